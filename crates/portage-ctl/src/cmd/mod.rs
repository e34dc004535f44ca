//! CLI command modules.

pub mod deliver;
pub mod http;
pub mod keygen;
pub mod status;
