//! portage-core: wire formats, cryptographic primitives, and configuration.
//! All other Portage crates depend on this one.

pub mod config;
pub mod crypto;
pub mod wire;

pub use wire::{MagicEnvelope, SealedEnvelope, WireError, WireMessage};
