//! HTTP handlers for the federation receive endpoints and operator status.

pub mod receive;
pub mod status;

use std::sync::Arc;

use axum::http::StatusCode;

use portage_services::{Acknowledgement, FeatureFlags, Inbox, PeerKeyTable, Receiver, UserTable};

#[derive(Clone)]
pub struct ApiState {
    pub receiver: Arc<Receiver>,
    pub flags: FeatureFlags,
    pub users: UserTable,
    pub peers: PeerKeyTable,
    pub inbox: Inbox,
    /// Maximum accepted request body, in bytes.
    pub body_limit: usize,
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// HTTP status for each acknowledgement. Rejected deliveries still get a
/// success-class code so peers do not retry them.
pub fn ack_status(ack: Acknowledgement) -> StatusCode {
    match ack {
        Acknowledgement::Processed => StatusCode::OK,
        Acknowledgement::Accepted => StatusCode::ACCEPTED,
        Acknowledgement::Forbidden => StatusCode::FORBIDDEN,
        Acknowledgement::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        Acknowledgement::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

pub use receive::{handle_receive_public, handle_receive_user};
pub use status::handle_status;
