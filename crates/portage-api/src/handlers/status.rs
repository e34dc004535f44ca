//! /status handler.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use portage_services::Stream;

use super::ApiState;

// ── /status ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub federation_enabled: bool,
    pub local_users: usize,
    pub known_peers: usize,
    pub public_entities: usize,
    pub user_entities: usize,
}

pub async fn handle_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let total = state.inbox.total();
    let public_entities = state.inbox.count(&Stream::Public);

    Json(StatusResponse {
        federation_enabled: state.flags.federation_enabled(),
        local_users: state.users.len(),
        known_peers: state.peers.len(),
        public_entities,
        user_entities: total.saturating_sub(public_entities),
    })
}
