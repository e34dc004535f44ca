//! /receive/public and /receive/users/{guid}.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;

use portage_services::{Acknowledgement, InboundBody, ReceiveTarget};

use super::{ack_status, ApiState};

// ── /receive/public (POST) ────────────────────────────────────────────────────

pub async fn handle_receive_public(
    State(state): State<ApiState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    receive(&state, ReceiveTarget::Public, &headers, body)
}

// ── /receive/users/{guid} (POST) ──────────────────────────────────────────────

pub async fn handle_receive_user(
    State(state): State<ApiState>,
    Path(guid): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    receive(&state, ReceiveTarget::User { guid }, &headers, body)
}

fn receive(
    state: &ApiState,
    target: ReceiveTarget,
    headers: &HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let content_type = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok());
    let body = InboundBody::classify(content_type, body);

    let ack = state.receiver.receive(&target, &body);
    let text = match ack {
        Acknowledgement::Forbidden => "Access denied.",
        _ => "",
    };
    (ack_status(ack), text)
}
