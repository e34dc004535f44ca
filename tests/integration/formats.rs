//! Wire generations and body classification.

use axum::http::StatusCode;
use serde_json::json;

use portage_core::wire::{self, WireMessage};
use portage_core::SealedEnvelope;
use portage_services::{RawFormat, Stream};

use crate::{legacy_form, user_path, Pod, BOB_GUID, FORM, JSON};

#[tokio::test]
async fn legacy_public_post_is_stored() {
    let pod = Pod::new();
    let body = pod.legacy(json!({"type": "status_message", "guid": "p1"}));

    let (status, _) = pod.post("/receive/public", FORM, body).await;
    assert_eq!(status, StatusCode::OK);
    let stored = pod.inbox.get(&Stream::Public, "p1").unwrap();
    assert_eq!(stored.raw_format, RawFormat::LegacyXml);
}

#[tokio::test]
async fn legacy_sealed_delivery_to_user() {
    let pod = Pod::new();
    let magic = pod.sign(json!({"type": "message", "guid": "m1"}));
    let sealed = SealedEnvelope::seal(&magic, &pod.bob.public).unwrap();
    let xml = wire::encode_legacy(&WireMessage::SealedEnvelope(sealed)).unwrap();

    let (status, _) = pod.post(&user_path(BOB_GUID), FORM, legacy_form(&xml)).await;
    assert_eq!(status, StatusCode::OK);
    let stored = pod.inbox.get(&Stream::User(BOB_GUID.into()), "m1").unwrap();
    assert_eq!(stored.raw_format, RawFormat::LegacyXml);
}

#[tokio::test]
async fn new_format_under_legacy_field_falls_back_on_public() {
    let pod = Pod::new();
    let json_body = String::from_utf8(pod.plain(json!({"type": "status_message", "guid": "p1"})))
        .unwrap();

    let (status, _) = pod.post("/receive/public", FORM, legacy_form(&json_body)).await;
    assert_eq!(status, StatusCode::OK);
    let stored = pod.inbox.get(&Stream::Public, "p1").unwrap();
    assert_eq!(stored.raw_format, RawFormat::PlainJson);
}

#[tokio::test]
async fn new_format_under_legacy_field_fails_for_users() {
    let pod = Pod::new();
    let json_body = String::from_utf8(pod.plain(json!({"type": "message", "guid": "m1"})))
        .unwrap();

    let (status, _) = pod.post(&user_path(BOB_GUID), FORM, legacy_form(&json_body)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(pod.inbox.total(), 0);
}

#[tokio::test]
async fn form_without_xml_field_is_treated_as_raw() {
    let pod = Pod::new();
    let (status, _) = pod
        .post("/receive/public", FORM, b"foo=bar".to_vec())
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn garbage_body_is_server_error() {
    let pod = Pod::new();
    let (status, _) = pod
        .post("/receive/public", JSON, b"\x00\x01 not a payload".to_vec())
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn entity_that_is_not_an_object_is_server_error() {
    let pod = Pod::new();
    let body = pod.plain(json!(["type", "status_message"]));
    let (status, _) = pod.post("/receive/public", JSON, body).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let pod = Pod::new();
    let body = pod.plain(json!({"type": "status_message", "guid": "p1"}));
    let (status, _) = pod.post("/receive/private", JSON, body).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
