//! Deliveries to /receive/users/{guid}.

use axum::http::StatusCode;
use serde_json::json;

use portage_services::{LocalUser, PrivateKey, RawFormat, Stream};

use crate::{user_path, Pod, BOB_GUID, JSON};

fn bob_stream() -> Stream {
    Stream::User(BOB_GUID.to_string())
}

#[tokio::test]
async fn sealed_message_reaches_user_stream() {
    let pod = Pod::new();
    let body = pod.sealed(json!({"type": "message", "guid": "m1", "text": "psst"}));

    let (status, _) = pod.post(&user_path(BOB_GUID), JSON, body).await;
    assert_eq!(status, StatusCode::OK);

    let stored = pod.inbox.get(&bob_stream(), "m1").expect("message stored");
    assert_eq!(stored.raw_format, RawFormat::RawEncrypted);
    assert_eq!(stored.body["text"], "psst");
    assert!(pod.inbox.get(&Stream::Public, "m1").is_none());
}

#[tokio::test]
async fn plain_delivery_to_user_is_stored() {
    let pod = Pod::new();
    let body = pod.plain(json!({"type": "contact", "following": true}));
    let (status, _) = pod.post(&user_path(BOB_GUID), JSON, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pod.inbox.count(&bob_stream()), 1);
}

#[tokio::test]
async fn comment_on_public_post_lands_in_user_stream() {
    let pod = Pod::new();
    pod.post(
        "/receive/public",
        JSON,
        pod.plain(json!({"type": "status_message", "guid": "p1"})),
    )
    .await;

    let comment = pod.sealed(json!({"type": "comment", "guid": "c1", "parent_guid": "p1"}));
    let (status, _) = pod.post(&user_path(BOB_GUID), JSON, comment).await;
    assert_eq!(status, StatusCode::OK);
    assert!(pod.inbox.get(&bob_stream(), "c1").is_some());
}

#[tokio::test]
async fn unknown_guid_is_accepted_without_storing() {
    let pod = Pod::new();
    let plain = pod.plain(json!({"type": "message", "guid": "m1"}));
    let sealed = pod.sealed(json!({"type": "message", "guid": "m2"}));

    assert_eq!(pod.post(&user_path("nobody"), JSON, plain).await.0, StatusCode::ACCEPTED);
    assert_eq!(pod.post(&user_path("nobody"), JSON, sealed).await.0, StatusCode::ACCEPTED);
    assert_eq!(pod.inbox.total(), 0);
}

#[tokio::test]
async fn user_without_key_cannot_open_sealed_mail() {
    let pod = Pod::new();
    pod.users
        .insert(LocalUser::new("no-key", "carol@portage.local", PrivateKey::default()));
    let body = pod.sealed(json!({"type": "message", "guid": "m1"}));

    let (status, _) = pod.post(&user_path("no-key"), JSON, body).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(pod.inbox.total(), 0);
}

#[tokio::test]
async fn disabled_federation_is_forbidden() {
    let pod = Pod::new();
    pod.set_enabled(false);
    let body = pod.sealed(json!({"type": "message", "guid": "m1"}));

    let (status, text) = pod.post(&user_path(BOB_GUID), JSON, body).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(text, "Access denied.");
}
