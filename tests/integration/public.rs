//! Deliveries to /receive/public.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use portage_services::Stream;

use crate::{send, Pod, AUTHOR, JSON};

#[tokio::test]
async fn plain_post_is_stored_in_public_stream() {
    let pod = Pod::new();
    let body = pod.plain(json!({"type": "status_message", "guid": "p1", "text": "hi"}));

    let (status, _) = pod.post("/receive/public", JSON, body).await;
    assert_eq!(status, StatusCode::OK);

    let stored = pod.inbox.get(&Stream::Public, "p1").expect("post stored");
    assert_eq!(stored.author, AUTHOR);
    assert_eq!(stored.entity_type, "status_message");
    assert_eq!(stored.body["text"], "hi");
}

#[tokio::test]
async fn redelivery_is_acknowledged_once_stored() {
    let pod = Pod::new();
    let body = pod.plain(json!({"type": "status_message", "guid": "p1"}));

    let (first, _) = pod.post("/receive/public", JSON, body.clone()).await;
    let (second, _) = pod.post("/receive/public", JSON, body).await;
    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(pod.inbox.count(&Stream::Public), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_redelivery_stores_one_copy() {
    let pod = Pod::new();
    let body = pod.plain(json!({"type": "status_message", "guid": "race"}));

    let mut tasks = Vec::new();
    for _ in 0..16 {
        let router = pod.router();
        let req = Request::builder()
            .method(Method::POST)
            .uri("/receive/public")
            .header(header::CONTENT_TYPE, JSON)
            .body(Body::from(body.clone()))
            .unwrap();
        tasks.push(tokio::spawn(send(router, req)));
    }
    for task in tasks {
        let (status, _) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }
    assert_eq!(pod.inbox.total(), 1);
}

#[tokio::test]
async fn comment_without_parent_is_accepted_but_not_stored() {
    let pod = Pod::new();
    let comment = pod.plain(json!({"type": "comment", "guid": "c1", "parent_guid": "p1"}));

    let (status, _) = pod.post("/receive/public", JSON, comment.clone()).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert!(pod.inbox.get(&Stream::Public, "c1").is_none());

    let post = pod.plain(json!({"type": "status_message", "guid": "p1"}));
    pod.post("/receive/public", JSON, post).await;
    let (status, _) = pod.post("/receive/public", JSON, comment).await;
    assert_eq!(status, StatusCode::OK);
    assert!(pod.inbox.get(&Stream::Public, "c1").is_some());
}

#[tokio::test]
async fn retraction_removes_post() {
    let pod = Pod::new();
    pod.post("/receive/public", JSON, pod.plain(json!({"type": "status_message", "guid": "p1"})))
        .await;

    let retraction = pod.plain(json!({"type": "retraction", "target_guid": "p1"}));
    let (status, _) = pod.post("/receive/public", JSON, retraction).await;
    assert_eq!(status, StatusCode::OK);
    assert!(pod.inbox.get(&Stream::Public, "p1").is_none());
}

#[tokio::test]
async fn unknown_type_is_accepted_without_storing() {
    let pod = Pod::new();
    let body = pod.plain(json!({"type": "poke", "guid": "x"}));
    let (status, _) = pod.post("/receive/public", JSON, body).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(pod.inbox.total(), 0);
}

#[tokio::test]
async fn unknown_author_is_accepted_without_storing() {
    let pod = Pod::new();
    pod.peers.remove(AUTHOR);
    let body = pod.plain(json!({"type": "status_message", "guid": "p1"}));
    let (status, _) = pod.post("/receive/public", JSON, body).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(pod.inbox.total(), 0);
}

#[tokio::test]
async fn forged_signature_is_accepted_without_storing() {
    let pod = Pod::new();
    let forger = Pod::new();
    // Same author handle, different signing key.
    let body = forger.plain(json!({"type": "status_message", "guid": "p1"}));
    let (status, _) = pod.post("/receive/public", JSON, body).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(pod.inbox.total(), 0);
}

#[tokio::test]
async fn empty_body_is_server_error() {
    let pod = Pod::new();
    let (status, _) = pod.post("/receive/public", JSON, Vec::new()).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn disabled_federation_is_forbidden() {
    let pod = Pod::new();
    pod.set_enabled(false);
    let body = pod.plain(json!({"type": "status_message", "guid": "p1"}));

    let (status, text) = pod.post("/receive/public", JSON, body.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(text, "Access denied.");
    assert_eq!(pod.inbox.total(), 0);

    // Takes effect without a restart.
    pod.set_enabled(true);
    let (status, _) = pod.post("/receive/public", JSON, body).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn full_inbox_asks_peer_to_retry() {
    let pod = Pod::with_limits(1, 1024 * 1024);
    let first = pod.plain(json!({"type": "status_message", "guid": "p1"}));
    let second = pod.plain(json!({"type": "status_message", "guid": "p2"}));

    assert_eq!(pod.post("/receive/public", JSON, first).await.0, StatusCode::OK);
    assert_eq!(
        pod.post("/receive/public", JSON, second).await.0,
        StatusCode::SERVICE_UNAVAILABLE
    );
}

#[tokio::test]
async fn oversized_body_is_refused() {
    let pod = Pod::with_limits(0, 256);
    let body = pod.plain(json!({"type": "status_message", "guid": "p1", "text": "x".repeat(1024)}));
    let (status, _) = pod.post("/receive/public", JSON, body).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(pod.inbox.total(), 0);
}
