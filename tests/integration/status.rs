//! GET /api/status.

use serde_json::json;

use crate::{user_path, Pod, BOB_GUID, JSON};

#[tokio::test]
async fn status_reports_directories_and_streams() {
    let pod = Pod::new();
    pod.post(
        "/receive/public",
        JSON,
        pod.plain(json!({"type": "status_message", "guid": "p1"})),
    )
    .await;
    pod.post(
        &user_path(BOB_GUID),
        JSON,
        pod.sealed(json!({"type": "message", "guid": "m1"})),
    )
    .await;

    let status = pod.get_json("/api/status").await;
    assert_eq!(status["federation_enabled"], true);
    assert_eq!(status["local_users"], 1);
    assert_eq!(status["known_peers"], 1);
    assert_eq!(status["public_entities"], 1);
    assert_eq!(status["user_entities"], 1);
}

#[tokio::test]
async fn status_reflects_flag_changes() {
    let pod = Pod::new();
    pod.set_enabled(false);
    let status = pod.get_json("/api/status").await;
    assert_eq!(status["federation_enabled"], false);
}
