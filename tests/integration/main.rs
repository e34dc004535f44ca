//! Portage integration test harness.
//!
//! Each test builds the full router over fresh in-memory stores and drives it
//! with `tower::ServiceExt::oneshot`; no sockets are opened.

mod formats;
mod public;
mod status;
mod users;

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use tower::ServiceExt;

use portage_core::crypto::{RecipientKeypair, SigningKeypair};
use portage_core::wire::{self, WireMessage};
use portage_core::{MagicEnvelope, SealedEnvelope};
use portage_services::{
    Collaborators, DiasporaCodec, FeatureFlags, Inbox, LocalUser, PeerKeyTable, PrivateKey,
    Receiver, SenderKey, UserTable, FEDERATION_ENABLED_KEY, SYSTEM_SCOPE,
};

// ── Harness ───────────────────────────────────────────────────────────────────

pub const AUTHOR: &str = "alice@remote.example";
pub const BOB_GUID: &str = "0f1e2d3c4b5a";
pub const BOB_HANDLE: &str = "bob@portage.local";
pub const FORM: &str = "application/x-www-form-urlencoded";
pub const JSON: &str = "application/json";

/// A receiver with one trusted remote author and one local user.
pub struct Pod {
    pub flags: FeatureFlags,
    pub users: UserTable,
    pub peers: PeerKeyTable,
    pub inbox: Inbox,
    pub author: SigningKeypair,
    pub bob: RecipientKeypair,
    router: Router,
}

impl Pod {
    pub fn new() -> Self {
        Self::with_limits(0, 1024 * 1024)
    }

    pub fn with_limits(max_entities: usize, body_limit: usize) -> Self {
        let flags = FeatureFlags::new();
        flags.set(SYSTEM_SCOPE, FEDERATION_ENABLED_KEY, true);

        let author = SigningKeypair::generate();
        let peers = PeerKeyTable::new();
        peers.insert(AUTHOR, SenderKey(author.public));

        let bob = RecipientKeypair::generate();
        let users = UserTable::new();
        users.insert(LocalUser::new(
            BOB_GUID,
            BOB_HANDLE,
            PrivateKey::new(bob.encoded_private().to_string()),
        ));

        let inbox = Inbox::new(max_entities);
        let receiver = Arc::new(Receiver::new(Collaborators {
            config: Arc::new(flags.clone()),
            users: Arc::new(users.clone()),
            keys: Arc::new(peers.clone()),
            codec: Arc::new(DiasporaCodec),
            public_ingest: Arc::new(inbox.clone()),
            user_ingest: Arc::new(inbox.clone()),
        }));

        let router = portage_api::router(portage_api::ApiState {
            receiver,
            flags: flags.clone(),
            users: users.clone(),
            peers: peers.clone(),
            inbox: inbox.clone(),
            body_limit,
        });

        Self {
            flags,
            users,
            peers,
            inbox,
            author,
            bob,
            router,
        }
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.flags.set(SYSTEM_SCOPE, FEDERATION_ENABLED_KEY, enabled);
    }

    /// Sign an entity as [`AUTHOR`].
    pub fn sign(&self, entity: serde_json::Value) -> MagicEnvelope {
        MagicEnvelope::sign(AUTHOR, entity.to_string().as_bytes(), &self.author)
    }

    /// New-format body, unencrypted.
    pub fn plain(&self, entity: serde_json::Value) -> Vec<u8> {
        wire::encode_raw(&WireMessage::MagicEnvelope(self.sign(entity)))
    }

    /// New-format body sealed for bob.
    pub fn sealed(&self, entity: serde_json::Value) -> Vec<u8> {
        let sealed = SealedEnvelope::seal(&self.sign(entity), &self.bob.public).unwrap();
        wire::encode_raw(&WireMessage::SealedEnvelope(sealed))
    }

    /// Legacy form body with the `<diaspora>` document double-encoded.
    pub fn legacy(&self, entity: serde_json::Value) -> Vec<u8> {
        let xml = wire::encode_legacy(&WireMessage::MagicEnvelope(self.sign(entity))).unwrap();
        legacy_form(&xml)
    }

    pub async fn post(&self, path: &str, content_type: &str, body: Vec<u8>) -> (StatusCode, String) {
        let req = Request::builder()
            .method(Method::POST)
            .uri(path)
            .header(header::CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        send(self.router.clone(), req).await
    }

    pub async fn get_json(&self, path: &str) -> serde_json::Value {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let (status, text) = send(self.router.clone(), req).await;
        assert_eq!(status, StatusCode::OK, "GET {path} failed: {text}");
        serde_json::from_str(&text).unwrap()
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }
}

/// Wrap a document the way legacy peers post it.
pub fn legacy_form(document: &str) -> Vec<u8> {
    let once = urlencoding::encode(document);
    format!("xml={}", urlencoding::encode(&once)).into_bytes()
}

pub fn user_path(guid: &str) -> String {
    format!("/receive/users/{guid}")
}

pub async fn send(router: Router, req: Request<Body>) -> (StatusCode, String) {
    let resp = router.oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}
