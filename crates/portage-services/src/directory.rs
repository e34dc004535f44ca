//! Directories the pipeline consults: local users and remote sender keys.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use portage_core::config::{PeerEntry, UserEntry};
use portage_core::crypto;
use zeroize::{Zeroize, ZeroizeOnDrop};

// ── Private key ───────────────────────────────────────────────────────────────

/// Opaque private key string as stored in the user directory.
///
/// Zeroized on drop and redacted from `Debug`, so it cannot leak through
/// `tracing` fields or panics.
#[derive(Clone, Default, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey(String);

impl PrivateKey {
    pub fn new(encoded: String) -> Self {
        Self(encoded)
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.trim()
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(REDACTED)")
    }
}

// ── Users ─────────────────────────────────────────────────────────────────────

/// A local account that can receive user-scoped deliveries.
#[derive(Debug, Clone)]
pub struct LocalUser {
    pub guid: String,
    pub handle: String,
    /// Empty when the account has no key.
    pub private_key: PrivateKey,
}

impl LocalUser {
    pub fn new(guid: &str, handle: &str, private_key: PrivateKey) -> Self {
        Self {
            guid: guid.to_string(),
            handle: handle.to_string(),
            private_key,
        }
    }
}

/// Looks up local users by guid.
pub trait UserDirectory: Send + Sync {
    fn get_by_guid(&self, guid: &str) -> Option<LocalUser>;
}

/// In-memory user directory keyed by guid.
#[derive(Clone, Default)]
pub struct UserTable {
    users: Arc<DashMap<String, LocalUser>>,
}

impl UserTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(entries: &[UserEntry]) -> Self {
        let table = Self::new();
        for entry in entries {
            table.insert(LocalUser::new(
                &entry.guid,
                &entry.handle,
                PrivateKey::new(entry.private_key.clone()),
            ));
            tracing::info!(
                guid = %entry.guid,
                handle = %entry.handle,
                has_key = !entry.private_key.trim().is_empty(),
                "local user registered"
            );
        }
        table
    }

    pub fn insert(&self, user: LocalUser) {
        self.users.insert(user.guid.clone(), user);
    }

    pub fn remove(&self, guid: &str) {
        self.users.remove(guid);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for UserTable {
    fn get_by_guid(&self, guid: &str) -> Option<LocalUser> {
        self.users.get(guid).map(|u| u.value().clone())
    }
}

// ── Sender keys ───────────────────────────────────────────────────────────────

/// A remote author's Ed25519 public key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SenderKey(pub [u8; 32]);

/// Resolves the public key of a remote author handle.
///
/// Implementations that fetch keys over the network own their caching.
pub trait KeyDirectory: Send + Sync {
    fn resolve_public_key(&self, handle: &str) -> Option<SenderKey>;
}

/// In-memory key directory. Handles are matched case-insensitively.
#[derive(Clone, Default)]
pub struct PeerKeyTable {
    keys: Arc<DashMap<String, SenderKey>>,
}

impl PeerKeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load peers from config. Entries with undecodable keys are skipped.
    pub fn from_config(entries: &[PeerEntry]) -> Self {
        let table = Self::new();
        for entry in entries {
            match crypto::decode_public_key(&entry.public_key) {
                Ok(key) => {
                    table.insert(&entry.handle, SenderKey(key));
                    tracing::info!(
                        handle = %entry.handle,
                        key = crypto::fingerprint(&key),
                        "peer key registered"
                    );
                }
                Err(e) => {
                    tracing::warn!(handle = %entry.handle, error = %e, "skipping peer with bad key");
                }
            }
        }
        table
    }

    pub fn insert(&self, handle: &str, key: SenderKey) {
        self.keys.insert(normalize_handle(handle), key);
    }

    pub fn remove(&self, handle: &str) {
        self.keys.remove(&normalize_handle(handle));
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyDirectory for PeerKeyTable {
    fn resolve_public_key(&self, handle: &str) -> Option<SenderKey> {
        self.keys.get(&normalize_handle(handle)).map(|k| *k.value())
    }
}

fn normalize_handle(handle: &str) -> String {
    handle.trim().to_ascii_lowercase()
}
