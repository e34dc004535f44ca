//! In-memory inbox: the public stream plus one stream per local user.
//!
//! Deduplicates on entity guid through a single map entry, so concurrent
//! redeliveries of one entity apply exactly once.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::directory::LocalUser;
use crate::envelope::{Entity, MessageEnvelope, RawFormat};
use crate::ingest::{IngestError, IngestResult, Ingested, PublicIngest, UserIngest};

/// Entity type strings this inbox stores.
pub mod entity_types {
    pub const STATUS_MESSAGE: &str = "status_message";
    pub const RESHARE: &str = "reshare";
    pub const COMMENT: &str = "comment";
    pub const LIKE: &str = "like";
    pub const RETRACTION: &str = "retraction";
    pub const CONTACT: &str = "contact";
    pub const PROFILE: &str = "profile";
    pub const CONVERSATION: &str = "conversation";
    pub const MESSAGE: &str = "message";
    pub const PARTICIPATION: &str = "participation";
    pub const POLL_PARTICIPATION: &str = "poll_participation";
    pub const EVENT_PARTICIPATION: &str = "event_participation";
    pub const ACCOUNT_DELETION: &str = "account_deletion";

    pub const KNOWN: &[&str] = &[
        STATUS_MESSAGE,
        RESHARE,
        COMMENT,
        LIKE,
        RETRACTION,
        CONTACT,
        PROFILE,
        CONVERSATION,
        MESSAGE,
        PARTICIPATION,
        POLL_PARTICIPATION,
        EVENT_PARTICIPATION,
        ACCOUNT_DELETION,
    ];

    /// Types that hang off a parent entity and need it present.
    pub const RELAYABLE: &[&str] = &[
        COMMENT,
        LIKE,
        PARTICIPATION,
        POLL_PARTICIPATION,
        EVENT_PARTICIPATION,
    ];

    /// Types without a guid: one current value per author, replaced on update.
    pub const PER_AUTHOR: &[&str] = &[CONTACT, PROFILE, ACCOUNT_DELETION];
}

/// Which stream an entity lives in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "guid")]
pub enum Stream {
    Public,
    User(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredEntity {
    pub key: String,
    pub entity_type: String,
    pub author: String,
    pub body: Map<String, Value>,
    pub raw_format: RawFormat,
    /// Unix timestamp in milliseconds.
    pub received_at: u64,
}

#[derive(Clone)]
pub struct Inbox {
    entries: Arc<DashMap<(Stream, String), StoredEntity>>,
    stored: Arc<AtomicUsize>,
    /// 0 = unlimited.
    max_entities: usize,
}

impl Default for Inbox {
    fn default() -> Self {
        Self::new(0)
    }
}

impl Inbox {
    pub fn new(max_entities: usize) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            stored: Arc::new(AtomicUsize::new(0)),
            max_entities,
        }
    }

    pub fn get(&self, stream: &Stream, key: &str) -> Option<StoredEntity> {
        self.entries
            .get(&(stream.clone(), key.to_string()))
            .map(|e| e.value().clone())
    }

    /// All entities in one stream, oldest first.
    pub fn list(&self, stream: &Stream) -> Vec<StoredEntity> {
        let mut out: Vec<StoredEntity> = self
            .entries
            .iter()
            .filter(|e| &e.key().0 == stream)
            .map(|e| e.value().clone())
            .collect();
        out.sort_by_key(|e| e.received_at);
        out
    }

    pub fn count(&self, stream: &Stream) -> usize {
        self.entries.iter().filter(|e| &e.key().0 == stream).count()
    }

    /// Entities across every stream.
    pub fn total(&self) -> usize {
        self.stored.load(Ordering::Relaxed)
    }

    pub fn clear(&self) {
        self.entries.clear();
        self.stored.store(0, Ordering::Relaxed);
    }

    fn ingest(&self, stream: Stream, envelope: &MessageEnvelope) -> IngestResult {
        let entity = envelope
            .entity()
            .filter(|_| envelope.is_verified())
            .ok_or_else(|| IngestError::Rejected("envelope not verified".to_string()))?;

        let entity_type = entity.payload_type.as_str();
        if !entity_types::KNOWN.contains(&entity_type) {
            return Err(IngestError::UnknownType(entity_type.to_string()));
        }
        if let Some(claimed) = entity.field("author") {
            if !claimed.eq_ignore_ascii_case(&entity.sender_handle) {
                return Err(IngestError::Rejected(format!(
                    "author {claimed} does not match signer {}",
                    entity.sender_handle
                )));
            }
        }

        if entity_type == entity_types::RETRACTION {
            return self.retract(&stream, entity);
        }
        if entity_types::RELAYABLE.contains(&entity_type) {
            let parent = entity
                .field("parent_guid")
                .ok_or_else(|| IngestError::Rejected("relayable without parent_guid".into()))?;
            if !self.contains(&stream, parent) && !self.contains(&Stream::Public, parent) {
                return Err(IngestError::MissingParent(parent.to_string()));
            }
        }

        let stored = StoredEntity {
            key: String::new(),
            entity_type: entity_type.to_string(),
            author: entity.sender_handle.clone(),
            body: entity.payload_body.clone(),
            raw_format: envelope.raw_format(),
            received_at: now_millis(),
        };

        if entity_types::PER_AUTHOR.contains(&entity_type) {
            let key = format!("{entity_type}:{}", entity.sender_handle.to_ascii_lowercase());
            return self.upsert(stream, key, stored);
        }

        let guid = entity.guid().ok_or(IngestError::MissingGuid)?;
        self.insert_once(stream, guid.to_string(), stored)
    }

    fn contains(&self, stream: &Stream, key: &str) -> bool {
        self.entries.contains_key(&(stream.clone(), key.to_string()))
    }

    fn reserve(&self) -> Result<(), IngestError> {
        if self.max_entities == 0 {
            self.stored.fetch_add(1, Ordering::Relaxed);
            return Ok(());
        }
        self.stored
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| {
                (n < self.max_entities).then_some(n + 1)
            })
            .map(|_| ())
            .map_err(|n| IngestError::Unavailable(format!("inbox full ({n} entities)")))
    }

    fn insert_once(&self, stream: Stream, key: String, mut stored: StoredEntity) -> IngestResult {
        match self.entries.entry((stream, key.clone())) {
            Entry::Occupied(_) => Ok(Ingested::AlreadyApplied),
            Entry::Vacant(slot) => {
                self.reserve()?;
                stored.key = key;
                slot.insert(stored);
                Ok(Ingested::Applied)
            }
        }
    }

    fn upsert(&self, stream: Stream, key: String, mut stored: StoredEntity) -> IngestResult {
        stored.key = key.clone();
        match self.entries.entry((stream, key)) {
            Entry::Occupied(mut existing) => {
                if existing.get().body == stored.body {
                    return Ok(Ingested::AlreadyApplied);
                }
                existing.insert(stored);
                Ok(Ingested::Applied)
            }
            Entry::Vacant(slot) => {
                self.reserve()?;
                slot.insert(stored);
                Ok(Ingested::Applied)
            }
        }
    }

    /// Remove the target if its author is the retraction's signer. A second
    /// delivery finds nothing left and reports `AlreadyApplied`.
    fn retract(&self, stream: &Stream, entity: &Entity) -> IngestResult {
        let target = entity
            .field("target_guid")
            .ok_or_else(|| IngestError::Rejected("retraction without target_guid".into()))?;
        let key = (stream.clone(), target.to_string());
        let removed = self
            .entries
            .remove_if(&key, |_, stored| {
                stored.author.eq_ignore_ascii_case(&entity.sender_handle)
            });
        if removed.is_some() {
            self.stored.fetch_sub(1, Ordering::Relaxed);
            return Ok(Ingested::Applied);
        }
        match self.entries.get(&key) {
            Some(other) => Err(IngestError::Rejected(format!(
                "{} cannot retract {target} owned by {}",
                entity.sender_handle,
                other.author
            ))),
            None => Ok(Ingested::AlreadyApplied),
        }
    }
}

impl PublicIngest for Inbox {
    fn ingest_public(&self, envelope: &MessageEnvelope) -> IngestResult {
        self.ingest(Stream::Public, envelope)
    }
}

impl UserIngest for Inbox {
    fn ingest_for_user(&self, importer: &LocalUser, envelope: &MessageEnvelope) -> IngestResult {
        self.ingest(Stream::User(importer.guid.clone()), envelope)
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
