//! Ingestion contract: what the Dispatcher hands verified envelopes to.
//!
//! Implementations own atomicity and deduplication of each entity write:
//! several peers may redeliver the same entity concurrently.

use crate::directory::LocalUser;
use crate::envelope::MessageEnvelope;

/// Successful ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ingested {
    Applied,
    /// Recognized and already applied earlier (e.g. duplicate guid).
    AlreadyApplied,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    #[error("unknown entity type {0:?}")]
    UnknownType(String),

    #[error("entity has no guid")]
    MissingGuid,

    #[error("referenced parent {0} not found")]
    MissingParent(String),

    #[error("content rejected: {0}")]
    Rejected(String),

    /// Storage or infrastructure is down; the peer should retry later.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl IngestError {
    /// Only transient failures invite a retry from the sending peer.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

pub type IngestResult = Result<Ingested, IngestError>;

/// Stores deliveries to the public stream.
pub trait PublicIngest: Send + Sync {
    fn ingest_public(&self, envelope: &MessageEnvelope) -> IngestResult;
}

/// Stores deliveries addressed to one local user.
pub trait UserIngest: Send + Sync {
    fn ingest_for_user(&self, importer: &LocalUser, envelope: &MessageEnvelope) -> IngestResult;
}
