//! portage-services: the inbound federation pipeline.
//!
//! Decoder → Verifier → Dispatcher, orchestrated by [`Receiver`]. Everything
//! the pipeline needs from the outside world (config, user directory, sender
//! keys, storage) is reached through the traits in [`flags`], [`directory`]
//! and [`ingest`]; in-memory implementations ship alongside them.

pub mod decoder;
pub mod directory;
pub mod dispatcher;
pub mod envelope;
pub mod flags;
pub mod inbox;
pub mod ingest;
pub mod receiver;
pub mod verifier;


pub use decoder::{DecodeError, Decoder, DiasporaCodec, InboundBody, WireCodec};
pub use directory::{
    KeyDirectory, LocalUser, PeerKeyTable, PrivateKey, SenderKey, UserDirectory, UserTable,
};
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use envelope::{
    Entity, EntityError, EnvelopeBody, MessageEnvelope, RawFormat, RecipientContext, Scope,
};
pub use flags::{ConfigLookup, FeatureFlags, FEDERATION_ENABLED_KEY, SYSTEM_SCOPE};
pub use inbox::{entity_types, Inbox, StoredEntity, Stream};
pub use ingest::{IngestError, IngestResult, Ingested, PublicIngest, UserIngest};
pub use receiver::{Acknowledgement, Collaborators, ReceiveStage, ReceiveTarget, Receiver};
pub use verifier::{VerificationError, Verifier};
