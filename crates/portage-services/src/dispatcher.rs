//! Routes verified envelopes to the public or per-user ingestion path.

use std::sync::Arc;

use crate::envelope::{MessageEnvelope, RecipientContext, Scope};
use crate::ingest::{IngestError, Ingested, PublicIngest, UserIngest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Accepted,
    Duplicate,
    Rejected,
    TransientFailure,
}

impl From<Result<Ingested, IngestError>> for DispatchOutcome {
    fn from(result: Result<Ingested, IngestError>) -> Self {
        match result {
            Ok(Ingested::Applied) => Self::Accepted,
            Ok(Ingested::AlreadyApplied) => Self::Duplicate,
            Err(e) if e.is_transient() => Self::TransientFailure,
            Err(_) => Self::Rejected,
        }
    }
}

pub struct Dispatcher {
    public: Arc<dyn PublicIngest>,
    user: Arc<dyn UserIngest>,
}

impl Dispatcher {
    pub fn new(public: Arc<dyn PublicIngest>, user: Arc<dyn UserIngest>) -> Self {
        Self { public, user }
    }

    pub fn dispatch(&self, envelope: &MessageEnvelope, ctx: &RecipientContext) -> DispatchOutcome {
        if !envelope.is_verified() {
            tracing::warn!("refusing to dispatch unverified envelope");
            return DispatchOutcome::Rejected;
        }
        let payload_type = envelope.payload_type().unwrap_or("-");
        let sender = envelope.sender_handle().unwrap_or("-");

        let result = match ctx.scope() {
            Scope::Public => self.public.ingest_public(envelope),
            Scope::User => {
                let Some(importer) = ctx.importer() else {
                    tracing::warn!(
                        guid = ctx.user_guid().unwrap_or("-"),
                        payload_type,
                        "no local user for delivery, dropping"
                    );
                    return DispatchOutcome::Rejected;
                };
                self.user.ingest_for_user(importer, envelope)
            }
        };

        if let Err(e) = &result {
            if e.is_transient() {
                tracing::warn!(payload_type, sender, error = %e, "ingestion unavailable");
            } else {
                tracing::info!(payload_type, sender, error = %e, "entity rejected");
            }
        }
        let outcome = DispatchOutcome::from(result);
        tracing::info!(payload_type, sender, ?outcome, "dispatched");
        outcome
    }
}
