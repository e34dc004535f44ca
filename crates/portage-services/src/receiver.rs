//! The receive pipeline: feature gate, Decoder, Verifier, Dispatcher.
//!
//! HTTP-agnostic. `portage-api` classifies the body, calls
//! [`Receiver::receive`] and maps the [`Acknowledgement`] to a status code.

use std::sync::Arc;

use crate::decoder::{Decoder, InboundBody, WireCodec};
use crate::directory::{KeyDirectory, UserDirectory};
use crate::dispatcher::{DispatchOutcome, Dispatcher};
use crate::envelope::RecipientContext;
use crate::flags::{ConfigLookup, FEDERATION_ENABLED_KEY, SYSTEM_SCOPE};
use crate::ingest::{PublicIngest, UserIngest};
use crate::verifier::Verifier;

/// Which endpoint a delivery came in on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiveTarget {
    Public,
    User { guid: String },
}

/// Pipeline position of one request. Every request ends in `Acknowledged`,
/// failures straight from the stage that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveStage {
    Idle,
    Decoding,
    Verifying,
    Dispatching,
    Acknowledged,
}

/// Transport-level answer to the sending peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Stored, or already stored.
    Processed,
    /// Received but not acted on. Peers must not retry.
    Accepted,
    /// Federation is switched off.
    Forbidden,
    /// The body could not be decoded.
    InternalError,
    /// Storage is down; peers should retry later.
    Unavailable,
}

impl From<DispatchOutcome> for Acknowledgement {
    fn from(outcome: DispatchOutcome) -> Self {
        match outcome {
            DispatchOutcome::Accepted | DispatchOutcome::Duplicate => Self::Processed,
            DispatchOutcome::Rejected => Self::Accepted,
            DispatchOutcome::TransientFailure => Self::Unavailable,
        }
    }
}

/// Everything the pipeline calls out to.
pub struct Collaborators {
    pub config: Arc<dyn ConfigLookup>,
    pub users: Arc<dyn UserDirectory>,
    pub keys: Arc<dyn KeyDirectory>,
    pub codec: Arc<dyn WireCodec>,
    pub public_ingest: Arc<dyn PublicIngest>,
    pub user_ingest: Arc<dyn UserIngest>,
}

pub struct Receiver {
    config: Arc<dyn ConfigLookup>,
    users: Arc<dyn UserDirectory>,
    decoder: Decoder,
    verifier: Verifier,
    dispatcher: Dispatcher,
}

impl Receiver {
    pub fn new(c: Collaborators) -> Self {
        Self {
            config: c.config,
            users: c.users,
            decoder: Decoder::new(c.codec),
            verifier: Verifier::new(c.keys),
            dispatcher: Dispatcher::new(c.public_ingest, c.user_ingest),
        }
    }

    pub fn federation_enabled(&self) -> bool {
        self.config.get_bool(SYSTEM_SCOPE, FEDERATION_ENABLED_KEY, false)
    }

    /// Run one delivery through the pipeline. Never fails; every outcome is
    /// an acknowledgement.
    pub fn receive(&self, target: &ReceiveTarget, body: &InboundBody) -> Acknowledgement {
        self.receive_staged(target, body).1
    }

    /// Like [`Receiver::receive`], also returning the last stage the request
    /// entered before it was acknowledged.
    pub fn receive_staged(
        &self,
        target: &ReceiveTarget,
        body: &InboundBody,
    ) -> (ReceiveStage, Acknowledgement) {
        let mut stage = ReceiveStage::Idle;
        let ack = self.run(&mut stage, target, body);
        let reached = stage;
        advance(&mut stage, ReceiveStage::Acknowledged);
        (reached, ack)
    }

    fn run(
        &self,
        stage: &mut ReceiveStage,
        target: &ReceiveTarget,
        body: &InboundBody,
    ) -> Acknowledgement {
        if !self.federation_enabled() {
            tracing::info!(endpoint = ?target, "federation disabled, refusing delivery");
            return Acknowledgement::Forbidden;
        }

        // Dropped at the end of the request, zeroizing any private key.
        let ctx = match target {
            ReceiveTarget::Public => RecipientContext::public(),
            ReceiveTarget::User { guid } => {
                let importer = self.users.get_by_guid(guid);
                if importer.is_none() {
                    tracing::debug!(guid = %guid, "no local user for guid");
                }
                RecipientContext::user(guid, importer)
            }
        };

        advance(stage, ReceiveStage::Decoding);
        let envelope = match self.decoder.decode(body, &ctx) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    endpoint = ?target,
                    ?stage,
                    error = %e,
                    "could not decode delivery"
                );
                return Acknowledgement::InternalError;
            }
        };

        advance(stage, ReceiveStage::Verifying);
        let envelope = match self.verifier.verify(envelope, &ctx) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::warn!(
                    endpoint = ?target,
                    ?stage,
                    error = %e,
                    "verification failed, acknowledging without action"
                );
                return Acknowledgement::Accepted;
            }
        };

        advance(stage, ReceiveStage::Dispatching);
        Acknowledgement::from(self.dispatcher.dispatch(&envelope, &ctx))
    }
}

fn advance(stage: &mut ReceiveStage, next: ReceiveStage) {
    tracing::debug!(from = ?*stage, to = ?next, "receive stage");
    *stage = next;
}
