//! Signature Verifier: opens sealed envelopes and authenticates the sender.

use std::sync::Arc;

use portage_core::crypto::{self, RecipientKeypair};
use portage_core::wire::ALG_ED25519;
use portage_core::MagicEnvelope;

use crate::directory::KeyDirectory;
use crate::envelope::{Entity, EnvelopeBody, MessageEnvelope, RecipientContext};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("bad signature: {0}")]
    BadSignature(String),

    #[error("cannot decrypt payload: {0}")]
    UndecryptablePayload(String),

    #[error("unknown sender {0}")]
    UnknownSender(String),
}

pub struct Verifier {
    keys: Arc<dyn KeyDirectory>,
}

impl Verifier {
    pub fn new(keys: Arc<dyn KeyDirectory>) -> Self {
        Self { keys }
    }

    /// Returns the envelope marked verified, with a sealed body replaced by
    /// the entity it contained.
    pub fn verify(
        &self,
        envelope: MessageEnvelope,
        ctx: &RecipientContext,
    ) -> Result<MessageEnvelope, VerificationError> {
        let entity = match envelope.body() {
            EnvelopeBody::Open(entity) => entity.clone(),
            EnvelopeBody::Sealed(sealed) => {
                let key = ctx.private_key().ok_or_else(|| {
                    VerificationError::UndecryptablePayload("recipient has no private key".into())
                })?;
                let keypair = RecipientKeypair::from_encoded(key.expose())
                    .map_err(undecryptable)?;
                let plaintext = sealed
                    .to_sealed()
                    .and_then(|s| keypair.open(&s))
                    .map_err(undecryptable)?;
                let magic: MagicEnvelope =
                    serde_json::from_slice(&plaintext).map_err(undecryptable)?;
                Entity::from_magic(magic).map_err(undecryptable)?
            }
        };

        self.check_signature(entity.signed())?;
        tracing::debug!(sender = %entity.sender_handle, "signature verified");
        Ok(envelope.into_verified(entity))
    }

    fn check_signature(&self, magic: &MagicEnvelope) -> Result<(), VerificationError> {
        if magic.alg != ALG_ED25519 {
            return Err(VerificationError::BadSignature(format!(
                "unsupported algorithm {:?}",
                magic.alg
            )));
        }
        let sender = self
            .keys
            .resolve_public_key(&magic.author)
            .ok_or_else(|| VerificationError::UnknownSender(magic.author.clone()))?;
        let signature = magic
            .signature()
            .map_err(|e| VerificationError::BadSignature(e.to_string()))?;
        crypto::verify_signature(&sender.0, magic.signed_text().as_bytes(), &signature)
            .map_err(|e| VerificationError::BadSignature(e.to_string()))
    }
}

fn undecryptable(e: impl std::fmt::Display) -> VerificationError {
    VerificationError::UndecryptablePayload(e.to_string())
}
