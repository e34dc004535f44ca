//! Payload Decoder: turns an HTTP body into an unverified [`MessageEnvelope`].
//!
//! Two wire generations are accepted without negotiation. Peers migrate
//! between them independently, and some send the current format under the
//! legacy `xml` field name, so public deliveries whose legacy decode fails get
//! a second attempt as a raw body.

use std::sync::Arc;

use bytes::Bytes;
use portage_core::wire::{self, WireError, WireMessage};

use crate::envelope::{
    Entity, EntityError, EnvelopeBody, MessageEnvelope, RawFormat, RecipientContext, Scope,
};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

// ── Inbound body ──────────────────────────────────────────────────────────────

/// An HTTP request body, classified by generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundBody {
    /// Value of the `xml` form field, still URL-encoded once.
    Legacy(String),
    Raw(Bytes),
}

impl InboundBody {
    /// Form posts carrying a non-empty `xml` field are legacy deliveries;
    /// every other body is raw.
    pub fn classify(content_type: Option<&str>, body: Bytes) -> Self {
        let is_form = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
            .unwrap_or(false);

        if is_form {
            if let Ok(fields) = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body) {
                if let Some((_, xml)) = fields
                    .into_iter()
                    .find(|(name, value)| name == "xml" && !value.is_empty())
                {
                    return Self::Legacy(xml);
                }
            }
        }
        Self::Raw(body)
    }
}

// ── Codec ─────────────────────────────────────────────────────────────────────

/// The protocol capability the Decoder calls into.
pub trait WireCodec: Send + Sync {
    fn decode_legacy(&self, xml: &str) -> Result<WireMessage, WireError>;
    fn decode_raw(&self, bytes: &[u8]) -> Result<WireMessage, WireError>;
}

/// The Diaspora-style codec from `portage-core::wire`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiasporaCodec;

impl WireCodec for DiasporaCodec {
    fn decode_legacy(&self, xml: &str) -> Result<WireMessage, WireError> {
        wire::decode_legacy(xml)
    }

    fn decode_raw(&self, bytes: &[u8]) -> Result<WireMessage, WireError> {
        wire::decode_raw(bytes)
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("missing postdata")]
    EmptyBody,

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),
}

impl From<WireError> for DecodeError {
    fn from(e: WireError) -> Self {
        match e {
            WireError::Unrecognized(_)
            | WireError::UnsupportedEncoding(_)
            | WireError::UnsupportedDataType(_) => Self::UnsupportedFormat(e.to_string()),
            WireError::Raw(_) | WireError::Legacy(_) | WireError::Field(_) => {
                Self::MalformedPayload(e.to_string())
            }
        }
    }
}

impl From<EntityError> for DecodeError {
    fn from(e: EntityError) -> Self {
        match e {
            EntityError::Wire(wire) => wire.into(),
            other => Self::MalformedPayload(other.to_string()),
        }
    }
}

// ── Decoder ───────────────────────────────────────────────────────────────────

pub struct Decoder {
    codec: Arc<dyn WireCodec>,
}

impl Decoder {
    pub fn new(codec: Arc<dyn WireCodec>) -> Self {
        Self { codec }
    }

    /// Decode and structurally validate a body. The result is never verified.
    pub fn decode(
        &self,
        body: &InboundBody,
        ctx: &RecipientContext,
    ) -> Result<MessageEnvelope, DecodeError> {
        let (raw_format, message) = match body {
            InboundBody::Legacy(field) => self.decode_legacy_field(field, ctx.scope())?,
            InboundBody::Raw(bytes) => {
                if bytes.is_empty() {
                    return Err(DecodeError::EmptyBody);
                }
                tracing::info!("message is in the new format");
                let message = self.codec.decode_raw(bytes)?;
                (raw_format_of(&message), message)
            }
        };

        let body = match message {
            WireMessage::MagicEnvelope(magic) => EnvelopeBody::Open(Entity::from_magic(magic)?),
            WireMessage::SealedEnvelope(sealed) => EnvelopeBody::Sealed(sealed),
        };
        let envelope = MessageEnvelope::unverified(raw_format, body);

        tracing::info!(format = ?raw_format, "post decoded");
        tracing::debug!(
            sealed = envelope.is_sealed(),
            sender = envelope.sender_handle().unwrap_or("-"),
            payload_type = envelope.payload_type().unwrap_or("-"),
            "decoded message"
        );
        Ok(envelope)
    }

    fn decode_legacy_field(
        &self,
        field: &str,
        scope: Scope,
    ) -> Result<(RawFormat, WireMessage), DecodeError> {
        // Legacy peers URL-encode the document before form-encoding it.
        let xml = urlencoding::decode_binary(field.as_bytes());

        tracing::info!("decoding message in the old format");
        let legacy = std::str::from_utf8(&xml)
            .map_err(|_| WireError::Unrecognized("legacy body is not UTF-8".to_string()))
            .and_then(|text| self.codec.decode_legacy(text));

        match legacy {
            Ok(message) => Ok((RawFormat::LegacyXml, message)),
            Err(e) if scope == Scope::Public => {
                tracing::info!(error = %e, "old format failed, decoding message in the new format");
                let message = self.codec.decode_raw(&xml)?;
                Ok((raw_format_of(&message), message))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn raw_format_of(message: &WireMessage) -> RawFormat {
    match message {
        WireMessage::MagicEnvelope(_) => RawFormat::PlainJson,
        WireMessage::SealedEnvelope(_) => RawFormat::RawEncrypted,
    }
}
