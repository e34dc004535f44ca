//! Per-request data model: the message envelope and the recipient context.

use portage_core::{MagicEnvelope, SealedEnvelope, WireError};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::directory::{LocalUser, PrivateKey};

/// Which wire generation produced an envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RawFormat {
    /// `<diaspora>` XML inside the `xml` form field.
    LegacyXml,
    /// Raw body carrying a sealed envelope.
    RawEncrypted,
    /// Raw body carrying a signed, unencrypted envelope.
    PlainJson,
}

// ── Entity ────────────────────────────────────────────────────────────────────

/// A signed federation entity with its attributes parsed out.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub sender_handle: String,
    pub payload_type: String,
    /// Entity attributes, `type` removed.
    pub payload_body: Map<String, Value>,
    signed: MagicEnvelope,
}

impl Entity {
    /// Parse the signed data of a magic envelope. The data must be a JSON
    /// object with a non-empty string `type`.
    pub fn from_magic(magic: MagicEnvelope) -> Result<Self, EntityError> {
        if magic.author.trim().is_empty() {
            return Err(EntityError::MissingAuthor);
        }
        let bytes = magic.payload()?;
        let value: Value =
            serde_json::from_slice(&bytes).map_err(|e| EntityError::NotJson(e.to_string()))?;
        let Value::Object(mut body) = value else {
            return Err(EntityError::NotAnObject);
        };
        let payload_type = match body.remove("type") {
            Some(Value::String(t)) if !t.is_empty() => t,
            _ => return Err(EntityError::MissingType),
        };
        Ok(Self {
            sender_handle: magic.author.clone(),
            payload_type,
            payload_body: body,
            signed: magic,
        })
    }

    /// The envelope the signature was computed over.
    pub fn signed(&self) -> &MagicEnvelope {
        &self.signed
    }

    /// A string attribute of the entity.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.payload_body.get(name).and_then(Value::as_str)
    }

    pub fn guid(&self) -> Option<&str> {
        self.field("guid").filter(|g| !g.is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EntityError {
    #[error(transparent)]
    Wire(#[from] WireError),
    #[error("entity data is not JSON: {0}")]
    NotJson(String),
    #[error("entity data is not a JSON object")]
    NotAnObject,
    #[error("entity has no type")]
    MissingType,
    #[error("envelope has no author")]
    MissingAuthor,
}

// ── Envelope ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum EnvelopeBody {
    Open(Entity),
    /// Still encrypted; sender and type are unknown until the Verifier opens it.
    Sealed(SealedEnvelope),
}

/// The unit passed Decoder → Verifier → Dispatcher.
///
/// `verified` can only be set by the Verifier; the Dispatcher refuses
/// envelopes without it.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageEnvelope {
    raw_format: RawFormat,
    body: EnvelopeBody,
    verified: bool,
}

impl MessageEnvelope {
    pub fn unverified(raw_format: RawFormat, body: EnvelopeBody) -> Self {
        Self {
            raw_format,
            body,
            verified: false,
        }
    }

    pub(crate) fn into_verified(self, entity: Entity) -> Self {
        Self {
            raw_format: self.raw_format,
            body: EnvelopeBody::Open(entity),
            verified: true,
        }
    }

    pub fn raw_format(&self) -> RawFormat {
        self.raw_format
    }

    pub fn body(&self) -> &EnvelopeBody {
        &self.body
    }

    pub fn is_verified(&self) -> bool {
        self.verified
    }

    pub fn is_sealed(&self) -> bool {
        matches!(self.body, EnvelopeBody::Sealed(_))
    }

    pub fn entity(&self) -> Option<&Entity> {
        match &self.body {
            EnvelopeBody::Open(entity) => Some(entity),
            EnvelopeBody::Sealed(_) => None,
        }
    }

    pub fn sender_handle(&self) -> Option<&str> {
        self.entity().map(|e| e.sender_handle.as_str())
    }

    pub fn payload_type(&self) -> Option<&str> {
        self.entity().map(|e| e.payload_type.as_str())
    }

    pub fn payload_body(&self) -> Option<&Map<String, Value>> {
        self.entity().map(|e| &e.payload_body)
    }
}

// ── Recipient context ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Public,
    User,
}

/// Who a delivery is for. Built once per request and passed by reference
/// through every stage.
///
/// The private key lives here and nowhere else for the duration of the
/// request; dropping the context wipes it.
#[derive(Debug)]
pub struct RecipientContext {
    scope: Scope,
    user_guid: Option<String>,
    importer: Option<LocalUser>,
    private_key: Option<PrivateKey>,
}

impl RecipientContext {
    pub fn public() -> Self {
        Self {
            scope: Scope::Public,
            user_guid: None,
            importer: None,
            private_key: None,
        }
    }

    /// Context for `/users/{guid}`. `importer` is `None` when the guid is
    /// unknown; the pipeline still runs and fails naturally later.
    pub fn user(guid: &str, importer: Option<LocalUser>) -> Self {
        let (importer, private_key) = match importer {
            Some(mut user) => {
                let key = std::mem::take(&mut user.private_key);
                (Some(user), Some(key).filter(|k| !k.is_empty()))
            }
            None => (None, None),
        };
        Self {
            scope: Scope::User,
            user_guid: Some(guid.to_string()),
            importer,
            private_key,
        }
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    pub fn user_guid(&self) -> Option<&str> {
        self.user_guid.as_deref()
    }

    pub fn importer(&self) -> Option<&LocalUser> {
        self.importer.as_ref()
    }

    pub fn private_key(&self) -> Option<&PrivateKey> {
        self.private_key.as_ref()
    }
}
