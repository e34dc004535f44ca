//! Portage wire formats: every byte layout a federation peer may POST to us.
//!
//! Two envelope kinds exist:
//!
//! * [`MagicEnvelope`]: an entity signed by its author. `data` carries the
//!   entity JSON in base64url; `sig` is an Ed25519 signature over
//!   `data.b64(data_type).b64(encoding).b64(alg)`.
//! * [`SealedEnvelope`]: a magic envelope encrypted for one recipient.
//!
//! Each kind travels in one of two generations. Raw bodies are JSON
//! (`{"magic_envelope": {...}}` or `{"sealed_envelope": {...}}`). Legacy
//! bodies are XML documents rooted at `<diaspora>` and arrive inside the
//! `xml` form field.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{self, CryptoError, Sealed, SigningKeypair};

pub const ALG_ED25519: &str = "ed25519";
pub const ENCODING_BASE64URL: &str = "base64url";
pub const DATA_TYPE_JSON: &str = "application/json";

// ── Magic envelope ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicEnvelope {
    /// Author handle, e.g. `alice@pod.example`.
    pub author: String,
    /// base64url of the entity bytes.
    pub data: String,
    pub data_type: String,
    pub encoding: String,
    pub alg: String,
    /// base64url Ed25519 signature over [`MagicEnvelope::signed_text`].
    pub sig: String,
}

impl MagicEnvelope {
    /// Build and sign an envelope around `payload`.
    pub fn sign(author: &str, payload: &[u8], key: &SigningKeypair) -> Self {
        let mut envelope = Self {
            author: author.to_string(),
            data: crypto::encode_b64(payload),
            data_type: DATA_TYPE_JSON.to_string(),
            encoding: ENCODING_BASE64URL.to_string(),
            alg: ALG_ED25519.to_string(),
            sig: String::new(),
        };
        envelope.sig = crypto::encode_b64(&key.sign(envelope.signed_text().as_bytes()));
        envelope
    }

    /// The exact byte string the signature covers.
    pub fn signed_text(&self) -> String {
        format!(
            "{}.{}.{}.{}",
            self.data,
            crypto::encode_b64(self.data_type.as_bytes()),
            crypto::encode_b64(self.encoding.as_bytes()),
            crypto::encode_b64(self.alg.as_bytes()),
        )
    }

    /// Decode `data` into the entity bytes. Rejects encodings and data types
    /// this receiver does not speak.
    pub fn payload(&self) -> Result<Vec<u8>, WireError> {
        if self.encoding != ENCODING_BASE64URL {
            return Err(WireError::UnsupportedEncoding(self.encoding.clone()));
        }
        if self.data_type != DATA_TYPE_JSON {
            return Err(WireError::UnsupportedDataType(self.data_type.clone()));
        }
        crypto::decode_b64(&self.data).map_err(WireError::Field)
    }

    pub fn signature(&self) -> Result<Vec<u8>, WireError> {
        crypto::decode_b64(&self.sig).map_err(WireError::Field)
    }
}

// ── Sealed envelope ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedEnvelope {
    pub ephemeral_key: String,
    pub nonce: String,
    pub ciphertext: String,
}

impl SealedEnvelope {
    /// Seal a magic envelope for the recipient's X25519 public key.
    pub fn seal(envelope: &MagicEnvelope, recipient_public: &[u8; 32]) -> Result<Self, WireError> {
        let plaintext = serde_json::to_vec(envelope).map_err(|e| WireError::Raw(e.to_string()))?;
        let sealed = crypto::seal(recipient_public, &plaintext).map_err(WireError::Field)?;
        Ok(Self {
            ephemeral_key: crypto::encode_b64(&sealed.ephemeral_public),
            nonce: crypto::encode_b64(&sealed.nonce),
            ciphertext: crypto::encode_b64(&sealed.ciphertext),
        })
    }

    /// Decode the base64url fields into their binary form.
    pub fn to_sealed(&self) -> Result<Sealed, CryptoError> {
        let ephemeral = crypto::decode_b64(&self.ephemeral_key)?;
        let nonce = crypto::decode_b64(&self.nonce)?;
        Ok(Sealed {
            ephemeral_public: ephemeral.as_slice().try_into().map_err(|_| {
                CryptoError::BadLength {
                    expected: 32,
                    actual: ephemeral.len(),
                }
            })?,
            nonce: nonce
                .as_slice()
                .try_into()
                .map_err(|_| CryptoError::BadLength {
                    expected: 24,
                    actual: nonce.len(),
                })?,
            ciphertext: crypto::decode_b64(&self.ciphertext)?,
        })
    }
}

// ── Generations ───────────────────────────────────────────────────────────────

/// A decoded body, independent of the generation it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireMessage {
    MagicEnvelope(MagicEnvelope),
    SealedEnvelope(SealedEnvelope),
}

/// Parse a raw (current generation) JSON body.
///
/// Bytes that are not JSON at all yield [`WireError::Unrecognized`]; JSON of
/// the wrong shape yields [`WireError::Raw`].
pub fn decode_raw(bytes: &[u8]) -> Result<WireMessage, WireError> {
    // serde_json reports a wrong top-level type as a syntax error, so parse
    // the document first and map it in a second step.
    let value: serde_json::Value =
        serde_json::from_slice(bytes).map_err(|e| WireError::Unrecognized(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| WireError::Raw(e.to_string()))
}

pub fn encode_raw(message: &WireMessage) -> Vec<u8> {
    // Only string fields; serialization cannot fail.
    serde_json::to_vec(message).unwrap_or_default()
}

/// XML document layout of the legacy generation.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "diaspora")]
struct LegacyDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    magic_envelope: Option<MagicEnvelope>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sealed_envelope: Option<SealedEnvelope>,
}

/// Parse a legacy XML document (already URL-decoded).
pub fn decode_legacy(xml: &str) -> Result<WireMessage, WireError> {
    if !xml.trim_start().starts_with('<') {
        return Err(WireError::Unrecognized("legacy body is not XML".to_string()));
    }
    let doc: LegacyDocument =
        quick_xml::de::from_str(xml).map_err(|e| WireError::Legacy(e.to_string()))?;
    match (doc.magic_envelope, doc.sealed_envelope) {
        (Some(magic), None) => Ok(WireMessage::MagicEnvelope(magic)),
        (None, Some(sealed)) => Ok(WireMessage::SealedEnvelope(sealed)),
        (None, None) => Err(WireError::Legacy("document carries no envelope".to_string())),
        (Some(_), Some(_)) => Err(WireError::Legacy(
            "document carries both a magic and a sealed envelope".to_string(),
        )),
    }
}

pub fn encode_legacy(message: &WireMessage) -> Result<String, WireError> {
    let doc = match message {
        WireMessage::MagicEnvelope(m) => LegacyDocument {
            magic_envelope: Some(m.clone()),
            sealed_envelope: None,
        },
        WireMessage::SealedEnvelope(s) => LegacyDocument {
            magic_envelope: None,
            sealed_envelope: Some(s.clone()),
        },
    };
    quick_xml::se::to_string(&doc).map_err(|e| WireError::Legacy(e.to_string()))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum WireError {
    /// Input is not in any syntax this generation uses.
    #[error("unrecognized body: {0}")]
    Unrecognized(String),

    #[error("malformed raw envelope: {0}")]
    Raw(String),

    #[error("malformed legacy envelope: {0}")]
    Legacy(String),

    #[error("unsupported encoding {0:?}")]
    UnsupportedEncoding(String),

    #[error("unsupported data type {0:?}")]
    UnsupportedDataType(String),

    #[error("bad envelope field: {0}")]
    Field(CryptoError),
}
