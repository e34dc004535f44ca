//! Cryptographic primitives for Portage.
//!
//!   1. Ed25519 signatures: authorship of every magic envelope
//!   2. Sealing: X25519 key agreement + XChaCha20-Poly1305 for private deliveries
//!   3. BLAKE3: key derivation and short key fingerprints for logs
//!
//! Private key material derives ZeroizeOnDrop and is wiped when dropped.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use rand::RngCore;
use thiserror::Error;
use x25519_dalek::{EphemeralSecret, PublicKey, StaticSecret};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// BLAKE3 context string for sealing keys. Changing it breaks every sealed
/// payload in flight.
const SEAL_CONTEXT: &str = "portage 2024-06 sealed envelope v1";

// ── Encoding ──────────────────────────────────────────────────────────────────

/// Unpadded base64url, the only binary encoding on the Portage wire.
pub fn encode_b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url. Trailing `=` padding is tolerated because
/// some peers emit it.
pub fn decode_b64(text: &str) -> Result<Vec<u8>, CryptoError> {
    URL_SAFE_NO_PAD
        .decode(text.trim().trim_end_matches('='))
        .map_err(|_| CryptoError::BadEncoding)
}

fn decode_array<const N: usize>(text: &str) -> Result<[u8; N], CryptoError> {
    let bytes = Zeroizing::new(decode_b64(text)?);
    if bytes.len() != N {
        return Err(CryptoError::BadLength {
            expected: N,
            actual: bytes.len(),
        });
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

/// Parse a base64url-encoded 32-byte public key.
pub fn decode_public_key(text: &str) -> Result<[u8; 32], CryptoError> {
    decode_array::<32>(text)
}

/// Short hex fingerprint of a public key. Safe to log.
pub fn fingerprint(public: &[u8; 32]) -> String {
    hex::encode(&blake3::hash(public).as_bytes()[..8])
}

// ── Signing ───────────────────────────────────────────────────────────────────

/// An author's long-term Ed25519 signing keypair.
///
/// Only the remote side signs in production; the receiver keeps this type for
/// tooling and tests.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SigningKeypair {
    private: Zeroizing<[u8; 32]>,
    pub public: [u8; 32],
}

impl SigningKeypair {
    pub fn generate() -> Self {
        let mut seed = Zeroizing::new([0u8; 32]);
        rand::thread_rng().fill_bytes(&mut seed[..]);
        Self::from_private(*seed)
    }

    /// Reconstruct a keypair from its 32-byte seed.
    pub fn from_private(private_bytes: [u8; 32]) -> Self {
        let signing = SigningKey::from_bytes(&private_bytes);
        Self {
            public: signing.verifying_key().to_bytes(),
            private: Zeroizing::new(private_bytes),
        }
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        SigningKey::from_bytes(&self.private)
            .sign(message)
            .to_bytes()
    }

    pub fn encoded_private(&self) -> Zeroizing<String> {
        Zeroizing::new(encode_b64(&self.private[..]))
    }
}

/// Check an Ed25519 signature. Uses strict verification so malleable
/// signatures are rejected.
pub fn verify_signature(
    public: &[u8; 32],
    message: &[u8],
    signature: &[u8],
) -> Result<(), CryptoError> {
    let key = VerifyingKey::from_bytes(public).map_err(|_| CryptoError::BadPublicKey)?;
    let sig_bytes: [u8; 64] = signature.try_into().map_err(|_| CryptoError::BadLength {
        expected: 64,
        actual: signature.len(),
    })?;
    key.verify_strict(message, &Signature::from_bytes(&sig_bytes))
        .map_err(|_| CryptoError::SignatureMismatch)
}

// ── Sealing ───────────────────────────────────────────────────────────────────

/// A local user's X25519 keypair used to open sealed deliveries.
///
/// The private half is the "private key" stored in the user directory as an
/// opaque base64url string. It never leaves this struct except through
/// [`RecipientKeypair::encoded_private`].
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RecipientKeypair {
    private: Zeroizing<[u8; 32]>,
    pub public: [u8; 32],
}

impl RecipientKeypair {
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(rand::thread_rng());
        Self::from_private(secret.to_bytes())
    }

    /// The public key is derived deterministically from the private key.
    pub fn from_private(private_bytes: [u8; 32]) -> Self {
        let secret = StaticSecret::from(private_bytes);
        let public = PublicKey::from(&secret);
        Self {
            private: Zeroizing::new(private_bytes),
            public: *public.as_bytes(),
        }
    }

    /// Parse the opaque directory representation (base64url, 32 bytes).
    pub fn from_encoded(text: &str) -> Result<Self, CryptoError> {
        let bytes = Zeroizing::new(decode_array::<32>(text)?);
        Ok(Self::from_private(*bytes))
    }

    pub fn encoded_private(&self) -> Zeroizing<String> {
        Zeroizing::new(encode_b64(&self.private[..]))
    }

    /// Decrypt a sealed payload addressed to this keypair.
    pub fn open(&self, sealed: &Sealed) -> Result<Vec<u8>, CryptoError> {
        let secret = StaticSecret::from(*self.private);
        let shared = secret.diffie_hellman(&PublicKey::from(sealed.ephemeral_public));
        let key = seal_key(shared.as_bytes(), &sealed.ephemeral_public, &self.public);

        let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
        cipher
            .decrypt(
                XNonce::from_slice(&sealed.nonce),
                Payload {
                    msg: &sealed.ciphertext,
                    aad: &sealed.ephemeral_public,
                },
            )
            .map_err(|_| CryptoError::Decrypt)
    }
}

/// Binary form of a sealed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ephemeral_public: [u8; 32],
    pub nonce: [u8; 24],
    pub ciphertext: Vec<u8>,
}

/// Seal `plaintext` for the holder of `recipient_public`.
///
/// A fresh ephemeral key is used per call, so two seals of the same
/// plaintext never share a ciphertext.
pub fn seal(recipient_public: &[u8; 32], plaintext: &[u8]) -> Result<Sealed, CryptoError> {
    let ephemeral = EphemeralSecret::random_from_rng(rand::thread_rng());
    let ephemeral_public = *PublicKey::from(&ephemeral).as_bytes();
    let shared = ephemeral.diffie_hellman(&PublicKey::from(*recipient_public));
    let key = seal_key(shared.as_bytes(), &ephemeral_public, recipient_public);

    let mut nonce = [0u8; 24];
    rand::thread_rng().fill_bytes(&mut nonce);

    let cipher = XChaCha20Poly1305::new(Key::from_slice(&key[..]));
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: &ephemeral_public,
            },
        )
        .map_err(|_| CryptoError::Encrypt)?;

    Ok(Sealed {
        ephemeral_public,
        nonce,
        ciphertext,
    })
}

/// key = BLAKE3-derive(shared || ephemeral_public || recipient_public)
fn seal_key(
    shared: &[u8; 32],
    ephemeral_public: &[u8; 32],
    recipient_public: &[u8; 32],
) -> Zeroizing<[u8; 32]> {
    let mut material = Zeroizing::new([0u8; 96]);
    material[..32].copy_from_slice(shared);
    material[32..64].copy_from_slice(ephemeral_public);
    material[64..].copy_from_slice(recipient_public);
    Zeroizing::new(blake3::derive_key(SEAL_CONTEXT, &material[..]))
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("invalid base64url encoding")]
    BadEncoding,

    #[error("wrong length: expected {expected} bytes, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("public key is not a valid Ed25519 point")]
    BadPublicKey,

    #[error("signature does not match")]
    SignatureMismatch,

    #[error("sealing failed")]
    Encrypt,

    #[error("sealed payload could not be opened")]
    Decrypt,
}
