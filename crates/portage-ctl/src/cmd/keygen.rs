//! Key generation for config entries.

use anyhow::Result;
use portage_core::crypto::{self, RecipientKeypair, SigningKeypair};

/// Print a fresh signing keypair and a fresh recipient keypair, base64url.
pub fn cmd_keygen() -> Result<()> {
    let signing = SigningKeypair::generate();
    let recipient = RecipientKeypair::generate();

    println!("═══════════════════════════════════════");
    println!("  Signing key (Ed25519)");
    println!("═══════════════════════════════════════");
    println!("  public      : {}", crypto::encode_b64(&signing.public));
    println!("  private     : {}", signing.encoded_private().as_str());
    println!("  fingerprint : {}", crypto::fingerprint(&signing.public));
    println!();
    println!("═══════════════════════════════════════");
    println!("  Recipient key (X25519)");
    println!("═══════════════════════════════════════");
    println!("  public      : {}", crypto::encode_b64(&recipient.public));
    println!("  private     : {}", recipient.encoded_private().as_str());
    println!();
    println!("  Put the recipient private key in a [[users]] entry,");
    println!("  and the signing public key in a remote pod's [[peers]] entry.");

    Ok(())
}
