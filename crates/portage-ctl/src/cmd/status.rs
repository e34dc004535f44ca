//! Daemon status command.

use anyhow::Result;
use serde::Deserialize;

use super::http::{base_url, get_json};

#[derive(Deserialize)]
struct StatusResponse {
    federation_enabled: bool,
    local_users: usize,
    known_peers: usize,
    public_entities: usize,
    user_entities: usize,
}

pub async fn cmd_status(port: u16) -> Result<()> {
    let resp: StatusResponse = get_json(&format!("{}/api/status", base_url(port))).await?;

    println!("═══════════════════════════════════════");
    println!("  Portage Receiver Status");
    println!("═══════════════════════════════════════");
    println!(
        "  Federation       : {}",
        if resp.federation_enabled { "enabled" } else { "disabled" }
    );
    println!("  Local users      : {}", resp.local_users);
    println!("  Known peers      : {}", resp.known_peers);
    println!("  Public entities  : {}", resp.public_entities);
    println!("  User entities    : {}", resp.user_entities);

    Ok(())
}
