//! portaged: inbound federation receiver daemon.

use std::sync::Arc;

use anyhow::Result;

use portage_core::config::PortageConfig;
use portage_services::{
    Collaborators, DiasporaCodec, FeatureFlags, Inbox, PeerKeyTable, Receiver, UserTable,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config
    if let Err(e) = PortageConfig::write_default_if_missing() {
        tracing::warn!(error = %e, "failed to write default config");
    }
    let config = PortageConfig::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "failed to load config, using defaults");
        PortageConfig::default()
    });
    tracing::info!(path = %PortageConfig::file_path().display(), "portaged starting");

    // Shared state
    let flags = FeatureFlags::from_config(&config);
    if !flags.federation_enabled() {
        tracing::warn!("federation disabled, every delivery will be refused with 403");
    }
    let users = UserTable::from_config(&config.users);
    let peers = PeerKeyTable::from_config(&config.peers);
    let inbox = Inbox::new(config.inbox.max_entities);
    tracing::info!(
        users = users.len(),
        peers = peers.len(),
        max_entities = config.inbox.max_entities,
        "directories loaded"
    );

    let receiver = Arc::new(Receiver::new(Collaborators {
        config: Arc::new(flags.clone()),
        users: Arc::new(users.clone()),
        keys: Arc::new(peers.clone()),
        codec: Arc::new(DiasporaCodec),
        public_ingest: Arc::new(inbox.clone()),
        user_ingest: Arc::new(inbox.clone()),
    }));

    let state = portage_api::ApiState {
        receiver,
        flags,
        users,
        peers,
        inbox,
        body_limit: config.server.body_limit_bytes,
    };

    let shutdown = async {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("shutdown signal received");
    };

    portage_api::serve(state, &config.server.bind, config.server.port, shutdown).await?;
    tracing::info!("shut down cleanly");
    Ok(())
}
