//! Runtime configuration lookups.

use std::sync::Arc;

use dashmap::DashMap;
use portage_core::config::PortageConfig;

/// Scope of system-wide switches.
pub const SYSTEM_SCOPE: &str = "system";
/// Key of the switch that gates both receive endpoints.
pub const FEDERATION_ENABLED_KEY: &str = "diaspora_enabled";

/// Boolean config lookup, `(scope, key)` addressed.
pub trait ConfigLookup: Send + Sync {
    fn get_bool(&self, scope: &str, key: &str, default: bool) -> bool;
}

/// Runtime-toggleable flag table, seeded from [`PortageConfig`].
///
/// Reads happen on every request, so a flipped flag takes effect on the next
/// delivery without a restart.
#[derive(Clone, Default)]
pub struct FeatureFlags {
    values: Arc<DashMap<(String, String), bool>>,
}

impl FeatureFlags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &PortageConfig) -> Self {
        let flags = Self::new();
        flags.set(SYSTEM_SCOPE, FEDERATION_ENABLED_KEY, config.federation.enabled);
        flags
    }

    pub fn set(&self, scope: &str, key: &str, value: bool) {
        self.values
            .insert((scope.to_string(), key.to_string()), value);
        tracing::info!(scope, key, value, "config flag set");
    }

    pub fn federation_enabled(&self) -> bool {
        self.get_bool(SYSTEM_SCOPE, FEDERATION_ENABLED_KEY, false)
    }
}

impl ConfigLookup for FeatureFlags {
    fn get_bool(&self, scope: &str, key: &str, default: bool) -> bool {
        self.values
            .get(&(scope.to_string(), key.to_string()))
            .map(|v| *v.value())
            .unwrap_or(default)
    }
}
