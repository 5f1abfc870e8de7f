//! Static `AuthZ` resolver plugin wiring.

use std::sync::Arc;

use authz_resolver_sdk::PolicyEngine;
use tracing::{info, warn};

use crate::config::{AuthZMode, StaticAuthZPluginConfig};
use crate::domain::Service;

/// Entry point used by the server to obtain the policy engine.
pub struct StaticAuthZPlugin;

impl StaticAuthZPlugin {
    /// Build the engine described by `cfg`.
    #[must_use]
    pub fn init(cfg: &StaticAuthZPluginConfig) -> Arc<dyn PolicyEngine> {
        info!(mode = ?cfg.mode, "Initializing static_authz_plugin");
        if cfg.mode == AuthZMode::AllowAll {
            warn!("static_authz_plugin running in allow_all mode; every request is authorized");
        }
        Arc::new(Service::new(cfg.mode))
    }
}
