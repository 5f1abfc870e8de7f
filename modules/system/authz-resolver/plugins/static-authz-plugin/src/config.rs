//! Configuration for the static `AuthZ` resolver plugin.

use serde::Deserialize;

/// Plugin configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticAuthZPluginConfig {
    /// Authorization mode.
    pub mode: AuthZMode,
}

/// Authorization mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AuthZMode {
    /// Grant according to the built-in role table.
    #[default]
    BuiltinRoles,
    /// Allow all requests.
    AllowAll,
}
