use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for workspace agent authentication.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AgentAuthConfig {
    /// Cookie carrying the agent session token.
    pub session_token_cookie: String,
    /// Header accepted in place of the cookie.
    pub session_token_header: String,
    pub aws: AwsIdentityConfig,
    pub azure: AzureIdentityConfig,
    pub gcp: GcpIdentityConfig,
}

impl Default for AgentAuthConfig {
    fn default() -> Self {
        Self {
            session_token_cookie: "fleet_session_token".to_owned(),
            session_token_header: "Fleet-Session-Token".to_owned(),
            aws: AwsIdentityConfig::default(),
            azure: AzureIdentityConfig::default(),
            gcp: GcpIdentityConfig::default(),
        }
    }
}

/// Region name under which the fallback AWS certificate is configured.
pub const AWS_DEFAULT_REGION: &str = "default";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsIdentityConfig {
    /// PEM certificate per region. Regions without an entry use the one
    /// stored under [`AWS_DEFAULT_REGION`].
    pub certificates: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AzureIdentityConfig {
    /// PEM root certificates the attested-data signer must chain to.
    pub root_certificates: Vec<String>,
    /// Regex the signer certificate's common name must match.
    pub allowed_signer_pattern: String,
}

impl Default for AzureIdentityConfig {
    fn default() -> Self {
        Self {
            root_certificates: Vec::new(),
            allowed_signer_pattern: r"^(.*\.)?metadata\.(azure\.(com|us|cn)|microsoftazure\.de)$"
                .to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcpIdentityConfig {
    /// Endpoint serving Google's token signing keys as a JWK set.
    pub jwks_url: String,
    /// Accepted `iss` values.
    pub issuers: Vec<String>,
    /// Expected `aud`; the audience is not checked when unset or blank.
    pub audience: Option<String>,
    /// Minimum seconds between key set fetches triggered by unknown key ids.
    pub key_refresh_interval_secs: u64,
}

impl Default for GcpIdentityConfig {
    fn default() -> Self {
        Self {
            jwks_url: "https://www.googleapis.com/oauth2/v3/certs".to_owned(),
            issuers: vec![
                "accounts.google.com".to_owned(),
                "https://accounts.google.com".to_owned(),
            ],
            audience: None,
            key_refresh_interval_secs: 60,
        }
    }
}

impl GcpIdentityConfig {
    /// The configured audience, ignoring blank values.
    #[must_use]
    pub fn audience(&self) -> Option<&str> {
        self.audience.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }

    #[must_use]
    pub fn key_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.key_refresh_interval_secs)
    }
}

/// Errors building verifiers from [`AgentAuthConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid certificate {name}: {source}")]
    Certificate {
        name: String,
        #[source]
        source: openssl::error::ErrorStack,
    },

    #[error("invalid allowed signer pattern: {0}")]
    SignerPattern(#[from] regex::Error),

    #[error("invalid session token header: {0}")]
    SessionHeader(#[from] http::header::InvalidHeaderName),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

impl ConfigError {
    #[must_use]
    pub fn certificate(name: impl Into<String>, source: openssl::error::ErrorStack) -> Self {
        Self::Certificate {
            name: name.into(),
            source,
        }
    }
}
