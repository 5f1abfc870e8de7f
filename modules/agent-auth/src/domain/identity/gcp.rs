use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use jsonwebtoken::jwk::JwkSet;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use parking_lot::RwLock;
use serde::Deserialize;
use tracing::debug;

use crate::config::{ConfigError, GcpIdentityConfig};
use crate::domain::error::AgentAuthError;
use crate::domain::exchange::IdentityVerifier;
use crate::domain::identity::CloudProvider;

const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Identity token minted by the GCE metadata server.
#[derive(Debug, Clone)]
pub struct GoogleInstanceIdentity {
    pub json_web_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleClaims {
    google: GoogleClaim,
}

#[derive(Debug, Deserialize)]
struct GoogleClaim {
    compute_engine: ComputeEngineClaim,
}

#[derive(Debug, Deserialize)]
struct ComputeEngineClaim {
    instance_id: String,
}

#[derive(Default)]
struct KeyCache {
    keys: Option<Arc<JwkSet>>,
    /// When the last fetch was started, successful or not.
    attempted_at: Option<Instant>,
}

/// Verifies GCE identity tokens against Google's published signing keys.
///
/// The key set is cached and fetched again when a token names a key id the
/// cached set does not contain, at most once per refresh interval.
pub struct GcpVerifier {
    client: reqwest::Client,
    jwks_url: String,
    validation: Validation,
    refresh_interval: Duration,
    cache: RwLock<KeyCache>,
}

impl GcpVerifier {
    /// # Errors
    ///
    /// [`ConfigError::HttpClient`] if the HTTP client cannot be built.
    pub fn new(config: &GcpIdentityConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()?;

        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&config.issuers);
        match config.audience() {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        Ok(Self {
            client,
            jwks_url: config.jwks_url.clone(),
            validation,
            refresh_interval: config.key_refresh_interval(),
            cache: RwLock::new(KeyCache::default()),
        })
    }

    async fn decoding_key(&self, kid: &str) -> Result<DecodingKey, String> {
        let cached = self.cache.read().keys.clone();
        let keys = match cached {
            Some(keys) if keys.find(kid).is_some() => keys,
            _ if self.claim_refresh() => self.refresh().await?,
            cached => {
                debug!(kid, "signing key refresh throttled");
                cached.ok_or_else(|| "signing keys are not available".to_owned())?
            }
        };
        let jwk = keys
            .find(kid)
            .ok_or_else(|| format!("no signing key with id \"{kid}\""))?;
        DecodingKey::from_jwk(jwk).map_err(|e| format!("unusable signing key: {e}"))
    }

    /// Reserve the next fetch unless one started within the refresh interval.
    fn claim_refresh(&self) -> bool {
        let mut cache = self.cache.write();
        match cache.attempted_at {
            Some(at) if at.elapsed() < self.refresh_interval => false,
            _ => {
                cache.attempted_at = Some(Instant::now());
                true
            }
        }
    }

    async fn refresh(&self) -> Result<Arc<JwkSet>, String> {
        debug!(url = %self.jwks_url, "fetching GCP signing keys");
        let keys: JwkSet = self
            .client
            .get(&self.jwks_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| format!("failed to fetch signing keys: {e}"))?
            .json()
            .await
            .map_err(|e| format!("malformed signing key set: {e}"))?;
        let keys = Arc::new(keys);
        self.cache.write().keys = Some(Arc::clone(&keys));
        Ok(keys)
    }
}

#[async_trait]
impl IdentityVerifier for GcpVerifier {
    type Evidence = GoogleInstanceIdentity;

    fn provider(&self) -> CloudProvider {
        CloudProvider::Gcp
    }

    async fn verify(&self, evidence: &GoogleInstanceIdentity) -> Result<String, AgentAuthError> {
        let invalid = |reason: String| AgentAuthError::invalid_identity(CloudProvider::Gcp, reason);
        let token = evidence.json_web_token.trim();

        let header = decode_header(token).map_err(|e| invalid(format!("malformed token: {e}")))?;
        let kid = header
            .kid
            .ok_or_else(|| invalid("token header names no key id".to_owned()))?;
        let key = self.decoding_key(&kid).await.map_err(invalid)?;

        let data = decode::<serde_json::Value>(token, &key, &self.validation)
            .map_err(|e| invalid(e.to_string()))?;
        let claims: GoogleClaims = serde_json::from_value(data.claims)
            .map_err(|e| AgentAuthError::ClaimsDecode(e.to_string()))?;
        Ok(claims.google.compute_engine.instance_id)
    }
}
