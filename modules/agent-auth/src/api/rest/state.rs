use std::sync::Arc;

use fleet_store::Store;
use http::HeaderName;

use crate::config::{AgentAuthConfig, ConfigError};
use crate::domain::exchange::InstanceIdentityExchange;
use crate::domain::identity::{AwsVerifier, AzureVerifier, GcpVerifier};
use crate::domain::subject::AgentSubjectResolver;

/// Where the middleware looks for the agent session token.
#[derive(Debug, Clone)]
pub struct TokenSource {
    pub cookie: String,
    pub header: HeaderName,
}

pub struct Verifiers {
    pub aws: AwsVerifier,
    pub azure: AzureVerifier,
    pub gcp: GcpVerifier,
}

/// Shared state for the agent routes and middleware.
#[derive(Clone)]
pub struct AgentAuthState {
    /// Authorization-enforcing store the handlers read through.
    pub store: Arc<dyn Store>,
    pub resolver: Arc<AgentSubjectResolver>,
    pub exchange: Arc<InstanceIdentityExchange>,
    pub verifiers: Arc<Verifiers>,
    pub tokens: TokenSource,
}

impl AgentAuthState {
    /// Build the verifiers and services from `config`.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when a certificate, the signer pattern or the token
    /// header name is invalid.
    pub fn new(store: Arc<dyn Store>, config: &AgentAuthConfig) -> Result<Self, ConfigError> {
        let verifiers = Verifiers {
            aws: AwsVerifier::new(&config.aws)?,
            azure: AzureVerifier::new(&config.azure)?,
            gcp: GcpVerifier::new(&config.gcp)?,
        };
        let tokens = TokenSource {
            cookie: config.session_token_cookie.clone(),
            header: HeaderName::from_bytes(config.session_token_header.as_bytes())?,
        };
        Ok(Self {
            resolver: Arc::new(AgentSubjectResolver::new(Arc::clone(&store))),
            exchange: Arc::new(InstanceIdentityExchange::new(Arc::clone(&store))),
            store,
            verifiers: Arc::new(verifiers),
            tokens,
        })
    }
}
