use fleet_store::StoreError;
use thiserror::Error;

use crate::domain::identity::CloudProvider;

/// Record the identity exchange was loading when the store failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeStage {
    Agent,
    Resource,
    Job,
    JobInput,
    Build,
    LatestBuild,
}

impl ExchangeStage {
    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::Agent => "Internal error fetching provisioner job agent.",
            Self::Resource => "Internal error fetching provisioner job resource.",
            Self::Job => "Internal error fetching provisioner job.",
            Self::JobInput => "Internal error extracting job data.",
            Self::Build => "Internal error fetching workspace build.",
            Self::LatestBuild => "Internal error fetching the latest workspace build.",
        }
    }
}

/// Errors raised while authenticating a workspace agent.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AgentAuthError {
    #[error("no session token in cookie \"{cookie}\" or header")]
    MissingToken { cookie: String },

    #[error("agent token is not a UUID (len {len})")]
    InvalidToken { len: usize },

    #[error("no agent holds the presented token")]
    AgentNotAuthorized,

    #[error("failed to resolve agent: {0}")]
    AgentLookup(String),

    #[error("invalid {provider} identity: {reason}")]
    InvalidIdentity {
        provider: CloudProvider,
        reason: String,
    },

    #[error("failed to decode identity claims: {0}")]
    ClaimsDecode(String),

    #[error("no agent registered for instance \"{instance_id}\"")]
    InstanceNotFound { instance_id: String },

    #[error("{}: {reason}", .stage.message())]
    Exchange { stage: ExchangeStage, reason: String },

    #[error("\"{job_type}\" jobs cannot be authenticated")]
    UnsupportedJobType { job_type: String },

    #[error("instance \"{instance_id}\" belongs to a superseded build")]
    StaleBuild { instance_id: String },
}

impl AgentAuthError {
    #[must_use]
    pub fn invalid_identity(provider: CloudProvider, reason: impl Into<String>) -> Self {
        Self::InvalidIdentity {
            provider,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn exchange(stage: ExchangeStage, reason: impl Into<String>) -> Self {
        Self::Exchange {
            stage,
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn instance_not_found(instance_id: impl Into<String>) -> Self {
        Self::InstanceNotFound {
            instance_id: instance_id.into(),
        }
    }

    #[must_use]
    pub fn stale_build(instance_id: impl Into<String>) -> Self {
        Self::StaleBuild {
            instance_id: instance_id.into(),
        }
    }
}

impl From<StoreError> for AgentAuthError {
    fn from(e: StoreError) -> Self {
        tracing::error!(error = %e, "store failure while resolving workspace agent");
        Self::AgentLookup(e.to_string())
    }
}
