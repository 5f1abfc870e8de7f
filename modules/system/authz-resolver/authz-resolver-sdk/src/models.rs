//! Decision models returned by the policy engine.

use serde::{Deserialize, Serialize};

/// Reason for an explicit deny from the policy engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DenyReason {
    /// Machine-readable error code.
    pub error_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl DenyReason {
    pub fn new(error_code: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            details: None,
        }
    }

    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Outcome of a point check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub allowed: bool,
    /// Present only when `allowed` is `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deny_reason: Option<DenyReason>,
}

impl Decision {
    #[must_use]
    pub fn allow() -> Self {
        Self {
            allowed: true,
            deny_reason: None,
        }
    }

    #[must_use]
    pub fn deny(reason: DenyReason) -> Self {
        Self {
            allowed: false,
            deny_reason: Some(reason),
        }
    }
}
