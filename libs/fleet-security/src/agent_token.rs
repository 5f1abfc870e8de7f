use std::fmt;
use std::hash::{Hash, Hasher};

use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Error parsing an [`AgentToken`] from its transport form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("agent token must be a valid UUID (len {len})")]
pub struct AgentTokenParseError {
    pub len: usize,
}

/// Session credential bound 1:1 to a workspace agent.
///
/// Compared in constant time and never formatted in full: `Debug` and
/// `Display` show only the last four hex digits.
#[derive(Clone, Copy)]
pub struct AgentToken(Uuid);

impl AgentToken {
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Parse a token presented in a cookie or header.
    ///
    /// # Errors
    ///
    /// Returns [`AgentTokenParseError`] when the value is not a UUID.
    pub fn parse(raw: &str) -> Result<Self, AgentTokenParseError> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| AgentTokenParseError { len: raw.len() })
    }

    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// The full token value. Only for handing the credential to its agent.
    #[must_use]
    pub fn expose(&self) -> String {
        self.0.to_string()
    }

    fn tail(&self) -> String {
        let simple = self.0.simple().to_string();
        simple[simple.len() - 4..].to_owned()
    }
}

impl PartialEq for AgentToken {
    fn eq(&self, other: &Self) -> bool {
        let (a, b): (&[u8], &[u8]) = (self.0.as_bytes(), other.0.as_bytes());
        a.ct_eq(b).into()
    }
}

impl Eq for AgentToken {}

impl Hash for AgentToken {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.hash(state);
    }
}

impl fmt::Debug for AgentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AgentToken(****{})", self.tail())
    }
}

impl fmt::Display for AgentToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "****{}", self.tail())
    }
}
