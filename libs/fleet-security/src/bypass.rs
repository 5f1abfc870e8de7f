//! Explicit, non-ambient elevation for trusted internal callers.

use std::fmt;

/// Internal callers allowed to act without a [`Subject`](crate::Subject).
///
/// Every variant is a reviewed trust boundary. Adding one means adding a
/// construction site that never sees untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SystemCaller {
    /// Periodic maintenance jobs (lifecycle sweeps, cleanup).
    BackgroundJob,
    /// Provisioning-server callbacks ingesting job results.
    Provisioner,
    /// Telemetry reporters reading aggregate data.
    Telemetry,
    /// Inter-replica heartbeat and mesh key exchange.
    Replication,
    /// Agent token lookup done before the agent's Subject exists.
    AgentAuthentication,
    /// Cloud instance identity exchange.
    InstanceIdentity,
}

impl SystemCaller {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BackgroundJob => "background_job",
            Self::Provisioner => "provisioner",
            Self::Telemetry => "telemetry",
            Self::Replication => "replication",
            Self::AgentAuthentication => "agent_authentication",
            Self::InstanceIdentity => "instance_identity",
        }
    }
}

impl fmt::Display for SystemCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Roles carried by every system bypass.
pub const SYSTEM_ROLES: &[&str] = &["owner", "system"];

/// Marker granting unchecked store access to a trusted internal caller.
///
/// Not a `Subject`. The only constructor is [`SystemBypass::for_caller`];
/// there is no `Default` and no deserialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemBypass {
    caller: SystemCaller,
}

impl SystemBypass {
    #[must_use]
    pub fn for_caller(caller: SystemCaller) -> Self {
        tracing::debug!(caller = caller.as_str(), "system bypass constructed");
        Self { caller }
    }

    #[must_use]
    pub fn caller(&self) -> SystemCaller {
        self.caller
    }

    #[must_use]
    pub fn roles(&self) -> &'static [&'static str] {
        SYSTEM_ROLES
    }
}
