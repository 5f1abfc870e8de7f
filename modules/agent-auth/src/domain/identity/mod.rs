//! Verifiers for the cloud instance identity documents agents present.

pub mod aws;
pub mod azure;
pub mod gcp;

pub use aws::{AwsInstanceIdentity, AwsVerifier};
pub use azure::{AzureInstanceIdentity, AzureVerifier};
pub use gcp::{GcpVerifier, GoogleInstanceIdentity};

use std::fmt;

/// Cloud provider an identity document was issued by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloudProvider {
    Aws,
    Azure,
    Gcp,
}

impl CloudProvider {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Aws => "AWS",
            Self::Azure => "Azure",
            Self::Gcp => "GCP",
        }
    }
}

impl fmt::Display for CloudProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
