use std::collections::HashMap;

use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use openssl::hash::MessageDigest;
use openssl::sign::Verifier;
use openssl::x509::X509;
use serde::Deserialize;

use crate::config::{AWS_DEFAULT_REGION, AwsIdentityConfig, ConfigError};
use crate::domain::error::AgentAuthError;
use crate::domain::exchange::IdentityVerifier;
use crate::domain::identity::CloudProvider;

/// Signed instance identity document from the EC2 metadata service.
#[derive(Debug, Clone)]
pub struct AwsInstanceIdentity {
    /// Base64 RSA-SHA256 signature over `document`.
    pub signature: String,
    /// The identity document, verbatim.
    pub document: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityDocument {
    instance_id: String,
    region: String,
}

/// Checks EC2 identity documents against the per-region AWS certificates.
pub struct AwsVerifier {
    certificates: HashMap<String, X509>,
}

impl AwsVerifier {
    /// # Errors
    ///
    /// [`ConfigError::Certificate`] when a configured PEM does not parse.
    pub fn new(config: &AwsIdentityConfig) -> Result<Self, ConfigError> {
        let certificates = config
            .certificates
            .iter()
            .map(|(region, pem)| {
                X509::from_pem(pem.as_bytes())
                    .map(|cert| (region.clone(), cert))
                    .map_err(|e| ConfigError::certificate(format!("aws.certificates.{region}"), e))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { certificates })
    }

    fn certificate_for(&self, region: &str) -> Option<&X509> {
        self.certificates
            .get(region)
            .or_else(|| self.certificates.get(AWS_DEFAULT_REGION))
    }

    fn check(&self, identity: &AwsInstanceIdentity) -> Result<String, String> {
        let document: IdentityDocument = serde_json::from_str(&identity.document)
            .map_err(|e| format!("malformed identity document: {e}"))?;
        let certificate = self
            .certificate_for(&document.region)
            .ok_or_else(|| format!("no certificate for region \"{}\"", document.region))?;

        // The metadata service wraps the signature across lines.
        let compact: String = identity.signature.split_whitespace().collect();
        let signature = STANDARD
            .decode(compact)
            .map_err(|e| format!("signature is not base64: {e}"))?;

        let key = certificate.public_key().map_err(|e| e.to_string())?;
        let mut verifier =
            Verifier::new(MessageDigest::sha256(), &key).map_err(|e| e.to_string())?;
        verifier
            .update(identity.document.as_bytes())
            .map_err(|e| e.to_string())?;
        // A mismatch on a well-formed key reports Ok(false); garbage reports Err.
        match verifier.verify(&signature) {
            Ok(true) => Ok(document.instance_id),
            Ok(false) | Err(_) => Err("signature does not match the document".to_owned()),
        }
    }
}

#[async_trait]
impl IdentityVerifier for AwsVerifier {
    type Evidence = AwsInstanceIdentity;

    fn provider(&self) -> CloudProvider {
        CloudProvider::Aws
    }

    async fn verify(&self, evidence: &AwsInstanceIdentity) -> Result<String, AgentAuthError> {
        self.check(evidence)
            .map_err(|reason| AgentAuthError::invalid_identity(CloudProvider::Aws, reason))
    }
}
