use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use openssl::error::ErrorStack;
use openssl::nid::Nid;
use openssl::pkcs7::{Pkcs7, Pkcs7Flags};
use openssl::stack::Stack;
use openssl::x509::store::{X509Store, X509StoreBuilder};
use openssl::x509::{X509, X509PurposeId, X509Ref};
use regex::Regex;
use serde::Deserialize;

use crate::config::{AzureIdentityConfig, ConfigError};
use crate::domain::error::AgentAuthError;
use crate::domain::exchange::IdentityVerifier;
use crate::domain::identity::CloudProvider;

/// Attested data document from the Azure instance metadata service.
#[derive(Debug, Clone)]
pub struct AzureInstanceIdentity {
    /// Base64 DER PKCS#7 signed data wrapping the attested JSON.
    pub signature: String,
    /// Must be `pkcs7`.
    pub encoding: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttestedData {
    vm_id: String,
}

/// Verifies Azure attested data against the configured roots.
pub struct AzureVerifier {
    roots: X509Store,
    allowed_signer: Regex,
}

impl AzureVerifier {
    /// # Errors
    ///
    /// [`ConfigError::Certificate`] for an unparsable root,
    /// [`ConfigError::SignerPattern`] for an invalid signer pattern.
    pub fn new(config: &AzureIdentityConfig) -> Result<Self, ConfigError> {
        let store_error = |e: ErrorStack| ConfigError::certificate("azure.root_certificates", e);
        let mut builder = X509StoreBuilder::new().map_err(store_error)?;
        for (index, pem) in config.root_certificates.iter().enumerate() {
            let name = format!("azure.root_certificates[{index}]");
            let root = X509::from_pem(pem.as_bytes())
                .map_err(|e| ConfigError::certificate(name.clone(), e))?;
            builder
                .add_cert(root)
                .map_err(|e| ConfigError::certificate(name, e))?;
        }
        // The metadata signer is a TLS certificate, not an S/MIME one.
        builder
            .set_purpose(X509PurposeId::ANY)
            .map_err(store_error)?;
        Ok(Self {
            roots: builder.build(),
            allowed_signer: Regex::new(&config.allowed_signer_pattern)?,
        })
    }

    fn check(&self, identity: &AzureInstanceIdentity) -> Result<String, String> {
        if identity.encoding != "pkcs7" {
            return Err(format!("unsupported encoding \"{}\"", identity.encoding));
        }
        let compact: String = identity.signature.split_whitespace().collect();
        let der = STANDARD
            .decode(compact)
            .map_err(|e| format!("signature is not base64: {e}"))?;
        let envelope = Pkcs7::from_der(&der).map_err(|e| format!("malformed PKCS#7: {e}"))?;

        let none = Stack::<X509>::new().map_err(|e| e.to_string())?;
        let mut content = Vec::new();
        envelope
            .verify(
                &none,
                &self.roots,
                None,
                Some(&mut content),
                Pkcs7Flags::empty(),
            )
            .map_err(|e| format!("signature verification failed: {e}"))?;

        let signers = envelope
            .signers(&none, Pkcs7Flags::empty())
            .map_err(|e| e.to_string())?;
        let signer = signers
            .iter()
            .next()
            .ok_or_else(|| "envelope carries no signer".to_owned())?;
        let name = common_name(signer).ok_or_else(|| "signer has no common name".to_owned())?;
        if !self.allowed_signer.is_match(&name) {
            return Err(format!("signer \"{name}\" is not allowed"));
        }

        let attested: AttestedData = serde_json::from_slice(&content)
            .map_err(|e| format!("malformed attested data: {e}"))?;
        Ok(attested.vm_id)
    }
}

fn common_name(cert: &X509Ref) -> Option<String> {
    cert.subject_name()
        .entries_by_nid(Nid::COMMONNAME)
        .next()
        .and_then(|entry| entry.data().as_utf8().ok())
        .as_ref()
        .map(ToString::to_string)
}

#[async_trait]
impl IdentityVerifier for AzureVerifier {
    type Evidence = AzureInstanceIdentity;

    fn provider(&self) -> CloudProvider {
        CloudProvider::Azure
    }

    async fn verify(&self, evidence: &AzureInstanceIdentity) -> Result<String, AgentAuthError> {
        self.check(evidence)
            .map_err(|reason| AgentAuthError::invalid_identity(CloudProvider::Azure, reason))
    }
}
