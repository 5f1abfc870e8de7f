//! Error types for the `AuthZ` resolver.

use thiserror::Error;

/// Errors that can occur when consulting a [`PolicyEngine`](crate::PolicyEngine).
///
/// These represent evaluation failures only.
/// Access denial is expressed via `Decision::allowed == false`,
/// not as an error variant.
#[derive(Debug, Clone, Error)]
pub enum AuthZResolverError {
    #[error("internal error: {0}")]
    Internal(String),
}
