#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! `AuthZ` Resolver SDK
//!
//! This crate provides the contract between policy enforcement points and
//! the policy decision point:
//!
//! - [`PolicyEngine`] - the decision point every plugin implements
//! - [`Decision`], [`DenyReason`] - point-check results
//! - [`AuthZResolverError`] - evaluation failures (never denials)
//! - [`pep`] - [`PolicyEnforcer`], which resolves the request's actor and
//!   short-circuits system callers before consulting the engine
//!
//! ## Usage
//!
//! ```ignore
//! use authz_resolver_sdk::PolicyEnforcer;
//! use fleet_security::{Action, resources};
//!
//! let enforcer = PolicyEnforcer::new(engine);
//!
//! // Point check against a persisted object
//! enforcer.authorize(&ctx, Action::Read, &workspace.object()).await?;
//!
//! // Filter predicate for a list operation
//! let scope = enforcer.access_scope(&ctx, Action::Read, resources::TEMPLATE).await?;
//! ```

pub mod api;
pub mod error;
pub mod models;
pub mod pep;

pub use api::PolicyEngine;
pub use error::AuthZResolverError;
pub use models::{Decision, DenyReason};
pub use pep::{EnforcerError, PolicyEnforcer};
