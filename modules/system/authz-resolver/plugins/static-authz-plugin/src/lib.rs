#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Static `AuthZ` Resolver Plugin
//!
//! A [`PolicyEngine`](authz_resolver_sdk::PolicyEngine) driven by a fixed
//! table of built-in roles.
//!
//! ## Mode: `builtin_roles` (default)
//!
//! Each role the subject holds contributes an [`AccessScope`](fleet_security::AccessScope)
//! for the requested resource type and action; the union is then narrowed by
//! the subject's scope restriction. Point checks evaluate that same scope
//! against the object, so `authorize` and `prepare_filter` always agree.
//!
//! ## Mode: `allow_all`
//!
//! Every subject may do everything. Development only.
//!
//! ## Configuration
//!
//! ```yaml
//! authz:
//!   mode: builtin_roles
//! ```

pub mod config;
pub mod domain;
pub mod plugin;

pub use plugin::StaticAuthZPlugin;
