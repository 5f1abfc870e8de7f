//! PEP (Policy Enforcement Point) helpers.
//!
//! - [`PolicyEnforcer`] - resolve actor, short-circuit system callers, evaluate
//! - [`EnforcerError`] - denial vs. evaluation failure vs. missing context

pub mod enforcer;

pub use enforcer::{EnforcerError, PolicyEnforcer};
