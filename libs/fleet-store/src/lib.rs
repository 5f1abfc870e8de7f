#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
//! Persistence layer for the fleet control plane.
//!
//! [`Store`] is the one seam every caller goes through. [`MemStore`] backs it
//! in memory; the authorization decorator lives in `authz-store` and wraps
//! any implementation of the trait.

pub mod error;
pub mod mem;
pub mod models;
pub mod store;

pub use error::StoreError;
pub use mem::MemStore;
pub use store::Store;
