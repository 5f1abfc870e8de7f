//! Domain layer for the static `AuthZ` resolver plugin.

mod client;
pub mod roles;
pub mod service;

pub use roles::Role;
pub use service::Service;
