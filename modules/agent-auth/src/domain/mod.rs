pub mod error;
pub mod exchange;
pub mod identity;
pub mod subject;
