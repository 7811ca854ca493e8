//! Core domain primitives shared across the council modules.

pub mod defaults;
pub mod error;
pub mod hash;

pub use error::DomainError;
pub use hash::hash_query;
