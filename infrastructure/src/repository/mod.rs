pub mod memory;

pub use memory::{FlagRecord, InMemoryCouncilRepository};
