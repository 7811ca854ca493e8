pub mod memory;

pub use memory::InMemoryEvidenceCache;
