//! Semantic equivalence detection over response embeddings.

pub mod detector;

pub use detector::SemanticDetector;
