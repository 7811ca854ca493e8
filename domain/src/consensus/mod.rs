//! Consensus calculation - confidence-weighted voting over equivalence groups.

pub mod calculator;
pub mod record;

pub use calculator::{ConsensusCalculator, ConsensusResult};
pub use record::{ConsensusRecord, Group};
