pub mod council_config;

pub use council_config::CouncilConfig;
