pub mod deliberate;
pub mod review;

pub use deliberate::{DeliberateError, DeliberateUseCase};
pub use review::ReviewUseCase;
