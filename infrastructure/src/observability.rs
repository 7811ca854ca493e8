//! Tracing setup for council binaries and services.

use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// Verbosity maps to a base filter (0 = warn, 1 = info, 2 = debug,
/// 3+ = trace); `RUST_LOG` overrides it when set. Calling this twice
/// is a no-op.
pub fn init_tracing(verbosity: u8) {
    let base = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(base));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
