//! Tracing/logging initialization.
//!
//! Mirrors `aperture::cli::tracing_init`: an env-filter driven subscriber
//! whose format (`text` vs `json`) is selected by an environment variable,
//! under this system's own names.

use crate::constants::{ENV_PROBE_LOG, ENV_PROBE_LOG_FORMAT};
use tracing_subscriber::EnvFilter;

/// Initializes the global tracing subscriber. `verbosity` follows the
/// conventional `-v`/`-vv` CLI counting convention: 0 -> `info`-by-env,
/// 1 -> `debug`, 2+ -> `trace`.
pub fn init_tracing(verbosity: u8) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let level = if verbosity > 0 {
        if verbosity == 1 { "debug" } else { "trace" }.to_string()
    } else {
        std::env::var(ENV_PROBE_LOG).unwrap_or_else(|_| "info".to_string())
    };

    let env_filter = EnvFilter::try_new(&level)
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let format = std::env::var(ENV_PROBE_LOG_FORMAT)
        .map_or_else(|_| "text".to_string(), |s| s.to_lowercase());

    if format == "json" {
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_line_number(true);
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init();
    } else {
        let layer = tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_line_number(false);
        let _ = tracing_subscriber::registry()
            .with(env_filter)
            .with(layer)
            .try_init();
    }
}
