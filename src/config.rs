//! Planner-side configuration.
//!
//! Unlike the agent's startup-argument parser (`probe::launch_args`, which is
//! the system's primary, fully in-scope configuration surface), this is a
//! small settings bag for the external planner process: where to find the
//! probe's control plane, and how the verifier's poll loop should be tuned.
//! Values fall back to environment variables, never to ambient credential
//! stores — see SPEC_FULL.md §1.1 and the auth-resolution invariant in §4.8.

use crate::constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_POLL_INTERVAL_MS, DEFAULT_TIMEOUT_MS, ENV_PROBE_BASE_URL,
};
use crate::error::Error;

#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Base URL of the probe's control-plane HTTP server, e.g.
    /// `http://127.0.0.1:9191`.
    pub probe_base_url: String,
    pub poll_interval_ms: u64,
    pub timeout_ms: u64,
    pub max_retries: u32,
    /// Roots the planner discovers projects under (populated by the
    /// out-of-scope Maven/Gradle discovery walk; the planner only consumes
    /// this as a plain list of candidate directories).
    pub discovery_roots: Vec<std::path::PathBuf>,
}

impl PlannerConfig {
    /// Builds a config from `PROBE_BASE_URL` plus defaults.
    ///
    /// # Errors
    /// Returns [`Error::configuration`] when `PROBE_BASE_URL` is unset, since
    /// the planner cannot reach a control plane without it.
    pub fn from_env() -> Result<Self, Error> {
        let probe_base_url = std::env::var(ENV_PROBE_BASE_URL).map_err(|_| {
            Error::configuration(format!(
                "{ENV_PROBE_BASE_URL} is not set; the planner needs the probe's control-plane base URL"
            ))
        })?;
        Ok(Self {
            probe_base_url,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            discovery_roots: Vec::new(),
        })
    }

    #[must_use]
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            probe_base_url: base_url.into(),
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_retries: DEFAULT_MAX_RETRIES,
            discovery_roots: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_base_url_fills_defaults() {
        let cfg = PlannerConfig::with_base_url("http://127.0.0.1:9191");
        assert_eq!(cfg.poll_interval_ms, DEFAULT_POLL_INTERVAL_MS);
        assert_eq!(cfg.max_retries, DEFAULT_MAX_RETRIES);
        assert!(cfg.discovery_roots.is_empty());
    }
}
