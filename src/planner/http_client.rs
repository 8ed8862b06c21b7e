//! Thin reqwest wrapper the planner uses to call the control plane
//! (status/reset/actuate) and to issue natural reproduction requests.
//! Retry/backoff reuses [`crate::resilience`]; the verifier's own poll
//! loop does not go through this module.

use crate::config::PlannerConfig;
use crate::constants::{FIELD_KEY, PATH_ACTUATE, PATH_RESET, PATH_STATUS};
use crate::error::Error;
use crate::planner::verifier::{ResetEpochSource, StatusSnapshot, StatusSource};
use crate::resilience::{create_resilient_client, execute_with_retry, RetryConfig, TimeoutConfig};
use serde_json::{json, Value};

pub struct ControlPlaneClient {
    client: reqwest::Client,
    base_url: String,
    retry_config: RetryConfig,
}

impl ControlPlaneClient {
    /// # Errors
    /// Returns an error if the underlying `reqwest::Client` cannot be built.
    pub fn new(config: &PlannerConfig) -> Result<Self, Error> {
        let timeout = TimeoutConfig {
            connect_timeout_ms: config.timeout_ms,
            request_timeout_ms: config.timeout_ms,
        };
        let client = create_resilient_client(&timeout)
            .map_err(|e| Error::transport_unreachable(&config.probe_base_url, &e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.probe_base_url.clone(),
            retry_config: RetryConfig {
                max_attempts: config.max_retries as usize,
                ..RetryConfig::default()
            },
        })
    }

    /// # Errors
    /// Returns an error if the status call cannot reach the control plane.
    pub async fn get_status_async(&self, key: &str) -> Result<StatusSnapshot, Error> {
        let url = format!("{}{PATH_STATUS}", self.base_url);
        let client = &self.client;
        let response = execute_with_retry(&self.retry_config, || async {
            client.get(&url).query(&[(FIELD_KEY, key)]).send().await
        })
        .await
        .map_err(|e| Error::transport_unreachable(&self.base_url, &e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::transport_unreachable(&self.base_url, &e.to_string()))?;
        Ok(StatusSnapshot {
            count: body["hitCount"].as_u64().unwrap_or(0),
            last_hit_epoch_ms: body["lastHitEpochMs"].as_i64().unwrap_or(0),
        })
    }

    /// Fetches the `resetEpochMs` the control plane last recorded for
    /// `key`, `None` if it has never been reset this process's lifetime.
    ///
    /// # Errors
    /// Returns an error if the status call cannot reach the control plane.
    pub async fn get_reset_epoch_async(&self, key: &str) -> Result<Option<i64>, Error> {
        let url = format!("{}{PATH_STATUS}", self.base_url);
        let client = &self.client;
        let response = execute_with_retry(&self.retry_config, || async {
            client.get(&url).query(&[(FIELD_KEY, key)]).send().await
        })
        .await
        .map_err(|e| Error::transport_unreachable(&self.base_url, &e.to_string()))?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| Error::transport_unreachable(&self.base_url, &e.to_string()))?;
        Ok(body["resetEpochMs"].as_i64())
    }

    /// # Errors
    /// Returns an error if the reset call cannot reach the control plane.
    pub async fn reset(&self, key: &str) -> Result<(), Error> {
        let url = format!("{}{PATH_RESET}", self.base_url);
        let client = &self.client;
        let body = json!({ FIELD_KEY: key });
        execute_with_retry(&self.retry_config, || async {
            client.post(&url).json(&body).send().await
        })
        .await
        .map_err(|e| Error::transport_unreachable(&self.base_url, &e.to_string()))?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the actuate call cannot reach the control plane.
    pub async fn actuate(&self, body: Value) -> Result<Value, Error> {
        let url = format!("{}{PATH_ACTUATE}", self.base_url);
        let client = &self.client;
        let response = execute_with_retry(&self.retry_config, || async {
            client.post(&url).json(&body).send().await
        })
        .await
        .map_err(|e| Error::transport_unreachable(&self.base_url, &e.to_string()))?;
        response
            .json()
            .await
            .map_err(|e| Error::transport_unreachable(&self.base_url, &e.to_string()))
    }
}

/// The verifier's poll loop (`planner::verifier::wait_for_inline_hit`) is
/// synchronous by design, so this runs on a dedicated blocking thread
/// (see `tool_surface::probe_wait_hit`), where blocking on the handle is
/// safe.
impl StatusSource for ControlPlaneClient {
    fn fetch_status(&self, key: &str) -> Result<StatusSnapshot, Error> {
        tokio::runtime::Handle::current().block_on(self.get_status_async(key))
    }
}

/// Same blocking-handle caveat as the `StatusSource` impl above. A
/// transport failure here is treated as "no recorded reset" rather than
/// propagated, since the verifier only uses this to establish the start
/// of its inline window and falling back to the poll's wait-start time
/// (see `wait_for_inline_hit`) is the safe default.
impl ResetEpochSource for ControlPlaneClient {
    fn last_reset_epoch_ms(&self, key: &str) -> Option<i64> {
        tokio::runtime::Handle::current()
            .block_on(self.get_reset_epoch_async(key))
            .ok()
            .flatten()
    }
}
