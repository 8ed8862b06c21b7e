//! Thread-per-request control-plane HTTP server (SPEC_FULL.md §4.4, §6.2).
//!
//! Three endpoints, backed directly by the [`ProbeRuntime`]: `status`
//! (read), `reset` (zero a key), `actuate` (reconfigure mode). The server
//! itself holds no state beyond a handle to the runtime it serves.

use crate::constants::{
    DEFAULT_HOST, DEFAULT_PORT, FIELD_ACTUATOR_ID, FIELD_KEY, FIELD_MODE, FIELD_RETURN_BOOLEAN,
    FIELD_TARGET_KEY, PATH_ACTUATE, PATH_RESET, PATH_STATUS,
};
use crate::probe::runtime::{ProbeMode, ProbeRuntime, RuntimeConfig};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tiny_http::{Method, Request, Response, Server};
use tracing::{info, warn};

/// Per-key last-reset epoch, consulted by the verifier (§4.10). Lives
/// alongside the control plane because `reset` is the only writer.
#[derive(Debug, Default)]
pub struct ResetLedger {
    entries: dashmap::DashMap<String, AtomicI64>,
}

impl ResetLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reset(&self, key: &str) {
        let now = crate::probe::hit_table::now_epoch_ms();
        self.entries
            .entry(key.to_string())
            .or_insert_with(|| AtomicI64::new(now))
            .store(now, Ordering::Release);
    }

    #[must_use]
    pub fn last_reset_epoch_ms(&self, key: &str) -> Option<i64> {
        self.entries.get(key).map(|v| v.load(Ordering::Acquire))
    }
}

/// Runs the control plane on the calling thread, handling requests one at a
/// time until the server is dropped or the process exits. A bounded
/// backlog (16) is configured at the socket level by `tiny_http`'s default.
///
/// # Errors
/// Returns an error if the listener cannot bind `host:port`.
pub fn serve(
    host: &str,
    port: u16,
    runtime: Arc<ProbeRuntime>,
    reset_ledger: Arc<ResetLedger>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let server = Server::http(format!("{host}:{port}"))?;
    info!(%host, %port, "control plane listening");
    for request in server.incoming_requests() {
        handle_request(request, &runtime, &reset_ledger);
    }
    Ok(())
}

#[must_use]
pub fn default_bind_address() -> (String, u16) {
    (DEFAULT_HOST.to_string(), DEFAULT_PORT)
}

fn handle_request(mut request: Request, runtime: &ProbeRuntime, reset_ledger: &ResetLedger) {
    let method = request.method().clone();
    let url = request.url().to_string();
    let (path, query) = split_path_and_query(&url);

    let mut body = String::new();
    if matches!(method, Method::Post) {
        let _ = request.as_reader().read_to_string(&mut body);
    }

    let outcome = match path.as_str() {
        PATH_STATUS => handle_status(&method, &query, runtime, reset_ledger),
        PATH_RESET => handle_reset(&method, &query, &body, runtime, reset_ledger),
        PATH_ACTUATE => handle_actuate(&method, &body, runtime),
        other => {
            warn!(path = %other, "control plane received unknown path");
            Outcome::NotFound
        }
    };

    let (status, payload) = outcome.into_status_and_body();
    let response = Response::from_string(payload.to_string())
        .with_status_code(status)
        .with_header(
            tiny_http::Header::from_bytes(&b"Content-Type"[..], &b"application/json"[..])
                .expect("static header is always valid"),
        );
    let _ = request.respond(response);
}

enum Outcome {
    Ok(Value),
    MissingKey,
    MethodNotAllowed,
    NotFound,
}

impl Outcome {
    fn into_status_and_body(self) -> (u16, Value) {
        match self {
            Self::Ok(body) => (200, body),
            Self::MissingKey => (400, json!({"error": "missing_key"})),
            Self::MethodNotAllowed => (405, json!({"error": "method_not_allowed"})),
            Self::NotFound => (404, json!({"error": "not_found"})),
        }
    }
}

fn split_path_and_query(url: &str) -> (String, Vec<(String, String)>) {
    let mut parts = url.splitn(2, '?');
    let path = parts.next().unwrap_or_default().to_string();
    let query = parts
        .next()
        .map(|q| {
            q.split('&')
                .filter_map(|pair| {
                    let mut kv = pair.splitn(2, '=');
                    let key = kv.next()?;
                    let value = kv.next().unwrap_or_default();
                    Some((
                        urlencoding::decode(key).ok()?.into_owned(),
                        urlencoding::decode(value).ok()?.into_owned(),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();
    (path, query)
}

fn query_param(query: &[(String, String)], name: &str) -> Option<String> {
    query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

fn handle_status(
    method: &Method,
    query: &[(String, String)],
    runtime: &ProbeRuntime,
    reset_ledger: &ResetLedger,
) -> Outcome {
    if *method != Method::Get {
        return Outcome::MethodNotAllowed;
    }
    let Some(key) = query_param(query, FIELD_KEY).filter(|k| !k.is_empty()) else {
        return Outcome::MissingKey;
    };
    let snapshot = runtime.hits().snapshot(&key);
    let config = runtime.config();
    Outcome::Ok(json!({
        FIELD_KEY: key,
        "hitCount": snapshot.count,
        "lastHitEpochMs": snapshot.last_hit_epoch_ms,
        "resetEpochMs": reset_ledger.last_reset_epoch_ms(&key),
        FIELD_MODE: mode_str(config.mode),
        FIELD_ACTUATOR_ID: config.actuator_id,
        "actuateTargetKey": config.actuate_target_key,
        FIELD_RETURN_BOOLEAN: config.actuate_return_boolean,
    }))
}

fn handle_reset(
    method: &Method,
    query: &[(String, String)],
    body: &str,
    runtime: &ProbeRuntime,
    reset_ledger: &ResetLedger,
) -> Outcome {
    if *method != Method::Post {
        return Outcome::MethodNotAllowed;
    }
    let key = body_field(body, FIELD_KEY).or_else(|| query_param(query, FIELD_KEY));
    let Some(key) = key.filter(|k| !k.is_empty()) else {
        return Outcome::MissingKey;
    };
    runtime.hits().reset(&key);
    reset_ledger.record_reset(&key);
    Outcome::Ok(json!({"ok": true, FIELD_KEY: key}))
}

fn handle_actuate(method: &Method, body: &str, runtime: &ProbeRuntime) -> Outcome {
    if *method != Method::Post {
        return Outcome::MethodNotAllowed;
    }
    let parsed: Value = serde_json::from_str(body).unwrap_or_else(|_| json!({}));
    let current = runtime.config();

    let mode = parsed
        .get(FIELD_MODE)
        .and_then(Value::as_str)
        .map_or(current.mode, |m| {
            if m.eq_ignore_ascii_case("actuate") {
                ProbeMode::Actuate
            } else {
                ProbeMode::Observe
            }
        });
    let actuator_id = parsed
        .get(FIELD_ACTUATOR_ID)
        .and_then(Value::as_str)
        .map_or_else(|| current.actuator_id.clone(), ToString::to_string);
    let actuate_target_key = parsed
        .get(FIELD_TARGET_KEY)
        .and_then(Value::as_str)
        .map_or_else(|| current.actuate_target_key.clone(), ToString::to_string);
    let actuate_return_boolean = parsed
        .get(FIELD_RETURN_BOOLEAN)
        .and_then(Value::as_bool)
        .unwrap_or(current.actuate_return_boolean);

    let new_config = RuntimeConfig {
        mode,
        actuator_id,
        actuate_target_key,
        actuate_return_boolean,
    };
    runtime.configure(new_config);
    let effective = runtime.config();
    Outcome::Ok(json!({
        FIELD_MODE: mode_str(effective.mode),
        FIELD_ACTUATOR_ID: effective.actuator_id,
        "actuateTargetKey": effective.actuate_target_key,
        FIELD_RETURN_BOOLEAN: effective.actuate_return_boolean,
    }))
}

fn body_field(body: &str, field: &str) -> Option<String> {
    serde_json::from_str::<Value>(body)
        .ok()?
        .get(field)?
        .as_str()
        .map(ToString::to_string)
}

fn mode_str(mode: ProbeMode) -> &'static str {
    match mode {
        ProbeMode::Observe => "observe",
        ProbeMode::Actuate => "actuate",
    }
}
