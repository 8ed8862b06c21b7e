//! The planner's nine operations (SPEC_FULL.md §2.1, §6.3), each a plain
//! async function over serde structs. This is the surface an embedding
//! tool-call layer (an MCP server, a CLI) wires up one-to-one; nothing
//! here depends on how it's invoked.

use crate::config::PlannerConfig;
use crate::constants::ACTUATOR_ID_RECIPE_FALLBACK;
use crate::error::Error;
use crate::planner::auth::{self, AuthInputs, AuthResolution};
use crate::planner::execution_plan::{self, ExecutionPlan};
use crate::planner::http_client::ControlPlaneClient;
use crate::planner::request_candidate;
use crate::planner::source_index::SourceIndex;
use crate::planner::target_infer::{self, InferredTarget, TargetHints};
use crate::planner::verifier::{self, VerifierConfig, WaitResult};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct PingResponse {
    pub ok: bool,
    pub message: String,
}

/// `debug_ping`: a liveness check the planner exposes so a caller can
/// confirm the tool surface itself is wired up before touching the
/// control plane or walking a project tree.
#[must_use]
pub fn debug_ping() -> PingResponse {
    PingResponse {
        ok: true,
        message: "probeplan planner is reachable".to_string(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsDiscoverRequest {
    pub roots: Vec<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectsDiscoverResponse {
    pub projects: Vec<PathBuf>,
}

/// `projects_discover`: lists candidate project roots containing at least
/// one indexable source file. Does not itself build an index; callers
/// pick one root and pass it to `target_infer`.
#[must_use]
pub fn projects_discover(request: &ProjectsDiscoverRequest) -> ProjectsDiscoverResponse {
    let projects = request
        .roots
        .iter()
        .filter(|root| {
            let index = SourceIndex::build(root);
            !index.files.is_empty()
        })
        .cloned()
        .collect();
    ProjectsDiscoverResponse { projects }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeDiagnoseRequest {
    pub key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeDiagnoseResponse {
    pub reachable: bool,
    pub detail: String,
}

/// `probe_diagnose`: a single status round-trip against the control
/// plane, used to confirm the agent is up before running the rest of
/// the planner pipeline.
///
/// # Errors
/// Never returns `Err`; connectivity failure is reported in the response
/// body so a caller can act on it without matching on an error type.
pub async fn probe_diagnose(
    config: &PlannerConfig,
    request: &ProbeDiagnoseRequest,
) -> Result<ProbeDiagnoseResponse, Error> {
    let client = ControlPlaneClient::new(config)?;
    let key = request.key.clone().unwrap_or_else(|| "__diagnose".to_string());
    match client.get_status_async(&key).await {
        Ok(_) => Ok(ProbeDiagnoseResponse {
            reachable: true,
            detail: format!("control plane at {} responded", config.probe_base_url),
        }),
        Err(e) => Ok(ProbeDiagnoseResponse {
            reachable: false,
            detail: e.to_string(),
        }),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TargetInferRequest {
    pub project_root: PathBuf,
    pub class_hint: Option<String>,
    pub method_hint: Option<String>,
    pub line_hint: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TargetInferResponse {
    pub targets: Vec<InferredTargetView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InferredTargetView {
    pub class: String,
    pub method: String,
    pub line: Option<usize>,
    pub key: String,
    pub confidence: u32,
    pub reasons: Vec<String>,
}

impl From<&InferredTarget> for InferredTargetView {
    fn from(t: &InferredTarget) -> Self {
        Self {
            class: t.class.clone(),
            method: t.method.clone(),
            line: t.line,
            key: t.key.clone(),
            confidence: t.confidence,
            reasons: t.reasons.clone(),
        }
    }
}

/// `target_infer`: walks `project_root`, scores every indexed method
/// against the supplied hints, and returns candidates ranked by
/// confidence.
#[must_use]
pub fn target_infer(request: &TargetInferRequest) -> TargetInferResponse {
    let index = SourceIndex::build(&request.project_root);
    let hints = TargetHints {
        class_hint: request.class_hint.clone(),
        method_hint: request.method_hint.clone(),
        line_hint: request.line_hint,
    };
    let targets = target_infer::infer_targets(&index, &hints);
    TargetInferResponse {
        targets: targets.iter().map(InferredTargetView::from).collect(),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeGenerateRequest {
    pub project_root: PathBuf,
    pub class_hint: Option<String>,
    pub method_hint: Option<String>,
    pub line_hint: Option<usize>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeGenerateResponse {
    pub target: Option<InferredTargetView>,
    pub request_candidate: Option<RequestCandidateView>,
    pub auth: Option<AuthView>,
    pub plan_mode: String,
    pub plan_reason: String,
    pub steps: Vec<StepView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestCandidateView {
    pub method: String,
    pub full_url_hint: String,
    pub body_template: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuthView {
    pub status: String,
    pub missing: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepView {
    pub phase: String,
    pub title: String,
    pub instruction: String,
}

fn phase_str(phase: crate::planner::execution_plan::PlanPhase) -> &'static str {
    use crate::planner::execution_plan::PlanPhase;
    match phase {
        PlanPhase::Prepare => "prepare",
        PlanPhase::Execute => "execute",
        PlanPhase::Verify => "verify",
        PlanPhase::Cleanup => "cleanup",
    }
}

fn status_str(status: crate::planner::auth::AuthStatus) -> &'static str {
    use crate::planner::auth::AuthStatus;
    match status {
        AuthStatus::NotRequired => "not_required",
        AuthStatus::AutoResolved => "auto_resolved",
        AuthStatus::NeedsUserInput => "needs_user_input",
        AuthStatus::Unknown => "unknown",
    }
}

/// `recipe_generate`: the planner's single highest-value call. Infers a
/// target, resolves a request candidate and auth, and returns a ready
/// execution plan in one round trip.
#[must_use]
pub fn recipe_generate(request: &RecipeGenerateRequest) -> RecipeGenerateResponse {
    let index = SourceIndex::build(&request.project_root);
    let hints = TargetHints {
        class_hint: request.class_hint.clone(),
        method_hint: request.method_hint.clone(),
        line_hint: request.line_hint,
    };
    let targets = target_infer::infer_targets(&index, &hints);
    let target = targets.into_iter().next();

    let candidate = target
        .as_ref()
        .and_then(|t| request_candidate::infer_request_candidate(&request.project_root, &index, &t.class, &t.method));

    let controller_file = candidate.as_ref().and_then(|_| {
        index
            .files
            .iter()
            .find(|f| f.primary_type.as_deref() == target.as_ref().map(|t| t.class.rsplit('.').next().unwrap_or_default()))
    });

    let auth_resolution: Option<AuthResolution> = candidate.as_ref().map(|c| {
        auth::resolve_auth(
            &request.project_root,
            &c.path,
            controller_file,
            &AuthInputs {
                username: request.username.clone(),
                password: request.password.clone(),
                auth_token: request.auth_token.clone(),
                discover_login_hint: true,
            },
        )
    });

    let plan: ExecutionPlan =
        execution_plan::build_execution_plan(target.as_ref(), candidate.as_ref(), auth_resolution.as_ref());

    let steps: Vec<StepView> = match plan.mode {
        crate::planner::execution_plan::PlanMode::Natural => &plan.natural_steps,
        crate::planner::execution_plan::PlanMode::Actuated => &plan.actuated_steps,
    }
    .iter()
    .map(|s| StepView {
        phase: phase_str(s.phase).to_string(),
        title: s.title.clone(),
        instruction: s.instruction.clone(),
    })
    .collect();

    RecipeGenerateResponse {
        target: target.as_ref().map(InferredTargetView::from),
        request_candidate: candidate.as_ref().map(|c| RequestCandidateView {
            method: c.method.as_str().to_string(),
            full_url_hint: c.full_url_hint.clone(),
            body_template: c.body_template.clone(),
        }),
        auth: auth_resolution.as_ref().map(|a| AuthView {
            status: status_str(a.status).to_string(),
            missing: a.missing.clone(),
        }),
        plan_mode: format!("{:?}", plan.mode).to_lowercase(),
        plan_reason: plan.mode_reason,
        steps,
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeStatusRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeStatusResponse {
    pub key: String,
    pub hit_count: u64,
    pub last_hit_epoch_ms: i64,
}

/// `probe_status`: a passthrough status read against the control plane.
///
/// # Errors
/// Returns an error if the control plane cannot be reached.
pub async fn probe_status(
    config: &PlannerConfig,
    request: &ProbeStatusRequest,
) -> Result<ProbeStatusResponse, Error> {
    let client = ControlPlaneClient::new(config)?;
    let snapshot = client.get_status_async(&request.key).await?;
    Ok(ProbeStatusResponse {
        key: request.key.clone(),
        hit_count: snapshot.count,
        last_hit_epoch_ms: snapshot.last_hit_epoch_ms,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeResetRequest {
    pub key: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeResetResponse {
    pub ok: bool,
}

/// `probe_reset`: zeroes a key's hit record ahead of a reproduction
/// attempt.
///
/// # Errors
/// Returns an error if the control plane cannot be reached.
pub async fn probe_reset(
    config: &PlannerConfig,
    request: &ProbeResetRequest,
) -> Result<ProbeResetResponse, Error> {
    let client = ControlPlaneClient::new(config)?;
    client.reset(&request.key).await?;
    Ok(ProbeResetResponse { ok: true })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeWaitHitRequest {
    pub key: String,
    pub timeout_ms: Option<u64>,
    pub poll_interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome")]
pub enum ProbeWaitHitResponse {
    #[serde(rename = "hit")]
    Hit { count: u64, last_hit_epoch_ms: i64 },
    #[serde(rename = "timeout")]
    Timeout {
        stale_observed_count: Option<u64>,
        stale_observed_epoch_ms: Option<i64>,
    },
    #[serde(rename = "line_key_required")]
    LineKeyRequired,
}

/// `probe_wait_hit`: the verifier tool surface. One of the three
/// endpoints that enforce the strict line-key requirement (SPEC_FULL.md
/// §4.10): a method-only key is rejected outright, without polling.
///
/// # Errors
/// Returns an error if a status read fails during polling.
pub async fn probe_wait_hit(
    config: &PlannerConfig,
    request: &ProbeWaitHitRequest,
) -> Result<ProbeWaitHitResponse, Error> {
    let client = ControlPlaneClient::new(config)?;
    let verifier_config = VerifierConfig {
        poll_interval: Duration::from_millis(request.poll_interval_ms.unwrap_or(config.poll_interval_ms)),
        timeout: Duration::from_millis(request.timeout_ms.unwrap_or(config.timeout_ms)),
        max_retries: request.max_retries.unwrap_or(config.max_retries),
    };
    let key = request.key.clone();
    let result = tokio::task::spawn_blocking(move || {
        verifier::wait_for_inline_hit(
            &key,
            &client,
            &client,
            &verifier_config,
            crate::probe::hit_table::now_epoch_ms,
            std::thread::sleep,
        )
    })
    .await
    .map_err(|e| Error::validation(format!("verifier task panicked: {e}")))??;

    Ok(match result {
        WaitResult::Hit { snapshot } => ProbeWaitHitResponse::Hit {
            count: snapshot.count,
            last_hit_epoch_ms: snapshot.last_hit_epoch_ms,
        },
        WaitResult::Timeout { stale_candidate } => ProbeWaitHitResponse::Timeout {
            stale_observed_count: stale_candidate.as_ref().map(|c| c.observed_count),
            stale_observed_epoch_ms: stale_candidate.as_ref().map(|c| c.observed_epoch_ms),
        },
        WaitResult::LineKeyRequired => ProbeWaitHitResponse::LineKeyRequired,
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProbeActuateRequest {
    pub target_key: String,
    pub return_boolean: bool,
    pub actuator_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProbeActuateResponse {
    pub mode: String,
    pub actuator_id: String,
    pub actuate_target_key: String,
    pub return_boolean: bool,
}

/// `probe_actuate`: arms or disarms forced actuation on the live agent.
/// A bare `target_key` with `return_boolean` is translated into the
/// control plane's `actuate`-mode JSON body; callers disarm by sending
/// `mode=observe` through the same endpoint directly (not modeled here,
/// since disarming carries no target).
///
/// # Errors
/// Returns an error if the control plane cannot be reached.
pub async fn probe_actuate(
    config: &PlannerConfig,
    request: &ProbeActuateRequest,
) -> Result<ProbeActuateResponse, Error> {
    if !request.target_key.contains(':') {
        return Err(Error::strict_line_key_violation(&request.target_key));
    }
    let client = ControlPlaneClient::new(config)?;
    let body = json!({
        "mode": crate::planner::execution_plan::PlanMode::Actuated.as_actuate_mode_str(),
        "actuatorId": request.actuator_id.clone().unwrap_or_else(|| ACTUATOR_ID_RECIPE_FALLBACK.to_string()),
        "targetKey": request.target_key,
        "returnBoolean": request.return_boolean,
    });
    let response = client.actuate(body).await?;
    Ok(ProbeActuateResponse {
        mode: response["mode"].as_str().unwrap_or_default().to_string(),
        actuator_id: response["actuatorId"].as_str().unwrap_or_default().to_string(),
        actuate_target_key: response["actuateTargetKey"].as_str().unwrap_or_default().to_string(),
        return_boolean: response["returnBoolean"].as_bool().unwrap_or_default(),
    })
}
