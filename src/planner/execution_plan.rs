//! Execution plan builder: the two-mode (`natural`/`actuated`) state
//! machine that turns inference results into ordered steps (SPEC_FULL.md
//! §4.9).

use crate::constants::ACTUATOR_ID_RECIPE_FALLBACK;
use crate::planner::auth::{AuthResolution, AuthStatus};
use crate::planner::request_candidate::RequestCandidate;
use crate::planner::target_infer::InferredTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanMode {
    Natural,
    Actuated,
}

impl PlanMode {
    /// The only place `PlanMode` and `probe::runtime::ProbeMode` touch:
    /// the literal string this mode maps to in a `probe_actuate` JSON
    /// body (SPEC_FULL.md §9's decision on the two mode enums).
    #[must_use]
    pub const fn as_actuate_mode_str(self) -> &'static str {
        match self {
            Self::Natural => "observe",
            Self::Actuated => "actuate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanPhase {
    Prepare,
    Execute,
    Verify,
    Cleanup,
}

#[derive(Debug, Clone)]
pub struct PlanStep {
    pub phase: PlanPhase,
    pub title: String,
    pub instruction: String,
}

#[derive(Debug, Clone)]
pub struct ExecutionPlan {
    pub mode: PlanMode,
    pub mode_reason: String,
    pub natural_steps: Vec<PlanStep>,
    pub actuated_steps: Vec<PlanStep>,
}

/// Builds the execution plan from inference results. Requested mode is
/// only a hint; natural mode is preferred whenever a request candidate
/// is available and auth is not blocking.
#[must_use]
pub fn build_execution_plan(
    target: Option<&InferredTarget>,
    request_candidate: Option<&RequestCandidate>,
    auth: Option<&AuthResolution>,
) -> ExecutionPlan {
    if request_candidate.is_none() {
        return build_without_candidate(target, auth);
    }
    build_with_candidate(target, request_candidate.unwrap(), auth)
}

fn build_without_candidate(
    target: Option<&InferredTarget>,
    _auth: Option<&AuthResolution>,
) -> ExecutionPlan {
    if target.is_none() {
        return ExecutionPlan {
            mode: PlanMode::Actuated,
            mode_reason: "no target key was inferred; actuated mode cannot be offered either"
                .to_string(),
            natural_steps: Vec::new(),
            actuated_steps: Vec::new(),
        };
    }
    let target = target.unwrap();
    ExecutionPlan {
        mode: PlanMode::Actuated,
        mode_reason: "no controller or OpenAPI route resolved; falling back to actuated reproduction"
            .to_string(),
        natural_steps: Vec::new(),
        actuated_steps: actuated_steps(&target.key, true),
    }
}

fn build_with_candidate(
    target: Option<&InferredTarget>,
    candidate: &RequestCandidate,
    auth: Option<&AuthResolution>,
) -> ExecutionPlan {
    let mut steps = Vec::new();
    let auth_pending = auth.is_some_and(|a| a.status == AuthStatus::NeedsUserInput);

    if auth_pending {
        steps.push(PlanStep {
            phase: PlanPhase::Prepare,
            title: "Resolve authentication".to_string(),
            instruction: format!("supply: {}", auth.unwrap().missing.join(", ")),
        });
    }

    let key = target.map(|t| t.key.clone()).unwrap_or_default();
    let is_line_key = key.contains(':');

    if is_line_key {
        steps.push(PlanStep {
            phase: PlanPhase::Prepare,
            title: "Reset baseline".to_string(),
            instruction: format!("reset probe key '{key}' before sending the request"),
        });
    } else {
        steps.push(PlanStep {
            phase: PlanPhase::Prepare,
            title: "Reset baseline".to_string(),
            instruction: format!(
                "strict line mode requires a line hint; '{key}' is method-level and cannot be reset for verification"
            ),
        });
    }

    steps.push(PlanStep {
        phase: PlanPhase::Execute,
        title: "Execute natural request".to_string(),
        instruction: format!(
            "{} {} (headers: {})",
            candidate.method.as_str(),
            candidate.full_url_hint,
            redacted_headers_summary(auth),
        ),
    });

    steps.push(PlanStep {
        phase: PlanPhase::Verify,
        title: "Verify inline hit".to_string(),
        instruction: format!("poll status for '{key}' and confirm an inline hit"),
    });

    ExecutionPlan {
        mode: PlanMode::Natural,
        mode_reason: "a request candidate was resolved".to_string(),
        natural_steps: steps,
        actuated_steps: Vec::new(),
    }
}

fn redacted_headers_summary(auth: Option<&AuthResolution>) -> String {
    let Some(auth) = auth else {
        return "none".to_string();
    };
    let Some(headers) = &auth.request_headers else {
        return "none".to_string();
    };
    headers
        .iter()
        .map(|(name, value)| format!("{name}: {}", crate::redact::redact_header_value(value)))
        .collect::<Vec<_>>()
        .join(", ")
}

fn actuated_steps(target_key: &str, force_taken: bool) -> Vec<PlanStep> {
    vec![
        PlanStep {
            phase: PlanPhase::Prepare,
            title: "Arm actuation".to_string(),
            instruction: format!(
                "actuate mode={}, target={target_key}, returnBoolean={}, actuatorId={ACTUATOR_ID_RECIPE_FALLBACK}",
                PlanMode::Actuated.as_actuate_mode_str(),
                force_taken,
            ),
        },
        PlanStep {
            phase: PlanPhase::Verify,
            title: "Trigger reachable path".to_string(),
            instruction: format!(
                "invoke any request that reaches '{target_key}' and confirm an inline hit"
            ),
        },
        PlanStep {
            phase: PlanPhase::Cleanup,
            title: "Disarm actuation".to_string(),
            instruction: "configure mode=observe to restore original behavior".to_string(),
        },
    ]
}
