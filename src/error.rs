//! Consolidated error handling.
//!
//! All internal failure modes collapse into one of the [`ErrorKind`] buckets
//! described in the design notes; a handful of external error types are kept
//! as their own variants because they cannot be meaningfully consolidated
//! without losing information a caller needs (`io::Error`, `reqwest::Error`,
//! serde errors).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{kind}: {message}")]
    Internal {
        kind: ErrorKind,
        message: Cow<'static, str>,
        context: Option<ErrorContext>,
    },
}

/// Semantic error buckets shared across the probe runtime and the planner.
///
/// See SPEC_FULL.md §7 for the meaning and propagation rule of each kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing/invalid startup argument, env var, or planner config. Fatal.
    Configuration,
    /// The control-plane endpoint could not be reached.
    TransportUnreachable,
    /// A verifier operation was called with a method-only key.
    StrictLineKeyViolation,
    /// No source-index candidate scored above the guardrail.
    TargetNotInferred,
    /// No request candidate was resolved, or auth is pending.
    NaturalUnreachable,
    /// Actuated mode was requested without an inferred target key.
    ActuatedBlocked,
    /// The verifier exhausted its poll budget without an inline hit.
    TimeoutNoInlineHit,
    /// Input failed structural validation before any inference ran.
    Validation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Configuration => "configuration error",
            Self::TransportUnreachable => "transport unreachable",
            Self::StrictLineKeyViolation => "strict line key violation",
            Self::TargetNotInferred => "target not inferred",
            Self::NaturalUnreachable => "natural path unreachable",
            Self::ActuatedBlocked => "actuated mode blocked",
            Self::TimeoutNoInlineHit => "timeout waiting for inline hit",
            Self::Validation => "validation error",
        };
        f.write_str(s)
    }
}

/// Structured detail attached to an [`Error::Internal`].
#[derive(Debug, Clone, Default)]
pub struct ErrorContext {
    pub details: Option<Value>,
    pub suggestion: Option<Cow<'static, str>>,
}

impl ErrorContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }

    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<Cow<'static, str>>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl Error {
    fn internal(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self::Internal {
            kind,
            message: message.into(),
            context: None,
        }
    }

    fn internal_with(
        kind: ErrorKind,
        message: impl Into<Cow<'static, str>>,
        context: ErrorContext,
    ) -> Self {
        Self::Internal {
            kind,
            message: message.into(),
            context: Some(context),
        }
    }

    #[must_use]
    pub fn configuration(message: impl Into<Cow<'static, str>>) -> Self {
        Self::internal(ErrorKind::Configuration, message)
    }

    #[must_use]
    pub fn transport_unreachable(base_url: &str, cause: &str) -> Self {
        Self::internal_with(
            ErrorKind::TransportUnreachable,
            format!("could not reach probe control plane at {base_url}: {cause}"),
            ErrorContext::new()
                .with_suggestion("check that the target process is running with the agent attached and that the port is correct"),
        )
    }

    #[must_use]
    pub fn strict_line_key_violation(key: &str) -> Self {
        Self::internal_with(
            ErrorKind::StrictLineKeyViolation,
            format!("key '{key}' is method-level; strict line mode requires a line-qualified key"),
            ErrorContext::new().with_suggestion(
                "supply a line hint so target inference can produce a `Class#method:line` key",
            ),
        )
    }

    #[must_use]
    pub fn target_not_inferred(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::internal(ErrorKind::TargetNotInferred, reason)
    }

    #[must_use]
    pub fn natural_unreachable(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::internal(ErrorKind::NaturalUnreachable, reason)
    }

    #[must_use]
    pub fn actuated_blocked(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::internal(ErrorKind::ActuatedBlocked, reason)
    }

    #[must_use]
    pub fn timeout_no_inline_hit(reason: impl Into<Cow<'static, str>>) -> Self {
        Self::internal(ErrorKind::TimeoutNoInlineHit, reason)
    }

    #[must_use]
    pub fn validation(message: impl Into<Cow<'static, str>>) -> Self {
        Self::internal(ErrorKind::Validation, message)
    }

    /// Serializes this error to the structured JSON shape used by
    /// `--json-errors`-style surfaces and by tool-surface error responses.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Internal {
                kind,
                message,
                context,
            } => {
                let mut obj = serde_json::json!({
                    "kind": kind.to_string(),
                    "message": message,
                });
                if let Some(ctx) = context {
                    if let Some(details) = &ctx.details {
                        obj["details"] = details.clone();
                    }
                    if let Some(suggestion) = &ctx.suggestion {
                        obj["suggestion"] = Value::String(suggestion.to_string());
                    }
                }
                obj
            }
            other => serde_json::json!({ "kind": "external", "message": other.to_string() }),
        }
    }
}

/// Wire-level error payload for the control-plane HTTP server (§6.2).
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display_matches_spec_vocabulary() {
        assert_eq!(ErrorKind::Configuration.to_string(), "configuration error");
        assert_eq!(
            ErrorKind::TransportUnreachable.to_string(),
            "transport unreachable"
        );
    }

    #[test]
    fn to_json_includes_suggestion_and_details() {
        let err = Error::strict_line_key_violation("c.C#m");
        let json = err.to_json();
        assert_eq!(json["kind"], "strict line key violation");
        assert!(json["suggestion"].is_string());
    }
}
