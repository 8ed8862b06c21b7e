//! Auth resolution: combines OpenAPI security declarations, controller
//! annotations, and user-supplied credentials into either ready-to-use
//! headers or a structured "needs more input" result (SPEC_FULL.md §4.8).
//!
//! Invariant: never reads credentials from the environment. Everything
//! comes through [`AuthInputs`] explicitly.

use crate::planner::openapi;
use crate::planner::source_index::SourceFile;
use base64::Engine;
use openapiv3::{OpenAPI, SecurityScheme};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Required {
    True,
    False,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStatus {
    NotRequired,
    AutoResolved,
    NeedsUserInput,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthStrategy {
    None,
    Bearer,
    Basic,
    Cookie,
    Unknown,
}

#[derive(Debug, Clone, Default)]
pub struct AuthInputs {
    pub username: Option<String>,
    pub password: Option<String>,
    pub auth_token: Option<String>,
    pub discover_login_hint: bool,
}

#[derive(Debug, Clone)]
pub struct LoginHint {
    pub method: &'static str,
    pub path: String,
    pub body_template: String,
}

#[derive(Debug, Clone)]
pub struct AuthResolution {
    pub required: Required,
    pub status: AuthStatus,
    pub strategy: AuthStrategy,
    pub request_headers: Option<Vec<(String, String)>>,
    pub missing: Vec<String>,
    pub login_hint: Option<LoginHint>,
    pub next_action: String,
    pub notes: Vec<String>,
}

const SECURITY_ANNOTATION_NEEDLES: &[&str] =
    &["@PreAuthorize", "@Secured", "@RolesAllowed", "@SecurityRequirement"];

/// Resolves auth for `endpoint_path` under `project_root`, consulting the
/// first available OpenAPI document and the controller file's security
/// annotations.
#[must_use]
pub fn resolve_auth(
    project_root: &Path,
    endpoint_path: &str,
    controller_file: Option<&SourceFile>,
    inputs: &AuthInputs,
) -> AuthResolution {
    let openapi_doc = openapi::load_first_openapi_document(project_root).map(|(_, doc)| doc);

    let (openapi_required, strategy) = openapi_doc
        .as_ref()
        .map_or((Required::Unknown, AuthStrategy::Unknown), |doc| {
            determine_openapi_security(doc, endpoint_path)
        });

    let controller_required = controller_file.is_some_and(|f| {
        SECURITY_ANNOTATION_NEEDLES
            .iter()
            .any(|needle| f.text.contains(needle))
    });

    let required = if controller_required {
        Required::True
    } else {
        openapi_required
    };

    let login_hint = if inputs.discover_login_hint {
        openapi_doc.as_ref().and_then(find_login_hint_typed)
    } else {
        None
    };

    if required != Required::True {
        return AuthResolution {
            required: Required::False,
            status: AuthStatus::NotRequired,
            strategy: AuthStrategy::None,
            request_headers: None,
            missing: Vec::new(),
            login_hint,
            next_action: "no authentication required for this endpoint".to_string(),
            notes: Vec::new(),
        };
    }

    match strategy {
        AuthStrategy::Basic => resolve_basic(inputs, login_hint),
        _ => resolve_token(strategy, inputs, login_hint),
    }
}

fn determine_openapi_security(doc: &OpenAPI, endpoint_path: &str) -> (Required, AuthStrategy) {
    let path_requires_security = doc
        .paths
        .paths
        .iter()
        .filter(|(path, _)| path.as_str() == endpoint_path)
        .filter_map(|(_, item)| item.as_item())
        .any(|item| {
            [&item.get, &item.post, &item.put, &item.patch, &item.delete]
                .into_iter()
                .flatten()
                .any(|op| !op.security.clone().unwrap_or_default().is_empty())
        });

    let global_requires_security = !doc.security.clone().unwrap_or_default().is_empty();

    if !path_requires_security && !global_requires_security {
        return (Required::False, AuthStrategy::Unknown);
    }

    let strategy = doc
        .components
        .as_ref()
        .and_then(|c| c.security_schemes.values().next())
        .and_then(|s| s.as_item())
        .map_or(AuthStrategy::Unknown, scheme_to_strategy);

    (Required::True, strategy)
}

fn scheme_to_strategy(scheme: &SecurityScheme) -> AuthStrategy {
    match scheme {
        SecurityScheme::HTTP { scheme, .. } if scheme.eq_ignore_ascii_case("bearer") => {
            AuthStrategy::Bearer
        }
        SecurityScheme::HTTP { scheme, .. } if scheme.eq_ignore_ascii_case("basic") => {
            AuthStrategy::Basic
        }
        SecurityScheme::APIKey { location, .. }
            if matches!(location, openapiv3::APIKeyLocation::Cookie) =>
        {
            AuthStrategy::Cookie
        }
        _ => AuthStrategy::Unknown,
    }
}

fn resolve_basic(inputs: &AuthInputs, login_hint: Option<LoginHint>) -> AuthResolution {
    match (&inputs.username, &inputs.password) {
        (Some(user), Some(pass)) => {
            let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{pass}"));
            AuthResolution {
                required: Required::True,
                status: AuthStatus::AutoResolved,
                strategy: AuthStrategy::Basic,
                request_headers: Some(vec![("Authorization".to_string(), format!("Basic {encoded}"))]),
                missing: Vec::new(),
                login_hint,
                next_action: "request is ready to send".to_string(),
                notes: Vec::new(),
            }
        }
        _ => {
            let mut missing = Vec::new();
            if inputs.username.is_none() {
                missing.push("username".to_string());
            }
            if inputs.password.is_none() {
                missing.push("password".to_string());
            }
            AuthResolution {
                required: Required::True,
                status: AuthStatus::NeedsUserInput,
                strategy: AuthStrategy::Basic,
                request_headers: None,
                missing,
                login_hint,
                next_action: "supply username and password".to_string(),
                notes: Vec::new(),
            }
        }
    }
}

fn resolve_token(
    strategy: AuthStrategy,
    inputs: &AuthInputs,
    login_hint: Option<LoginHint>,
) -> AuthResolution {
    if let Some(token) = &inputs.auth_token {
        let header = if strategy == AuthStrategy::Cookie {
            ("Cookie".to_string(), format!("session={token}"))
        } else {
            ("Authorization".to_string(), format!("Bearer {token}"))
        };
        return AuthResolution {
            required: Required::True,
            status: AuthStatus::AutoResolved,
            strategy,
            request_headers: Some(vec![header]),
            missing: Vec::new(),
            login_hint,
            next_action: "request is ready to send".to_string(),
            notes: Vec::new(),
        };
    }

    let mut missing = vec!["authToken".to_string()];
    if matches!(strategy, AuthStrategy::Unknown) {
        missing.push("username".to_string());
        missing.push("password".to_string());
    }
    AuthResolution {
        required: Required::True,
        status: AuthStatus::NeedsUserInput,
        strategy,
        request_headers: None,
        missing,
        login_hint,
        next_action: "supply an auth token (or username/password as a fallback)".to_string(),
        notes: Vec::new(),
    }
}

fn find_login_hint_typed(doc: &OpenAPI) -> Option<LoginHint> {
    let (path, has_email) = openapi::find_login_hint(doc)?;
    let body_template = if has_email {
        r#"{"email":"value","password":"value"}"#.to_string()
    } else {
        r#"{"username":"value","password":"value"}"#.to_string()
    };
    Some(LoginHint {
        method: "POST",
        path,
        body_template,
    })
}
