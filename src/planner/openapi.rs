//! Shared OpenAPI document loading (SPEC_FULL.md §4.7, §4.8).
//!
//! Looks for a document at the conventional paths and parses it with
//! `openapiv3`, the way `aperture::spec::parser` loads a user-supplied
//! spec file — except here the candidate paths are fixed conventions
//! rather than a CLI argument, and a missing file is not an error.

use openapiv3::OpenAPI;
use std::path::{Path, PathBuf};

const CANDIDATE_RELATIVE_PATHS: &[&str] = &[
    "docs/openapi/openapi.yaml",
    "docs/openapi/openapi.yml",
    "openapi.yaml",
    "openapi.yml",
    "swagger.yaml",
    "swagger.yml",
];

/// Searches `project_root` for the first present conventional OpenAPI
/// file and parses it. Returns `None` when no candidate file exists;
/// a present-but-unparseable file is also treated as absent, since the
/// caller's only use of this is a best-effort fallback.
#[must_use]
pub fn load_first_openapi_document(project_root: &Path) -> Option<(PathBuf, OpenAPI)> {
    for relative in CANDIDATE_RELATIVE_PATHS {
        let path = project_root.join(relative);
        if !path.is_file() {
            continue;
        }
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        if let Ok(doc) = serde_yaml::from_str::<OpenAPI>(&text) {
            return Some((path, doc));
        }
    }
    None
}

/// Finds the operation whose `operationId` matches `method_name` or any
/// name in `alternate_names`, returning its HTTP method, path, and the
/// matched operation.
#[must_use]
pub fn find_operation_by_id<'a>(
    doc: &'a OpenAPI,
    method_name: &str,
    alternate_names: &[String],
) -> Option<(&'static str, String, &'a openapiv3::Operation)> {
    let wants = |op_id: &str| {
        op_id.eq_ignore_ascii_case(method_name)
            || alternate_names.iter().any(|n| op_id.eq_ignore_ascii_case(n))
    };

    for (path, item) in &doc.paths.paths {
        let Some(path_item) = item.as_item() else {
            continue;
        };
        for (http_method, operation) in [
            ("GET", &path_item.get),
            ("POST", &path_item.post),
            ("PUT", &path_item.put),
            ("PATCH", &path_item.patch),
            ("DELETE", &path_item.delete),
        ] {
            if let Some(op) = operation {
                if op.operation_id.as_deref().is_some_and(wants) {
                    return Some((http_method, path.clone(), op));
                }
            }
        }
    }
    None
}

/// Walks every path for the first `POST` operation whose path or request
/// body schema name matches a login-ish keyword, per §4.8's login-hint
/// discovery step.
#[must_use]
pub fn find_login_hint(doc: &OpenAPI) -> Option<(String, bool)> {
    const LOGIN_KEYWORDS: &[&str] = &["login", "signin", "sign-in", "token", "auth", "authenticate", "session"];

    for (path, item) in &doc.paths.paths {
        let Some(path_item) = item.as_item() else {
            continue;
        };
        let Some(post) = &path_item.post else {
            continue;
        };
        let path_lower = path.to_lowercase();
        let op_id_lower = post.operation_id.clone().unwrap_or_default().to_lowercase();
        let matches_keyword = LOGIN_KEYWORDS
            .iter()
            .any(|kw| path_lower.contains(kw) || op_id_lower.contains(kw));
        if !matches_keyword {
            continue;
        }
        let has_password = request_body_mentions(post, "password");
        if !has_password {
            continue;
        }
        let has_email = request_body_mentions(post, "email");
        return Some((path.clone(), has_email));
    }
    None
}

fn request_body_mentions(operation: &openapiv3::Operation, field: &str) -> bool {
    let Some(body) = operation.request_body.as_ref().and_then(|b| b.as_item()) else {
        return false;
    };
    body.content.values().any(|media| {
        media
            .schema
            .as_ref()
            .and_then(|s| s.as_item())
            .is_some_and(|schema| schema_mentions_field(schema, field))
    })
}

fn schema_mentions_field(schema: &openapiv3::Schema, field: &str) -> bool {
    if let openapiv3::SchemaKind::Type(openapiv3::Type::Object(obj)) = &schema.schema_kind {
        return obj.properties.contains_key(field);
    }
    false
}
