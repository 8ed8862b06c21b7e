//! Locates a controller endpoint that transitively invokes a target
//! method and reconstructs an HTTP request candidate (SPEC_FULL.md §4.7).
//!
//! The largest single component in the system: a textual search for a
//! direct call, a bounded caller-BFS when no direct call is found, and an
//! OpenAPI fallback when neither resolves a route. Never fabricates a
//! route from a class's base path alone.

use crate::planner::openapi;
use crate::planner::source_index::{SourceFile, SourceIndex};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};

const MAX_CONTROLLER_FILES: usize = 120;
const MAX_BFS_DEPTH: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RequestCandidate {
    pub method: HttpMethod,
    pub path: String,
    pub query_template: Vec<(String, String)>,
    pub full_url_hint: String,
    pub body_template: Option<String>,
    pub rationale: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Query,
    Path,
    Header,
    Body,
    Unknown,
}

#[derive(Debug, Clone)]
struct ControllerParam {
    kind: ParamKind,
    request_name: String,
    example_value: String,
}

static CONTROLLER_FILENAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Controller").unwrap());
static CLASS_REQUEST_MAPPING_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"@RequestMapping\s*\(\s*(?:value\s*=\s*)?"([^"]*)""#).unwrap());
static METHOD_MAPPING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"@(GetMapping|PostMapping|PutMapping|PatchMapping|DeleteMapping|RequestMapping)\s*\(([^)]*)\)"#,
    )
    .unwrap()
});
static REQUEST_METHOD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"RequestMethod\.(\w+)").unwrap());
static MAPPING_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?:value\s*=\s*)?"([^"]*)""#).unwrap());
static PARAM_ANNOTATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"@(RequestParam|PathVariable|RequestHeader|RequestBody)(?:\s*\(\s*(?:value\s*=\s*)?"([^"]*)"\s*\))?\s+(?:final\s+)?[\w<>\[\],.? ]+\s+(\w+)"#,
    )
    .unwrap()
});

/// Attempts to build a request candidate for `target_class`/`target_method`
/// rooted at `project_root`. Returns `None` when neither controller
/// annotations nor an OpenAPI document resolve a route.
#[must_use]
pub fn infer_request_candidate(
    project_root: &Path,
    index: &SourceIndex,
    target_class: &str,
    target_method: &str,
) -> Option<RequestCandidate> {
    let controller_files: Vec<&SourceFile> = index
        .files
        .iter()
        .filter(|f| is_controller_file(f))
        .take(MAX_CONTROLLER_FILES)
        .collect();

    if let Some(candidate) = find_direct_invocation(&controller_files, target_method) {
        return Some(candidate);
    }

    let (candidate, caller_names) =
        find_via_caller_bfs(index, &controller_files, target_class, target_method);
    if let Some(candidate) = candidate {
        return Some(candidate);
    }

    find_via_openapi(project_root, target_method, &caller_names)
}

fn is_controller_file(file: &SourceFile) -> bool {
    let name_matches = file
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .is_some_and(|n| CONTROLLER_FILENAME_RE.is_match(n));
    let type_matches = file
        .primary_type
        .as_deref()
        .is_some_and(|t| CONTROLLER_FILENAME_RE.is_match(t));
    name_matches || type_matches
}

fn find_direct_invocation(
    controller_files: &[&SourceFile],
    target_method: &str,
) -> Option<RequestCandidate> {
    let call_re = Regex::new(&format!(r"\b{}\s*\(", regex::escape(target_method))).ok()?;
    for file in controller_files {
        if call_re.is_match(&file.text) {
            return build_candidate(file, target_method, &[]);
        }
    }
    None
}

/// Returns the landed candidate (if the BFS reaches a controller) plus
/// every caller method name it visited along the way, regardless of
/// whether it landed — the OpenAPI fallback matches an `operationId`
/// against that whole name set (SPEC_FULL.md §4.7 step 6), not just the
/// target method's own name.
fn find_via_caller_bfs(
    index: &SourceIndex,
    controller_files: &[&SourceFile],
    _target_class: &str,
    target_method: &str,
) -> (Option<RequestCandidate>, Vec<String>) {
    let mut visited: HashSet<String> = HashSet::new();
    visited.insert(target_method.to_string());
    let mut queue: VecDeque<(String, u32, Vec<String>)> = VecDeque::new();
    queue.push_back((target_method.to_string(), 0, Vec::new()));

    while let Some((current_method, depth, chain)) = queue.pop_front() {
        if depth >= MAX_BFS_DEPTH {
            continue;
        }
        let callers = find_callers(index, &current_method);
        let mut scored: Vec<(i32, String)> = callers
            .into_iter()
            .filter(|(name, _)| visited.insert(name.clone()))
            .map(|(name, file)| (score_caller_file(file), name))
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| chain.len().cmp(&chain.len())));

        for (_, caller_method) in scored {
            let mut new_chain = chain.clone();
            new_chain.push(caller_method.clone());

            for file in controller_files {
                if let Some(candidate) = build_candidate(file, &caller_method, &new_chain) {
                    let mut names: Vec<String> = visited.into_iter().collect();
                    names.retain(|n| n != target_method);
                    return (Some(candidate), names);
                }
            }
            queue.push_back((caller_method, depth + 1, new_chain));
        }
    }
    let mut names: Vec<String> = visited.into_iter().collect();
    names.retain(|n| n != target_method);
    (None, names)
}

fn find_callers<'a>(index: &'a SourceIndex, method_name: &str) -> Vec<(String, &'a SourceFile)> {
    let Ok(call_re) = Regex::new(&format!(r"\b{}\s*\(", regex::escape(method_name))) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for file in &index.files {
        if !call_re.is_match(&file.text) {
            continue;
        }
        for method in &file.methods {
            if method.name == method_name {
                continue;
            }
            out.push((method.name.clone(), file));
        }
    }
    out
}

fn score_caller_file(file: &SourceFile) -> i32 {
    let mut score = 0;
    let path_lower = file.path.to_string_lossy().to_lowercase();
    if path_lower.contains("/service/") || path_lower.contains("\\service\\") {
        score += 4;
    }
    if file
        .primary_type
        .as_deref()
        .is_some_and(|t| t.to_lowercase().contains("service"))
    {
        score += 2;
    }
    if is_controller_file(file) {
        score -= 2;
    }
    score
}

fn build_candidate(
    controller_file: &SourceFile,
    called_method: &str,
    chain: &[String],
) -> Option<RequestCandidate> {
    let call_re = Regex::new(&format!(r"\b{}\s*\(", regex::escape(called_method))).ok()?;
    let call_pos = call_re.find(&controller_file.text)?.start();
    let call_line = controller_file.text[..call_pos].matches('\n').count() + 1;

    let enclosing = controller_file
        .methods
        .iter()
        .filter(|m| m.start_line <= call_line)
        .max_by_key(|m| m.start_line)?;

    let class_base_path = CLASS_REQUEST_MAPPING_RE
        .captures(&controller_file.text)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    let method_context = method_body_text(controller_file, enclosing);
    let (http_method, sub_path) = extract_mapping(&method_context)?;

    let params = extract_params(&method_context);
    let (path, query_template, body_template) =
        materialize_request(&class_base_path, &sub_path, &params);

    let mut full_url_hint = path.clone();
    if !query_template.is_empty() {
        let qs = query_template
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        full_url_hint = format!("{path}?{qs}");
    }

    let mut rationale = vec![format!(
        "controller {} calls {} at line {}",
        controller_file.path.display(),
        called_method,
        call_line
    )];
    if !chain.is_empty() {
        rationale.push(format!("via caller chain: {}", chain.join(" -> ")));
    }
    if let Some(hint) = branch_precondition_hint(&method_context) {
        rationale.push(hint);
    }

    Some(RequestCandidate {
        method: http_method,
        path,
        query_template,
        full_url_hint,
        body_template,
        rationale,
    })
}

fn method_body_text(file: &SourceFile, method: &crate::planner::source_index::MethodRecord) -> String {
    let lines: Vec<&str> = file.text.lines().collect();
    let start = method.start_line.saturating_sub(3).max(1) - 1;
    let end = (method.start_line + 20).min(lines.len());
    lines[start..end].join("\n")
}

fn extract_mapping(method_context: &str) -> Option<(HttpMethod, String)> {
    let captures = METHOD_MAPPING_RE.captures(method_context)?;
    let annotation = &captures[1];
    let args = &captures[2];
    let sub_path = MAPPING_PATH_RE
        .captures(args)
        .map(|c| c[1].to_string())
        .unwrap_or_default();

    let http_method = match annotation {
        "GetMapping" => HttpMethod::Get,
        "PostMapping" => HttpMethod::Post,
        "PutMapping" => HttpMethod::Put,
        "PatchMapping" => HttpMethod::Patch,
        "DeleteMapping" => HttpMethod::Delete,
        _ => {
            let method_name = REQUEST_METHOD_RE
                .captures(args)
                .map_or("GET", |c| c.get(1).map_or("GET", |m| m.as_str()));
            match method_name {
                "POST" => HttpMethod::Post,
                "PUT" => HttpMethod::Put,
                "PATCH" => HttpMethod::Patch,
                "DELETE" => HttpMethod::Delete,
                _ => HttpMethod::Get,
            }
        }
    };
    Some((http_method, sub_path))
}

fn extract_params(method_context: &str) -> Vec<ControllerParam> {
    PARAM_ANNOTATION_RE
        .captures_iter(method_context)
        .map(|c| {
            let annotation = &c[1];
            let declared_name = c.get(2).map(|m| m.as_str());
            let formal_name = &c[3];
            let request_name = declared_name.unwrap_or(formal_name).to_string();
            let kind = match annotation {
                "RequestParam" => ParamKind::Query,
                "PathVariable" => ParamKind::Path,
                "RequestHeader" => ParamKind::Header,
                "RequestBody" => ParamKind::Body,
                _ => ParamKind::Unknown,
            };
            ControllerParam {
                kind,
                request_name,
                example_value: example_value_for(method_context, formal_name),
            }
        })
        .collect()
}

fn example_value_for(method_context: &str, formal_name: &str) -> String {
    let type_re = Regex::new(&format!(r"(\w+(?:<[\w<>,. ]+>)?)\s+{formal_name}\b"))
        .ok()
        .and_then(|re| re.captures(method_context).map(|c| c[1].to_string()))
        .unwrap_or_default();
    match type_re.as_str() {
        "int" | "long" | "Integer" | "Long" | "short" | "Short" => "1".to_string(),
        "float" | "double" | "Float" | "Double" | "BigDecimal" => "1000".to_string(),
        "boolean" | "Boolean" => "true".to_string(),
        t if t.contains("Dto") || t.contains("Request") || t.contains("Map") => {
            "{\"example\":true}".to_string()
        }
        _ => "value".to_string(),
    }
}

fn materialize_request(
    class_base_path: &str,
    sub_path: &str,
    params: &[ControllerParam],
) -> (String, Vec<(String, String)>, Option<String>) {
    let mut path = format!(
        "{}/{}",
        class_base_path.trim_end_matches('/'),
        sub_path.trim_start_matches('/')
    )
    .trim_end_matches('/')
    .to_string();
    if path.is_empty() {
        path = "/".to_string();
    }

    let mut query_template = Vec::new();
    let mut body_template = None;

    let skip_min_price = params.iter().any(|p| p.request_name == "minPrice")
        && params.iter().any(|p| p.request_name == "maxPrice");

    for param in params {
        if skip_min_price && param.request_name == "minPrice" {
            continue;
        }
        match param.kind {
            ParamKind::Path => {
                path = path
                    .replace(&format!("{{{}}}", param.request_name), &param.example_value);
            }
            ParamKind::Query => {
                query_template.push((param.request_name.clone(), param.example_value.clone()));
            }
            ParamKind::Body => {
                body_template = Some(param.example_value.clone());
            }
            ParamKind::Header | ParamKind::Unknown => {}
        }
    }

    if params.iter().any(|p| p.request_name == "page") {
        query_template.push(("page".to_string(), "0".to_string()));
    }
    if params.iter().any(|p| p.request_name == "size") {
        query_template.push(("size".to_string(), "1".to_string()));
    }

    (path, query_template, body_template)
}

fn branch_precondition_hint(method_context: &str) -> Option<String> {
    let mut last_match = None;
    for line in method_context.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("else if") && trimmed.contains("maxPrice") {
            last_match = Some(trimmed.to_string());
        } else if trimmed.starts_with("if") && trimmed.contains("minPrice") {
            last_match = Some(trimmed.to_string());
        }
    }
    last_match.map(|line| format!("branch precondition hint: {line}"))
}

fn find_via_openapi(
    project_root: &Path,
    target_method: &str,
    alternate_names: &[String],
) -> Option<RequestCandidate> {
    let (_, doc) = openapi::load_first_openapi_document(project_root)?;
    let (http_method_str, path, _operation) =
        openapi::find_operation_by_id(&doc, target_method, alternate_names)?;
    let http_method = match http_method_str {
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "PATCH" => HttpMethod::Patch,
        "DELETE" => HttpMethod::Delete,
        _ => HttpMethod::Get,
    };
    let body_template = if matches!(http_method, HttpMethod::Get | HttpMethod::Delete) {
        None
    } else {
        Some("{\"example\":true}".to_string())
    };
    Some(RequestCandidate {
        method: http_method,
        path: path.clone(),
        query_template: Vec::new(),
        full_url_hint: path,
        body_template,
        rationale: vec![format!(
            "resolved from OpenAPI operationId matching '{target_method}'"
        )],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_source(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::File::create(path).unwrap().write_all(contents.as_bytes()).unwrap();
    }

    #[test]
    fn direct_invocation_query_param_candidate() {
        let dir = tempdir().unwrap();
        write_source(
            dir.path(),
            "CatalogController.java",
            r#"package com.example;

@RequestMapping("/catalog")
public class CatalogController {
    @GetMapping("/items")
    public List<Item> list(@RequestParam("keyword") String keyword) {
        return specs.finalPriceLte(keyword);
    }
}
"#,
        );
        let index = SourceIndex::build(dir.path());
        let candidate =
            infer_request_candidate(dir.path(), &index, "CatalogSpecs", "finalPriceLte").unwrap();
        assert_eq!(candidate.method, HttpMethod::Get);
        assert_eq!(candidate.full_url_hint, "/catalog/items?keyword=value");
    }

    #[test]
    fn no_controller_in_tree_yields_no_candidate() {
        let dir = tempdir().unwrap();
        write_source(dir.path(), "Plain.java", "class Plain { void m() {} }");
        let index = SourceIndex::build(dir.path());
        let candidate = infer_request_candidate(dir.path(), &index, "C", "m");
        assert!(candidate.is_none());
    }

    #[test]
    fn branch_precondition_hint_detected() {
        let method_context = "if (minPrice != null) {\n} else if (maxPrice != null) {\n}";
        assert!(branch_precondition_hint(method_context).is_some());
    }

    #[test]
    fn min_price_omitted_when_max_price_also_present() {
        let params = vec![
            ControllerParam {
                kind: ParamKind::Query,
                request_name: "minPrice".to_string(),
                example_value: "1000".to_string(),
            },
            ControllerParam {
                kind: ParamKind::Query,
                request_name: "maxPrice".to_string(),
                example_value: "1000".to_string(),
            },
        ];
        let (_, query, _) = materialize_request("/catalog", "/items", &params);
        assert!(!query.iter().any(|(k, _)| k == "minPrice"));
        assert!(query.iter().any(|(k, _)| k == "maxPrice"));
    }

    #[test]
    fn caller_chain_name_resolves_a_cross_module_openapi_operation() {
        let dir = tempdir().unwrap();
        write_source(
            dir.path(),
            "core/SettingsService.java",
            r#"package com.example.core;

class SettingsService {
    void putSettingsJson(String json) {
        store(json);
    }
}
"#,
        );
        write_source(
            dir.path(),
            "core/AccountFacade.java",
            r#"package com.example.core;

class AccountFacade {
    void updateAccountSettings(String json) {
        settingsService.putSettingsJson(json);
    }
}
"#,
        );
        write_source(
            dir.path(),
            "openapi.yaml",
            "openapi: 3.0.0\ninfo:\n  title: t\n  version: '1'\npaths:\n  /accounts/settings:\n    patch:\n      operationId: updateAccountSettings\n      responses:\n        '200':\n          description: ok\n",
        );

        let index = SourceIndex::build(dir.path());
        let candidate =
            infer_request_candidate(dir.path(), &index, "SettingsService", "putSettingsJson")
                .expect("caller-chain name should resolve through the OpenAPI fallback");
        assert_eq!(candidate.method, HttpMethod::Patch);
        assert_eq!(candidate.path, "/accounts/settings");
    }

    #[test]
    fn path_variable_substitution() {
        let params = vec![ControllerParam {
            kind: ParamKind::Path,
            request_name: "userId".to_string(),
            example_value: "1".to_string(),
        }];
        let (path, _, _) = materialize_request("/user-accounts", "/{userId}/settings", &params);
        assert_eq!(path, "/user-accounts/1/settings");
    }
}
