//! Target inference: scores indexed methods against caller-supplied hints
//! and returns a probe key (SPEC_FULL.md §4.6).

use crate::planner::source_index::SourceIndex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InferredTarget {
    pub file: std::path::PathBuf,
    pub class: String,
    pub method: String,
    pub line: Option<usize>,
    pub signature: String,
    pub returns_boolean: bool,
    pub key: String,
    pub confidence: u32,
    pub reasons: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TargetHints {
    pub class_hint: Option<String>,
    pub method_hint: Option<String>,
    pub line_hint: Option<usize>,
}

/// Scores every indexed method against `hints` and returns candidates
/// ordered by descending confidence (ties broken by ascending line
/// number). Returns an empty list when the guardrail fires: a textual
/// hint was supplied but matched nothing.
#[must_use]
pub fn infer_targets(index: &SourceIndex, hints: &TargetHints) -> Vec<InferredTarget> {
    let mut any_textual_match = false;

    let mut scored = Vec::new();
    for (file, method) in index.iter_methods() {
        let class_name = file.primary_type.clone().unwrap_or_default();
        let mut score: i64 = 0;
        let mut reasons = Vec::new();

        if let Some(class_hint) = &hints.class_hint {
            if class_name.eq_ignore_ascii_case(class_hint) {
                score += 45;
                reasons.push(format!("class name exactly matches hint '{class_hint}'"));
                any_textual_match = true;
            } else if class_name_substring_match(&class_name, file, class_hint) {
                score += 25;
                reasons.push(format!("class name or filename contains hint '{class_hint}'"));
                any_textual_match = true;
            }
        }

        if let Some(method_hint) = &hints.method_hint {
            if method.name.eq_ignore_ascii_case(method_hint) {
                score += 40;
                reasons.push(format!("method name exactly matches hint '{method_hint}'"));
                any_textual_match = true;
            } else if method.name.to_lowercase().contains(&method_hint.to_lowercase()) {
                score += 22;
                reasons.push(format!("method name contains hint '{method_hint}'"));
                any_textual_match = true;
            }
        }

        if let Some(line_hint) = hints.line_hint {
            let distance = line_hint.abs_diff(method.start_line);
            let line_score = match distance {
                0 => 25,
                d if d <= 3 => 16,
                d if d <= 12 => 8,
                _ => 0,
            };
            if line_score > 0 {
                score += line_score;
                reasons.push(format!("method starts {distance} lines from hint"));
            }
        }

        if score <= 0 {
            continue;
        }

        let confidence = u32::try_from(score.min(100)).unwrap_or(100);
        let key = if class_name.is_empty() {
            method.name.clone()
        } else if let Some(line) = hints.line_hint.filter(|_| distance_is_exact(method, hints)) {
            format!(
                "{}{}#{}:{}",
                package_prefix(file),
                class_name,
                method.name,
                line
            )
        } else {
            format!("{}{}#{}", package_prefix(file), class_name, method.name)
        };

        scored.push(InferredTarget {
            file: file.path.clone(),
            class: format!("{}{}", package_prefix(file), class_name),
            method: method.name.clone(),
            line: Some(method.start_line),
            signature: method.raw_signature.clone(),
            returns_boolean: returns_boolean(&method.raw_signature),
            key,
            confidence,
            reasons,
        });
    }

    let any_textual_hint_given = hints.class_hint.is_some() || hints.method_hint.is_some();
    if any_textual_hint_given && !any_textual_match {
        return Vec::new();
    }

    scored.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.line.unwrap_or(0).cmp(&b.line.unwrap_or(0)))
    });
    scored
}

fn distance_is_exact(method: &crate::planner::source_index::MethodRecord, hints: &TargetHints) -> bool {
    hints.line_hint == Some(method.start_line)
}

fn package_prefix(file: &crate::planner::source_index::SourceFile) -> String {
    file.package
        .as_ref()
        .map_or_else(String::new, |p| format!("{p}."))
}

fn class_name_substring_match(
    class_name: &str,
    file: &crate::planner::source_index::SourceFile,
    hint: &str,
) -> bool {
    let hint_lower = hint.to_lowercase();
    let filename_base = file
        .path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_lowercase();
    class_name.to_lowercase().contains(&hint_lower) || filename_base.contains(&hint_lower)
}

fn returns_boolean(signature: &str) -> bool {
    signature
        .split_whitespace()
        .take_while(|w| !w.contains('('))
        .any(|w| w == "boolean")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::planner::source_index::{MethodRecord, SourceFile};
    use std::path::PathBuf;

    fn index_with(files: Vec<SourceFile>) -> SourceIndex {
        SourceIndex { files }
    }

    fn file(path: &str, package: &str, primary_type: &str, methods: Vec<MethodRecord>) -> SourceFile {
        SourceFile {
            path: PathBuf::from(path),
            package: Some(package.to_string()),
            primary_type: Some(primary_type.to_string()),
            methods,
            text: String::new(),
        }
    }

    fn method(name: &str, line: usize, sig: &str) -> MethodRecord {
        MethodRecord {
            name: name.to_string(),
            start_line: line,
            raw_signature: sig.to_string(),
        }
    }

    #[test]
    fn exact_class_and_method_hint_scores_highest() {
        let index = index_with(vec![file(
            "CatalogSpecs.java",
            "com.example",
            "CatalogSpecs",
            vec![method("finalPriceLte", 10, "public boolean finalPriceLte(String k) {")],
        )]);
        let hints = TargetHints {
            class_hint: Some("CatalogSpecs".to_string()),
            method_hint: Some("finalPriceLte".to_string()),
            line_hint: None,
        };
        let results = infer_targets(&index, &hints);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].confidence, 85);
        assert!(results[0].returns_boolean);
        assert_eq!(results[0].key, "com.example.CatalogSpecs#finalPriceLte");
    }

    #[test]
    fn guardrail_suppresses_line_only_matches_across_unrelated_classes() {
        let index = index_with(vec![file(
            "UnrelatedRepository.java",
            "com.other",
            "UnrelatedRepository",
            vec![method("notTheMethod", 41, "public void notTheMethod() {")],
        )]);
        let hints = TargetHints {
            class_hint: Some("DynamoDbAccountSettingsRepository".to_string()),
            method_hint: Some("putSettingsJson".to_string()),
            line_hint: Some(41),
        };
        let results = infer_targets(&index, &hints);
        assert!(results.is_empty());
    }

    #[test]
    fn confidence_saturates_at_100() {
        let index = index_with(vec![file(
            "C.java",
            "c",
            "C",
            vec![method("m", 10, "public void m() {")],
        )]);
        let hints = TargetHints {
            class_hint: Some("C".to_string()),
            method_hint: Some("m".to_string()),
            line_hint: Some(10),
        };
        let results = infer_targets(&index, &hints);
        assert_eq!(results[0].confidence, 100);
    }

    #[test]
    fn line_hint_alone_with_no_textual_hints_is_not_guardrailed() {
        let index = index_with(vec![file(
            "C.java",
            "c",
            "C",
            vec![method("m", 10, "public void m() {")],
        )]);
        let hints = TargetHints {
            class_hint: None,
            method_hint: None,
            line_hint: Some(10),
        };
        let results = infer_targets(&index, &hints);
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn ties_broken_by_smaller_line_number() {
        let index = index_with(vec![file(
            "C.java",
            "c",
            "C",
            vec![method("doWork", 5, "public void doWork() {"), method("doWork", 50, "public void doWork() {")],
        )]);
        let hints = TargetHints {
            class_hint: Some("C".to_string()),
            method_hint: Some("doWork".to_string()),
            line_hint: None,
        };
        let results = infer_targets(&index, &hints);
        assert_eq!(results[0].line, Some(5));
    }
}
