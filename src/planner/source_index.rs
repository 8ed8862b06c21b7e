//! Heuristic source index over a project tree (SPEC_FULL.md §4.5).
//!
//! Not a parser: a breadth-first walk plus a single per-line regex that
//! recognizes method declarations well enough to have good recall on
//! conventionally formatted Java/Kotlin sources, at the cost of tolerable
//! false positives. Callers (target inference, request-candidate search)
//! are expected to score and guardrail rather than trust every match.

use crate::constants::{SKIPPED_DIR_NAMES, SOURCE_EXTENSIONS};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodRecord {
    pub name: String,
    pub start_line: usize,
    pub raw_signature: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub package: Option<String>,
    pub primary_type: Option<String>,
    pub methods: Vec<MethodRecord>,
    pub text: String,
}

#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    pub files: Vec<SourceFile>,
}

impl SourceIndex {
    /// Builds an index by walking `root` breadth-first, skipping
    /// version-control and build-output directories, reading every file
    /// with a recognized source extension. Per-file read failures are
    /// skipped rather than propagated.
    #[must_use]
    pub fn build(root: &Path) -> Self {
        let mut files = Vec::new();
        let walker = WalkDir::new(root)
            .contents_first(false)
            .into_iter()
            .filter_entry(|entry| !is_skipped_dir(entry.path()));

        for entry in walker.filter_map(Result::ok) {
            if !entry.file_type().is_file() {
                continue;
            }
            if !has_source_extension(entry.path()) {
                continue;
            }
            let Ok(text) = std::fs::read_to_string(entry.path()) else {
                continue;
            };
            files.push(index_file(entry.path().to_path_buf(), text));
        }

        Self { files }
    }

    pub fn iter_methods(&self) -> impl Iterator<Item = (&SourceFile, &MethodRecord)> {
        self.files
            .iter()
            .flat_map(|file| file.methods.iter().map(move |m| (file, m)))
    }
}

fn is_skipped_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| SKIPPED_DIR_NAMES.contains(&name))
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

static PACKAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*package\s+([\w.]+)\s*;?").unwrap());
static PRIMARY_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:class|interface|enum|record)\s+(\w+)").unwrap()
});
static METHOD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*(?:(?:public|private|protected|static|final|abstract|synchronized|default)\s+)*[\w<>\[\],.? ]+\s+(\w+)\s*\([^;]*\)\s*(?:throws\s+[\w.,\s]+)?\s*\{?\s*$",
    )
    .unwrap()
});
static CONTROL_KEYWORD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?:(?:}\s*)?else\s+)?(if|for|while|switch|catch)\s*\(").unwrap()
});

fn index_file(path: PathBuf, text: String) -> SourceFile {
    let package = text.lines().find_map(|line| {
        PACKAGE_RE
            .captures(line)
            .map(|c| c[1].to_string())
    });

    let primary_type = text.lines().find_map(|line| {
        PRIMARY_TYPE_RE.captures(line).map(|c| c[1].to_string())
    });

    let mut methods = Vec::new();
    for (idx, line) in text.lines().enumerate() {
        if CONTROL_KEYWORD_RE.is_match(line) {
            continue;
        }
        if let Some(captures) = METHOD_RE.captures(line) {
            let ends_plausibly = line.trim_end().ends_with('{')
                || line.trim_end().ends_with("throws")
                || line.contains("throws ");
            if !ends_plausibly {
                continue;
            }
            methods.push(MethodRecord {
                name: captures[1].to_string(),
                start_line: idx + 1,
                raw_signature: line.trim().to_string(),
            });
        }
    }

    SourceFile {
        path,
        package,
        primary_type,
        methods,
        text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, relative: &str, contents: &str) -> PathBuf {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn extracts_package_type_and_methods() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "src/com/example/Service.java",
            "package com.example;\n\npublic class Service {\n    public int doWork(String x) {\n        if (x != null) {\n            return 1;\n        }\n        return 0;\n    }\n}\n",
        );
        let index = SourceIndex::build(dir.path());
        assert_eq!(index.files.len(), 1);
        let file = &index.files[0];
        assert_eq!(file.package.as_deref(), Some("com.example"));
        assert_eq!(file.primary_type.as_deref(), Some("Service"));
        assert!(file.methods.iter().any(|m| m.name == "doWork"));
        assert!(!file.methods.iter().any(|m| m.name == "if"));
    }

    #[test]
    fn skips_build_output_directories() {
        let dir = tempdir().unwrap();
        write_file(dir.path(), "target/Generated.java", "package gen;\nclass Generated {}\n");
        write_file(dir.path(), "src/Real.java", "package real;\nclass Real {}\n");
        let index = SourceIndex::build(dir.path());
        assert_eq!(index.files.len(), 1);
        assert_eq!(index.files[0].package.as_deref(), Some("real"));
    }

    #[test]
    fn control_keyword_lines_are_not_mistaken_for_methods() {
        let dir = tempdir().unwrap();
        write_file(
            dir.path(),
            "src/C.java",
            "class C {\n    void m() {\n        for (int i = 0; i < 10; i++) {\n        }\n    }\n}\n",
        );
        let index = SourceIndex::build(dir.path());
        let methods: Vec<_> = index.iter_methods().map(|(_, m)| m.name.clone()).collect();
        assert_eq!(methods, vec!["m".to_string()]);
    }
}
