//! Compiles include/exclude glob patterns and decides whether a loaded
//! class is eligible for instrumentation (SPEC_FULL.md §4.2).

use regex::Regex;

/// Prefixes that are always excluded, regardless of user configuration:
/// runtime internals, this crate's own instrumentation namespace, and the
/// handful of managed-runtime libraries that show up on every classpath.
const BUILT_IN_EXCLUDED_PREFIXES: &[&str] = &[
    "java.",
    "javax.",
    "jdk.",
    "sun.",
    "kotlin.",
    "probeplan.",
    "org.springframework.",
    "org.apache.",
];

/// A single compiled glob/prefix pattern.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    source: String,
    regex: Regex,
}

impl PatternMatcher {
    /// Compiles a pattern into a matcher. A wildcard-free pattern is treated
    /// as a package prefix (`.** appended`); `*` matches one dotted
    /// segment, `**` matches any substring including dots.
    #[must_use]
    pub fn compile(pattern: &str) -> Self {
        let normalized = if pattern.contains('*') {
            pattern.to_string()
        } else {
            format!("{pattern}.**")
        };
        Self {
            source: pattern.to_string(),
            regex: Regex::new(&format!("^{}$", to_regex_body(&normalized))).unwrap_or_else(|_| {
                Regex::new(&regex::escape(&normalized)).expect("escaped literal always compiles")
            }),
        }
    }

    #[must_use]
    pub fn matches(&self, class_name: &str) -> bool {
        self.regex.is_match(class_name)
    }

    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Translates a glob pattern into the body of an anchored regex: `**` ->
/// `.*` (any substring including dots), `*` -> `[^.]*` (one path segment),
/// everything else escaped literally.
fn to_regex_body(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        if chars[i] == '*' {
            if chars.get(i + 1) == Some(&'*') {
                out.push_str(".*");
                i += 2;
            } else {
                out.push_str("[^.]*");
                i += 1;
            }
        } else {
            out.push_str(&regex::escape(&chars[i].to_string()));
            i += 1;
        }
    }
    out
}

/// Ordered include/exclude matcher lists. Compiled once at agent start.
#[derive(Debug, Clone, Default)]
pub struct ClassFilter {
    includes: Vec<PatternMatcher>,
    excludes: Vec<PatternMatcher>,
}

impl ClassFilter {
    #[must_use]
    pub fn new(include_patterns: &[String], exclude_patterns: &[String]) -> Self {
        Self {
            includes: include_patterns.iter().map(|p| PatternMatcher::compile(p)).collect(),
            excludes: exclude_patterns.iter().map(|p| PatternMatcher::compile(p)).collect(),
        }
    }

    /// Decides eligibility purely from `(class_name, includes, excludes)`:
    /// reject empty names and built-in excluded prefixes, then require some
    /// include match and no exclude match.
    #[must_use]
    pub fn is_instrumentable(&self, class_name: &str) -> bool {
        if class_name.is_empty() {
            return false;
        }
        if BUILT_IN_EXCLUDED_PREFIXES
            .iter()
            .any(|prefix| class_name.starts_with(prefix))
        {
            return false;
        }
        let included = self.includes.iter().any(|m| m.matches(class_name));
        let excluded = self.excludes.iter().any(|m| m.matches(class_name));
        included && !excluded
    }
}

/// Infers the default include pattern from the process launch command, per
/// SPEC_FULL.md §4.2: a `.jar` entry is resolved via its manifest
/// (`Start-Class` preferred, then `Main-Class`); anything else is treated
/// as the fully-qualified launch class directly. Either way, the base
/// package (all but the last dotted segment) becomes `basePackage.**`.
#[must_use]
pub fn infer_default_include(launch_class: &str) -> Option<String> {
    let base_package = launch_class.rsplit_once('.').map(|(pkg, _)| pkg)?;
    if base_package.is_empty() {
        return None;
    }
    Some(format!("{base_package}.**"))
}

/// Reads `Start-Class` (preferred) or `Main-Class` out of a jar manifest's
/// raw text (`META-INF/MANIFEST.MF` contents).
#[must_use]
pub fn launch_class_from_manifest(manifest_text: &str) -> Option<String> {
    let mut main_class = None;
    for line in manifest_text.lines() {
        if let Some(value) = line.strip_prefix("Start-Class:") {
            return Some(value.trim().to_string());
        }
        if let Some(value) = line.strip_prefix("Main-Class:") {
            main_class = Some(value.trim().to_string());
        }
    }
    main_class
}

#[must_use]
pub fn default_exclude_pattern() -> String {
    "probeplan.**".to_string()
}
