//! Startup-argument parser for the in-process agent (SPEC_FULL.md §6.1).
//!
//! A single opaque `key=value;key=value` string, with three layered
//! override sources in ascending precedence: the argument string itself,
//! then environment variables, then an in-memory "system-property"-style
//! override table an embedder populates before [`install`] runs (standing
//! in for a JVM `-D` property, which has no equivalent outside the JVM).

use crate::constants::{DEFAULT_HOST, DEFAULT_PORT};
use crate::probe::runtime::ProbeMode;
use std::collections::HashMap;

/// Fully resolved startup configuration, after applying
/// `args < env < system-property` precedence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchArgs {
    pub host: String,
    pub port: u16,
    pub mode: ProbeMode,
    pub actuator_id: String,
    pub actuate_target: String,
    pub actuate_return_boolean: bool,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
}

impl Default for LaunchArgs {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            mode: ProbeMode::Observe,
            actuator_id: String::new(),
            actuate_target: String::new(),
            actuate_return_boolean: false,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// An in-memory override table standing in for JVM system properties. The
/// embedder populates this before [`install`] and it wins over both the
/// argument string and the environment.
#[derive(Debug, Clone, Default)]
pub struct SystemProperties {
    values: HashMap<String, String>,
}

impl SystemProperties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into().to_lowercase(), value.into());
    }

    #[must_use]
    fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&key.to_lowercase()).map(String::as_str)
    }
}

/// Parses the raw `key=value;key=value` string into a lowercase-keyed map,
/// ignoring blank segments and entries with no `=`.
fn parse_kv_string(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|segment| {
            let segment = segment.trim();
            if segment.is_empty() {
                return None;
            }
            let (key, value) = segment.split_once('=')?;
            Some((key.trim().to_lowercase(), value.trim().to_string()))
        })
        .collect()
}

fn resolve(
    key: &str,
    args: &HashMap<String, String>,
    env_key: &str,
    system_properties: &SystemProperties,
) -> Option<String> {
    if let Some(value) = system_properties.get(key) {
        return Some(value.to_string());
    }
    if let Ok(value) = std::env::var(env_key) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    args.get(key).cloned()
}

/// Parses startup arguments, applying `args < env < system-property`
/// precedence per key. Environment variable names are the upper-cased,
/// `PROBE_`-prefixed form of each key (e.g. `mode` -> `PROBE_MODE`).
#[must_use]
pub fn parse(raw: &str, system_properties: &SystemProperties) -> LaunchArgs {
    let args = parse_kv_string(raw);
    let defaults = LaunchArgs::default();

    let host = resolve("host", &args, "PROBE_HOST", system_properties).unwrap_or(defaults.host);
    let port = resolve("port", &args, "PROBE_PORT", system_properties)
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults.port);
    let mode_raw = resolve("mode", &args, "PROBE_MODE", system_properties)
        .or_else(|| resolve("probemode", &args, "PROBE_PROBEMODE", system_properties));
    let mode = mode_raw.map_or(defaults.mode, |m| {
        if m.eq_ignore_ascii_case("actuate") {
            ProbeMode::Actuate
        } else {
            ProbeMode::Observe
        }
    });
    let actuator_id =
        resolve("actuatorid", &args, "PROBE_ACTUATORID", system_properties).unwrap_or_default();
    let actuate_target =
        resolve("actuatetarget", &args, "PROBE_ACTUATETARGET", system_properties)
            .unwrap_or_default();
    let actuate_return_boolean = resolve(
        "actuatereturnboolean",
        &args,
        "PROBE_ACTUATERETURNBOOLEAN",
        system_properties,
    )
    .map(|v| v.eq_ignore_ascii_case("true"))
    .unwrap_or_default();
    let include = resolve("include", &args, "PROBE_INCLUDE", system_properties)
        .map(|v| split_csv(&v))
        .unwrap_or_default();
    let exclude = resolve("exclude", &args, "PROBE_EXCLUDE", system_properties)
        .map(|v| split_csv(&v))
        .unwrap_or_default();

    LaunchArgs {
        host,
        port,
        mode,
        actuator_id,
        actuate_target,
        actuate_return_boolean,
        include,
        exclude,
    }
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::ACTUATOR_ID_RECIPE_FALLBACK;

    #[test]
    fn defaults_apply_when_nothing_supplied() {
        let resolved = parse("", &SystemProperties::new());
        assert_eq!(resolved.host, DEFAULT_HOST);
        assert_eq!(resolved.port, DEFAULT_PORT);
        assert_eq!(resolved.mode, ProbeMode::Observe);
    }

    #[test]
    fn args_string_is_parsed_case_insensitively() {
        let resolved = parse("MODE=actuate;Host=0.0.0.0;port=9999", &SystemProperties::new());
        assert_eq!(resolved.mode, ProbeMode::Actuate);
        assert_eq!(resolved.host, "0.0.0.0");
        assert_eq!(resolved.port, 9999);
    }

    #[test]
    fn system_property_wins_over_args() {
        let mut props = SystemProperties::new();
        props.set("mode", "observe");
        let resolved = parse("mode=actuate", &props);
        assert_eq!(resolved.mode, ProbeMode::Observe);
    }

    #[test]
    fn include_and_exclude_are_split_on_comma() {
        let resolved = parse("include=a.b.**,c.d.**;exclude=a.b.internal.**", &SystemProperties::new());
        assert_eq!(resolved.include, vec!["a.b.**", "c.d.**"]);
        assert_eq!(resolved.exclude, vec!["a.b.internal.**"]);
    }

    #[test]
    fn malformed_segments_are_ignored() {
        let resolved = parse("host;;port=7000;=oops", &SystemProperties::new());
        assert_eq!(resolved.port, 7000);
        assert_eq!(resolved.host, DEFAULT_HOST);
    }

    #[test]
    fn actuator_id_default_matches_recipe_fallback_constant_when_set_explicitly() {
        let resolved = parse(
            &format!("actuatorId={ACTUATOR_ID_RECIPE_FALLBACK}"),
            &SystemProperties::new(),
        );
        assert_eq!(resolved.actuator_id, ACTUATOR_ID_RECIPE_FALLBACK);
    }
}
