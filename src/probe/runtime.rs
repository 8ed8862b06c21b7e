//! Process-wide probe runtime: the global mutable configuration the
//! instrumented bytecode's advice code consults, plus the hit table it
//! writes into.
//!
//! The configuration is deliberately global (SPEC_FULL.md §9): advice code
//! runs on the application's own threads and has no path back to
//! dependency-injected state. It is published behind an `ArcSwap` so every
//! read after a `configure()` call observes either the old snapshot in full
//! or the new one in full — never a half-applied mix of fields.

use crate::probe::hit_table::HitTable;
use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProbeMode {
    Observe,
    Actuate,
}

impl Default for ProbeMode {
    fn default() -> Self {
        Self::Observe
    }
}

/// The four fields the control plane's `actuate` endpoint updates together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub mode: ProbeMode,
    pub actuator_id: String,
    pub actuate_target_key: String,
    pub actuate_return_boolean: bool,
}

impl RuntimeConfig {
    /// Normalizes this config the way `configure()` requires: leaving
    /// `Observe` mode always clears the actuation-only fields, even if the
    /// caller tried to set them.
    #[must_use]
    fn normalized(self) -> Self {
        if self.mode == ProbeMode::Observe {
            Self {
                mode: ProbeMode::Observe,
                actuator_id: String::new(),
                actuate_target_key: String::new(),
                actuate_return_boolean: false,
            }
        } else {
            self
        }
    }
}

/// -1 (use original condition), 1 (force taken), 0 (force fallthrough).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i8)]
pub enum BranchDecision {
    UseOriginal = -1,
    ForceTaken = 1,
    ForceFallthrough = 0,
}

impl BranchDecision {
    #[must_use]
    pub const fn as_i8(self) -> i8 {
        self as i8
    }
}

/// The probe runtime: global config plus the hit table bytecode advice
/// writes into. One instance lives for the process lifetime.
pub struct ProbeRuntime {
    config: ArcSwap<RuntimeConfig>,
    hits: HitTable,
}

impl Default for ProbeRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeRuntime {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ArcSwap::from_pointee(RuntimeConfig::default()),
            hits: HitTable::new(),
        }
    }

    #[must_use]
    pub const fn hits(&self) -> &HitTable {
        &self.hits
    }

    #[must_use]
    pub fn config(&self) -> Arc<RuntimeConfig> {
        self.config.load_full()
    }

    /// Atomically replaces all four config fields. Transitioning out of
    /// `actuate` clears the actuator id, target key, and forced boolean.
    pub fn configure(&self, config: RuntimeConfig) {
        self.config.store(Arc::new(config.normalized()));
    }

    /// `true` iff in `actuate` mode and `target == class#method`.
    #[must_use]
    pub fn should_actuate_boolean_return(&self, class: &str, method: &str) -> bool {
        let config = self.config.load();
        if config.mode != ProbeMode::Actuate {
            return false;
        }
        config.actuate_target_key == format!("{class}#{method}")
    }

    /// Returns the branch decision for a conditional jump at
    /// `class#method:line`. Returns `UseOriginal` unless actuating with a
    /// non-empty target matching that exact line key.
    #[must_use]
    pub fn branch_decision_by_class_method_line(
        &self,
        class: &str,
        method: &str,
        line: i64,
    ) -> BranchDecision {
        let config = self.config.load();
        if config.mode != ProbeMode::Actuate || config.actuate_target_key.is_empty() {
            return BranchDecision::UseOriginal;
        }
        if config.actuate_target_key != format!("{class}#{method}:{line}") {
            return BranchDecision::UseOriginal;
        }
        if config.actuate_return_boolean {
            BranchDecision::ForceTaken
        } else {
            BranchDecision::ForceFallthrough
        }
    }
}
