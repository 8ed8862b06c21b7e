//! Centralized string/numeric constants.
//!
//! Collecting these here (rather than inlining) keeps the control-plane wire
//! format and the planner's regex vocabulary consistent across modules.

// Control-plane HTTP paths
pub const PATH_STATUS: &str = "/__probe/status";
pub const PATH_RESET: &str = "/__probe/reset";
pub const PATH_ACTUATE: &str = "/__probe/actuate";

// JSON field names shared by the control plane wire protocol
pub const FIELD_KEY: &str = "key";
pub const FIELD_MODE: &str = "mode";
pub const FIELD_ACTUATOR_ID: &str = "actuatorId";
pub const FIELD_TARGET_KEY: &str = "targetKey";
pub const FIELD_RETURN_BOOLEAN: &str = "returnBoolean";

// Default control-plane bind address
pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 9191;

// Default verifier tuning
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 150;
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

// Recipe/actuator identifiers
pub const ACTUATOR_ID_RECIPE_FALLBACK: &str = "recipe_generate_fallback";

// Environment variables
pub const ENV_PROBE_LOG: &str = "PROBE_LOG";
pub const ENV_PROBE_LOG_FORMAT: &str = "PROBE_LOG_FORMAT";
pub const ENV_PROBE_BASE_URL: &str = "PROBE_BASE_URL";

// Secret redaction
pub const MIN_SECRET_LEN_FOR_FULL_REDACTION: usize = 8;

// Directories skipped during the source-index walk
pub const SKIPPED_DIR_NAMES: &[&str] = &[
    ".git", ".hg", ".svn", "target", "build", "out", "dist", "node_modules", ".idea", ".gradle",
];

// File extensions considered "source" by the index
pub const SOURCE_EXTENSIONS: &[&str] = &["java", "kt"];
