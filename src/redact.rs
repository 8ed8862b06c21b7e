//! Secret redaction for anything that might land in recipe text or logs.
//!
//! Grounded on `aperture::logging`'s redaction helpers, adapted to this
//! system's own rule (SPEC_FULL.md §7): short secrets disappear entirely,
//! longer ones keep enough of a fingerprint to be recognizable without being
//! reusable.

use crate::constants::MIN_SECRET_LEN_FOR_FULL_REDACTION;

/// Redacts a single secret value per §7: `len <= 8 -> "***"`, otherwise
/// `first4…last2`.
#[must_use]
pub fn redact_secret_value(value: &str) -> String {
    if value.is_empty() {
        return String::new();
    }
    if value.len() <= MIN_SECRET_LEN_FOR_FULL_REDACTION {
        return "***".to_string();
    }
    let chars: Vec<char> = value.chars().collect();
    let first: String = chars.iter().take(4).collect();
    let last: String = chars.iter().rev().take(2).collect::<Vec<_>>().into_iter().rev().collect();
    format!("{first}\u{2026}{last}")
}

/// Redacts the value half of an `Authorization`/`Cookie`-style header for
/// display, leaving the scheme prefix (`Bearer `, `Basic `) intact when
/// present so the rendered recipe still reads naturally.
#[must_use]
pub fn redact_header_value(value: &str) -> String {
    for prefix in ["Bearer ", "Basic "] {
        if let Some(rest) = value.strip_prefix(prefix) {
            return format!("{prefix}{}", redact_secret_value(rest));
        }
    }
    redact_secret_value(value)
}
