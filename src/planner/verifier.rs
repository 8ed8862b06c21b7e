//! Wait-for-inline-hit verifier (SPEC_FULL.md §4.10).
//!
//! Enforces the central correctness property: a hit counts only if it is
//! both fresh (count increased) and inline (its timestamp is no older
//! than this reproduction attempt's reset). A fixed-interval poll loop,
//! deliberately distinct from `resilience::execute_with_retry` — it is
//! waiting for a state change, not retrying a failed call.

use std::time::Duration;

/// `true` iff `key` matches the strict line-key shape `…#…:<digits>`.
#[must_use]
pub fn is_line_key(key: &str) -> bool {
    let Some((head, line)) = key.rsplit_once(':') else {
        return false;
    };
    head.contains('#') && !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub count: u64,
    pub last_hit_epoch_ms: i64,
}

#[derive(Debug, Clone)]
pub struct StaleCandidate {
    pub observed_count: u64,
    pub observed_epoch_ms: i64,
}

#[derive(Debug, Clone)]
pub enum WaitResult {
    Hit {
        snapshot: StatusSnapshot,
    },
    Timeout {
        stale_candidate: Option<StaleCandidate>,
    },
    LineKeyRequired,
}

/// Fetches the current status snapshot for `key`. Implemented by the
/// caller's HTTP client against the control plane.
pub trait StatusSource {
    fn fetch_status(&self, key: &str) -> Result<StatusSnapshot, crate::error::Error>;
}

/// Per-key last successful reset epoch, as recorded by
/// `probe::control_plane::ResetLedger`, consulted here so the verifier
/// can recognize a hit as belonging to the current reproduction window.
pub trait ResetEpochSource {
    fn last_reset_epoch_ms(&self, key: &str) -> Option<i64>;
}

pub struct VerifierConfig {
    pub poll_interval: Duration,
    pub timeout: Duration,
    pub max_retries: u32,
}

/// Waits for an inline hit on `key`, per the algorithm in §4.10. Strict
/// line mode refuses method-only keys outright, performing no polling.
///
/// `now_ms` and `sleep` are injected so this stays testable without real
/// wall-clock waits; production callers pass
/// `probe::hit_table::now_epoch_ms` and `std::thread::sleep` (or a tokio
/// sleep in async contexts).
pub fn wait_for_inline_hit(
    key: &str,
    status_source: &impl StatusSource,
    reset_epochs: &impl ResetEpochSource,
    config: &VerifierConfig,
    now_ms: impl Fn() -> i64,
    sleep: impl Fn(Duration),
) -> Result<WaitResult, crate::error::Error> {
    if !is_line_key(key) {
        return Ok(WaitResult::LineKeyRequired);
    }

    let mut last_stale_candidate = None;

    for _attempt in 0..config.max_retries.max(1) {
        let wait_start = now_ms();
        let inline_start = reset_epochs.last_reset_epoch_ms(key).unwrap_or(wait_start);

        let baseline = status_source.fetch_status(key)?;
        if baseline.count > 0 && baseline.last_hit_epoch_ms >= inline_start {
            return Ok(WaitResult::Hit { snapshot: baseline });
        }

        let deadline = now_ms() + i64::try_from(config.timeout.as_millis()).unwrap_or(i64::MAX);

        loop {
            sleep(config.poll_interval);
            let current = status_source.fetch_status(key)?;
            let delta = current.count.saturating_sub(baseline.count);

            if delta > 0 && current.last_hit_epoch_ms >= inline_start {
                return Ok(WaitResult::Hit { snapshot: current });
            }
            if delta > 0 {
                last_stale_candidate = Some(StaleCandidate {
                    observed_count: current.count,
                    observed_epoch_ms: current.last_hit_epoch_ms,
                });
            }
            if now_ms() >= deadline {
                break;
            }
        }
    }

    Ok(WaitResult::Timeout {
        stale_candidate: last_stale_candidate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::HashMap;

    struct FakeStatus {
        sequence: RefCell<Vec<StatusSnapshot>>,
    }

    impl StatusSource for FakeStatus {
        fn fetch_status(&self, _key: &str) -> Result<StatusSnapshot, crate::error::Error> {
            let mut seq = self.sequence.borrow_mut();
            if seq.len() > 1 {
                Ok(seq.remove(0))
            } else {
                Ok(seq[0])
            }
        }
    }

    struct FakeResetEpochs {
        epochs: HashMap<String, i64>,
    }

    impl ResetEpochSource for FakeResetEpochs {
        fn last_reset_epoch_ms(&self, key: &str) -> Option<i64> {
            self.epochs.get(key).copied()
        }
    }

    fn config() -> VerifierConfig {
        VerifierConfig {
            poll_interval: Duration::from_millis(1),
            timeout: Duration::from_millis(5),
            max_retries: 1,
        }
    }

    #[test]
    fn method_only_key_short_circuits_without_polling() {
        let status = FakeStatus {
            sequence: RefCell::new(vec![StatusSnapshot { count: 0, last_hit_epoch_ms: 0 }]),
        };
        let epochs = FakeResetEpochs { epochs: HashMap::new() };
        let result = wait_for_inline_hit(
            "c.C#m",
            &status,
            &epochs,
            &config(),
            || 1_000,
            |_| {},
        )
        .unwrap();
        assert!(matches!(result, WaitResult::LineKeyRequired));
    }

    #[test]
    fn inline_hit_already_present_returns_success_immediately() {
        let status = FakeStatus {
            sequence: RefCell::new(vec![StatusSnapshot { count: 1, last_hit_epoch_ms: 2_000 }]),
        };
        let mut epochs = HashMap::new();
        epochs.insert("c.C#m:10".to_string(), 1_000);
        let epochs = FakeResetEpochs { epochs };
        let result = wait_for_inline_hit(
            "c.C#m:10",
            &status,
            &epochs,
            &config(),
            || 1_500,
            |_| {},
        )
        .unwrap();
        assert!(matches!(result, WaitResult::Hit { .. }));
    }

    #[test]
    fn stale_hit_before_reset_is_not_declared_success() {
        let status = FakeStatus {
            sequence: RefCell::new(vec![StatusSnapshot { count: 1, last_hit_epoch_ms: 500 }]),
        };
        let mut epochs = HashMap::new();
        epochs.insert("c.C#m:10".to_string(), 1_000);
        let epochs = FakeResetEpochs { epochs };
        let clock = std::cell::Cell::new(1_100i64);
        let now = || {
            let v = clock.get();
            clock.set(v + 10);
            v
        };
        let result = wait_for_inline_hit("c.C#m:10", &status, &epochs, &config(), now, |_| {}).unwrap();
        match result {
            WaitResult::Timeout { stale_candidate } => assert!(stale_candidate.is_none()),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn delta_with_fresh_timestamp_during_poll_succeeds() {
        let status = FakeStatus {
            sequence: RefCell::new(vec![
                StatusSnapshot { count: 0, last_hit_epoch_ms: 0 },
                StatusSnapshot { count: 1, last_hit_epoch_ms: 2_000 },
            ]),
        };
        let epochs = FakeResetEpochs { epochs: HashMap::new() };
        let result = wait_for_inline_hit(
            "c.C#m:10",
            &status,
            &epochs,
            &config(),
            || 1_000,
            |_| {},
        )
        .unwrap();
        assert!(matches!(result, WaitResult::Hit { .. }));
    }

    #[test]
    fn is_line_key_requires_class_hash_method_colon_digits() {
        assert!(is_line_key("c.C#m:10"));
        assert!(!is_line_key("c.C#m"));
        assert!(!is_line_key("c.C#m:"));
        assert!(!is_line_key("c.C#m:abc"));
    }
}
