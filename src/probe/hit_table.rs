//! Concurrent probe-key -> hit-record map.
//!
//! The advice code instrumented into application bytecode calls into this
//! table on the application's own threads (SPEC_FULL.md §5), so reads must
//! stay lock-free and writes allocation-light on the hot path. `DashMap`
//! gives get-or-create semantics with per-shard locking instead of a single
//! global lock, and each record's two fields are plain atomics so a read
//! never blocks a concurrent writer.

use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// *(count, last-hit-epoch-ms)* for one probe key.
///
/// Invariant (SPEC_FULL.md §3): `count == 0 <=> last_hit_epoch_ms == 0` only
/// holds for entries that have never been written; after any hit,
/// `last_hit_epoch_ms > 0`.
#[derive(Debug, Default)]
struct HitRecord {
    count: AtomicU64,
    last_hit_epoch_ms: AtomicI64,
}

/// A snapshot of a [`HitRecord`] taken at a single point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HitSnapshot {
    pub count: u64,
    pub last_hit_epoch_ms: i64,
}

#[must_use]
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

/// Concurrent mapping from probe key to hit record.
///
/// Method-level keys (`Class#method`) and line-level keys
/// (`Class#method:line`) share this map but never collide as strings, so
/// they are distinct namespaces without any extra bookkeeping.
#[derive(Debug, Default)]
pub struct HitTable {
    records: DashMap<String, HitRecord>,
}

impl HitTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&self, key: &str) {
        let now = now_epoch_ms();
        let entry = self.records.entry(key.to_string()).or_default();
        entry.count.fetch_add(1, Ordering::AcqRel);
        entry.last_hit_epoch_ms.store(now, Ordering::Release);
    }

    /// Increments the method-level key `class#method`.
    pub fn hit_by_class_method(&self, class: &str, method: &str) {
        self.bump(&format!("{class}#{method}"));
    }

    /// Increments the line-level key `class#method:line`. A no-op when
    /// `line <= 0`.
    pub fn hit_line_by_class_method(&self, class: &str, method: &str, line: i64) {
        if line <= 0 {
            return;
        }
        self.bump(&format!("{class}#{method}:{line}"));
    }

    #[must_use]
    pub fn get_count(&self, key: &str) -> u64 {
        self.records
            .get(key)
            .map_or(0, |r| r.count.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn get_last_hit_epoch_ms(&self, key: &str) -> i64 {
        self.records
            .get(key)
            .map_or(0, |r| r.last_hit_epoch_ms.load(Ordering::Acquire))
    }

    #[must_use]
    pub fn snapshot(&self, key: &str) -> HitSnapshot {
        HitSnapshot {
            count: self.get_count(key),
            last_hit_epoch_ms: self.get_last_hit_epoch_ms(key),
        }
    }

    /// Resets `key` to `(0, 0)`, creating the entry if absent so subsequent
    /// reads are authoritative rather than defaulting by absence.
    pub fn reset(&self, key: &str) {
        let entry = self.records.entry(key.to_string()).or_default();
        entry.count.store(0, Ordering::Release);
        entry.last_hit_epoch_ms.store(0, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_reads_as_zero() {
        let table = HitTable::new();
        assert_eq!(table.get_count("c.C#m"), 0);
        assert_eq!(table.get_last_hit_epoch_ms("c.C#m"), 0);
    }

    #[test]
    fn hit_increments_count_and_sets_timestamp() {
        let table = HitTable::new();
        table.hit_by_class_method("c.C", "m");
        assert_eq!(table.get_count("c.C#m"), 1);
        assert!(table.get_last_hit_epoch_ms("c.C#m") > 0);
    }

    #[test]
    fn line_hit_is_separate_namespace_from_method_hit() {
        let table = HitTable::new();
        table.hit_by_class_method("c.C", "m");
        table.hit_line_by_class_method("c.C", "m", 10);
        assert_eq!(table.get_count("c.C#m"), 1);
        assert_eq!(table.get_count("c.C#m:10"), 1);
    }

    #[test]
    fn non_positive_line_is_ignored() {
        let table = HitTable::new();
        table.hit_line_by_class_method("c.C", "m", 0);
        table.hit_line_by_class_method("c.C", "m", -5);
        assert_eq!(table.get_count("c.C#m:0"), 0);
        assert_eq!(table.get_count("c.C#m:-5"), 0);
    }

    #[test]
    fn reset_zeroes_count_and_timestamp() {
        let table = HitTable::new();
        table.hit_by_class_method("c.C", "m");
        table.reset("c.C#m");
        assert_eq!(table.snapshot("c.C#m"), HitSnapshot { count: 0, last_hit_epoch_ms: 0 });
    }

    #[test]
    fn reset_is_idempotent_and_creates_absent_entries() {
        let table = HitTable::new();
        table.reset("never.Hit#m");
        table.reset("never.Hit#m");
        assert_eq!(table.get_count("never.Hit#m"), 0);
    }

    #[test]
    fn count_is_monotonic_under_concurrent_writers() {
        use std::sync::Arc;
        let table = Arc::new(HitTable::new());
        std::thread::scope(|scope| {
            for _ in 0..8 {
                let table = Arc::clone(&table);
                scope.spawn(move || {
                    for _ in 0..100 {
                        table.hit_by_class_method("c.C", "m");
                    }
                });
            }
        });
        assert_eq!(table.get_count("c.C#m"), 800);
    }
}
