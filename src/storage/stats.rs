//! Cumulative publish statistics
//!
//! Counters only ever go up, except on explicit reset. The snapshot is
//! persisted after every cycle with the same atomic write discipline as the
//! posted cache, but a failed stats flush is advisory: the engine logs it and
//! carries on, since losing a counter increment never risks a duplicate post.

use chrono::Utc;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::{FailureKind, StatsSnapshot};

/// Persistent counters over every cycle the engine has run
pub struct StatsTracker {
    snapshot: StatsSnapshot,
    path: PathBuf,
}

impl StatsTracker {
    /// Load the tracker from disk. A missing backing file starts from zero.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot: StatsSnapshot = super::load_json(&path)?.unwrap_or_default();
        Ok(Self { snapshot, path })
    }

    /// Count a cycle that ended in success or failure
    pub fn record_attempt(&mut self) {
        self.snapshot.attempted += 1;
    }

    /// Count a confirmed successful publish
    pub fn record_success(&mut self) {
        self.snapshot.succeeded += 1;
        self.snapshot.last_success_at = Some(Utc::now());
    }

    /// Count a failed cycle under the given kind
    pub fn record_failure(&mut self, kind: FailureKind) {
        self.snapshot.failed += 1;
        self.snapshot.last_failure_at = Some(Utc::now());
        *self
            .snapshot
            .failures_by_kind
            .entry(kind.as_str().to_string())
            .or_insert(0) += 1;
    }

    /// Count a cycle that found nothing eligible to publish
    pub fn record_no_candidates(&mut self) {
        self.snapshot.no_candidate_cycles += 1;
    }

    /// Current counters
    pub fn snapshot(&self) -> &StatsSnapshot {
        &self.snapshot
    }

    /// Zero every counter and flush
    pub fn reset(&mut self) -> Result<()> {
        self.snapshot = StatsSnapshot::default();
        self.save()
    }

    /// Persist the current snapshot
    pub fn save(&self) -> Result<()> {
        super::save_json(&self.path, &self.snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_starts_from_zero() {
        let dir = TempDir::new().unwrap();
        let tracker = StatsTracker::load(dir.path().join("stats.json")).unwrap();
        assert_eq!(tracker.snapshot().attempted, 0);
        assert_eq!(tracker.snapshot().succeeded, 0);
    }

    #[test]
    fn test_counters_accumulate() {
        let dir = TempDir::new().unwrap();
        let mut tracker = StatsTracker::load(dir.path().join("stats.json")).unwrap();

        tracker.record_attempt();
        tracker.record_success();
        tracker.record_attempt();
        tracker.record_failure(FailureKind::Publish);
        tracker.record_no_candidates();

        let snap = tracker.snapshot();
        assert_eq!(snap.attempted, 2);
        assert_eq!(snap.succeeded, 1);
        assert_eq!(snap.failed, 1);
        assert_eq!(snap.no_candidate_cycles, 1);
        assert_eq!(snap.failures_by_kind.get("publish"), Some(&1));
        assert!(snap.last_success_at.is_some());
        assert!(snap.last_failure_at.is_some());
    }

    #[test]
    fn test_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");

        {
            let mut tracker = StatsTracker::load(&path).unwrap();
            tracker.record_attempt();
            tracker.record_success();
            tracker.save().unwrap();
        }

        let tracker = StatsTracker::load(&path).unwrap();
        assert_eq!(tracker.snapshot().attempted, 1);
        assert_eq!(tracker.snapshot().succeeded, 1);
    }

    #[test]
    fn test_reset_zeroes_and_flushes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("stats.json");

        let mut tracker = StatsTracker::load(&path).unwrap();
        tracker.record_attempt();
        tracker.record_failure(FailureKind::Timeout);
        tracker.reset().unwrap();

        assert_eq!(tracker.snapshot().attempted, 0);
        assert!(tracker.snapshot().failures_by_kind.is_empty());

        let reloaded = StatsTracker::load(&path).unwrap();
        assert_eq!(reloaded.snapshot().failed, 0);
    }
}
