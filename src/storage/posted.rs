//! Durable record of everything ever published
//!
//! The posted cache is the at-most-once guarantee: an id present here was
//! published exactly once and will never be selected again. Every new record
//! is flushed synchronously to disk before the cycle that produced it is
//! reported successful; the only duplicate window left is a crash between the
//! publish call returning and the flush completing.

use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::path::PathBuf;

use crate::error::Result;
use crate::models::PostedRecord;

/// In-memory map of posted ids backed by a JSON file
pub struct PostedCache {
    records: HashMap<String, PostedRecord>,
    path: PathBuf,
}

impl PostedCache {
    /// Load the cache from disk. A missing backing file is an empty cache.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let records: HashMap<String, PostedRecord> =
            super::load_json(&path)?.unwrap_or_default();

        tracing::debug!(
            path = %path.display(),
            records = records.len(),
            "Posted cache loaded"
        );

        Ok(Self { records, path })
    }

    /// Check whether an id has already been published
    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    /// Record a published item and flush synchronously. Idempotent: recording
    /// an id that is already present leaves the first record in place and
    /// skips the flush.
    pub fn record(&mut self, record: PostedRecord) -> Result<()> {
        if self.records.contains_key(&record.id) {
            tracing::debug!(id = %record.id, "Id already recorded, skipping");
            return Ok(());
        }

        self.records.insert(record.id.clone(), record);
        self.flush()
    }

    /// Remove records older than the retention window. Runs outside the
    /// publish path; flushes only when something was removed.
    pub fn prune(&mut self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let before = self.records.len();
        self.records.retain(|_, r| r.posted_at > cutoff);
        let removed = before - self.records.len();

        if removed > 0 {
            self.flush()?;
            tracing::info!(removed = removed, "Pruned expired posted records");
        }

        Ok(removed)
    }

    /// Drop every record and flush. Operator-invoked only.
    pub fn reset(&mut self) -> Result<()> {
        self.records.clear();
        self.flush()
    }

    /// Categories of the most recently published items, newest first,
    /// at most `window` entries. Feeds the selector's diversity penalty.
    pub fn recent_categories(&self, window: usize) -> Vec<String> {
        let mut records: Vec<&PostedRecord> = self.records.values().collect();
        records.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));
        records
            .into_iter()
            .take(window)
            .map(|r| r.category.clone())
            .collect()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has ever been recorded
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Oldest and newest posted-at timestamps, if any records exist
    pub fn time_span(&self) -> Option<(chrono::DateTime<Utc>, chrono::DateTime<Utc>)> {
        let oldest = self.records.values().map(|r| r.posted_at).min()?;
        let newest = self.records.values().map(|r| r.posted_at).max()?;
        Some((oldest, newest))
    }

    fn flush(&self) -> Result<()> {
        super::save_json(&self.path, &self.records)
    }
}
