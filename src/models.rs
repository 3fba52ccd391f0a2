// Core data structures for the herald posting engine

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// Kind of external source a candidate was harvested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Traditional news provider (articles)
    News,
    /// Social content provider (community posts)
    Social,
}

impl SourceKind {
    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::News => "news",
            Self::Social => "social",
        }
    }

    /// Create from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "news" => Some(Self::News),
            "social" | "reddit" => Some(Self::Social),
            _ => None,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A fetched, not-yet-published content item eligible for scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Canonical source-derived identifier (see [`Candidate::canonical_id`])
    pub id: String,

    /// Which kind of provider supplied this candidate
    pub source: SourceKind,

    /// Title or headline
    pub title: String,

    /// Body text (description, summary or selftext)
    pub text: String,

    /// Original URL, if any
    pub url: Option<String>,

    /// Reference to an attached image/video, if any
    pub media_ref: Option<String>,

    /// Topical category (politics, technology, paranormal, ...)
    pub category: String,

    /// Provider-side popularity signal (upvotes, shares), used as a raw
    /// score input
    pub popularity: u64,

    /// When the item was published at the source
    pub published_at: DateTime<Utc>,
}

impl Candidate {
    /// Compute the canonical candidate id: a stable hash of the source kind
    /// plus the normalized title and URL. Providers that carry a native id
    /// should still route it through here so ids stay uniform across sources.
    pub fn canonical_id(source: SourceKind, title: &str, url: Option<&str>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(source.as_str().as_bytes());
        hasher.update(b"\x1f");
        hasher.update(normalize_text(title).as_bytes());
        if let Some(url) = url {
            hasher.update(b"\x1f");
            hasher.update(normalize_url(url).as_bytes());
        }
        let digest = hasher.finalize();
        // 16 hex chars is plenty for a per-destination dedup key
        format!("{digest:x}")[..16].to_string()
    }

    /// True if the candidate carries a media reference
    pub fn has_media(&self) -> bool {
        self.media_ref.as_deref().is_some_and(|m| !m.is_empty())
    }
}

/// Lowercase, collapse whitespace
fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Strip query/fragment and trailing slash so republished links hash the same
fn normalize_url(raw: &str) -> String {
    match url::Url::parse(raw) {
        Ok(mut u) => {
            u.set_query(None);
            u.set_fragment(None);
            u.as_str().trim_end_matches('/').to_lowercase()
        }
        Err(_) => raw.trim().trim_end_matches('/').to_lowercase(),
    }
}

/// Record of a published item. Created only on confirmed successful publish,
/// never mutated, deleted only by pruning or an explicit reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostedRecord {
    /// Canonical candidate id
    pub id: String,

    /// Which kind of provider the item came from
    pub source: SourceKind,

    /// Category at publish time (feeds the selector's diversity window)
    pub category: String,

    /// Post id returned by the publisher, if any
    pub post_id: Option<String>,

    /// When the item was published
    pub posted_at: DateTime<Utc>,
}

impl PostedRecord {
    /// Create a record stamped with the current time
    pub fn new(candidate: &Candidate, post_id: Option<String>) -> Self {
        Self {
            id: candidate.id.clone(),
            source: candidate.source,
            category: candidate.category.clone(),
            post_id,
            posted_at: Utc::now(),
        }
    }
}

/// Terminal result of one engine cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CycleResult {
    /// A candidate was published and recorded
    Success,
    /// Every fetched candidate was filtered out (valid, non-error outcome)
    NoCandidates,
    /// The cycle failed; see the failure kind
    Failed,
}

/// Classification of a cycle failure, for stats and logs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FailureKind {
    /// Fetching candidates failed after retries
    Source,
    /// Content generation failed after retries
    Generate,
    /// Publishing failed (retries exhausted or permanent rejection)
    Publish,
    /// The dedup flush failed after a successful publish
    CacheIo,
    /// The cycle exceeded its deadline
    Timeout,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Generate => "generate",
            Self::Publish => "publish",
            Self::CacheIo => "cache-io",
            Self::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one fetch→select→publish→record pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleOutcome {
    /// When the cycle started
    pub attempted_at: DateTime<Utc>,

    /// Id of the selected candidate, if selection happened
    pub selected_id: Option<String>,

    /// Terminal result
    pub result: CycleResult,

    /// Failure classification when `result == Failed`
    pub failure_kind: Option<FailureKind>,
}

impl CycleOutcome {
    pub fn success(attempted_at: DateTime<Utc>, id: &str) -> Self {
        Self {
            attempted_at,
            selected_id: Some(id.to_string()),
            result: CycleResult::Success,
            failure_kind: None,
        }
    }

    pub fn no_candidates(attempted_at: DateTime<Utc>) -> Self {
        Self {
            attempted_at,
            selected_id: None,
            result: CycleResult::NoCandidates,
            failure_kind: None,
        }
    }

    pub fn failed(
        attempted_at: DateTime<Utc>,
        selected_id: Option<String>,
        kind: FailureKind,
    ) -> Self {
        Self {
            attempted_at,
            selected_id,
            result: CycleResult::Failed,
            failure_kind: Some(kind),
        }
    }

    /// True unless the cycle failed (a no-candidate cycle is not an error)
    pub fn is_ok(&self) -> bool {
        self.result != CycleResult::Failed
    }
}

/// Snapshot of the scheduler's pacing state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleState {
    /// Seconds slept between the end of one cycle and the start of the next
    pub interval_secs: u64,

    /// When the most recent cycle started
    pub last_cycle_started_at: Option<DateTime<Utc>>,

    /// When the most recent cycle ended
    pub last_cycle_ended_at: Option<DateTime<Utc>>,

    /// True while a cycle is executing
    pub running: bool,
}

/// Cumulative publish statistics. Monotonically non-decreasing except on
/// explicit reset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    /// Cycles that ended in success or failure (no-candidate cycles excluded)
    pub attempted: u64,

    /// Confirmed successful publishes
    pub succeeded: u64,

    /// Failed cycles
    pub failed: u64,

    /// Cycles that found no eligible candidate
    pub no_candidate_cycles: u64,

    /// Failure counts broken down by kind
    #[serde(default)]
    pub failures_by_kind: HashMap<String, u64>,

    /// Last successful publish time
    pub last_success_at: Option<DateTime<Utc>>,

    /// Last failure time
    pub last_failure_at: Option<DateTime<Utc>>,
}

impl StatsSnapshot {
    /// Derived success rate, 0.0 when nothing has been attempted
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.succeeded as f64 / self.attempted as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_id_stable() {
        let a = Candidate::canonical_id(SourceKind::News, "Big Story", Some("https://ex.com/a"));
        let b = Candidate::canonical_id(SourceKind::News, "Big  Story", Some("https://ex.com/a/"));
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[test]
    fn test_canonical_id_varies_by_source() {
        let news = Candidate::canonical_id(SourceKind::News, "Same Title", None);
        let social = Candidate::canonical_id(SourceKind::Social, "Same Title", None);
        assert_ne!(news, social);
    }

    #[test]
    fn test_canonical_id_ignores_query_params() {
        let a = Candidate::canonical_id(
            SourceKind::News,
            "t",
            Some("https://ex.com/story?utm_source=feed"),
        );
        let b = Candidate::canonical_id(SourceKind::News, "t", Some("https://ex.com/story"));
        assert_eq!(a, b);
    }

    #[test]
    fn test_source_kind_parse() {
        assert_eq!(SourceKind::parse("news"), Some(SourceKind::News));
        assert_eq!(SourceKind::parse("Reddit"), Some(SourceKind::Social));
        assert_eq!(SourceKind::parse("unknown"), None);
    }

    #[test]
    fn test_success_rate_zero_attempts() {
        let stats = StatsSnapshot::default();
        assert_eq!(stats.success_rate(), 0.0);
    }

    #[test]
    fn test_success_rate() {
        let stats = StatsSnapshot {
            attempted: 4,
            succeeded: 3,
            failed: 1,
            ..Default::default()
        };
        assert!((stats.success_rate() - 0.75).abs() < f64::EPSILON);
    }

    #[test]
    fn test_outcome_is_ok() {
        let now = Utc::now();
        assert!(CycleOutcome::success(now, "id1").is_ok());
        assert!(CycleOutcome::no_candidates(now).is_ok());
        assert!(!CycleOutcome::failed(now, None, FailureKind::Timeout).is_ok());
    }
}
