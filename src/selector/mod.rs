//! Candidate scoring and selection
//!
//! Scores every eligible candidate and picks the single best one per cycle.
//! Already-posted ids are filtered out before scoring, so the selector never
//! proposes a duplicate. Scoring is deterministic: the same inputs at the
//! same instant always yield the same winner.

use chrono::{DateTime, Utc};

use crate::config::SelectionConfig;
use crate::models::Candidate;
use crate::storage::PostedCache;

/// Per-component score breakdown, kept around for logging
#[derive(Debug, Clone, Copy)]
struct Score {
    recency: f64,
    quality: f64,
    penalty: f64,
}

impl Score {
    fn total(&self) -> f64 {
        self.recency + self.quality - self.penalty
    }
}

/// Picks the best unposted candidate out of a fetched batch
pub struct Selector {
    config: SelectionConfig,
}

impl Selector {
    pub fn new(config: SelectionConfig) -> Self {
        Self { config }
    }

    /// Select the highest-scoring candidate not yet published.
    ///
    /// Returns `None` when every candidate is filtered out. Ties break by
    /// recency, then raw quality, then position in the input batch.
    pub fn select<'a>(
        &self,
        candidates: &'a [Candidate],
        posted: &PostedCache,
    ) -> Option<&'a Candidate> {
        let now = Utc::now();
        let recent = posted.recent_categories(self.config.diversity_window);

        let mut best: Option<(&Candidate, Score)> = None;

        for candidate in candidates {
            if posted.contains(&candidate.id) {
                tracing::debug!(id = %candidate.id, "Skipping already-posted candidate");
                continue;
            }

            let score = self.score(candidate, &recent, now);
            tracing::debug!(
                id = %candidate.id,
                category = %candidate.category,
                recency = score.recency,
                quality = score.quality,
                penalty = score.penalty,
                total = score.total(),
                "Scored candidate"
            );

            // Strict > keeps the earlier candidate on a tie
            let replace = match &best {
                None => true,
                Some((prev, prev_score)) => {
                    let a = score.total();
                    let b = prev_score.total();
                    if a != b {
                        a > b
                    } else if candidate.published_at != prev.published_at {
                        candidate.published_at > prev.published_at
                    } else {
                        score.quality > prev_score.quality
                    }
                }
            };

            if replace {
                best = Some((candidate, score));
            }
        }

        best.map(|(candidate, score)| {
            tracing::info!(
                id = %candidate.id,
                title = %candidate.title,
                score = score.total(),
                "Selected candidate"
            );
            candidate
        })
    }

    fn score(&self, candidate: &Candidate, recent_categories: &[String], now: DateTime<Utc>) -> Score {
        Score {
            recency: self.config.recency_weight * self.recency(candidate, now),
            quality: self.config.quality_weight * self.quality(candidate),
            penalty: self.diversity_penalty(candidate, recent_categories)
                + self.blocked_penalty(candidate),
        }
    }

    /// Exponential decay with the configured half-life. A just-published item
    /// scores 1.0; one half-life old scores 0.5.
    fn recency(&self, candidate: &Candidate, now: DateTime<Utc>) -> f64 {
        let age_hours = (now - candidate.published_at).num_seconds().max(0) as f64 / 3600.0;
        0.5_f64.powf(age_hours / self.config.recency_half_life_hours)
    }

    /// Substantial text, attached media and provider popularity all help
    fn quality(&self, candidate: &Candidate) -> f64 {
        let mut score = 0.0;

        if candidate.text.len() >= self.config.min_text_len {
            score += 1.0;
        }

        if candidate.has_media() {
            score += self.config.media_bonus;
        }

        // Popularity saturates; a viral outlier should not drown out recency
        score += (candidate.popularity as f64).ln_1p() / 10.0;

        score
    }

    fn diversity_penalty(&self, candidate: &Candidate, recent: &[String]) -> f64 {
        let repeats = recent
            .iter()
            .filter(|c| c.as_str() == candidate.category)
            .count();
        repeats as f64 * self.config.diversity_penalty
    }

    fn blocked_penalty(&self, candidate: &Candidate) -> f64 {
        let title = candidate.title.to_lowercase();
        let hit = self
            .config
            .blocked_keywords
            .iter()
            .any(|k| title.contains(&k.to_lowercase()));
        if hit {
            self.config.blocked_penalty
        } else {
            0.0
        }
    }
}
