//! File-backed candidate source
//!
//! Reads candidates from a JSON spool file maintained by an upstream
//! harvester. The spool holds raw items without canonical ids; this provider
//! normalizes them into [`Candidate`]s so every downstream stage sees uniform
//! ids regardless of where the items came from.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::PathBuf;

use super::SourceProvider;
use crate::error::SourceError;
use crate::models::{Candidate, SourceKind};

/// One raw spool entry as the harvester writes it
#[derive(Debug, Deserialize)]
struct SpoolItem {
    title: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    media: Option<String>,
    #[serde(default = "default_category")]
    category: String,
    #[serde(default)]
    popularity: u64,
    #[serde(default)]
    published_at: Option<DateTime<Utc>>,
}

fn default_category() -> String {
    "general".to_string()
}

/// Source provider reading a JSON array of items from disk
pub struct SpoolSource {
    kind: SourceKind,
    path: PathBuf,
}

impl SpoolSource {
    pub fn new(kind: SourceKind, path: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            path: path.into(),
        }
    }
}

#[async_trait]
impl SourceProvider for SpoolSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self) -> Result<Vec<Candidate>, SourceError> {
        // A missing spool just means the harvester has nothing for us yet
        let raw = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(SourceError::Malformed(format!(
                    "cannot read spool {}: {e}",
                    self.path.display()
                )))
            }
        };

        let items: Vec<SpoolItem> = serde_json::from_slice(&raw).map_err(|e| {
            SourceError::Malformed(format!("invalid spool {}: {e}", self.path.display()))
        })?;

        let candidates: Vec<Candidate> = items
            .into_iter()
            .filter(|item| !item.title.trim().is_empty())
            .map(|item| Candidate {
                id: Candidate::canonical_id(self.kind, &item.title, item.url.as_deref()),
                source: self.kind,
                title: item.title,
                text: item.text,
                url: item.url,
                media_ref: item.media,
                category: item.category,
                popularity: item.popularity,
                published_at: item.published_at.unwrap_or_else(Utc::now),
            })
            .collect();

        tracing::debug!(
            kind = %self.kind,
            path = %self.path.display(),
            count = candidates.len(),
            "Fetched spool candidates"
        );

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_spool_is_empty_batch() {
        let dir = TempDir::new().unwrap();
        let source = SpoolSource::new(SourceKind::News, dir.path().join("absent.json"));
        assert!(source.fetch().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parses_items_and_assigns_ids() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spool.json");
        std::fs::write(
            &path,
            r#"[
                {"title": "Big Story", "text": "body text", "url": "https://ex.com/a",
                 "category": "technology", "popularity": 12},
                {"title": "Second", "media": "https://img.example/b.jpg"}
            ]"#,
        )
        .unwrap();

        let source = SpoolSource::new(SourceKind::News, &path);
        let candidates = source.fetch().await.unwrap();

        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].category, "technology");
        assert_eq!(candidates[1].category, "general");
        assert!(candidates[1].has_media());
        assert_eq!(
            candidates[0].id,
            Candidate::canonical_id(SourceKind::News, "Big Story", Some("https://ex.com/a"))
        );
    }

    #[tokio::test]
    async fn test_untitled_items_dropped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spool.json");
        std::fs::write(&path, r#"[{"title": "  "}, {"title": "Kept"}]"#).unwrap();

        let source = SpoolSource::new(SourceKind::Social, &path);
        let candidates = source.fetch().await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].title, "Kept");
    }

    #[tokio::test]
    async fn test_corrupt_spool_is_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("spool.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let source = SpoolSource::new(SourceKind::News, &path);
        let err = source.fetch().await.unwrap_err();
        assert!(matches!(err, SourceError::Malformed(_)));
    }
}
