//! File-backed publisher
//!
//! Appends each published post as one JSON line to an outbox file. A
//! downstream delivery process (or a human) drains the outbox; from the
//! engine's point of view a successful append is a successful publish, which
//! keeps the whole pipeline runnable without any network credentials.

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

use super::{PostContent, Publisher};
use crate::error::PublishError;

#[derive(Serialize)]
struct OutboxEntry<'a> {
    post_id: &'a str,
    page_id: &'a str,
    posted_at: chrono::DateTime<Utc>,
    message: &'a str,
    media_ref: Option<&'a str>,
}

/// Publisher writing JSON lines to a local file
pub struct FileOutbox {
    path: PathBuf,
}

impl FileOutbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Publisher for FileOutbox {
    async fn publish(
        &self,
        page_id: &str,
        content: &PostContent,
    ) -> Result<Option<String>, PublishError> {
        let now = Utc::now();
        let post_id = format!("outbox-{}", now.timestamp_millis());

        let entry = OutboxEntry {
            post_id: &post_id,
            page_id,
            posted_at: now,
            message: &content.message,
            media_ref: content.media_ref.as_deref(),
        };

        let mut line = serde_json::to_vec(&entry)
            .map_err(|e| PublishError::Rejected(format!("unserializable post: {e}")))?;
        line.push(b'\n');

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PublishError::Transport(e.to_string()))?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        file.write_all(&line)
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        tracing::info!(post_id = %post_id, page_id = %page_id, "Post appended to outbox");

        Ok(Some(post_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_appends_one_line_per_post() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let outbox = FileOutbox::new(&path);

        let content = PostContent {
            message: "hello".to_string(),
            media_ref: None,
        };

        let first = outbox.publish("page-1", &content).await.unwrap();
        let second = outbox.publish("page-1", &content).await.unwrap();
        assert!(first.is_some());
        assert!(second.is_some());

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);
    }

    #[tokio::test]
    async fn test_entries_are_valid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("outbox.jsonl");
        let outbox = FileOutbox::new(&path);

        let content = PostContent {
            message: "line\nwith\nnewlines".to_string(),
            media_ref: Some("https://img.example/x.jpg".to_string()),
        };
        outbox.publish("page-9", &content).await.unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let entry: serde_json::Value = serde_json::from_str(text.lines().next().unwrap()).unwrap();
        assert_eq!(entry["page_id"], "page-9");
        assert_eq!(entry["message"], "line\nwith\nnewlines");
        assert_eq!(entry["media_ref"], "https://img.example/x.jpg");
    }

    #[tokio::test]
    async fn test_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("outbox.jsonl");
        let outbox = FileOutbox::new(&path);

        let content = PostContent {
            message: "hi".to_string(),
            media_ref: None,
        };
        outbox.publish("p", &content).await.unwrap();
        assert!(path.exists());
    }
}
