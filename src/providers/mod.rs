//! Collaborator interfaces the engine orchestrates
//!
//! The engine never talks to the outside world directly; it drives four
//! traits (source, generator, media, publisher) and a rotation strategy that
//! decides which source kind each cycle draws from. Concrete file-backed
//! implementations live in the submodules; anything network-shaped plugs in
//! behind the same traits.

pub mod outbox;
pub mod spool;
pub mod template;

pub use outbox::FileOutbox;
pub use spool::SpoolSource;
pub use template::TemplateGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ContentMode;
use crate::error::{GenerateError, PublishError, SourceError};
use crate::models::{Candidate, SourceKind};

/// Fully rendered post, ready to hand to a publisher
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostContent {
    /// Message body, including any hashtags
    pub message: String,

    /// Media reference to attach, if any
    pub media_ref: Option<String>,
}

/// Supplies candidate items of one source kind
#[async_trait]
pub trait SourceProvider: Send + Sync {
    /// Which kind of candidates this provider yields
    fn kind(&self) -> SourceKind;

    /// Fetch the current batch of candidates
    async fn fetch(&self) -> Result<Vec<Candidate>, SourceError>;
}

/// Turns a selected candidate into publishable text
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, candidate: &Candidate) -> Result<PostContent, GenerateError>;
}

/// Optionally renders a media attachment for a candidate
#[async_trait]
pub trait MediaGenerator: Send + Sync {
    /// Returns `Ok(None)` when no media applies to this candidate
    async fn render(&self, candidate: &Candidate) -> Result<Option<String>, GenerateError>;
}

/// Delivers a rendered post to the destination
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish and return the destination-side post id, if the destination
    /// reports one
    async fn publish(
        &self,
        page_id: &str,
        content: &PostContent,
    ) -> Result<Option<String>, PublishError>;
}

/// Media generator that reuses whatever the source already attached
pub struct PassthroughMedia;

#[async_trait]
impl MediaGenerator for PassthroughMedia {
    async fn render(&self, candidate: &Candidate) -> Result<Option<String>, GenerateError> {
        Ok(candidate.media_ref.clone())
    }
}

/// Decides which source kind the next cycle draws from
pub trait SourceRotation: Send {
    fn next_kind(&mut self) -> SourceKind;
}

/// Strict alternation over the kinds the content mode allows
pub struct RoundRobin {
    order: Vec<SourceKind>,
    cursor: usize,
}

impl RoundRobin {
    pub fn for_mode(mode: ContentMode) -> Self {
        let order = match mode {
            ContentMode::Mixed => vec![SourceKind::News, SourceKind::Social],
            ContentMode::NewsOnly => vec![SourceKind::News],
            ContentMode::SocialOnly => vec![SourceKind::Social],
        };
        Self { order, cursor: 0 }
    }
}

impl SourceRotation for RoundRobin {
    fn next_kind(&mut self) -> SourceKind {
        let kind = self.order[self.cursor % self.order.len()];
        self.cursor = self.cursor.wrapping_add(1);
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mixed_alternates() {
        let mut rotation = RoundRobin::for_mode(ContentMode::Mixed);
        assert_eq!(rotation.next_kind(), SourceKind::News);
        assert_eq!(rotation.next_kind(), SourceKind::Social);
        assert_eq!(rotation.next_kind(), SourceKind::News);
        assert_eq!(rotation.next_kind(), SourceKind::Social);
    }

    #[test]
    fn test_single_mode_pins_kind() {
        let mut rotation = RoundRobin::for_mode(ContentMode::NewsOnly);
        for _ in 0..4 {
            assert_eq!(rotation.next_kind(), SourceKind::News);
        }

        let mut rotation = RoundRobin::for_mode(ContentMode::SocialOnly);
        for _ in 0..4 {
            assert_eq!(rotation.next_kind(), SourceKind::Social);
        }
    }
}
