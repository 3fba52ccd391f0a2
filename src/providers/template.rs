//! Template-based content generation
//!
//! Renders a candidate into a post body without any external backend: title,
//! a trimmed excerpt, the source link and category hashtags. Serves both as
//! the fallback when a richer generator is unavailable and as the default
//! generator for the bundled binary.

use async_trait::async_trait;

use super::{ContentGenerator, PostContent};
use crate::error::GenerateError;
use crate::models::Candidate;

const MAX_EXCERPT_LEN: usize = 280;

/// Deterministic generator composing the post from the candidate itself
pub struct TemplateGenerator;

impl TemplateGenerator {
    pub fn new() -> Self {
        Self
    }

    fn excerpt(text: &str) -> Option<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return None;
        }

        if trimmed.chars().count() <= MAX_EXCERPT_LEN {
            return Some(trimmed.to_string());
        }

        // Cut at a word boundary inside the limit
        let cut: String = trimmed.chars().take(MAX_EXCERPT_LEN).collect();
        let cut = match cut.rfind(' ') {
            Some(pos) => &cut[..pos],
            None => cut.as_str(),
        };
        Some(format!("{}...", cut.trim_end()))
    }

    fn hashtags(category: &str) -> String {
        let tag: String = category
            .chars()
            .filter(|c| c.is_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        if tag.is_empty() {
            "#news".to_string()
        } else {
            format!("#{tag} #news")
        }
    }
}

impl Default for TemplateGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ContentGenerator for TemplateGenerator {
    async fn generate(&self, candidate: &Candidate) -> Result<PostContent, GenerateError> {
        let title = candidate.title.trim();
        if title.is_empty() {
            return Err(GenerateError::Rejected("candidate has no title".into()));
        }

        let mut parts = vec![title.to_string()];

        if let Some(excerpt) = Self::excerpt(&candidate.text) {
            parts.push(excerpt);
        }

        if let Some(url) = candidate.url.as_deref() {
            parts.push(url.to_string());
        }

        parts.push(Self::hashtags(&candidate.category));

        Ok(PostContent {
            message: parts.join("\n\n"),
            media_ref: candidate.media_ref.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SourceKind;
    use chrono::Utc;

    fn candidate(title: &str, text: &str) -> Candidate {
        Candidate {
            id: "id".to_string(),
            source: SourceKind::News,
            title: title.to_string(),
            text: text.to_string(),
            url: Some("https://ex.com/story".to_string()),
            media_ref: None,
            category: "technology".to_string(),
            popularity: 0,
            published_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_composes_title_excerpt_link_tags() {
        let generator = TemplateGenerator::new();
        let content = generator
            .generate(&candidate("Big Story", "Something happened."))
            .await
            .unwrap();

        assert!(content.message.starts_with("Big Story"));
        assert!(content.message.contains("Something happened."));
        assert!(content.message.contains("https://ex.com/story"));
        assert!(content.message.contains("#technology"));
    }

    #[tokio::test]
    async fn test_long_text_truncated_at_word_boundary() {
        let generator = TemplateGenerator::new();
        let long_text = "word ".repeat(200);
        let content = generator
            .generate(&candidate("T", &long_text))
            .await
            .unwrap();

        let excerpt_line = content.message.lines().find(|l| l.ends_with("...")).unwrap();
        assert!(excerpt_line.chars().count() <= MAX_EXCERPT_LEN + 3);
    }

    #[tokio::test]
    async fn test_empty_title_rejected() {
        let generator = TemplateGenerator::new();
        let err = generator.generate(&candidate("  ", "body")).await.unwrap_err();
        assert!(matches!(err, GenerateError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_media_ref_carried_through() {
        let generator = TemplateGenerator::new();
        let mut c = candidate("T", "body");
        c.media_ref = Some("https://img.example/x.jpg".to_string());

        let content = generator.generate(&c).await.unwrap();
        assert_eq!(content.media_ref.as_deref(), Some("https://img.example/x.jpg"));
    }
}
