//! Unified error handling for the herald crate
//!
//! Failures are classified along the axis the retry policy cares about:
//! transient (retry within the cycle), fatal for the cycle (give up, record
//! the outcome, carry on), or fatal for the process (configuration problems
//! caught at startup). Collaborator-facing error enums live here so providers
//! written outside this crate signal failures through the same taxonomy.

use std::io;
use thiserror::Error;

use crate::models::FailureKind;

/// Classification of an error for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    /// Retryable within the current cycle (timeout, rate limit, 5xx)
    Transient,
    /// Ends the current cycle immediately; the next cycle starts fresh
    FatalCycle,
    /// Only valid at startup; the process should not run
    FatalProcess,
}

/// Common interface implemented by all herald error types
pub trait Classify {
    /// How the retry policy should treat this error
    fn class(&self) -> ErrorClass;
}

/// Errors from a source provider's fetch call
#[derive(Error, Debug)]
pub enum SourceError {
    /// Request timed out
    #[error("source request timed out")]
    Timeout,

    /// Provider rate limit exceeded
    #[error("source rate limit exceeded")]
    RateLimit,

    /// Server-side error with status code
    #[error("source server error: {0}")]
    ServerError(u16),

    /// Credentials rejected by the provider
    #[error("source credentials rejected")]
    Unauthorized,

    /// Response could not be interpreted as candidates
    #[error("malformed source payload: {0}")]
    Malformed(String),
}

impl Classify for SourceError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout | Self::RateLimit | Self::ServerError(_) => ErrorClass::Transient,
            Self::Unauthorized | Self::Malformed(_) => ErrorClass::FatalCycle,
        }
    }
}

/// Errors from the content generator
#[derive(Error, Debug)]
pub enum GenerateError {
    /// Generation backend timed out
    #[error("content generation timed out")]
    Timeout,

    /// Generation backend unavailable
    #[error("content generation unavailable: {0}")]
    Unavailable(String),

    /// The candidate cannot produce usable text
    #[error("candidate rejected by generator: {0}")]
    Rejected(String),
}

impl Classify for GenerateError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout | Self::Unavailable(_) => ErrorClass::Transient,
            Self::Rejected(_) => ErrorClass::FatalCycle,
        }
    }
}

/// Errors from the publisher
#[derive(Error, Debug)]
pub enum PublishError {
    /// Request timed out
    #[error("publish request timed out")]
    Timeout,

    /// Destination rate limit exceeded
    #[error("publish rate limit exceeded")]
    RateLimit,

    /// Server-side error with status code
    #[error("publish server error: {0}")]
    ServerError(u16),

    /// Expired or invalid credentials
    #[error("publish credentials invalid or expired")]
    InvalidCredentials,

    /// The destination refused the operation
    #[error("permission denied by destination")]
    PermissionDenied,

    /// Payload permanently rejected (too long, forbidden content, ...)
    #[error("post rejected: {0}")]
    Rejected(String),

    /// Transport-level failure reaching the destination
    #[error("publish transport error: {0}")]
    Transport(String),
}

impl Classify for PublishError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Timeout | Self::RateLimit | Self::ServerError(_) | Self::Transport(_) => {
                ErrorClass::Transient
            }
            Self::InvalidCredentials | Self::PermissionDenied | Self::Rejected(_) => {
                ErrorClass::FatalCycle
            }
        }
    }
}

/// Unified error type for the herald engine
#[derive(Error, Debug)]
pub enum EngineError {
    /// Missing or invalid configuration, detected at startup only
    #[error("configuration error: {0}")]
    Config(String),

    /// Source provider failure
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    /// Content generator failure
    #[error("generate error: {0}")]
    Generate(#[from] GenerateError),

    /// Publisher failure
    #[error("publish error: {0}")]
    Publish(#[from] PublishError),

    /// Dedup or stats store I/O failure
    #[error("cache I/O error: {0}")]
    CacheIo(String),

    /// The cycle exceeded its deadline
    #[error("cycle deadline exceeded")]
    Timeout,

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Classify for EngineError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Config(_) => ErrorClass::FatalProcess,
            Self::Source(e) => e.class(),
            Self::Generate(e) => e.class(),
            Self::Publish(e) => e.class(),
            // A failed flush ends the cycle; the publish may already be live
            Self::CacheIo(_) => ErrorClass::FatalCycle,
            Self::Timeout => ErrorClass::FatalCycle,
            Self::Io(_) => ErrorClass::Transient,
            Self::Json(_) => ErrorClass::FatalCycle,
        }
    }
}

impl EngineError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a cache I/O error
    pub fn cache_io(msg: impl Into<String>) -> Self {
        Self::CacheIo(msg.into())
    }

    /// Map this error to the failure kind recorded on the cycle outcome
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Source(_) => FailureKind::Source,
            Self::Generate(_) => FailureKind::Generate,
            Self::Publish(_) => FailureKind::Publish,
            Self::CacheIo(_) | Self::Io(_) | Self::Json(_) => FailureKind::CacheIo,
            Self::Timeout => FailureKind::Timeout,
            // Config errors are caught at startup and never reach a cycle
            Self::Config(_) => FailureKind::Source,
        }
    }
}

/// Result type alias using the unified engine error
pub type Result<T> = std::result::Result<T, EngineError>;
