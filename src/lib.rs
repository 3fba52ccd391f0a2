//! herald - Scheduled social post orchestration engine
//!
//! Runs an endless publish loop: every cycle it fetches candidate items from
//! its sources, scores them, publishes the single best one and records it so
//! it can never be posted twice.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - [`config`] - Configuration management and settings
//! - [`engine`] - Cycle orchestration and pacing
//! - [`selector`] - Candidate scoring and selection
//! - [`providers`] - Source, generator and publisher interfaces
//! - [`retry`] - Classified retry with exponential backoff
//! - [`storage`] - Posted-record dedup cache and stats persistence
//! - [`models`] - Core data structures and types
//!
//! # Example
//!
//! ```no_run
//! use herald::config::Config;
//! use herald::engine::Engine;
//! use herald::providers::{
//!     FileOutbox, PassthroughMedia, SourceProvider, SpoolSource, TemplateGenerator,
//! };
//! use herald::models::SourceKind;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env()?;
//!     let sources: Vec<Arc<dyn SourceProvider>> = vec![Arc::new(SpoolSource::new(
//!         SourceKind::News,
//!         config.storage.news_spool_path(),
//!     ))];
//!     let engine = Engine::new(
//!         config.clone(),
//!         sources,
//!         Arc::new(TemplateGenerator::new()),
//!         Arc::new(PassthroughMedia),
//!         Arc::new(FileOutbox::new(config.storage.outbox_path())),
//!     )?;
//!     engine.run_once().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod models;
pub mod providers;
pub mod retry;
pub mod selector;
pub mod storage;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{Config, ContentMode};
    pub use crate::engine::Engine;
    pub use crate::error::{Classify, EngineError, ErrorClass, Result};
    pub use crate::models::{Candidate, CycleOutcome, CycleResult, FailureKind, SourceKind};
    pub use crate::selector::Selector;
    pub use crate::storage::{PostedCache, StatsTracker};
}

// Direct re-exports for convenience
pub use models::{Candidate, CycleOutcome, CycleResult, FailureKind, SourceKind};
