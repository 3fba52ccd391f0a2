//! Cycle orchestration
//!
//! The engine owns the fetch, select, generate, publish, record pipeline and
//! the pacing around it. One cycle publishes at most one post. The posted
//! cache is flushed before a cycle may report success, and a cycle that
//! overruns its deadline is abandoned and counted as failed.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{EngineError, Result};
use crate::models::{
    Candidate, CycleOutcome, CycleResult, FailureKind, PostedRecord, ScheduleState, SourceKind,
};
use crate::providers::{
    ContentGenerator, MediaGenerator, Publisher, RoundRobin, SourceProvider, SourceRotation,
};
use crate::retry::with_retry;
use crate::selector::Selector;
use crate::storage::{PostedCache, StatsTracker};

/// Mutable engine state, guarded by one lock so a cycle sees a consistent
/// view of the caches
struct EngineState {
    posted: PostedCache,
    stats: StatsTracker,
    rotation: Box<dyn SourceRotation>,
    cycles_run: u64,
    last_cycle_started_at: Option<chrono::DateTime<Utc>>,
    last_cycle_ended_at: Option<chrono::DateTime<Utc>>,
}

/// The posting engine
pub struct Engine {
    config: Config,
    selector: Selector,
    sources: Vec<Arc<dyn SourceProvider>>,
    generator: Arc<dyn ContentGenerator>,
    media: Arc<dyn MediaGenerator>,
    publisher: Arc<dyn Publisher>,
    state: Mutex<EngineState>,
    is_running: RwLock<bool>,
    // Id of the candidate the current cycle selected, readable after the
    // cycle future is dropped on deadline
    in_flight: RwLock<Option<String>>,
}

impl Engine {
    /// Build an engine, loading durable state from the configured data
    /// directory. Fails fast on invalid configuration or unreadable state.
    pub fn new(
        config: Config,
        sources: Vec<Arc<dyn SourceProvider>>,
        generator: Arc<dyn ContentGenerator>,
        media: Arc<dyn MediaGenerator>,
        publisher: Arc<dyn Publisher>,
    ) -> Result<Self> {
        config.validate()?;

        let posted = PostedCache::load(config.storage.posted_path())?;
        let stats = StatsTracker::load(config.storage.stats_path())?;
        let rotation = Box::new(RoundRobin::for_mode(config.scheduler.content_mode));
        let selector = Selector::new(config.selection.clone());

        info!(
            posted_records = posted.len(),
            content_mode = %config.scheduler.content_mode,
            "Engine initialized"
        );

        Ok(Self {
            config,
            selector,
            sources,
            generator,
            media,
            publisher,
            state: Mutex::new(EngineState {
                posted,
                stats,
                rotation,
                cycles_run: 0,
                last_cycle_started_at: None,
                last_cycle_ended_at: None,
            }),
            is_running: RwLock::new(false),
            in_flight: RwLock::new(None),
        })
    }

    /// Whether a cycle is currently executing
    pub async fn is_running(&self) -> bool {
        *self.is_running.read().await
    }

    /// Current pacing state
    pub async fn schedule_state(&self) -> ScheduleState {
        let running = *self.is_running.read().await;
        let state = self.state.lock().await;
        ScheduleState {
            interval_secs: self.config.scheduler.interval_secs,
            last_cycle_started_at: state.last_cycle_started_at,
            last_cycle_ended_at: state.last_cycle_ended_at,
            running,
        }
    }

    /// Run one cycle. A trigger that arrives while a cycle is already in
    /// flight is a no-op and returns `Ok(None)`.
    pub async fn run_once(&self) -> Result<Option<CycleOutcome>> {
        {
            let mut running = self.is_running.write().await;
            if *running {
                info!("Cycle already in progress, ignoring trigger");
                return Ok(None);
            }
            *running = true;
        }

        let outcome = self.run_cycle_guarded().await;

        *self.is_running.write().await = false;
        outcome.map(Some)
    }

    /// Run cycles forever, sleeping the configured interval between the end
    /// of one cycle and the start of the next. Stops between cycles when the
    /// shutdown channel flips to true; an in-flight cycle always completes.
    pub async fn run_forever(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        info!(
            interval_secs = self.config.scheduler.interval_secs,
            "Engine loop started"
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            match self.run_once().await? {
                Some(outcome) => {
                    debug!(result = ?outcome.result, "Cycle finished");
                }
                None => {
                    // Only possible with an external trigger racing the loop
                    debug!("Cycle skipped, already running");
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.interval()) => {}
                changed = shutdown.changed() => {
                    // A dropped sender counts as a shutdown request
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Engine loop stopped");
        Ok(())
    }

    async fn run_cycle_guarded(&self) -> Result<CycleOutcome> {
        let mut state = self.state.lock().await;
        let started = Utc::now();
        state.last_cycle_started_at = Some(started);
        *self.in_flight.write().await = None;

        let outcome = match tokio::time::timeout(self.config.cycle_deadline(), self.cycle(&mut state)).await
        {
            Ok(outcome) => outcome,
            Err(_) => {
                let selected = self.in_flight.read().await.clone();
                warn!(
                    deadline_secs = self.config.scheduler.cycle_deadline_secs,
                    selected = ?selected,
                    "Cycle exceeded deadline, abandoning"
                );
                CycleOutcome::failed(started, selected, FailureKind::Timeout)
            }
        };

        self.account(&mut state, &outcome);

        state.last_cycle_ended_at = Some(Utc::now());
        state.cycles_run += 1;
        if state.cycles_run % self.config.scheduler.prune_every_cycles == 0 {
            let max_age = chrono::Duration::days(self.config.storage.retention_days);
            if let Err(e) = state.posted.prune(max_age) {
                warn!(error = %e, "Prune failed, will retry next window");
            }
        }

        Ok(outcome)
    }

    /// Fold the outcome into the stats store. A failed stats flush is logged
    /// and swallowed; it cannot cause a duplicate post.
    fn account(&self, state: &mut EngineState, outcome: &CycleOutcome) {
        match outcome.result {
            CycleResult::Success => {
                state.stats.record_attempt();
                state.stats.record_success();
            }
            CycleResult::NoCandidates => {
                state.stats.record_no_candidates();
            }
            CycleResult::Failed => {
                state.stats.record_attempt();
                if let Some(kind) = outcome.failure_kind {
                    state.stats.record_failure(kind);
                }
            }
        }

        if let Err(e) = state.stats.save() {
            warn!(error = %e, "Stats flush failed");
        }
    }

    /// One fetch, select, generate, publish, record pass
    async fn cycle(&self, state: &mut EngineState) -> CycleOutcome {
        let attempted_at = Utc::now();
        let retry = self.config.retry.clone();

        let kind = state.rotation.next_kind();
        let provider = match self.provider_for(kind) {
            Some(p) => p,
            None => {
                warn!(kind = %kind, "No provider for source kind");
                return CycleOutcome::no_candidates(attempted_at);
            }
        };

        // Fetch
        let fetch_provider = Arc::clone(&provider);
        let candidates = match with_retry(&retry, "fetch", move || {
            let provider = Arc::clone(&fetch_provider);
            async move { provider.fetch().await.map_err(EngineError::from) }
        })
        .await
        {
            Ok(batch) => batch,
            Err(e) => {
                error!(kind = %kind, error = %e, "Fetch failed");
                return CycleOutcome::failed(attempted_at, None, e.failure_kind());
            }
        };

        info!(kind = %kind, count = candidates.len(), "Fetched candidates");

        // Select
        let selected: Candidate = match self.selector.select(&candidates, &state.posted) {
            Some(c) => c.clone(),
            None => {
                info!("No eligible candidate this cycle");
                return CycleOutcome::no_candidates(attempted_at);
            }
        };
        *self.in_flight.write().await = Some(selected.id.clone());

        // Generate
        let generator = Arc::clone(&self.generator);
        let gen_candidate = selected.clone();
        let mut content = match with_retry(&retry, "generate", move || {
            let generator = Arc::clone(&generator);
            let candidate = gen_candidate.clone();
            async move { generator.generate(&candidate).await.map_err(EngineError::from) }
        })
        .await
        {
            Ok(content) => content,
            Err(e) => {
                error!(id = %selected.id, error = %e, "Content generation failed");
                return CycleOutcome::failed(attempted_at, Some(selected.id), e.failure_kind());
            }
        };

        // Media rendering failure never fails the cycle; the post goes out
        // without an attachment
        match self.media.render(&selected).await {
            Ok(media_ref) => content.media_ref = media_ref,
            Err(e) => {
                warn!(id = %selected.id, error = %e, "Media rendering failed, posting without media");
            }
        }

        // Publish
        let publisher = Arc::clone(&self.publisher);
        let page_id = self.config.destination.page_id.clone();
        let pub_content = content.clone();
        let post_id = match with_retry(&retry, "publish", move || {
            let publisher = Arc::clone(&publisher);
            let page_id = page_id.clone();
            let content = pub_content.clone();
            async move {
                publisher
                    .publish(&page_id, &content)
                    .await
                    .map_err(EngineError::from)
            }
        })
        .await
        {
            Ok(post_id) => post_id,
            Err(e) => {
                error!(id = %selected.id, error = %e, "Publish failed");
                return CycleOutcome::failed(attempted_at, Some(selected.id), e.failure_kind());
            }
        };

        // Record and flush before reporting success. The post is live at this
        // point; a failed flush fails the cycle so the operator sees it.
        let record = PostedRecord::new(&selected, post_id.clone());
        if let Err(e) = state.posted.record(record) {
            error!(
                id = %selected.id,
                post_id = ?post_id,
                error = %e,
                "Published but failed to record; manual reconciliation needed"
            );
            return CycleOutcome::failed(attempted_at, Some(selected.id), FailureKind::CacheIo);
        }

        info!(id = %selected.id, post_id = ?post_id, title = %selected.title, "Published");
        CycleOutcome::success(attempted_at, &selected.id)
    }

    fn provider_for(&self, kind: SourceKind) -> Option<Arc<dyn SourceProvider>> {
        self.sources
            .iter()
            .find(|p| p.kind() == kind)
            .or_else(|| self.sources.first())
            .cloned()
    }
}
