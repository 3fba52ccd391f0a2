use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use herald::config::Config;
use herald::engine::Engine;
use herald::models::{CycleResult, SourceKind};
use herald::providers::{
    FileOutbox, PassthroughMedia, SourceProvider, SpoolSource, TemplateGenerator,
};
use herald::storage::{PostedCache, StatsTracker};

#[derive(Parser)]
#[command(
    name = "herald",
    version,
    about = "Scheduled social post orchestration engine",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to a TOML config file (environment variables used otherwise)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, global = true, default_value = "text")]
    log_format: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the posting loop until interrupted
    Run {
        /// Override the cycle interval in seconds
        #[arg(short, long)]
        interval: Option<u64>,
    },

    /// Run exactly one cycle and exit (non-zero on a failed cycle)
    Once,

    /// Show cumulative posting statistics
    Stats,

    /// Reset posting statistics
    Reset {
        /// Also clear the posted-record cache (published items become
        /// eligible again)
        #[arg(long)]
        cache: bool,
    },

    /// Show configuration and durable state summary
    Info,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::from_env()?,
    };

    match cli.command {
        Commands::Run { interval } => {
            if let Some(secs) = interval {
                config.scheduler.interval_secs = secs;
            }
            run(config).await?;
        }

        Commands::Once => {
            once(config).await?;
        }

        Commands::Stats => {
            stats(config)?;
        }

        Commands::Reset { cache } => {
            reset(config, cache)?;
        }

        Commands::Info => {
            info(config)?;
        }
    }

    Ok(())
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        tracing_subscriber::EnvFilter::new("herald=debug,info")
    } else {
        tracing_subscriber::EnvFilter::new("herald=info,warn")
    };

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
    }

    Ok(())
}

fn build_engine(config: Config) -> Result<Engine> {
    let sources: Vec<Arc<dyn SourceProvider>> = vec![
        Arc::new(SpoolSource::new(
            SourceKind::News,
            config.storage.news_spool_path(),
        )),
        Arc::new(SpoolSource::new(
            SourceKind::Social,
            config.storage.social_spool_path(),
        )),
    ];

    let engine = Engine::new(
        config.clone(),
        sources,
        Arc::new(TemplateGenerator::new()),
        Arc::new(PassthroughMedia),
        Arc::new(FileOutbox::new(config.storage.outbox_path())),
    )?;

    Ok(engine)
}

async fn run(config: Config) -> Result<()> {
    tracing::info!(
        interval_secs = config.scheduler.interval_secs,
        data_dir = %config.storage.data_dir.display(),
        "Starting posting loop"
    );

    let engine = build_engine(config)?;
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, stopping after current cycle");
            let _ = shutdown_tx.send(true);
        }
    });

    engine.run_forever(shutdown_rx).await?;
    Ok(())
}

async fn once(config: Config) -> Result<()> {
    let engine = build_engine(config)?;

    match engine.run_once().await? {
        Some(outcome) => {
            println!("Cycle result: {:?}", outcome.result);
            if let Some(id) = &outcome.selected_id {
                println!("  Selected: {id}");
            }
            if let Some(kind) = outcome.failure_kind {
                println!("  Failure: {kind}");
            }

            if outcome.result == CycleResult::Failed {
                anyhow::bail!("cycle failed");
            }
        }
        None => {
            println!("Cycle already in progress, nothing done");
        }
    }

    Ok(())
}

fn stats(config: Config) -> Result<()> {
    let tracker = StatsTracker::load(config.storage.stats_path())?;
    let snap = tracker.snapshot();

    println!("Posting statistics");
    println!("{:-<40}", "");
    println!("Attempted:          {}", snap.attempted);
    println!("Succeeded:          {}", snap.succeeded);
    println!("Failed:             {}", snap.failed);
    println!("No-candidate:       {}", snap.no_candidate_cycles);
    println!("Success rate:       {:.1}%", snap.success_rate() * 100.0);

    if !snap.failures_by_kind.is_empty() {
        println!("Failures by kind:");
        let mut kinds: Vec<_> = snap.failures_by_kind.iter().collect();
        kinds.sort_by_key(|(k, _)| k.clone());
        for (kind, count) in kinds {
            println!("  {kind:<16} {count}");
        }
    }

    if let Some(at) = snap.last_success_at {
        println!("Last success:       {at}");
    }
    if let Some(at) = snap.last_failure_at {
        println!("Last failure:       {at}");
    }

    let posted = PostedCache::load(config.storage.posted_path())?;
    println!("Posted records:     {}", posted.len());
    if let Some((oldest, newest)) = posted.time_span() {
        println!("  Oldest:           {oldest}");
        println!("  Newest:           {newest}");
    }

    Ok(())
}

fn reset(config: Config, cache: bool) -> Result<()> {
    let mut tracker = StatsTracker::load(config.storage.stats_path())?;
    tracker.reset()?;
    println!("Statistics reset");

    if cache {
        let mut posted = PostedCache::load(config.storage.posted_path())?;
        let cleared = posted.len();
        posted.reset()?;
        println!("Posted cache cleared ({cleared} records)");
    }

    Ok(())
}

fn info(config: Config) -> Result<()> {
    let posted = PostedCache::load(config.storage.posted_path())?;
    let tracker = StatsTracker::load(config.storage.stats_path())?;

    println!("herald configuration");
    println!("{:-<40}", "");
    println!("Data dir:           {}", config.storage.data_dir.display());
    println!("Interval:           {}s", config.scheduler.interval_secs);
    println!("Cycle deadline:     {}s", config.scheduler.cycle_deadline_secs);
    println!("Content mode:       {}", config.scheduler.content_mode);
    println!("Retention:          {} days", config.storage.retention_days);
    println!("Retry budget:       {}", config.retry.budget);
    println!(
        "Destination:        {} ({})",
        config.destination.page_id,
        config.destination.label.as_deref().unwrap_or("unlabeled")
    );
    println!();
    println!("Posted records:     {}", posted.len());
    if let Some((oldest, newest)) = posted.time_span() {
        println!("  Oldest:           {oldest}");
        println!("  Newest:           {newest}");
    }
    println!("Total published:    {}", tracker.snapshot().succeeded);

    Ok(())
}
