//! amwatch - background Alertmanager watcher
//!
//! Polls the active Alertmanager instance, keeps a badge up to date, raises
//! notifications for newly firing alerts and caches the last good results.
//!
//! ## Usage
//!
//! ```bash
//! # Poll in the background until Ctrl-C
//! amwatch
//!
//! # Run a single cycle and print the outcome
//! amwatch once
//!
//! # Check the active instance
//! amwatch status
//!
//! # Show cached silences
//! amwatch cache silences
//!
//! # Verbose logging to a custom directory
//! amwatch -v --log-dir /tmp/amwatch-logs run
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info, warn};

use amwatch_client::{AlertmanagerClient, ClientConfig};
use amwatch_config::{AppConfig, ConfigEvent, ConfigWatcher, FileSettingsProvider};
use amwatch_core::ports::{AlertCache, BadgeSink, NotificationSink};
use amwatch_core::types::CacheKind;
use amwatch_core::{LogGuard, init_logging};
use amwatch_poller::{
    CommandNotifier, CycleOutcome, FileBadge, LogBadge, LogNotifier, MemoryCache, PollCycle,
    PollPorts, PollScheduler, SqliteCache,
};

/// Background Alertmanager watcher
#[derive(Parser, Debug)]
#[command(name = "amwatch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging (increases log level)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Directory for log files (defaults to ~/.amwatch/logs/)
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Config file (defaults to ~/.amwatch/config.yaml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
enum Command {
    /// Poll on a timer until interrupted (default)
    Run,
    /// Run one poll cycle and print the outcome
    Once,
    /// Query the active instance's status endpoint
    Status,
    /// Print a cached entry for the active instance
    Cache {
        #[arg(value_enum, default_value_t = CacheArg::Alerts)]
        kind: CacheArg,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum CacheArg {
    Alerts,
    Silences,
}

impl From<CacheArg> for CacheKind {
    fn from(arg: CacheArg) -> Self {
        match arg {
            CacheArg::Alerts => CacheKind::Alerts,
            CacheArg::Silences => CacheKind::Silences,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {}", e);
            return ExitCode::from(1);
        }
    };

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("amwatch error: {:#}", e);
            eprintln!("Error: {:#}", e);
            if let Some(hint) = e
                .downcast_ref::<amwatch_core::AmwatchError>()
                .and_then(|e| e.guidance())
            {
                eprintln!("Hint: {}", hint);
            }
            ExitCode::from(1)
        }
    }
}

/// Set up logging based on CLI arguments.
fn setup_logging(cli: &Cli) -> amwatch_core::Result<LogGuard> {
    init_logging(cli.log_dir.clone(), cli.verbose > 0)
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = match cli.config {
        Some(path) => path,
        None => AppConfig::default_path()?,
    };

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config_path).await,
        Command::Once => once(config_path).await,
        Command::Status => status(&config_path).await,
        Command::Cache { kind } => show_cache(&config_path, kind.into()),
    }
}

/// Wire the poll cycle to the adapters named in the config.
fn build_cycle(config_path: &Path, config: &AppConfig) -> anyhow::Result<Arc<PollCycle>> {
    let client = AlertmanagerClient::new(
        ClientConfig::default().with_timeout(config.settings.request_timeout_secs),
    )?;

    let cache: Arc<dyn AlertCache> = match config.cache_path() {
        Some(path) => Arc::new(
            SqliteCache::open(&path)
                .with_context(|| format!("opening cache at {}", path.display()))?,
        ),
        None => Arc::new(MemoryCache::new()),
    };

    let badge: Arc<dyn BadgeSink> = match config.badge_file() {
        Some(path) => Arc::new(FileBadge::new(path)),
        None => Arc::new(LogBadge::new()),
    };

    let notifications: Arc<dyn NotificationSink> = match &config.notify_command {
        Some(program) => Arc::new(CommandNotifier::new(program.clone())),
        None => Arc::new(LogNotifier::new()),
    };

    Ok(Arc::new(PollCycle::new(PollPorts {
        settings: Arc::new(FileSettingsProvider::new(config_path)),
        api: Arc::new(client),
        cache,
        badge,
        notifications,
    })))
}

async fn run(config_path: PathBuf) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(&config_path)?;
    let cycle = build_cycle(&config_path, &config)?;

    let scheduler = PollScheduler::new();
    scheduler.on_tick(cycle.clone());
    let mut interval = config.settings.refresh_interval_secs;
    scheduler.arm(interval)?;

    let (_watcher, mut events) = ConfigWatcher::new(config_path.clone())?;
    let mut known: HashSet<String> = config.instances.iter().map(|i| i.id.clone()).collect();

    info!(
        config = %config_path.display(),
        active = config.active_instance.as_deref().unwrap_or("-"),
        "amwatch started"
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
            Some(event) = events.recv() => match event {
                ConfigEvent::Reloaded { config } => {
                    let ids: HashSet<String> =
                        config.instances.iter().map(|i| i.id.clone()).collect();
                    for removed in known.difference(&ids) {
                        info!(instance = %removed, "Instance removed, dropping its state");
                        cycle.forget_instance(removed);
                    }
                    known = ids;

                    if config.settings.refresh_interval_secs != interval {
                        interval = config.settings.refresh_interval_secs;
                        scheduler.arm(interval)?;
                    }

                    let on_demand = cycle.clone();
                    tokio::spawn(async move {
                        let outcome = on_demand.run_cycle().await;
                        info!(outcome = outcome.label(), "Poll after config reload");
                    });
                }
                ConfigEvent::ValidationError { error, path } => {
                    warn!(path = %path.display(), %error, "Config change rejected");
                }
                ConfigEvent::Removed => {
                    warn!(path = %config_path.display(), "Config file removed");
                }
            }
        }
    }

    scheduler.disarm();
    Ok(ExitCode::SUCCESS)
}

async fn once(config_path: PathBuf) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(&config_path)?;
    let cycle = build_cycle(&config_path, &config)?;

    let outcome = cycle.run_cycle().await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    Ok(match outcome {
        CycleOutcome::Completed(_) | CycleOutcome::Idle => ExitCode::SUCCESS,
        _ => ExitCode::from(2),
    })
}

async fn status(config_path: &Path) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(config_path)?;
    let Some(instance) = config.active() else {
        println!("No active instance");
        return Ok(ExitCode::SUCCESS);
    };

    let client = AlertmanagerClient::new(
        ClientConfig::default().with_timeout(config.settings.request_timeout_secs),
    )?;
    let check = client.check_connection(instance).await;

    println!("Instance: {} ({})", instance.id, instance.base_url());
    println!("Auth:     {}", instance.auth.auth_type());
    println!("Latency:  {}ms", check.latency_ms);
    match (check.status, check.error) {
        (Some(status), _) => {
            println!("Version:  {}", status.version);
            println!("Uptime:   since {}", status.uptime.to_rfc3339());
            println!(
                "Cluster:  {} ({} peers)",
                status.cluster_status, status.cluster_peers
            );
            Ok(ExitCode::SUCCESS)
        }
        (None, error) => {
            println!("Unreachable: {}", error.unwrap_or_default());
            Ok(ExitCode::from(2))
        }
    }
}

fn show_cache(config_path: &Path, kind: CacheKind) -> anyhow::Result<ExitCode> {
    let config = AppConfig::load(config_path)?;
    let Some(path) = config.cache_path() else {
        bail!("no cache_path configured; the in-memory cache is only visible to the running process");
    };
    let Some(instance) = config.active() else {
        println!("No active instance");
        return Ok(ExitCode::SUCCESS);
    };

    let cache = SqliteCache::open(&path)?;
    match cache.get(&instance.id, kind)? {
        Some(entry) => {
            let age = entry.age(Utc::now());
            println!(
                "{} {} for {} (written {}, {}s ago)",
                entry.payload.len(),
                kind,
                instance.id,
                entry.timestamp.to_rfc3339(),
                age.num_seconds()
            );
            println!("{}", serde_json::to_string_pretty(&entry.payload)?);
        }
        None => println!("No cached {} for {}", kind, instance.id),
    }
    Ok(ExitCode::SUCCESS)
}
