//! Docgen Server: document generation backend
//!
//! Main entry point that wires all crates together. `serve` runs the HTTP
//! API (with an embedded worker unless disabled), `worker` runs only the
//! job worker, `migrate` applies database migrations and exits.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing_subscriber::{EnvFilter, fmt};

use docgen_api::AppState;
use docgen_broker::BrokerManager;
use docgen_core::config::AppConfig;
use docgen_core::error::AppError;
use docgen_database::{DatabasePool, Stores};
use docgen_provider::{GeminiClient, OperationPoller};
use docgen_worker::jobs::{
    ProviderCall, QuizGenerationHandler, SearchQueryHandler, ThesisGenerationHandler,
};
use docgen_worker::{CronScheduler, JobExecutor, JobQueue, WorkerRunner};

/// Command line interface.
#[derive(Debug, Parser)]
#[command(name = "docgen-server", version, about = "Docgen document generation backend")]
struct Cli {
    /// Configuration overlay to load from the config directory
    /// (falls back to `DOCGEN_ENV`, then `development`).
    #[arg(long)]
    env: Option<String>,

    /// Directory holding `default.toml` and the overlays.
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// Run the HTTP API (default).
    Serve,
    /// Run only the background worker.
    Worker,
    /// Apply database migrations and exit.
    Migrate,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let env = cli
        .env
        .clone()
        .or_else(|| std::env::var("DOCGEN_ENV").ok())
        .unwrap_or_else(|| "development".to_string());

    let config = match AppConfig::load_from(&cli.config_dir, &env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);
    tracing::info!(env = %env, "Configuration loaded");

    let result = match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Worker => worker(config).await,
        Command::Migrate => migrate(config).await,
    };

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Process-wide handles shared by the API and the worker.
struct Runtime {
    config: Arc<AppConfig>,
    stores: Stores,
    queue: Arc<JobQueue>,
    gemini: Arc<GeminiClient>,
    poller: OperationPoller,
}

async fn build_runtime(config: AppConfig) -> Result<Runtime, AppError> {
    tracing::info!("Starting Docgen v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Job record store ─────────────────────────────────
    let stores = Stores::open(&config.database).await?;

    // ── Step 2: Message broker + queue ───────────────────────────
    tracing::info!("Initializing broker (backend: {})...", config.broker.backend);
    let broker = BrokerManager::new(&config.broker)?;
    let queue = Arc::new(JobQueue::new(broker, config.queue.clone()));

    // ── Step 3: Provider client + poller ─────────────────────────
    let gemini = Arc::new(GeminiClient::new(&config.provider)?);
    let poller = OperationPoller::new(gemini.clone(), config.provider.poll_interval());

    Ok(Runtime {
        config: Arc::new(config),
        stores,
        queue,
        gemini,
        poller,
    })
}

fn build_executor(rt: &Runtime) -> JobExecutor {
    let call = ProviderCall::new(
        rt.gemini.clone(),
        rt.poller.clone(),
        rt.config.provider.max_wait(),
    );

    let mut executor = JobExecutor::new();
    executor.register(Arc::new(ThesisGenerationHandler::new(
        rt.stores.status.clone(),
        rt.stores.theses.clone(),
        call.clone(),
        Arc::clone(&rt.queue),
    )));
    executor.register(Arc::new(QuizGenerationHandler::new(
        rt.stores.theses.clone(),
        call.clone(),
    )));
    executor.register(Arc::new(SearchQueryHandler::new(
        rt.stores.theses.clone(),
        call,
    )));
    executor
}

/// Run the worker runner and the maintenance scheduler until shutdown.
async fn run_worker(rt: &Runtime, shutdown: watch::Receiver<bool>) -> Result<(), AppError> {
    let executor = Arc::new(build_executor(rt));
    let mut scheduler = CronScheduler::new(Arc::clone(&rt.queue), Arc::clone(&executor)).await?;
    scheduler.register_default_tasks(&rt.config.worker).await?;
    scheduler.start().await?;

    let runner = WorkerRunner::new(
        Arc::clone(&rt.queue),
        executor,
        rt.config.worker.clone(),
        format!("worker-{}", std::process::id()),
    );
    runner.run(shutdown).await;

    scheduler.shutdown().await
}

async fn serve(config: AppConfig) -> Result<(), AppError> {
    let rt = Arc::new(build_runtime(config).await?);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, starting graceful shutdown...");
        let _ = shutdown_tx.send(true);
    });

    let worker_handle = if rt.config.worker.enabled {
        let rt = Arc::clone(&rt);
        let rx = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = run_worker(&rt, rx).await {
                tracing::error!("Worker stopped with error: {}", e);
            }
        }))
    } else {
        tracing::info!("Embedded worker disabled");
        None
    };

    let state = AppState::new(
        Arc::clone(&rt.config),
        rt.stores.clone(),
        Arc::clone(&rt.queue),
        rt.poller.clone(),
        rt.gemini.clone(),
    );
    docgen_api::app::serve(state, shutdown_rx).await?;

    if let Some(handle) = worker_handle {
        tracing::info!("Waiting for background worker to finish...");
        let _ = tokio::time::timeout(Duration::from_secs(35), handle).await;
    }

    tracing::info!("Docgen server shut down gracefully");
    Ok(())
}

async fn worker(config: AppConfig) -> Result<(), AppError> {
    let rt = build_runtime(config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received, stopping worker...");
        let _ = shutdown_tx.send(true);
    });

    run_worker(&rt, shutdown_rx).await?;
    tracing::info!("Worker shut down gracefully");
    Ok(())
}

async fn migrate(config: AppConfig) -> Result<(), AppError> {
    let mut db_config = config.database;
    db_config.lazy = false;
    let db = DatabasePool::connect(&db_config).await?;
    docgen_database::migration::run_migrations(db.pool()).await?;
    db.close().await;
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
