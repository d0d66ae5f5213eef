use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, ValueEnum};

use quanta_runtime::{
    ChatOrchestrator, ChatOrchestratorBuilder, EventHub, FileStore, MemoryStore,
    ProviderRegistry, ResearchStore, ResilientPersistence, RuntimeConfig, UnavailableStore,
};
use quanta_server::{http, AppState, Environment};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum StorageKind {
    /// In-process, lost on restart
    Memory,
    /// One JSON file per session under `--storage-dir`
    File,
    /// No storage; chat runs in degraded mode
    None,
}

#[derive(Debug, Parser)]
#[command(name = "quanta", version, about = "Physics research assistant server")]
struct Args {
    #[arg(long, env = "QUANTA_HTTP_ADDR", default_value = "127.0.0.1:8080")]
    http_addr: String,

    /// YAML runtime configuration; defaults apply when absent
    #[arg(long, env = "QUANTA_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long, env = "QUANTA_STORAGE", value_enum, default_value = "memory")]
    storage: StorageKind,

    #[arg(long, env = "QUANTA_STORAGE_DIR", default_value = "./data")]
    storage_dir: PathBuf,

    #[arg(long, env = "QUANTA_ENV", value_enum, default_value = "production")]
    environment: Environment,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => RuntimeConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => RuntimeConfig::default(),
    };
    tracing::info!(
        model = %config.completion.model,
        max_retries = config.retry.max_retries,
        retry_ceiling = ?config.retry.timeout_ceiling(),
        "runtime configuration loaded"
    );

    let store: Arc<dyn ResearchStore> = match args.storage {
        StorageKind::Memory => Arc::new(MemoryStore::new()),
        StorageKind::File => Arc::new(FileStore::new(&args.storage_dir)),
        StorageKind::None => Arc::new(UnavailableStore::default()),
    };
    let hub = Arc::new(EventHub::new());
    let persistence = ResilientPersistence::new();

    let chat = build_chat(&config, store.clone(), hub.clone(), persistence.clone());

    let app = http::router(AppState {
        chat,
        store,
        hub,
        persistence,
        environment: args.environment,
    });

    let listener = tokio::net::TcpListener::bind(&args.http_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.http_addr))?;
    tracing::info!(addr = %args.http_addr, environment = args.environment.as_str(), "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .context("http server crashed")?;

    Ok(())
}

/// Chat is disabled, not fatal, when the provider cannot be built.
fn build_chat(
    config: &RuntimeConfig,
    store: Arc<dyn ResearchStore>,
    hub: Arc<EventHub>,
    persistence: ResilientPersistence,
) -> Option<Arc<ChatOrchestrator>> {
    let provider = match ProviderRegistry::with_defaults().from_settings(&config.provider) {
        Ok(provider) => provider,
        Err(e) => {
            tracing::warn!(provider = %config.provider.kind, error = %e, "chat disabled");
            return None;
        }
    };

    ChatOrchestratorBuilder::new()
        .provider(provider)
        .store(store)
        .hub(hub)
        .persistence(persistence)
        .config(config.clone())
        .build()
        .map(Arc::new)
        .map_err(|e| tracing::warn!(error = %e, "chat disabled"))
        .ok()
}

fn init_tracing() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_env("QUANTA_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))
}
