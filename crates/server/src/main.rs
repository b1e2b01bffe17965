//! clipforge-server — the pipeline process: HTTP job submission surface,
//! single-flight worker, staleness sweeper and auto-fetch scheduler.

mod api;
mod router;
mod state;

use std::sync::Arc;

use clap::Parser;
use tracing::info;

use clipforge_core::Config;
use clipforge_ingest::HttpFeedFetcher;
use clipforge_llm::{ModelHandle, OpenAiModel};
use clipforge_queue::{AutoFetchScheduler, Sweeper, Worker};
use clipforge_store::MemoryStore;

use crate::state::AppState;

/// Short-video script generation pipeline.
#[derive(Parser, Debug)]
#[command(name = "clipforge-server", version, about)]
struct Cli {
    /// Port to listen on (overrides PORT).
    #[arg(long)]
    port: Option<u16>,

    /// Disable the automatic fetch-topics scheduler.
    #[arg(long, env = "NO_AUTO_FETCH", default_value_t = false)]
    no_auto_fetch: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    clipforge_core::config::load_dotenv();
    let mut config = Config::from_env();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    config.log_summary();

    let store = Arc::new(MemoryStore::new());
    let fetcher = Arc::new(HttpFeedFetcher::new(config.ingest.fetch_timeout_secs));

    let backend: Option<Arc<dyn clipforge_llm::LanguageModel>> = match &config.llm.api_key {
        Some(key) => {
            info!(model = %config.llm.model, "language model configured");
            Some(Arc::new(OpenAiModel::new(
                key.clone(),
                config.llm.base_url.clone(),
                config.llm.embedding_model.clone(),
                config.llm.max_tokens,
            )))
        }
        None => {
            info!("no LLM_API_KEY — generation runs on deterministic templates");
            None
        }
    };
    let model = ModelHandle::new(backend, config.llm.model.clone(), config.llm.temperature);

    // Background services, each with an explicit lifecycle.
    let worker = Worker::new(
        store.clone(),
        fetcher,
        model,
        config.quota,
        config.ingest.clone(),
        config.worker,
    );
    let worker_handle = worker.start();

    let sweeper = Sweeper::new(store.clone(), config.worker);
    let sweeper_handle = sweeper.start();

    let scheduler = if cli.no_auto_fetch {
        None
    } else {
        let scheduler = AutoFetchScheduler::new(store.clone(), config.quota, config.worker);
        let handle = scheduler.start();
        Some((scheduler, handle))
    };

    let app_state = Arc::new(AppState {
        store,
        config: config.clone(),
    });
    let app = router::build_router(app_state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr = %addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("shutting down background services");
    worker.shutdown();
    sweeper.shutdown();
    let _ = worker_handle.await;
    let _ = sweeper_handle.await;
    if let Some((scheduler, handle)) = scheduler {
        scheduler.shutdown();
        let _ = handle.await;
    }

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install ctrl-c handler");
    }
}
