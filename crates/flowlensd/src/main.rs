//! flowlensd: the Flowlens daemon.
//!
//! Single binary that assembles the Flowlens pieces:
//! - Workflow store (JSON snapshot)
//! - Metric registry with the built-in sources
//! - Query engine
//! - Prometheus collector
//! - HTTP API (datasource + `/metrics`)
//!
//! # Usage
//!
//! ```text
//! flowlensd serve --config /etc/flowlens/flowlens.toml --snapshot airflow.json
//! flowlensd init-config > flowlens.toml
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use flowlens_api::ApiState;
use flowlens_core::{FlowlensConfig, LogConfig, LogFormat};
use flowlens_metrics::MetricsCollector;
use flowlens_query::{QueryEngine, Registry};
use flowlens_state::{MemoryStore, WorkflowStore};

#[derive(Parser)]
#[command(name = "flowlensd", about = "Flowlens workflow metrics daemon")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the datasource API and the Prometheus exposition.
    Serve {
        /// Path to flowlens.toml. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Listen address, overriding `server.listen`.
        #[arg(long)]
        listen: Option<String>,

        /// Snapshot file, overriding `store.snapshot`.
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
    /// Print the default configuration as TOML.
    InitConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            config,
            listen,
            snapshot,
        } => {
            let mut config = match config {
                Some(path) => FlowlensConfig::from_file(&path)?,
                None => FlowlensConfig::default(),
            };
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            if snapshot.is_some() {
                config.store.snapshot = snapshot;
            }
            init_tracing(&config.log);
            run_serve(config).await
        }
        Command::InitConfig => {
            print!("{}", FlowlensConfig::default().to_toml_string()?);
            Ok(())
        }
    }
}

fn init_tracing(log: &LogConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn open_store(config: &FlowlensConfig) -> anyhow::Result<Arc<dyn WorkflowStore>> {
    match &config.store.snapshot {
        Some(path) => {
            let store = MemoryStore::open(path)?;
            info!(path = ?path, "snapshot store opened");
            Ok(Arc::new(store))
        }
        None => {
            info!("no snapshot configured, serving an empty store");
            Ok(Arc::new(MemoryStore::default()))
        }
    }
}

fn build_state(config: &FlowlensConfig, store: Arc<dyn WorkflowStore>) -> ApiState {
    let mut builder = Registry::builder();
    flowlens_sources::register_builtin(&mut builder, store.clone());
    let registry = builder.build();
    info!(readers = ?registry.reader_names().collect::<Vec<_>>(), "registry built");

    let engine = QueryEngine::new(Arc::new(registry))
        .with_default_target(config.server.default_target.clone());
    let metrics = MetricsCollector::new(store.clone(), config.exporter.xcom_params.clone());

    ApiState {
        engine,
        store,
        metrics: Arc::new(metrics),
    }
}

async fn run_serve(config: FlowlensConfig) -> anyhow::Result<()> {
    info!("Flowlens daemon starting");

    let store = open_store(&config)?;
    let state = build_state(&config, store);

    let prefix = config.server.normalized_prefix();
    let router = flowlens_api::build_router(state, &prefix);

    let listener = tokio::net::TcpListener::bind(&config.server.listen).await?;
    info!(addr = %listener.local_addr()?, prefix = %prefix, "API server starting");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
            info!("shutdown signal received");
        })
        .await?;

    info!("Flowlens daemon stopped");
    Ok(())
}
