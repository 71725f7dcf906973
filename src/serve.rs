use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context as _;
use axum::{extract::FromRef, routing::get, Router};
use clap::Parser;
use clap_verbosity_flag::{log::LevelFilter, InfoLevel, Verbosity};
use figment::{providers::Format as _, Figment};
use sqlx::SqlitePool;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

pub use super::error::Error;
use super::{
    chain::{ContractReader, Disconnected, RpcContracts},
    config::AppConfig,
    db::establish_pool,
    indexer::{self, IndexerHandle},
    live::LiveReads,
    read_model::{LocalSnapshot, ReadModel, TokenRegistry},
    store::SharedIndex,
};

/// The application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Parser, Debug, Clone)]
/// Command line arguments.
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, default_value = "default.toml")]
    pub config: PathBuf,
    /// The verbosity level.
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,
}

#[derive(Clone, FromRef)]
/// The application state, shared across all routes.
pub struct AppState {
    /// The application configuration.
    pub(crate) config: AppConfig,
    /// The event journal.
    pub db: SqlitePool,
    /// Assembles views over the index.
    pub read_model: ReadModel,
    /// Submits events to the single writer.
    pub indexer: IndexerHandle,
}

/// Create the directory holding a file-backed SQLite database.
async fn create_db_dir(url: &str) -> anyhow::Result<()> {
    let Some(path) = url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    let path = path.split('?').next().unwrap_or(path);
    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

/// Open the journal, rebuild the index, ingest the configured events file and build the router.
pub(crate) async fn app(config: &AppConfig, reader: Arc<dyn ContractReader>) -> anyhow::Result<Router> {
    create_db_dir(&config.db).await?;
    let db = establish_pool(&config.db).await.context("failed to open event journal")?;

    let index = SharedIndex::default();
    _ = indexer::replay(&db, &index).await.context("failed to replay journal")?;
    let (_indexer, handle) = indexer::spawn(db.clone(), index.clone());

    if let Some(path) = &config.events {
        let events = indexer::read_events_file(path).await?;
        let report = handle.ingest(events).await.context("failed to ingest events file")?;
        info!(
            "ingested {}: {} applied, {} already journaled, {} dropped",
            path.display(),
            report.applied,
            report.duplicate,
            report.dropped
        );
    }

    let live = LiveReads::new(reader, Duration::from_secs(config.live_cache_secs));
    let read_model = ReadModel::new(
        Arc::new(LocalSnapshot::new(index)),
        Arc::new(live),
        TokenRegistry::new(&config.tokens),
        config.contracts.clone(),
    );

    Ok(Router::new()
        .route("/", get(super::index))
        .merge(super::endpoints::routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(AppState {
            config: config.clone(),
            db,
            read_model,
            indexer: handle,
        }))
}

/// The main application entry point.
pub async fn run() -> anyhow::Result<()> {
    let args = Args::parse();

    // Set up trace logging to console and account for the user-provided verbosity flag.
    if args.verbosity.log_level_filter() != LevelFilter::Off {
        let lvl = match args.verbosity.log_level_filter() {
            LevelFilter::Error => tracing::Level::ERROR,
            LevelFilter::Warn => tracing::Level::WARN,
            LevelFilter::Info | LevelFilter::Off => tracing::Level::INFO,
            LevelFilter::Debug => tracing::Level::DEBUG,
            LevelFilter::Trace => tracing::Level::TRACE,
        };
        tracing_subscriber::fmt().with_max_level(lvl).init();
    }

    if !args.config.exists() {
        // Not fatal: every setting can also come from the environment.
        warn!("configuration file {} does not exist", args.config.display());
    }

    // Read and parse the user-provided configuration.
    let config: AppConfig = Figment::new()
        .admerge(figment::providers::Toml::file(args.config))
        .admerge(figment::providers::Env::prefixed("HERMIS_"))
        .extract()
        .context("failed to load configuration")?;

    // Initialize metrics reporting.
    super::metrics::setup(config.metrics.as_ref()).context("failed to set up metrics exporter")?;

    let reader: Arc<dyn ContractReader> = match &config.rpc_url {
        Some(url) => {
            info!("live contract reads via {url}");
            Arc::new(RpcContracts::connect(url.clone()))
        }
        None => {
            warn!("no rpc_url configured; live guard and strategy reads will use fallbacks");
            Arc::new(Disconnected)
        }
    };

    let app = app(&config, reader).await?;

    let addr = config
        .listen_address
        .unwrap_or(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8000));
    info!("listening on {addr}");

    let listener = TcpListener::bind(&addr)
        .await
        .context("failed to bind address")?;

    let serve = tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .await
            .context("failed to serve app")
    });

    serve
        .await
        .map_err(Into::into)
        .and_then(|r| r)
        .context("failed to serve app")
}
