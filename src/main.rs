//! Application entry point for the `winecast` service.
//!
//! The binary has two modes:
//! - `winecast ingest` fetches weather and wine descriptions, cleans and
//!   merges them into `merged_data.json`, and archives the merged document
//!   in Postgres
//! - `winecast serve` (default) loads that merged document and serves the
//!   wine pairing API backed by a hosted language model
//!
//! Startup in both modes:
//! - Loading configuration from environment variables or `.env`
//! - Initializing structured logging/tracing
//! - Establishing a PostgreSQL connection pool and creating the schema
//!
//! # Environment Variables
//! See [`config::load_from_env`] for the full list. The four API/DB
//! credentials are required; a missing one aborts startup.
//! - `AXUM_LOG_LEVEL` (optional) – log verbosity (default: `debug`)
//! - `AXUM_SPAN_EVENTS` (optional) – span event mode for tracing
//!
//! This module follows the Explicit Module Boundary Pattern (EMBP) by
//! delegating schema setup to `schema`, configuration parsing to `config`,
//! ingestion to `ingest`, and route registration to `routes`.
use std::{env, io::IsTerminal, net::SocketAddr, sync::Arc, time::Duration};

use axum::Router;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use anyhow::{Context, Result};

mod config;
mod ingest;
mod llm;
mod models;
mod recommend;
mod routes;
mod schema;
mod store;

pub use config::Config;

// Re-exported for the submodules so they depend on this gateway rather than
// on each other's file layout.
pub use models::{
    clean_weather_data, AnalysisSummary, MergedDataset, NewSummary, WeatherRecord,
};
pub use recommend::{RecommendError, Recommendation, RecommendationService};
pub use store::SummaryStore;

// ---

#[derive(Debug, Parser)]
#[command(name = "winecast", version, about = "Weather-driven wine pairing service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the pairing API (default)
    Serve,
    /// Fetch, clean and merge upstream data, then archive it
    Ingest {
        /// Write the JSON artifacts only; do not touch the database
        #[arg(long)]
        skip_db: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // ---
    init_tracing();
    dotenv().ok();

    let cli = Cli::parse();

    let cfg = config::load_from_env()?;
    cfg.log_config();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(cfg).await,
        Command::Ingest { skip_db } => {
            let pool = if skip_db {
                None
            } else {
                Some(connect(&cfg).await?)
            };
            ingest::run(&cfg, pool.as_ref()).await?;
            Ok(())
        }
    }
}

async fn serve(cfg: Config) -> Result<()> {
    // ---
    let merged_path = ingest::merged_path(&cfg.data_dir);
    let dataset = MergedDataset::load(&merged_path)?;
    tracing::info!(
        "Loaded merged dataset from {} ({} weather, {} wine entries)",
        merged_path.display(),
        dataset.weather.len(),
        dataset.wine.len()
    );

    let pool = connect(&cfg).await?;

    let store: Arc<dyn SummaryStore> = Arc::new(store::PgSummaryStore::new(
        pool,
        Duration::from_secs(cfg.db_timeout_secs),
    ));
    let model = llm::OpenAiChat::new(
        &cfg.openai_api_key,
        &cfg.openai_api_url,
        &cfg.openai_model,
        Duration::from_secs(cfg.llm_timeout_secs),
    )?;
    let service = RecommendationService::new(Arc::new(dataset), store.clone(), Arc::new(model));

    // Build app from routes gateway (EMBP)
    let app: Router = routes::router(routes::AppState {
        service: Arc::new(service),
        store,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connect the pool and make sure the schema exists.
async fn connect(cfg: &Config) -> Result<PgPool> {
    // ---
    tracing::info!("Attempting to connect to database");

    let pool = PgPoolOptions::new()
        .max_connections(cfg.db_pool_max)
        .acquire_timeout(Duration::from_secs(cfg.db_timeout_secs))
        .connect(&cfg.db_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Successfully connected to database");

    schema::create_schema(&pool).await?;
    Ok(pool)
}

// ---

/// Initialize the global tracing subscriber for structured logging.
///
/// This function configures the [`tracing_subscriber`] with:
/// - Log target, file, and line number output enabled
/// - Color output controlled by TTY detection and `FORCE_COLOR` env var:
///   - `FORCE_COLOR=1|true|yes`: force colors on
///   - `FORCE_COLOR=0|false|no`: force colors off
///   - unset or other values: auto-detect TTY
/// - Span event emission mode controlled by the `AXUM_SPAN_EVENTS` env var:
///   - `"full"`       : emit ENTER, EXIT, and CLOSE events with timing
///   - `"enter_exit"` : emit ENTER and EXIT only
///   - unset or other values: emit CLOSE events only (default)
/// - Log level controlled by the `AXUM_LOG_LEVEL` env var
///
/// This should be called once at application startup before any logging
/// or tracing macros are invoked.
fn init_tracing() {
    // ---
    let span_events = match env::var("AXUM_SPAN_EVENTS").as_deref() {
        Ok("full") => FmtSpan::FULL,
        Ok("enter_exit") => FmtSpan::ENTER | FmtSpan::EXIT,
        _ => FmtSpan::CLOSE,
    };

    let use_color = match env::var("FORCE_COLOR").as_deref() {
        Ok("1") | Ok("true") | Ok("yes") => true,
        Ok("0") | Ok("false") | Ok("no") => false,
        _ => std::io::stdout().is_terminal(),
    };

    // Use RUST_LOG if available, otherwise fall back to AXUM_LOG_LEVEL
    let env_filter = if env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = match env::var("AXUM_LOG_LEVEL").ok().as_deref() {
            Some("trace") => "trace",
            Some("debug") => "debug",
            Some("info") => "info",
            Some("warn") => "warn",
            Some("error") => "error",
            _ => "debug",
        };
        EnvFilter::new(format!("{level},sqlx::query=warn,hyper=info,reqwest=info"))
    };

    tracing_subscriber::fmt()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(span_events)
        .with_env_filter(env_filter)
        .with_ansi(use_color)
        .compact()
        .init();
}
