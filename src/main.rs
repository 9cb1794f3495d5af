//! Keplero pivot backend.
//!
//! Serves paged, filtered and sorted grid data out of SQLite and caches
//! searches pulled from the Faschim portal.

mod api;
mod config;
mod domain;
mod infra;
mod platform;
mod query;
mod usecase;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::{default_config_path, AppConfig};
use crate::infra::http::faschim::FaschimClient;
use crate::infra::sqlite::documents::SqliteDocumentStore;
use crate::infra::sqlite::repo::SqliteRepo;
use crate::query::tables::Grid;
use crate::usecase::ports::documents::DocumentStore;
use crate::usecase::ports::repo::PivotRepository;
use crate::usecase::services::import_service::ImportService;
use crate::usecase::services::query_service::QueryService;
use crate::usecase::services::scraper_service::ScraperService;

#[derive(Parser, Debug)]
#[command(name = "keplero-pivot", version, about = "Keplero pivot grid backend")]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "KEPLERO_LOG_LEVEL", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Host address to bind to
        #[arg(short = 'H', long, env = "KEPLERO_HOST")]
        host: Option<String>,

        /// Port to listen on
        #[arg(short = 'p', long, env = "KEPLERO_PORT")]
        port: Option<u16>,
    },
    /// Load a CSV or XLSX file into one of the tables
    Import {
        #[arg(long, value_enum)]
        table: ImportTable,

        #[arg(long, value_name = "PATH")]
        file: PathBuf,

        /// Worksheet name for XLSX files; the first sheet otherwise
        #[arg(long)]
        sheet: Option<String>,

        /// Empty the table before loading
        #[arg(long)]
        replace: bool,
    },
    /// Print the effective configuration as TOML
    Config,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ImportTable {
    FullKeplero,
    SecondTable,
    KepleroCompare,
}

impl From<ImportTable> for Grid {
    fn from(table: ImportTable) -> Self {
        match table {
            ImportTable::FullKeplero => Grid::FullKeplero,
            ImportTable::SecondTable => Grid::SecondTable,
            ImportTable::KepleroCompare => Grid::KepleroCompare,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = load_config(args.config.as_deref())?;

    match args.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            run_server(config).await
        }
        Command::Import {
            table,
            file,
            sheet,
            replace,
        } => {
            let service = ImportService::new(config.database_path()?, config.database.tables);
            let result = service.import_file(table.into(), &file, sheet.as_deref(), replace)?;
            if !result.skipped_headers.is_empty() {
                warn!(skipped = ?result.skipped_headers, "some headers had no matching column");
            }
            info!(table = %result.table, rows = result.row_count, "imported");
            Ok(())
        }
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{log_level},tower_http=info")));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(explicit: Option<&std::path::Path>) -> Result<AppConfig> {
    if let Some(path) = explicit {
        info!(path = %path.display(), "loading configuration");
        return AppConfig::from_file(path);
    }
    match default_config_path() {
        Some(path) if path.exists() => {
            info!(path = %path.display(), "loading configuration");
            AppConfig::from_file(&path)
        }
        _ => Ok(AppConfig::default()),
    }
}

async fn run_server(config: AppConfig) -> Result<()> {
    let db_path = config.database_path()?;
    let documents_path = config.documents_path()?;
    info!(database = %db_path.display(), documents = %documents_path.display(), "opening storage");

    let repo = SqliteRepo::new(
        db_path,
        config.database.tables.clone(),
        config.column_lookup.registries(),
    );
    repo.init().context("failed to initialize database")?;
    let repo: Arc<dyn PivotRepository> = Arc::new(repo);

    let store: Arc<dyn DocumentStore> = Arc::new(
        SqliteDocumentStore::open(&documents_path).context("failed to open document store")?,
    );
    let client = FaschimClient::new(config.scraper.clone())?;

    let state = AppState {
        query: QueryService::new(repo),
        scraper: Arc::new(ScraperService::new(client, store)),
    };
    let router = api::router(state, &config.server.allowed_origins);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("invalid server address")?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "listening");

    api::serve(listener, router, shutdown_signal()).await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
