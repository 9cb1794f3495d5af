//! Application configuration.
//!
//! Loaded from a TOML file; every field has a default so an empty file (or
//! no file at all) yields a working local setup.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

use crate::infra::sqlite::schema::TableNames;
use crate::query::registry::ColumnMatching;
use crate::query::tables::Registries;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub documents: DocumentsConfig,
    #[serde(default)]
    pub column_lookup: ColumnLookupConfig,
    #[serde(default)]
    pub scraper: ScraperConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Front-end origins allowed by CORS.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_allowed_origins() -> Vec<String> {
    vec![
        "http://localhost:5173".to_string(),
        "http://localhost:4280".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding the grid tables; defaults to the user data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub tables: TableNames,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentsConfig {
    /// SQLite file holding scraper documents; defaults to the user data dir.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// Column-id matching per grid. The comparison grid historically accepted
/// ids in any casing while the others required the exact id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnLookupConfig {
    #[serde(default)]
    pub full_keplero: ColumnMatching,
    #[serde(default)]
    pub second_table: ColumnMatching,
    #[serde(default = "default_compare_matching")]
    pub keplero_compare: ColumnMatching,
    #[serde(default)]
    pub protocollo_grouped: ColumnMatching,
}

fn default_compare_matching() -> ColumnMatching {
    ColumnMatching::IgnoreCase
}

impl Default for ColumnLookupConfig {
    fn default() -> Self {
        Self {
            full_keplero: ColumnMatching::Exact,
            second_table: ColumnMatching::Exact,
            keplero_compare: default_compare_matching(),
            protocollo_grouped: ColumnMatching::Exact,
        }
    }
}

impl ColumnLookupConfig {
    pub fn registries(&self) -> Registries {
        Registries::new(
            self.full_keplero,
            self.second_table,
            self.keplero_compare,
            self.protocollo_grouped,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScraperConfig {
    #[serde(default = "default_scraper_base_url")]
    pub base_url: String,
    #[serde(default = "default_login_path")]
    pub login_path: String,
    #[serde(default = "default_data_path")]
    pub data_path: String,
    #[serde(default)]
    pub username: String,
    /// Read from the file but never written back out.
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pause between two data page requests.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_scraper_base_url() -> String {
    "https://www.faschim.it".to_string()
}

fn default_login_path() -> String {
    "/login".to_string()
}

fn default_data_path() -> String {
    "/api/pratiche".to_string()
}

fn default_page_size() -> u32 {
    100
}

fn default_page_delay_ms() -> u64 {
    500
}

fn default_connect_timeout_secs() -> u64 {
    30
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: default_scraper_base_url(),
            login_path: default_login_path(),
            data_path: default_data_path(),
            username: String::new(),
            password: String::new(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay_ms(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ScraperConfig {
    pub fn login_url(&self) -> String {
        join_url(&self.base_url, &self.login_path)
    }

    pub fn data_url(&self) -> String {
        join_url(&self.base_url, &self.data_path)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

impl AppConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        Self::from_toml(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.database.tables.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize config")
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database.path {
            Some(path) => Ok(path.clone()),
            None => Ok(default_data_dir()?.join("keplero.sqlite")),
        }
    }

    pub fn documents_path(&self) -> Result<PathBuf> {
        match &self.documents.path {
            Some(path) => Ok(path.clone()),
            None => Ok(default_data_dir()?.join("scraper.sqlite")),
        }
    }
}

pub fn default_data_dir() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("it", "Faschim", "KepleroPivot")
        .context("failed to resolve project data directory")?;
    Ok(dirs.data_dir().to_path_buf())
}

pub fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("it", "Faschim", "KepleroPivot")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}
