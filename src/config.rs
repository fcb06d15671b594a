//! TOML configuration parsing and validation.
//!
//! ```toml
//! [db]
//! path = "./data/docingest.sqlite"
//!
//! [storage]
//! documents_dir = "./data/documents"
//!
//! [chunking]
//! chunk_size = 500
//! overlap = 50
//!
//! [server]
//! bind = "127.0.0.1:8000"
//! max_upload_bytes = 67108864
//! ```
//!
//! `[chunking]` and `[server]` may be omitted; their fields default to the
//! values shown above.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use doc_ingest_core::chunk::{Chunker, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};

/// Environment variable overriding the database path when no config file exists.
pub const DB_PATH_ENV: &str = "DOCINGEST_DB_PATH";
/// Environment variable overriding the documents directory when no config file exists.
pub const STORAGE_DIR_ENV: &str = "DOCINGEST_STORAGE_DIR";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// Directory where uploaded files are written.
    pub documents_dir: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }
}

impl ChunkingConfig {
    /// Build the validated [`Chunker`] for these settings.
    pub fn chunker(&self) -> Result<Chunker> {
        Chunker::new(self.chunk_size, self.overlap).map_err(|e| anyhow::anyhow!("chunking: {}", e))
    }
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
fn default_overlap() -> usize {
    DEFAULT_OVERLAP
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Largest accepted `POST /documents` body; bigger uploads get 413.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

/// 64 MiB.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}
fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl Config {
    /// Defaults used when no config file is present, with the database path
    /// and documents directory taken from the environment when set.
    pub fn from_env() -> Self {
        let db_path = std::env::var_os(DB_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/docingest.sqlite"));
        let documents_dir = std::env::var_os(STORAGE_DIR_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("./data/documents"));

        Self {
            db: DbConfig { path: db_path },
            storage: StorageConfig { documents_dir },
            chunking: ChunkingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    validate(&config)?;
    Ok(config)
}

/// Like [`load_config`], but falls back to [`Config::from_env`] when the
/// file does not exist. A file that exists but is invalid is still an error.
pub fn load_config_or_default(path: &Path) -> Result<Config> {
    if path.exists() {
        return load_config(path);
    }
    tracing::debug!(
        "config file {} not found, using defaults",
        path.display()
    );
    let config = Config::from_env();
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.chunking.chunk_size == 0 {
        bail!("chunking.chunk_size must be > 0");
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        bail!(
            "chunking.overlap ({}) must be smaller than chunking.chunk_size ({})",
            config.chunking.overlap,
            config.chunking.chunk_size
        );
    }
    if config.server.bind.trim().is_empty() {
        bail!("server.bind must not be empty");
    }
    if config.server.max_upload_bytes == 0 {
        bail!("server.max_upload_bytes must be > 0");
    }
    Ok(())
}
