//! # doc-ingest CLI (`docingest`)
//!
//! ## Usage
//!
//! ```bash
//! docingest --config ./config/docingest.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `docingest init` | Create the SQLite database and run schema migrations |
//! | `docingest upload <path>` | Store a file and register a pending document |
//! | `docingest list` | List documents, newest first |
//! | `docingest get <id>` | Show one document |
//! | `docingest process <id>` | Chunk a document's stored text |
//! | `docingest chunks <id>` | Print a document's chunks in order |
//! | `docingest delete <id>` | Remove a document, its chunks, and its file |
//! | `docingest serve` | Start the HTTP API |
//!
//! If the config file does not exist, defaults are used; the database path
//! and documents directory can then be set with `DOCINGEST_DB_PATH` and
//! `DOCINGEST_STORAGE_DIR`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use doc_ingest::{commands, config, migrate, server};

/// doc-ingest: upload documents, split them into overlapping chunks, and
/// serve both over a REST API.
#[derive(Parser)]
#[command(name = "docingest", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/docingest.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Upload a file as a new pending document.
    Upload {
        /// File to upload.
        path: PathBuf,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        description: Option<String>,

        /// Tag to attach; repeat for several.
        #[arg(long = "tag")]
        tags: Vec<String>,
    },

    /// List documents, newest first.
    List {
        #[arg(long, default_value_t = 20)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        offset: u32,
    },

    /// Show a document by id.
    Get { id: String },

    /// Chunk a document, replacing any previous chunks.
    Process { id: String },

    /// Print a document's chunks in position order.
    Chunks { id: String },

    /// Delete a document together with its chunks and stored file.
    Delete { id: String },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "doc_ingest=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cfg = config::load_config_or_default(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Upload {
            path,
            title,
            description,
            tags,
        } => {
            commands::run_upload(&cfg, &path, title, description, tags).await?;
        }
        Commands::List { limit, offset } => {
            commands::run_list(&cfg, limit, offset).await?;
        }
        Commands::Get { id } => {
            commands::run_get(&cfg, &id).await?;
        }
        Commands::Process { id } => {
            commands::run_process(&cfg, &id).await?;
        }
        Commands::Chunks { id } => {
            commands::run_chunks(&cfg, &id).await?;
        }
        Commands::Delete { id } => {
            commands::run_delete(&cfg, &id).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
