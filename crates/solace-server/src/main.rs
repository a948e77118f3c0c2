//! solace server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), loads the
//! retrieval index, opens the SQLite chat log, and serves `POST /chat`.
//!
//! # Building the index
//!
//! The index file is derived from the context CSV with the configured
//! embedding model:
//!
//! ```sh
//! cargo run -p solace-server --bin solace -- build-index
//! ```

use std::{path::PathBuf, sync::Arc};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use solace_rag::{HttpEmbedder, HttpGenerator, RagPipeline, RetrievalIndex, builder::build_index};
use solace_server::{AppState, ServerConfig};
use solace_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Solace retrieval-augmented chat server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the chat API (default).
  Serve,
  /// Embed the context CSV and write the index file.
  BuildIndex {
    /// Context CSV to read; defaults to `context_path` from the config.
    #[arg(long)]
    context: Option<PathBuf>,
    /// Index file to write; defaults to `index_path` from the config.
    #[arg(long)]
    output:  Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?
    .with_expanded_paths();

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(config).await,
    Command::BuildIndex { context, output } => {
      let context = context.unwrap_or_else(|| config.context_path.clone());
      let output = output.unwrap_or_else(|| config.index_path.clone());
      let embedder = HttpEmbedder::new(config.embedding.clone())
        .context("failed to build embedding client")?;

      let report = build_index(&embedder, &context, &output)
        .await
        .with_context(|| format!("failed to build index from {context:?}"))?;
      println!(
        "indexed {} of {} rows (dimension {}) into {}",
        report.embedded,
        report.rows,
        report.dimension,
        output.display()
      );
      Ok(())
    }
  }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
  let rate_limit = config
    .rate_limit
    .to_rate_limit()
    .context("invalid rate_limit configuration")?;

  // Both files are required; the server must not start without them.
  let index = RetrievalIndex::load(&config.index_path, &config.context_path).with_context(|| {
    format!(
      "failed to load retrieval index {:?} with context {:?}",
      config.index_path, config.context_path
    )
  })?;
  tracing::info!(rows = index.len(), dimension = index.dimension(), "retrieval index loaded");

  let embedder =
    HttpEmbedder::new(config.embedding.clone()).context("failed to build embedding client")?;
  let generator =
    HttpGenerator::new(config.generation.clone()).context("failed to build generation client")?;
  let pipeline = RagPipeline::new(embedder, generator, Arc::new(index))
    .with_top_k(config.top_k)
    .with_sampling(config.sampling);

  let store = SqliteStore::open(&config.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", config.store_path))?;

  let state = AppState {
    store: Arc::new(store),
    responder: Arc::new(pipeline),
    rate_limit,
  };

  let app = solace_server::router(state);
  let address = config.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}
