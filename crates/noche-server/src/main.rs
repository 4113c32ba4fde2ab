//! noche-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, and serves the match API over HTTP. Operator subcommands seed the
//! directory tables and manage bearer tokens.
//!
//! ```text
//! noche-server serve --seed demo.json
//! noche-server issue-token U1
//! noche-server revoke-token <token>
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use noche_core::{engine::SwipeEngine, id::UserId};
use noche_server::{ServerConfig, expand_tilde, load_config, seed::SeedFile, tasks};
use noche_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Noche match server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the HTTP API (the default).
  Serve {
    /// Apply a JSON seed file before serving.
    #[arg(long, value_name = "FILE")]
    seed: Option<PathBuf>,
  },
  /// Apply a JSON seed file and exit.
  Seed {
    file: PathBuf,
  },
  /// Issue a bearer token for a user and print it.
  IssueToken {
    user: String,
  },
  /// Revoke a previously issued bearer token.
  RevokeToken {
    token: String,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = load_config(&cli.config).context("failed to load configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {}", parent.display()))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve { seed: None }) {
    Command::Serve { seed } => {
      if let Some(path) = seed {
        apply_seed(&store, &path).await?;
      }
      serve(store, server_cfg).await
    }
    Command::Seed { file } => apply_seed(&store, &file).await,
    Command::IssueToken { user } => {
      let token = store
        .issue_token(&UserId::from(user))
        .await
        .context("failed to issue token")?;
      println!("{token}");
      Ok(())
    }
    Command::RevokeToken { token } => {
      let revoked = store
        .revoke_token(&token)
        .await
        .context("failed to revoke token")?;
      if revoked {
        println!("revoked");
        Ok(())
      } else {
        anyhow::bail!("token is unknown or already revoked")
      }
    }
  }
}

async fn apply_seed(store: &SqliteStore, path: &Path) -> anyhow::Result<()> {
  let seed = SeedFile::from_path(path)
    .with_context(|| format!("failed to load seed file {}", path.display()))?;
  seed.apply(store).await.context("failed to apply seed")?;
  Ok(())
}

async fn serve(store: SqliteStore, server_cfg: ServerConfig) -> anyhow::Result<()> {
  let engine = Arc::new(SwipeEngine::new(Arc::new(store), server_cfg.engine.clone()));

  let _logger = tasks::spawn_match_logger(&engine);
  let sweeper = tasks::spawn_sweeper(engine.clone(), server_cfg.sweep.clone());

  let app = noche_server::app(engine);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let result = axum::serve(listener, app).await.context("server error");
  sweeper.abort();
  result
}
