//! `noche`: command-line client for the Noche match API.
//!
//! # Usage
//!
//! ```text
//! noche --url http://localhost:8080 --token <token> feed E1
//! noche like E1 U2
//! noche --config ~/.config/noche/config.toml matches E1
//! ```

mod client;
mod settings;

use anyhow::Result;
use clap::{Parser, Subcommand};
use client::ApiClient;
use noche_core::decision::DecisionKind;
use settings::ConfigFile;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "noche", about = "Command-line client for the Noche match API")]
struct Args {
  /// Path to a TOML config file (url, token).
  #[arg(short, long, value_name = "FILE")]
  config: Option<std::path::PathBuf>,

  /// Base URL of the noche server (default: http://localhost:8080).
  #[arg(long, env = "NOCHE_URL")]
  url: Option<String>,

  /// Bearer token. Falls back to the config file, then to `NOCHE_TOKEN`.
  #[arg(long)]
  token: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show the next undecided participants of an event.
  Feed {
    event: String,
    #[arg(short, long)]
    limit: Option<usize>,
  },
  /// Like a participant.
  Like { event: String, user: String },
  /// Dislike a participant.
  Dislike { event: String, user: String },
  /// List your matches in an event.
  Matches { event: String },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let file_cfg = match &args.config {
    Some(path) => ConfigFile::load(path)?,
    None => ConfigFile::default(),
  };
  let client = ApiClient::new(settings::api_config(args.url, args.token, file_cfg))?;

  match args.command {
    Command::Feed { event, limit } => {
      let page = client.feed(&event, limit).await?;
      if page.participants.is_empty() {
        println!("Nobody left to see in {event}.");
      }
      for p in &page.participants {
        let age = p.age.map(|a| format!(", {a}")).unwrap_or_default();
        println!("{:<16} {}{age}", p.user_id.as_str(), p.display_name);
        if let Some(bio) = &p.bio {
          println!("{:<16} {bio}", "");
        }
      }
      if page.remaining > 0 {
        println!("({} more)", page.remaining);
      }
    }
    Command::Like { event, user } => swipe(&client, &event, &user, DecisionKind::Like).await?,
    Command::Dislike { event, user } => {
      swipe(&client, &event, &user, DecisionKind::Dislike).await?
    }
    Command::Matches { event } => {
      let entries = client.matches(&event).await?;
      if entries.is_empty() {
        println!("No matches in {event} yet.");
      }
      for m in entries {
        let name = m.partner_name.as_deref().unwrap_or("?");
        let at = m.matched_at.format("%Y-%m-%d %H:%M");
        println!("{:<16} {name:<24} {at}", m.partner.as_str());
      }
    }
  }
  Ok(())
}

async fn swipe(client: &ApiClient, event: &str, user: &str, kind: DecisionKind) -> Result<()> {
  let outcome = client.decide(event, user, kind).await?;
  tracing::debug!(?outcome, "decision submitted");
  if outcome.matched {
    let name = outcome
      .matched_display_name
      .or_else(|| outcome.matched_with.map(|u| u.into_inner()))
      .unwrap_or_else(|| user.to_owned());
    println!("It's a match with {name}!");
  } else if outcome.replayed {
    println!("Already {kind}d {user}.");
  } else {
    println!("{kind}d {user}.");
  }
  Ok(())
}
