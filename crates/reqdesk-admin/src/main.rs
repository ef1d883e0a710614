//! `reqdesk-admin`: grant, revoke and list administrators.
//!
//! # Usage
//!
//! ```
//! reqdesk-admin --store requests.db grant 123456789 --handle alice
//! reqdesk-admin --store requests.db revoke 123456789
//! reqdesk-admin list
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqdesk_core::{store::RequestStore, user::ActorIdentity};
use reqdesk_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "reqdesk-admin", about = "Manage reqdesk administrators")]
struct Args {
  /// Path to the SQLite store shared with the bot.
  #[arg(long, env = "REQDESK_STORE_PATH", default_value = "requests.db")]
  store: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Make a user an administrator, registering them if needed.
  Grant {
    external_id: i64,
    /// Messaging handle to record for the user.
    #[arg(long)]
    handle:      Option<String>,
  },
  /// Remove administrator rights from a user.
  Revoke { external_id: i64 },
  /// List all administrators.
  List,
}

// ─── Commands ─────────────────────────────────────────────────────────────────

fn name(handle: Option<&str>) -> &str { handle.filter(|h| !h.is_empty()).unwrap_or("(no handle)") }

async fn run(store: &SqliteStore, command: Command) -> Result<String> {
  match command {
    Command::Grant { external_id, handle } => {
      let user = store
        .grant_admin(ActorIdentity::new(external_id, handle))
        .await
        .context("granting admin")?;
      tracing::info!(user_id = user.user_id, external_id, "admin granted");
      Ok(format!(
        "Administrator {} (ID: {}) has been added.",
        name(user.handle.as_deref()),
        user.external_id
      ))
    }
    Command::Revoke { external_id } => {
      match store.revoke_admin(external_id).await.context("revoking admin")? {
        Some(user) => {
          tracing::info!(user_id = user.user_id, external_id, "admin revoked");
          Ok(format!(
            "Administrator privileges have been removed from user {} (ID: {external_id}).",
            name(user.handle.as_deref())
          ))
        }
        None => Ok(format!("User with ID {external_id} not found.")),
      }
    }
    Command::List => {
      let admins = store.list_admins().await.context("listing admins")?;
      if admins.is_empty() {
        return Ok("No administrators found.".to_owned());
      }
      let mut out = String::from("Current administrators:");
      for admin in &admins {
        out.push_str(&format!("\n- {} (ID: {})", name(admin.handle.as_deref()), admin.external_id));
      }
      Ok(out)
    }
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

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
  let store = SqliteStore::open(&args.store)
    .await
    .with_context(|| format!("opening store {}", args.store.display()))?;

  println!("{}", run(&store, args.command).await?);
  Ok(())
}
