//! simpel-server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered with
//! `SIMPEL_*` environment variables, opens the SQLite store and serves the
//! portal over HTTP.
//!
//! # Helper modes
//!
//! ```
//! cargo run -p simpel-web --bin simpel-server -- --hash-password
//! cargo run -p simpel-web --bin simpel-server -- --seed
//! ```
//!
//! `--seed` creates the three kelurahan and the four officer accounts
//! (skipping any that exist) before serving.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use simpel_store_sqlite::SqliteStore;
use simpel_web::{AppState, MIN_SECRET_LEN, ServerConfig, assets::AssetManifest, password, seed};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "SIMPEL-KTP portal server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,

  /// Create the default kelurahan and officer accounts before serving.
  #[arg(long)]
  seed: bool,
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

  if cli.hash_password {
    let plain = read_password()?;
    let hash = password::hash(&plain).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("SIMPEL")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("allowed_origins"),
    )
    .build()
    .context("failed to read config file")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  if server_cfg.session_secret.len() < MIN_SECRET_LEN {
    anyhow::bail!("session_secret must be at least {MIN_SECRET_LEN} characters");
  }
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);
  server_cfg.upload_dir = expand_tilde(&server_cfg.upload_dir);

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  if cli.seed {
    let report = seed::run(&store).await.context("seeding failed")?;
    tracing::info!(
      kelurahan = report.kelurahan_created,
      officers = report.officers_created,
      skipped = report.skipped,
      "seed complete"
    );
  }

  let assets = AssetManifest::load(&server_cfg.asset_manifest, &server_cfg.asset_dev_server)
    .with_context(|| format!("failed to load asset manifest {:?}", server_cfg.asset_manifest))?;
  if assets.is_dev() {
    tracing::warn!(dev_server = %server_cfg.asset_dev_server, "serving assets from dev server");
  }

  tokio::fs::create_dir_all(&server_cfg.upload_dir)
    .await
    .with_context(|| format!("failed to create upload dir {:?}", server_cfg.upload_dir))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let app = simpel_web::router(AppState::new(store, server_cfg, assets));

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\r', '\n']).to_owned())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
