//! `grafeas-es`: operator tool for the Elasticsearch storage backend.
//!
//! Reads `config.toml` (or the path given with `--config`), overridden by
//! `GRAFEAS_ES_*` environment variables.
//!
//! ```
//! grafeas-es migrate
//! grafeas-es --config /etc/grafeas/es.toml status
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use grafeas_store_es::{
  ElasticsearchConfig, HttpIndexClient, Migrator, indices::CURRENT_SCHEMA_VERSION,
};

#[derive(Parser)]
#[command(author, version, about = "Grafeas Elasticsearch storage backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Migrate every managed alias to the current schema version.
  Migrate,
  /// Print every managed alias with the physical index behind it.
  Status,
  /// Start the storage the way the host does (honours GRAFEAS_MIGRATE).
  Check,
}

fn load_config(path: PathBuf) -> anyhow::Result<ElasticsearchConfig> {
  let settings = config::Config::builder()
    .add_source(config::File::from(path).required(false))
    .add_source(config::Environment::with_prefix("GRAFEAS_ES").try_parsing(true))
    .build()
    .context("failed to read config file")?;

  let config: ElasticsearchConfig = settings
    .try_deserialize()
    .context("failed to deserialise ElasticsearchConfig")?;
  config.validate().context("invalid configuration")?;
  Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  grafeas_es::init_tracing();

  let cli = Cli::parse();
  let config = load_config(cli.config)?;

  match cli.command {
    Command::Migrate => {
      let outcomes = grafeas_es::migrate(&config).await.context("migration failed")?;
      for (names, outcome) in outcomes {
        println!("{names}\t{outcome}");
      }
    }
    Command::Status => {
      let client = HttpIndexClient::new(&config)?;
      let migrator = Migrator::new(client, CURRENT_SCHEMA_VERSION);
      let statuses = migrator.status().await.context("failed to read alias status")?;
      for status in statuses {
        let version = status.version.map_or_else(|| "-".to_owned(), |v| v.to_string());
        let state = match status.version {
          Some(v) if v == migrator.target() => "current",
          Some(v) if v < migrator.target() => "needs migration",
          Some(_) => "newer than this build",
          None => "unknown",
        };
        let indices =
          if status.indices.is_empty() { "(unbound)".to_owned() } else { status.indices.join(",") };
        println!("{}\t{indices}\t{version}\t{state}", status.alias);
      }
    }
    Command::Check => {
      let _storage = grafeas_es::startup(&grafeas_es::registry(), &config).await?;
      tracing::info!(url = %config.url, "storage ready");
    }
  }

  Ok(())
}
