//! Startup wiring for hosting the Elasticsearch storage backend.
//!
//! The host server calls [`startup`] once before serving: it runs the index
//! migrator when the operator opted in through `GRAFEAS_MIGRATE=yes`, then
//! asks the provider registry for the `"elasticsearch"` storage.

use std::sync::Arc;

use anyhow::Context as _;
use grafeas_core::{Storage, provider::ProviderRegistry};
use grafeas_store_es::{
  ElasticsearchConfig, ElasticsearchProvider, HttpIndexClient, MigrationOutcome, Migrator,
  PROVIDER_NAME,
  indices::{CURRENT_SCHEMA_VERSION, IndexNames},
};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Opt-in switch for running the migrator at startup.
pub const MIGRATE_ENV: &str = "GRAFEAS_MIGRATE";

/// Enables debug-level logging when set.
pub const DEBUG_ENV: &str = "DEBUG";

/// A registry with every storage provider this build ships.
pub fn registry() -> ProviderRegistry {
  let mut registry = ProviderRegistry::new();
  registry.register(Arc::new(ElasticsearchProvider));
  registry
}

/// Only the exact value `yes` enables migration.
pub fn migrate_requested_from(value: Option<&str>) -> bool { value == Some("yes") }

pub fn migrate_requested() -> bool {
  migrate_requested_from(std::env::var(MIGRATE_ENV).ok().as_deref())
}

pub fn debug_requested_from(value: Option<&str>) -> bool {
  match value {
    None | Some("") | Some("0") => false,
    Some(v) => !v.eq_ignore_ascii_case("false"),
  }
}

/// Install the global `fmt` subscriber. `RUST_LOG` directives win over the
/// `DEBUG` default.
pub fn init_tracing() {
  let level = if debug_requested_from(std::env::var(DEBUG_ENV).ok().as_deref()) {
    LevelFilter::DEBUG
  } else {
    LevelFilter::INFO
  };
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy(),
    )
    .init();
}

/// Migrate every managed alias on `config`'s cluster to the current schema
/// version.
pub async fn migrate(
  config: &ElasticsearchConfig,
) -> grafeas_core::Result<Vec<(IndexNames, MigrationOutcome)>> {
  let client = HttpIndexClient::new(config)?;
  let migrator = Migrator::new(client, CURRENT_SCHEMA_VERSION);
  tracing::info!(url = %config.url, version = %migrator.target(), "migrating indices");
  migrator.migrate_all().await
}

/// Run the migrator if requested through the environment, then build the
/// storage the host will serve from.
pub async fn startup(
  registry: &ProviderRegistry,
  config: &ElasticsearchConfig,
) -> anyhow::Result<Arc<dyn Storage>> {
  if migrate_requested() {
    for (names, outcome) in migrate(config).await.context("index migration failed")? {
      tracing::info!(alias = %names, %outcome, "migration");
    }
  } else {
    tracing::debug!("{MIGRATE_ENV} is not \"yes\"; skipping migration");
  }
  open(registry, config).await
}

/// Obtain the storage from `registry` without migrating.
pub async fn open(
  registry: &ProviderRegistry,
  config: &ElasticsearchConfig,
) -> anyhow::Result<Arc<dyn Storage>> {
  let settings = serde_json::to_value(config).context("failed to encode storage settings")?;
  registry
    .create(PROVIDER_NAME, settings)
    .await
    .with_context(|| format!("failed to create {PROVIDER_NAME} storage"))
}

#[cfg(test)]
mod tests {
  use async_trait::async_trait;
  use grafeas_core::{ListRequest, provider::StorageProvider};
  use grafeas_store_es::{ElasticsearchStorage, MemoryIndex, Refresh};

  use super::*;

  /// Stands in for the HTTP provider under the same name.
  struct InProcess;

  #[async_trait]
  impl StorageProvider for InProcess {
    fn name(&self) -> &'static str { PROVIDER_NAME }

    async fn create(&self, settings: serde_json::Value) -> grafeas_core::Result<Arc<dyn Storage>> {
      let config = ElasticsearchConfig::from_settings(settings)?;
      assert_eq!(config.refresh, Refresh::False);
      Ok(Arc::new(ElasticsearchStorage::new(MemoryIndex::new(), &config)))
    }
  }

  #[test]
  fn migrate_only_on_exact_yes() {
    assert!(migrate_requested_from(Some("yes")));
    for value in [None, Some(""), Some("no"), Some("YES"), Some("true")] {
      assert!(!migrate_requested_from(value), "{value:?}");
    }
  }

  #[test]
  fn debug_flag_values() {
    assert!(debug_requested_from(Some("1")));
    assert!(debug_requested_from(Some("true")));
    for value in [None, Some(""), Some("0"), Some("false"), Some("FALSE")] {
      assert!(!debug_requested_from(value), "{value:?}");
    }
  }

  #[test]
  fn registry_ships_elasticsearch() {
    assert_eq!(registry().names(), vec![PROVIDER_NAME]);
  }

  #[tokio::test]
  async fn open_passes_settings_through_registry() {
    let mut registry = ProviderRegistry::new();
    registry.register(Arc::new(InProcess));
    let mut config = ElasticsearchConfig::new("http://unused:9200");
    config.refresh = Refresh::False;

    let storage = open(&registry, &config).await.unwrap();
    storage.create_project("projects/foo").await.unwrap();
    let page = storage.list_projects(&ListRequest::default()).await.unwrap();
    assert_eq!(page.items.len(), 1);
  }

  #[tokio::test]
  async fn open_without_provider_fails() {
    let err = open(&ProviderRegistry::new(), &ElasticsearchConfig::new("http://es:9200"))
      .await
      .err()
      .unwrap();
    assert!(err.to_string().contains("elasticsearch"));
  }
}
