//! Registration with the host's provider registry.

use std::sync::Arc;

use async_trait::async_trait;
use grafeas_core::{Result, Storage, provider::StorageProvider};

use crate::{
  client::HttpIndexClient, config::ElasticsearchConfig, store::ElasticsearchStorage,
};

/// Name the host selects this backend by.
pub const PROVIDER_NAME: &str = "elasticsearch";

/// Builds [`ElasticsearchStorage`] over HTTP from a settings object shaped
/// like [`ElasticsearchConfig`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ElasticsearchProvider;

#[async_trait]
impl StorageProvider for ElasticsearchProvider {
  fn name(&self) -> &'static str { PROVIDER_NAME }

  async fn create(&self, settings: serde_json::Value) -> Result<Arc<dyn Storage>> {
    let config = ElasticsearchConfig::from_settings(settings)?;
    let client = HttpIndexClient::new(&config)?;
    let storage = ElasticsearchStorage::new(client, &config);
    storage.initialize().await?;
    tracing::info!(url = %config.url, refresh = config.refresh.as_param(), "elasticsearch storage ready");
    Ok(Arc::new(storage))
  }
}
