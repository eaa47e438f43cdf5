//! Named storage providers.
//!
//! The host asks for a provider by name (e.g. `"elasticsearch"`) and receives
//! an object implementing [`Storage`]. Backends register a
//! [`StorageProvider`] factory at startup.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;

use crate::{Error, Result, storage::Storage};

/// Factory for one storage backend.
#[async_trait]
pub trait StorageProvider: Send + Sync {
  /// The name the host uses to select this provider.
  fn name(&self) -> &'static str;

  /// Build a storage instance from the backend's configuration section.
  async fn create(&self, settings: serde_json::Value) -> Result<Arc<dyn Storage>>;
}

/// Registry of storage providers keyed by name.
#[derive(Default)]
pub struct ProviderRegistry {
  providers: HashMap<&'static str, Arc<dyn StorageProvider>>,
}

impl ProviderRegistry {
  pub fn new() -> Self { Self::default() }

  /// Register `provider`, replacing any provider with the same name.
  pub fn register(&mut self, provider: Arc<dyn StorageProvider>) {
    self.providers.insert(provider.name(), provider);
  }

  pub fn get(&self, name: &str) -> Option<Arc<dyn StorageProvider>> {
    self.providers.get(name).cloned()
  }

  pub fn names(&self) -> Vec<&'static str> {
    let mut names: Vec<_> = self.providers.keys().copied().collect();
    names.sort_unstable();
    names
  }

  /// Look up `name` and build a storage instance from `settings`.
  pub async fn create(
    &self,
    name: &str,
    settings: serde_json::Value,
  ) -> Result<Arc<dyn Storage>> {
    let provider = self.get(name).ok_or_else(|| {
      Error::invalid(format!(
        "unknown storage provider {name:?}; registered: {:?}",
        self.names()
      ))
    })?;
    provider.create(settings).await
  }
}
