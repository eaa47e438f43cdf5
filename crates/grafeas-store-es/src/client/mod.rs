//! The `IndexClient` trait and the request/response shapes it exchanges.
//!
//! Two implementations ship with the crate: [`HttpIndexClient`] talks to a
//! real cluster over its HTTP+JSON API, and [`MemoryIndex`] keeps everything
//! in process for tests and local experiments.

mod http;
mod memory;

use std::future::Future;

use grafeas_filter::Query;
use serde_json::Value;

pub use http::HttpIndexClient;
pub use memory::MemoryIndex;

use crate::{config::Refresh, error::Result};

// ─── Request / response shapes ───────────────────────────────────────────────

/// Keyset-paginated search over a single keyword sort field.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
  pub query:        Query,
  pub size:         usize,
  /// Ascending sort field; must be a keyword unique per document.
  pub sort_field:   String,
  /// Return only hits whose sort key is strictly greater than this.
  pub search_after: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
  pub id:     String,
  pub source: Value,
}

/// One step of an atomic alias update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AliasAction {
  Add { index: String, alias: String },
  Remove { index: String, alias: String },
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Operations the storage adapter and the migrator need from the index
/// cluster.
///
/// `index` arguments accept either an alias or a physical index name.
/// Implementations must be cheap to clone and safe to share across tasks.
pub trait IndexClient: Send + Sync {
  // ── Documents ─────────────────────────────────────────────────────────

  /// Fetch a document's source. `Ok(None)` if the document is absent.
  fn get_document(
    &self,
    index: &str,
    id: &str,
  ) -> impl Future<Output = Result<Option<Value>>> + Send;

  /// Create a document; fails with [`IndexError::Conflict`] if the id is
  /// taken.
  ///
  /// [`IndexError::Conflict`]: crate::IndexError::Conflict
  fn create_document(
    &self,
    index: &str,
    id: &str,
    doc: &Value,
    refresh: Refresh,
  ) -> impl Future<Output = Result<()>> + Send;

  /// Create or replace a document.
  fn put_document(
    &self,
    index: &str,
    id: &str,
    doc: &Value,
    refresh: Refresh,
  ) -> impl Future<Output = Result<()>> + Send;

  /// Delete a document. `Ok(false)` if it did not exist.
  fn delete_document(
    &self,
    index: &str,
    id: &str,
    refresh: Refresh,
  ) -> impl Future<Output = Result<bool>> + Send;

  /// Create many documents in one request. Per-item results are returned in
  /// input order; the outer error is reserved for whole-request failures.
  /// A missing target index or alias fails each item with `NotFound`.
  fn bulk_create(
    &self,
    index: &str,
    docs: &[(String, Value)],
    refresh: Refresh,
  ) -> impl Future<Output = Result<Vec<Result<()>>>> + Send;

  fn search(
    &self,
    index: &str,
    request: &SearchRequest,
  ) -> impl Future<Output = Result<Vec<Hit>>> + Send;

  // ── Indices and aliases ───────────────────────────────────────────────

  fn index_exists(&self, index: &str) -> impl Future<Output = Result<bool>> + Send;

  /// Create a physical index from a settings/mappings body.
  fn create_index(&self, index: &str, body: &Value) -> impl Future<Output = Result<()>> + Send;

  fn delete_index(&self, index: &str) -> impl Future<Output = Result<()>> + Send;

  /// Physical indices the alias points at; empty if the alias does not exist.
  fn get_alias(&self, alias: &str) -> impl Future<Output = Result<Vec<String>>> + Send;

  /// Apply all actions atomically.
  fn update_aliases(&self, actions: &[AliasAction]) -> impl Future<Output = Result<()>> + Send;

  /// Copy every document from `source` into `dest`, waiting for completion.
  /// Returns the number of documents written.
  fn reindex(&self, source: &str, dest: &str) -> impl Future<Output = Result<u64>> + Send;
}
