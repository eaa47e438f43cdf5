//! The `Storage` trait and supporting list types.
//!
//! The trait is the fixed capability set the host server expects from a
//! storage provider. Backends (e.g. `grafeas-store-es`) implement it; the host
//! holds it as `Arc<dyn Storage>` obtained from the
//! [`ProviderRegistry`](crate::provider::ProviderRegistry).

use async_trait::async_trait;

use crate::{
  Result,
  resource::{Note, Occurrence, Project},
};

/// Page size used when a caller passes `0`.
pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Largest page a single list call returns; larger requests are capped.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Largest number of occurrences accepted by one batch create.
pub const MAX_BATCH_SIZE: usize = 1000;

// ─── List types ──────────────────────────────────────────────────────────────

/// Parameters shared by every list operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListRequest {
  /// Filter expression; empty matches every document.
  pub filter:     String,
  /// `0` selects [`DEFAULT_PAGE_SIZE`]; negative values are rejected.
  pub page_size:  i32,
  /// Token returned by a previous call; empty starts from the beginning.
  pub page_token: String,
}

impl ListRequest {
  pub fn filtered(filter: impl Into<String>) -> Self {
    Self { filter: filter.into(), ..Self::default() }
  }

  pub fn with_page_size(mut self, page_size: i32) -> Self {
    self.page_size = page_size;
    self
  }

  pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
    self.page_token = page_token.into();
    self
  }
}

/// One page of a listing.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
  pub items:           Vec<T>,
  /// Empty when there are no further results.
  pub next_page_token: String,
}

impl<T> Page<T> {
  pub fn is_last(&self) -> bool { self.next_page_token.is_empty() }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Storage capability for projects, notes and occurrences.
///
/// Names are always fully qualified (`projects/{id}`,
/// `projects/{id}/notes/{nid}`, `projects/{id}/occurrences/{oid}`); `parent`
/// arguments are project names.
#[async_trait]
pub trait Storage: Send + Sync {
  // ── Projects ──────────────────────────────────────────────────────────

  /// Fails with `AlreadyExists` if the project is already stored.
  async fn create_project(&self, name: &str) -> Result<Project>;

  async fn get_project(&self, name: &str) -> Result<Project>;

  async fn list_projects(&self, request: &ListRequest) -> Result<Page<Project>>;

  /// Removes the project document; notes and occurrences under it are reaped
  /// asynchronously.
  async fn delete_project(&self, name: &str) -> Result<()>;

  // ── Notes ─────────────────────────────────────────────────────────────

  /// Fails with `FailedPrecondition` if `parent` does not exist.
  async fn create_note(&self, parent: &str, note_id: &str, note: Note) -> Result<Note>;

  async fn get_note(&self, name: &str) -> Result<Note>;

  async fn list_notes(&self, parent: &str, request: &ListRequest) -> Result<Page<Note>>;

  /// Last-writer-wins replacement of an existing note.
  async fn update_note(&self, name: &str, note: Note) -> Result<Note>;

  async fn delete_note(&self, name: &str) -> Result<()>;

  // ── Occurrences ───────────────────────────────────────────────────────

  /// An occurrence with an empty name (or one ending at the collection
  /// segment) gets a generated id.
  async fn create_occurrence(&self, parent: &str, occurrence: Occurrence) -> Result<Occurrence>;

  /// Per-item results in input order. Fails as a whole only when no item
  /// was created.
  async fn batch_create_occurrences(
    &self,
    parent: &str,
    occurrences: Vec<Occurrence>,
  ) -> Result<Vec<Result<Occurrence>>>;

  async fn get_occurrence(&self, name: &str) -> Result<Occurrence>;

  async fn list_occurrences(
    &self,
    parent: &str,
    request: &ListRequest,
  ) -> Result<Page<Occurrence>>;

  /// Last-writer-wins replacement of an existing occurrence.
  async fn update_occurrence(&self, name: &str, occurrence: Occurrence) -> Result<Occurrence>;

  async fn delete_occurrence(&self, name: &str) -> Result<()>;
}

/// Resolve a requested page size against the default and the cap.
pub fn effective_page_size(requested: i32) -> Result<usize> {
  match requested {
    n if n < 0 => Err(crate::Error::invalid(format!(
      "page size must not be negative, got {n}"
    ))),
    0 => Ok(DEFAULT_PAGE_SIZE),
    n => Ok((n as usize).min(MAX_PAGE_SIZE)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_size_defaults_and_caps() {
    assert_eq!(effective_page_size(0).unwrap(), DEFAULT_PAGE_SIZE);
    assert_eq!(effective_page_size(7).unwrap(), 7);
    assert_eq!(effective_page_size(5000).unwrap(), MAX_PAGE_SIZE);
    assert!(effective_page_size(-1).is_err());
  }
}
