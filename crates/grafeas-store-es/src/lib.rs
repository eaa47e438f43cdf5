//! Elasticsearch storage backend for Grafeas.
//!
//! Three parts:
//!
//! - [`ElasticsearchStorage`] implements the host's
//!   [`Storage`](grafeas_core::Storage) trait over an [`IndexClient`].
//! - Filters are compiled by [`grafeas_filter`] into index queries.
//! - [`Migrator`] moves aliases between mapping versions at startup.
//!
//! [`HttpIndexClient`] talks to a real cluster; [`MemoryIndex`] keeps the
//! whole cluster in process.

pub mod client;
pub mod config;
mod cursor;
pub mod error;
pub mod indices;
pub mod migrate;
pub mod provider;
mod reaper;
pub mod retry;
pub mod store;

pub use client::{HttpIndexClient, IndexClient, MemoryIndex};
pub use config::{ElasticsearchConfig, Refresh};
pub use error::IndexError;
pub use migrate::{AliasStatus, MigrationOutcome, Migrator};
pub use provider::{ElasticsearchProvider, PROVIDER_NAME};
pub use store::ElasticsearchStorage;
