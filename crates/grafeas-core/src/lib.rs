//! Core types and trait definitions for the Grafeas storage backends.
//!
//! This crate is deliberately free of HTTP and index-client dependencies.
//! The filter translator and every backend depend on it.

pub mod details;
pub mod error;
pub mod name;
pub mod provider;
pub mod resource;
pub mod storage;

pub use error::{Code, Error, Result};
pub use name::{NoteName, OccurrenceName, ProjectName, ResourceKind};
pub use resource::{Note, Occurrence, Project};
pub use storage::{ListRequest, Page, Storage};
