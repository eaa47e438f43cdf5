//! Error types for the filter translator.
//!
//! Every variant carries the byte offset of the offending input so the
//! message can point at it.

use grafeas_core::ResourceKind;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
  #[error("unterminated string starting at offset {offset}")]
  UnterminatedString { offset: usize },

  #[error("invalid escape sequence \\{ch} at offset {offset}; only \\\" and \\\\ are allowed")]
  InvalidEscape { ch: char, offset: usize },

  #[error("unexpected character {ch:?} at offset {offset}")]
  UnexpectedChar { ch: char, offset: usize },

  #[error("expected {expected} at offset {offset}, found {found}")]
  Expected {
    expected: &'static str,
    found:    String,
    offset:   usize,
  },

  #[error("unexpected end of filter at offset {offset}, expected {expected}")]
  UnexpectedEnd { expected: &'static str, offset: usize },

  #[error("unknown field {field:?} for {kind} filters at offset {offset}")]
  UnknownField {
    field:  String,
    kind:   ResourceKind,
    offset: usize,
  },
}

impl From<Error> for grafeas_core::Error {
  fn from(e: Error) -> Self { grafeas_core::Error::InvalidArgument(format!("invalid filter: {e}")) }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
