//! Error taxonomy shared by every storage backend.
//!
//! The host translates these into gRPC status codes; [`Error::code`] gives the
//! canonical code name for each variant.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed name, malformed filter, unknown filter field, bad page size.
  #[error("invalid argument: {0}")]
  InvalidArgument(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("already exists: {0}")]
  AlreadyExists(String),

  /// A parent resource is missing on child create.
  #[error("failed precondition: {0}")]
  FailedPrecondition(String),

  /// Index cluster error, network failure, unexpected decode failure.
  #[error("internal error: {0}")]
  Internal(String),

  /// Index cluster unreachable after retries.
  #[error("unavailable: {0}")]
  Unavailable(String),
}

/// gRPC-style status code for an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Code {
  InvalidArgument,
  NotFound,
  AlreadyExists,
  FailedPrecondition,
  Internal,
  Unavailable,
}

impl Code {
  pub fn as_str(self) -> &'static str {
    match self {
      Code::InvalidArgument => "INVALID_ARGUMENT",
      Code::NotFound => "NOT_FOUND",
      Code::AlreadyExists => "ALREADY_EXISTS",
      Code::FailedPrecondition => "FAILED_PRECONDITION",
      Code::Internal => "INTERNAL",
      Code::Unavailable => "UNAVAILABLE",
    }
  }
}

impl Error {
  pub fn code(&self) -> Code {
    match self {
      Error::InvalidArgument(_) => Code::InvalidArgument,
      Error::NotFound(_) => Code::NotFound,
      Error::AlreadyExists(_) => Code::AlreadyExists,
      Error::FailedPrecondition(_) => Code::FailedPrecondition,
      Error::Internal(_) => Code::Internal,
      Error::Unavailable(_) => Code::Unavailable,
    }
  }

  pub fn invalid(msg: impl Into<String>) -> Self {
    Error::InvalidArgument(msg.into())
  }

  pub fn not_found(msg: impl Into<String>) -> Self { Error::NotFound(msg.into()) }

  pub fn is_not_found(&self) -> bool { matches!(self, Error::NotFound(_)) }
}

impl From<serde_json::Error> for Error {
  fn from(e: serde_json::Error) -> Self {
    Error::Internal(format!("serialization error: {e}"))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
