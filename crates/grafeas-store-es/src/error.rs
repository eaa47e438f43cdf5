//! Error type for the index client layer, and its mapping onto the host's
//! error taxonomy.

use reqwest::StatusCode;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IndexError {
  /// The index, alias or document does not exist (HTTP 404).
  #[error("not found: {0}")]
  NotFound(String),

  /// Version conflict, e.g. create of an existing document id (HTTP 409).
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("index returned {status}: {body}")]
  Status { status: StatusCode, body: String },

  #[error("transport error: {0}")]
  Transport(#[from] reqwest::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// The client stopped waiting; the operation may still be running on the
  /// cluster.
  #[error("gave up waiting: {0}")]
  Unfinished(String),

  /// The index answered, but not in the shape we expected.
  #[error("unexpected response: {0}")]
  Unexpected(String),
}

impl IndexError {
  /// Build the error for a non-success HTTP response.
  pub fn from_status(status: StatusCode, body: String) -> Self {
    match status {
      StatusCode::NOT_FOUND => IndexError::NotFound(body),
      StatusCode::CONFLICT => IndexError::Conflict(body),
      status => IndexError::Status { status, body },
    }
  }

  /// Whether a retry of an idempotent read may succeed.
  pub fn is_transient(&self) -> bool {
    match self {
      IndexError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
      IndexError::Status { status, .. } => matches!(
        *status,
        StatusCode::TOO_MANY_REQUESTS
          | StatusCode::BAD_GATEWAY
          | StatusCode::SERVICE_UNAVAILABLE
          | StatusCode::GATEWAY_TIMEOUT
      ),
      _ => false,
    }
  }
}

/// Map an index failure to the host's taxonomy.
///
/// Anything without a specific mapping becomes `Internal`; the cause is
/// logged under a fresh correlation id that is also returned in the message.
pub(crate) fn to_core(err: IndexError, context: &str) -> grafeas_core::Error {
  match err {
    IndexError::NotFound(_) => grafeas_core::Error::NotFound(context.to_owned()),
    IndexError::Conflict(_) => grafeas_core::Error::AlreadyExists(context.to_owned()),
    other => internal(other, context),
  }
}

pub(crate) fn internal(err: impl std::fmt::Display, context: &str) -> grafeas_core::Error {
  let correlation_id = Uuid::new_v4();
  tracing::error!(%correlation_id, error = %err, "{context} failed");
  grafeas_core::Error::Internal(format!("{context} failed (correlation id {correlation_id})"))
}

pub type Result<T, E = IndexError> = std::result::Result<T, E>;
