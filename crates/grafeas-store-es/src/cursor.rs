//! Opaque page tokens.
//!
//! A token is URL-safe base64 over a small JSON cursor holding the running
//! offset, the last key returned and a fingerprint of the query it belongs
//! to. A token presented against a different alias, schema version, kind or
//! filter is rejected rather than silently restarting the listing.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use grafeas_core::{Error, ResourceKind, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::indices::SchemaVersion;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Cursor {
  /// Number of items returned before this page.
  #[serde(rename = "o")]
  pub offset:      u64,
  /// Sort key of the last item returned.
  #[serde(rename = "k")]
  pub last_key:    String,
  #[serde(rename = "f")]
  pub fingerprint: String,
}

/// Identifies the logical query a cursor was issued for.
pub(crate) fn fingerprint(
  alias: &str,
  version: SchemaVersion,
  kind: ResourceKind,
  filter: &str,
) -> String {
  let version = version.to_string();
  let mut hasher = Sha256::new();
  for part in [alias, version.as_str(), kind.collection(), filter] {
    hasher.update(part.as_bytes());
    hasher.update([0u8]);
  }
  hex::encode(&hasher.finalize()[..8])
}

impl Cursor {
  pub fn encode(&self) -> Result<String> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(self)?))
  }

  /// Decode `token` and check it was issued for `expected_fingerprint`.
  pub fn decode(token: &str, expected_fingerprint: &str) -> Result<Self> {
    let invalid = || Error::invalid(format!("invalid page token {token:?}"));
    let bytes = URL_SAFE_NO_PAD.decode(token).map_err(|_| invalid())?;
    let cursor: Cursor = serde_json::from_slice(&bytes).map_err(|_| invalid())?;
    if cursor.fingerprint != expected_fingerprint {
      return Err(Error::invalid(
        "page token was issued for a different query; restart the listing",
      ));
    }
    Ok(cursor)
  }
}
