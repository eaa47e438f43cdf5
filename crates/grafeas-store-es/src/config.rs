//! Backend configuration.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Write refresh policy attached to every document write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Refresh {
  True,
  False,
  /// Block the write until the change is visible to search.
  #[default]
  WaitFor,
}

impl Refresh {
  pub fn as_param(self) -> &'static str {
    match self {
      Refresh::True => "true",
      Refresh::False => "false",
      Refresh::WaitFor => "wait_for",
    }
  }
}

impl Serialize for Refresh {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    match self {
      Refresh::True => serializer.serialize_bool(true),
      Refresh::False => serializer.serialize_bool(false),
      Refresh::WaitFor => serializer.serialize_str("wait_for"),
    }
  }
}

impl<'de> Deserialize<'de> for Refresh {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    struct RefreshVisitor;

    impl de::Visitor<'_> for RefreshVisitor {
      type Value = Refresh;

      fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(r#"true, false or "wait_for""#)
      }

      fn visit_bool<E: de::Error>(self, v: bool) -> Result<Refresh, E> {
        Ok(if v { Refresh::True } else { Refresh::False })
      }

      // Environment-sourced settings arrive as strings.
      fn visit_str<E: de::Error>(self, v: &str) -> Result<Refresh, E> {
        match v {
          "true" => Ok(Refresh::True),
          "false" => Ok(Refresh::False),
          "wait_for" => Ok(Refresh::WaitFor),
          other => Err(E::invalid_value(de::Unexpected::Str(other), &self)),
        }
      }
    }

    deserializer.deserialize_any(RefreshVisitor)
  }
}

fn default_request_timeout_secs() -> u64 { 30 }

fn default_reindex_timeout_secs() -> u64 { 6 * 60 * 60 }

fn default_reaper_concurrency() -> usize { 4 }

/// Settings for the Elasticsearch storage provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElasticsearchConfig {
  /// Base URL of the index cluster, e.g. `http://localhost:9200`.
  pub url:                  String,
  #[serde(default)]
  pub username:             Option<String>,
  #[serde(default)]
  pub password:             Option<String>,
  #[serde(default)]
  pub refresh:              Refresh,
  #[serde(default = "default_request_timeout_secs")]
  pub request_timeout_secs: u64,
  /// Client-side limit on one blocking `_reindex` call during migration.
  #[serde(default = "default_reindex_timeout_secs")]
  pub reindex_timeout_secs: u64,
  /// Maximum cascade deletes running at once.
  #[serde(default = "default_reaper_concurrency")]
  pub reaper_concurrency:   usize,
}

impl ElasticsearchConfig {
  pub fn new(url: impl Into<String>) -> Self {
    Self {
      url:                  url.into(),
      username:             None,
      password:             None,
      refresh:              Refresh::default(),
      request_timeout_secs: default_request_timeout_secs(),
      reindex_timeout_secs: default_reindex_timeout_secs(),
      reaper_concurrency:   default_reaper_concurrency(),
    }
  }

  /// Deserialise and validate a provider settings object.
  pub fn from_settings(settings: serde_json::Value) -> grafeas_core::Result<Self> {
    let config: Self = serde_json::from_value(settings).map_err(|e| {
      grafeas_core::Error::invalid(format!("invalid elasticsearch configuration: {e}"))
    })?;
    config.validate()?;
    Ok(config)
  }

  pub fn validate(&self) -> grafeas_core::Result<()> {
    if self.url.trim().is_empty() {
      return Err(grafeas_core::Error::invalid("elasticsearch url is required"));
    }
    if self.username.is_some() != self.password.is_some() {
      return Err(grafeas_core::Error::invalid(
        "elasticsearch username and password must be set together",
      ));
    }
    if self.request_timeout_secs == 0 || self.reindex_timeout_secs == 0 {
      return Err(grafeas_core::Error::invalid("timeouts must be at least one second"));
    }
    if self.reaper_concurrency == 0 {
      return Err(grafeas_core::Error::invalid("reaper_concurrency must be at least 1"));
    }
    Ok(())
  }

  pub fn credentials(&self) -> Option<(&str, &str)> {
    self.username.as_deref().zip(self.password.as_deref())
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn defaults_apply() {
    let cfg = ElasticsearchConfig::from_settings(json!({ "url": "http://es:9200" })).unwrap();
    assert_eq!(cfg.refresh, Refresh::WaitFor);
    assert_eq!(cfg.request_timeout_secs, 30);
    assert_eq!(cfg.reindex_timeout_secs, 21_600);
    assert_eq!(cfg.reaper_concurrency, 4);
    assert!(cfg.credentials().is_none());
  }

  #[test]
  fn refresh_accepts_bools_and_wait_for() {
    for (raw, expected) in [
      (json!(true), Refresh::True),
      (json!(false), Refresh::False),
      (json!("wait_for"), Refresh::WaitFor),
      (json!("false"), Refresh::False),
    ] {
      let cfg =
        ElasticsearchConfig::from_settings(json!({ "url": "http://es", "refresh": raw })).unwrap();
      assert_eq!(cfg.refresh, expected);
    }
    assert!(
      ElasticsearchConfig::from_settings(json!({ "url": "http://es", "refresh": "sometimes" }))
        .is_err()
    );
  }

  #[test]
  fn credentials_must_be_paired() {
    let err = ElasticsearchConfig::from_settings(json!({ "url": "http://es", "username": "u" }))
      .unwrap_err();
    assert!(matches!(err, grafeas_core::Error::InvalidArgument(_)));

    let cfg = ElasticsearchConfig::from_settings(
      json!({ "url": "http://es", "username": "u", "password": "p" }),
    )
    .unwrap();
    assert_eq!(cfg.credentials(), Some(("u", "p")));
  }

  #[test]
  fn reindex_timeout_is_separate_from_request_timeout() {
    let cfg = ElasticsearchConfig::from_settings(
      json!({ "url": "http://es", "request_timeout_secs": 5, "reindex_timeout_secs": 7200 }),
    )
    .unwrap();
    assert_eq!(cfg.request_timeout_secs, 5);
    assert_eq!(cfg.reindex_timeout_secs, 7200);

    let zero = json!({ "url": "http://es", "reindex_timeout_secs": 0 });
    assert!(ElasticsearchConfig::from_settings(zero).is_err());
  }

  #[test]
  fn url_is_required() {
    assert!(ElasticsearchConfig::from_settings(json!({})).is_err());
    assert!(ElasticsearchConfig::from_settings(json!({ "url": " " })).is_err());
  }
}
