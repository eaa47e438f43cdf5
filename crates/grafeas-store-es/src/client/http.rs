//! [`HttpIndexClient`]: the cluster's HTTP+JSON API via `reqwest`.

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{Value, json};

use super::{AliasAction, Hit, IndexClient, SearchRequest};
use crate::{
  config::{ElasticsearchConfig, Refresh},
  error::{IndexError, Result},
};

/// Index client for a real cluster.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based and pools
/// connections.
#[derive(Clone)]
pub struct HttpIndexClient {
  client:          Client,
  base:            Url,
  credentials:     Option<(String, String)>,
  reindex_timeout: Duration,
}

impl HttpIndexClient {
  pub fn new(config: &ElasticsearchConfig) -> grafeas_core::Result<Self> {
    let base = Url::parse(&config.url).map_err(|e| {
      grafeas_core::Error::invalid(format!("invalid elasticsearch url {:?}: {e}", config.url))
    })?;
    if base.cannot_be_a_base() {
      return Err(grafeas_core::Error::invalid(format!(
        "elasticsearch url {:?} cannot be used as a base",
        config.url
      )));
    }

    let client = Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()
      .map_err(|e| grafeas_core::Error::Internal(format!("failed to build HTTP client: {e}")))?;

    let credentials = config
      .credentials()
      .map(|(u, p)| (u.to_owned(), p.to_owned()));

    Ok(Self {
      client,
      base,
      credentials,
      reindex_timeout: Duration::from_secs(config.reindex_timeout_secs),
    })
  }

  /// Build a URL from path segments; each segment is percent-encoded, so
  /// document ids containing `/` stay a single segment.
  fn url(&self, segments: &[&str]) -> Url {
    let mut url = self.base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    url
  }

  fn request(&self, method: Method, url: Url) -> RequestBuilder {
    tracing::debug!(%method, %url, "index request");
    let req = self.client.request(method, url);
    match &self.credentials {
      Some((user, pass)) => req.basic_auth(user, Some(pass)),
      None => req,
    }
  }

  /// Send, turning non-success statuses into [`IndexError`]s.
  async fn send(&self, req: RequestBuilder) -> Result<Response> {
    let resp = req.send().await?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(IndexError::from_status(status, body))
  }
}

// ─── Response shapes ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct GetResponse {
  #[serde(rename = "_source")]
  source: Option<Value>,
}

#[derive(Deserialize)]
struct SearchResponse {
  hits: SearchHits,
}

#[derive(Deserialize)]
struct SearchHits {
  hits: Vec<RawHit>,
}

#[derive(Deserialize)]
struct RawHit {
  #[serde(rename = "_id")]
  id:     String,
  #[serde(rename = "_source")]
  source: Value,
}

#[derive(Deserialize)]
struct BulkResponse {
  items: Vec<BulkItem>,
}

#[derive(Deserialize)]
struct BulkItem {
  create: BulkItemResult,
}

#[derive(Deserialize)]
struct BulkItemResult {
  status: u16,
  #[serde(default)]
  error:  Option<Value>,
}

#[derive(Deserialize)]
struct ReindexResponse {
  #[serde(default)]
  created:  u64,
  #[serde(default)]
  updated:  u64,
  #[serde(default)]
  failures: Vec<Value>,
}

// ─── IndexClient impl ────────────────────────────────────────────────────────

// Writes pass `require_alias=true` so a missing alias is a 404 instead of an
// auto-created concrete index squatting on the alias name.
impl IndexClient for HttpIndexClient {
  async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
    let url = self.url(&[index, "_doc", id]);
    match self.send(self.request(Method::GET, url)).await {
      Ok(resp) => Ok(resp.json::<GetResponse>().await?.source),
      Err(IndexError::NotFound(_)) => Ok(None),
      Err(e) => Err(e),
    }
  }

  async fn create_document(
    &self,
    index: &str,
    id: &str,
    doc: &Value,
    refresh: Refresh,
  ) -> Result<()> {
    let url = self.url(&[index, "_create", id]);
    let req = self
      .request(Method::PUT, url)
      .query(&[("refresh", refresh.as_param()), ("require_alias", "true")])
      .json(doc);
    self.send(req).await?;
    Ok(())
  }

  async fn put_document(&self, index: &str, id: &str, doc: &Value, refresh: Refresh) -> Result<()> {
    let url = self.url(&[index, "_doc", id]);
    let req = self
      .request(Method::PUT, url)
      .query(&[("refresh", refresh.as_param()), ("require_alias", "true")])
      .json(doc);
    self.send(req).await?;
    Ok(())
  }

  async fn delete_document(&self, index: &str, id: &str, refresh: Refresh) -> Result<bool> {
    let url = self.url(&[index, "_doc", id]);
    let req = self
      .request(Method::DELETE, url)
      .query(&[("refresh", refresh.as_param())]);
    match self.send(req).await {
      Ok(_) => Ok(true),
      Err(IndexError::NotFound(_)) => Ok(false),
      Err(e) => Err(e),
    }
  }

  async fn bulk_create(
    &self,
    index: &str,
    docs: &[(String, Value)],
    refresh: Refresh,
  ) -> Result<Vec<Result<()>>> {
    let mut body = String::new();
    for (id, doc) in docs {
      body.push_str(&json!({ "create": { "_id": id } }).to_string());
      body.push('\n');
      body.push_str(&serde_json::to_string(doc)?);
      body.push('\n');
    }

    let url = self.url(&[index, "_bulk"]);
    let req = self
      .request(Method::POST, url)
      .query(&[("refresh", refresh.as_param()), ("require_alias", "true")])
      .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
      .body(body);
    let resp: BulkResponse = self.send(req).await?.json().await?;

    if resp.items.len() != docs.len() {
      return Err(IndexError::Unexpected(format!(
        "bulk response has {} items for {} documents",
        resp.items.len(),
        docs.len()
      )));
    }

    Ok(
      resp
        .items
        .into_iter()
        .map(|item| {
          let result = item.create;
          match (result.status, result.error) {
            (200..=299, None) => Ok(()),
            (status, error) => {
              let detail = error.map(|e| e.to_string()).unwrap_or_default();
              let status = reqwest::StatusCode::from_u16(status)
                .unwrap_or(reqwest::StatusCode::INTERNAL_SERVER_ERROR);
              Err(IndexError::from_status(status, detail))
            }
          }
        })
        .collect(),
    )
  }

  async fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<Hit>> {
    let mut body = json!({
      "query": request.query.to_json(),
      "size":  request.size,
      "sort":  [ { request.sort_field.as_str(): "asc" } ],
    });
    if let Some(after) = &request.search_after {
      body["search_after"] = json!([after]);
    }

    let url = self.url(&[index, "_search"]);
    let resp: SearchResponse = self
      .send(self.request(Method::POST, url).json(&body))
      .await?
      .json()
      .await?;

    Ok(
      resp
        .hits
        .hits
        .into_iter()
        .map(|h| Hit { id: h.id, source: h.source })
        .collect(),
    )
  }

  async fn index_exists(&self, index: &str) -> Result<bool> {
    let url = self.url(&[index]);
    match self.send(self.request(Method::HEAD, url)).await {
      Ok(_) => Ok(true),
      Err(IndexError::NotFound(_)) => Ok(false),
      Err(e) => Err(e),
    }
  }

  async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
    let url = self.url(&[index]);
    self.send(self.request(Method::PUT, url).json(body)).await?;
    Ok(())
  }

  async fn delete_index(&self, index: &str) -> Result<()> {
    let url = self.url(&[index]);
    self.send(self.request(Method::DELETE, url)).await?;
    Ok(())
  }

  async fn get_alias(&self, alias: &str) -> Result<Vec<String>> {
    let url = self.url(&["_alias", alias]);
    match self.send(self.request(Method::GET, url)).await {
      Ok(resp) => {
        let body: serde_json::Map<String, Value> = resp.json().await?;
        let mut indices: Vec<String> = body.into_iter().map(|(k, _)| k).collect();
        indices.sort();
        Ok(indices)
      }
      Err(IndexError::NotFound(_)) => Ok(vec![]),
      Err(e) => Err(e),
    }
  }

  async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
    let actions: Vec<Value> = actions
      .iter()
      .map(|a| match a {
        AliasAction::Add { index, alias } => json!({ "add": { "index": index, "alias": alias } }),
        AliasAction::Remove { index, alias } => {
          json!({ "remove": { "index": index, "alias": alias } })
        }
      })
      .collect();

    let url = self.url(&["_aliases"]);
    self
      .send(self.request(Method::POST, url).json(&json!({ "actions": actions })))
      .await?;
    Ok(())
  }

  async fn reindex(&self, source: &str, dest: &str) -> Result<u64> {
    let url = self.url(&["_reindex"]);
    let body = json!({
      "source": { "index": source },
      "dest":   { "index": dest },
    });
    // The reindex runs as a server-side task; a client timeout does not
    // cancel it.
    let req = self
      .request(Method::POST, url)
      .query(&[("wait_for_completion", "true"), ("refresh", "true")])
      .timeout(self.reindex_timeout)
      .json(&body);
    let resp: ReindexResponse = match self.send(req).await {
      Ok(resp) => resp.json().await?,
      Err(IndexError::Transport(e)) if e.is_timeout() => {
        return Err(IndexError::Unfinished(format!(
          "reindex {source} -> {dest} still running after {}s",
          self.reindex_timeout.as_secs()
        )));
      }
      Err(e) => return Err(e),
    };

    if !resp.failures.is_empty() {
      return Err(IndexError::Unexpected(format!(
        "reindex {source} -> {dest} reported {} failures: {}",
        resp.failures.len(),
        Value::Array(resp.failures)
      )));
    }
    Ok(resp.created + resp.updated)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn document_ids_are_single_path_segments() {
    let client = HttpIndexClient::new(&ElasticsearchConfig::new("http://es:9200/prefix/")).unwrap();
    let url = client.url(&["grafeas-projects", "_doc", "projects/foo"]);
    assert_eq!(url.as_str(), "http://es:9200/prefix/grafeas-projects/_doc/projects%2Ffoo");
  }

  #[tokio::test]
  async fn stalled_reindex_is_unfinished() {
    // Accepts connections but never answers.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let mut held = Vec::new();
      while let Ok((socket, _)) = listener.accept().await {
        held.push(socket);
      }
    });

    let mut config = ElasticsearchConfig::new(format!("http://{addr}"));
    config.reindex_timeout_secs = 1;
    let client = HttpIndexClient::new(&config).unwrap();
    let err = client.reindex("src-v1", "src-v2").await.unwrap_err();
    assert!(matches!(err, IndexError::Unfinished(ref m) if m.contains("src-v2")), "{err}");
  }

  #[test]
  fn rejects_unusable_urls() {
    assert!(HttpIndexClient::new(&ElasticsearchConfig::new("not a url")).is_err());
    assert!(HttpIndexClient::new(&ElasticsearchConfig::new("mailto:x@example.com")).is_err());
  }
}
