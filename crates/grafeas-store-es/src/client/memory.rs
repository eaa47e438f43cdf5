//! [`MemoryIndex`], an in-process index cluster.
//!
//! Implements the same contract as the HTTP client (aliases, create
//! conflicts, keyset search, reindex) over plain maps. Writes are visible
//! immediately regardless of the refresh policy.

use std::{
  collections::BTreeMap,
  sync::{Arc, PoisonError, RwLock},
};

use grafeas_filter::Query;
use serde_json::Value;

use super::{AliasAction, Hit, IndexClient, SearchRequest};
use crate::{
  config::Refresh,
  error::{IndexError, Result},
};

#[derive(Default)]
struct PhysicalIndex {
  body: Value,
  docs: BTreeMap<String, Value>,
}

#[derive(Default)]
struct Cluster {
  indices: BTreeMap<String, PhysicalIndex>,
  /// alias → physical indices
  aliases: BTreeMap<String, Vec<String>>,
}

impl Cluster {
  /// Resolve an alias or index name to exactly one physical index.
  fn resolve(&self, name: &str) -> Result<&str> {
    if let Some(targets) = self.aliases.get(name) {
      return match targets.as_slice() {
        [one] => Ok(one.as_str()),
        _ => Err(IndexError::Unexpected(format!(
          "alias {name} points at {} indices",
          targets.len()
        ))),
      };
    }
    match self.indices.get_key_value(name) {
      Some((k, _)) => Ok(k.as_str()),
      None => Err(IndexError::NotFound(format!("no such index [{name}]"))),
    }
  }

  fn index(&self, name: &str) -> Result<&PhysicalIndex> {
    let physical = self.resolve(name)?;
    self
      .indices
      .get(physical)
      .ok_or_else(|| IndexError::NotFound(format!("no such index [{name}]")))
  }

  fn index_mut(&mut self, name: &str) -> Result<&mut PhysicalIndex> {
    let physical = self.resolve(name)?.to_owned();
    self
      .indices
      .get_mut(&physical)
      .ok_or_else(|| IndexError::NotFound(format!("no such index [{name}]")))
  }
}

/// An in-process index cluster.
///
/// Clones share the same state.
#[derive(Clone, Default)]
pub struct MemoryIndex {
  cluster: Arc<RwLock<Cluster>>,
}

impl MemoryIndex {
  pub fn new() -> Self { Self::default() }

  /// Names of all physical indices, sorted.
  pub fn indices(&self) -> Vec<String> {
    self.read(|c| c.indices.keys().cloned().collect())
  }

  /// Settings/mappings body a physical index was created with.
  pub fn index_body(&self, index: &str) -> Option<Value> {
    self.read(|c| c.indices.get(index).map(|i| i.body.clone()))
  }

  /// Number of documents behind an alias or index; `None` if it does not
  /// resolve.
  pub fn document_count(&self, index: &str) -> Option<usize> {
    self.read(|c| c.index(index).ok().map(|i| i.docs.len()))
  }

  fn read<T>(&self, f: impl FnOnce(&Cluster) -> T) -> T {
    let guard = self.cluster.read().unwrap_or_else(PoisonError::into_inner);
    f(&guard)
  }

  fn write<T>(&self, f: impl FnOnce(&mut Cluster) -> T) -> T {
    let mut guard = self.cluster.write().unwrap_or_else(PoisonError::into_inner);
    f(&mut guard)
  }
}

// ─── Query evaluation ────────────────────────────────────────────────────────

/// Values at a dotted path; arrays contribute each of their elements.
fn values_at<'a>(doc: &'a Value, path: &str) -> Vec<&'a str> {
  let mut current = doc;
  for part in path.split('.') {
    match current.get(part) {
      Some(v) => current = v,
      None => return vec![],
    }
  }
  match current {
    Value::String(s) => vec![s.as_str()],
    Value::Array(items) => items.iter().filter_map(Value::as_str).collect(),
    _ => vec![],
  }
}

pub(crate) fn matches(query: &Query, doc: &Value) -> bool {
  match query {
    Query::MatchAll => true,
    Query::Term { field, value } => values_at(doc, field).contains(&value.as_str()),
    Query::Prefix { field, value } => {
      values_at(doc, field).iter().any(|v| v.starts_with(value.as_str()))
    }
    Query::Bool(b) => {
      b.must.iter().all(|q| matches(q, doc))
        && (b.should.is_empty() || b.should.iter().any(|q| matches(q, doc)))
        && !b.must_not.iter().any(|q| matches(q, doc))
    }
  }
}

// ─── IndexClient impl ────────────────────────────────────────────────────────

impl IndexClient for MemoryIndex {
  async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
    self.read(|c| match c.index(index) {
      Ok(i) => Ok(i.docs.get(id).cloned()),
      Err(IndexError::NotFound(_)) => Ok(None),
      Err(e) => Err(e),
    })
  }

  async fn create_document(
    &self,
    index: &str,
    id: &str,
    doc: &Value,
    _refresh: Refresh,
  ) -> Result<()> {
    self.write(|c| {
      let i = c.index_mut(index)?;
      if i.docs.contains_key(id) {
        return Err(IndexError::Conflict(format!(
          "[{id}]: version conflict, document already exists"
        )));
      }
      i.docs.insert(id.to_owned(), doc.clone());
      Ok(())
    })
  }

  async fn put_document(&self, index: &str, id: &str, doc: &Value, _refresh: Refresh) -> Result<()> {
    self.write(|c| {
      c.index_mut(index)?.docs.insert(id.to_owned(), doc.clone());
      Ok(())
    })
  }

  async fn delete_document(&self, index: &str, id: &str, _refresh: Refresh) -> Result<bool> {
    self.write(|c| match c.index_mut(index) {
      Ok(i) => Ok(i.docs.remove(id).is_some()),
      Err(IndexError::NotFound(_)) => Ok(false),
      Err(e) => Err(e),
    })
  }

  async fn bulk_create(
    &self,
    index: &str,
    docs: &[(String, Value)],
    _refresh: Refresh,
  ) -> Result<Vec<Result<()>>> {
    self.write(|c| {
      // A missing target fails every item, not the request.
      let i = match c.index_mut(index) {
        Ok(i) => i,
        Err(IndexError::NotFound(reason)) => {
          return Ok(docs.iter().map(|_| Err(IndexError::NotFound(reason.clone()))).collect());
        }
        Err(e) => return Err(e),
      };
      Ok(
        docs
          .iter()
          .map(|(id, doc)| {
            if i.docs.contains_key(id) {
              Err(IndexError::Conflict(format!("[{id}]: document already exists")))
            } else {
              i.docs.insert(id.clone(), doc.clone());
              Ok(())
            }
          })
          .collect(),
      )
    })
  }

  async fn search(&self, index: &str, request: &SearchRequest) -> Result<Vec<Hit>> {
    self.read(|c| {
      let i = c.index(index)?;
      let mut hits: Vec<(String, Hit)> = i
        .docs
        .iter()
        .filter(|(_, doc)| matches(&request.query, doc))
        .filter_map(|(id, doc)| {
          let key = values_at(doc, &request.sort_field).first()?.to_string();
          Some((key, Hit { id: id.clone(), source: doc.clone() }))
        })
        .filter(|(key, _)| match &request.search_after {
          Some(after) => key.as_str() > after.as_str(),
          None => true,
        })
        .collect();
      hits.sort_by(|a, b| a.0.cmp(&b.0));
      Ok(hits.into_iter().take(request.size).map(|(_, h)| h).collect())
    })
  }

  async fn index_exists(&self, index: &str) -> Result<bool> {
    self.read(|c| Ok(c.indices.contains_key(index) || c.aliases.contains_key(index)))
  }

  async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
    self.write(|c| {
      if c.indices.contains_key(index) || c.aliases.contains_key(index) {
        return Err(IndexError::Status {
          status: reqwest::StatusCode::BAD_REQUEST,
          body:   format!("resource_already_exists_exception: index [{index}] already exists"),
        });
      }
      c.indices.insert(index.to_owned(), PhysicalIndex {
        body: body.clone(),
        docs: BTreeMap::new(),
      });
      Ok(())
    })
  }

  async fn delete_index(&self, index: &str) -> Result<()> {
    self.write(|c| {
      if c.indices.remove(index).is_none() {
        return Err(IndexError::NotFound(format!("no such index [{index}]")));
      }
      for targets in c.aliases.values_mut() {
        targets.retain(|t| t != index);
      }
      c.aliases.retain(|_, targets| !targets.is_empty());
      Ok(())
    })
  }

  async fn get_alias(&self, alias: &str) -> Result<Vec<String>> {
    self.read(|c| Ok(c.aliases.get(alias).cloned().unwrap_or_default()))
  }

  async fn update_aliases(&self, actions: &[AliasAction]) -> Result<()> {
    self.write(|c| {
      // Validate everything first so the update is all-or-nothing.
      for action in actions {
        match action {
          AliasAction::Add { index, .. } if !c.indices.contains_key(index) => {
            return Err(IndexError::NotFound(format!("no such index [{index}]")));
          }
          AliasAction::Remove { index, alias }
            if !c.aliases.get(alias).is_some_and(|t| t.contains(index)) =>
          {
            return Err(IndexError::NotFound(format!(
              "aliases [{alias}] missing on index [{index}]"
            )));
          }
          _ => {}
        }
      }

      for action in actions {
        match action {
          AliasAction::Add { index, alias } => {
            let targets = c.aliases.entry(alias.clone()).or_default();
            if !targets.contains(index) {
              targets.push(index.clone());
              targets.sort();
            }
          }
          AliasAction::Remove { index, alias } => {
            if let Some(targets) = c.aliases.get_mut(alias) {
              targets.retain(|t| t != index);
            }
          }
        }
      }
      c.aliases.retain(|_, targets| !targets.is_empty());
      Ok(())
    })
  }

  async fn reindex(&self, source: &str, dest: &str) -> Result<u64> {
    self.write(|c| {
      let docs = c.index(source)?.docs.clone();
      let target = c.index_mut(dest)?;
      let count = docs.len() as u64;
      target.docs.extend(docs);
      Ok(count)
    })
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn term_matches_nested_and_array_fields() {
    let doc = json!({
      "name": "projects/p/notes/n",
      "resource": { "uri": "docker://img" },
      "relatedNoteNames": ["projects/p/notes/a", "projects/p/notes/b"],
    });
    assert!(matches(&Query::term("resource.uri", "docker://img"), &doc));
    assert!(matches(&Query::term("relatedNoteNames", "projects/p/notes/b"), &doc));
    assert!(!matches(&Query::term("resource.name", "docker://img"), &doc));
    assert!(matches(&Query::prefix("name", "projects/p/notes/"), &doc));
    assert!(!matches(&Query::term("name", "projects/p/notes/n").negate(), &doc));
  }

  #[tokio::test]
  async fn alias_swap_is_atomic() {
    let es = MemoryIndex::new();
    es.create_index("a-v1", &json!({})).await.unwrap();
    es.create_index("a-v2", &json!({})).await.unwrap();
    es.update_aliases(&[AliasAction::Add { index: "a-v1".into(), alias: "a".into() }])
      .await
      .unwrap();

    // A bad action aborts the whole update.
    let err = es
      .update_aliases(&[
        AliasAction::Remove { index: "a-v1".into(), alias: "a".into() },
        AliasAction::Add { index: "missing".into(), alias: "a".into() },
      ])
      .await;
    assert!(err.is_err());
    assert_eq!(es.get_alias("a").await.unwrap(), vec!["a-v1"]);

    es.update_aliases(&[
      AliasAction::Remove { index: "a-v1".into(), alias: "a".into() },
      AliasAction::Add { index: "a-v2".into(), alias: "a".into() },
    ])
    .await
    .unwrap();
    assert_eq!(es.get_alias("a").await.unwrap(), vec!["a-v2"]);
  }

  #[tokio::test]
  async fn bulk_into_missing_index_fails_per_item() {
    let es = MemoryIndex::new();
    let docs = vec![("a".to_owned(), json!({})), ("b".to_owned(), json!({}))];
    let items = es.bulk_create("absent", &docs, Refresh::False).await.unwrap();
    assert_eq!(items.len(), 2);
    assert!(items.iter().all(|i| matches!(i, Err(IndexError::NotFound(_)))));
    assert!(es.indices().is_empty());
  }

  #[tokio::test]
  async fn create_conflicts_on_existing_id() {
    let es = MemoryIndex::new();
    es.create_index("i", &json!({})).await.unwrap();
    let doc = json!({ "name": "x" });
    es.create_document("i", "x", &doc, Refresh::WaitFor).await.unwrap();
    let err = es.create_document("i", "x", &doc, Refresh::WaitFor).await.unwrap_err();
    assert!(matches!(err, IndexError::Conflict(_)));
  }
}
