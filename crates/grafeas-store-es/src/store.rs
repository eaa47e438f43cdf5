//! The index-backed implementation of [`Storage`], [`ElasticsearchStorage`].
//!
//! Each resource is one JSON document whose id is its fully qualified name.
//! Projects share one alias; every project gets its own notes and
//! occurrences aliases, provisioned when the project is created (and lazily
//! on first write if they are missing).

use std::future::Future;

use async_trait::async_trait;
use chrono::Utc;
use grafeas_core::{
  Error, ListRequest, Note, NoteName, Occurrence, OccurrenceName, Page, Project, ProjectName,
  Result, Storage,
  storage::{MAX_BATCH_SIZE, effective_page_size},
};
use grafeas_filter::Query;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{
  client::{IndexClient, SearchRequest},
  config::{ElasticsearchConfig, Refresh},
  cursor::{self, Cursor},
  error::{self, IndexError},
  indices::{CURRENT_SCHEMA_VERSION, IndexNames},
  migrate,
  reaper::Reaper,
  retry::{self, ReadError, RetryPolicy},
};

/// Document field used as the keyset pagination key.
const SORT_FIELD: &str = "name";

// ─── Documents ───────────────────────────────────────────────────────────────

/// A stored resource, keyed by its name.
trait Document: Serialize + DeserializeOwned + Send {
  fn name(&self) -> &str;
}

impl Document for Project {
  fn name(&self) -> &str { &self.name }
}

impl Document for Note {
  fn name(&self) -> &str { &self.name }
}

impl Document for Occurrence {
  fn name(&self) -> &str { &self.name }
}

fn encode<T: Serialize>(doc: &T) -> Result<Value> {
  serde_json::to_value(doc).map_err(|e| error::internal(e, "encode document"))
}

fn decode<T: DeserializeOwned>(source: Value) -> Result<T> {
  serde_json::from_value(source).map_err(|e| error::internal(e, "decode stored document"))
}

fn missing(name: &str) -> Error { Error::not_found(format!("{name} not found")) }

fn create_error(err: IndexError, name: &str) -> Error {
  match err {
    IndexError::Conflict(_) => Error::AlreadyExists(format!("{name} already exists")),
    other => error::to_core(other, &format!("create {name}")),
  }
}

/// Whether a bulk create failed because its target alias is gone. The index
/// reports this per item, so every item must carry the 404.
fn alias_missing(outcome: &error::Result<Vec<error::Result<()>>>) -> bool {
  match outcome {
    Err(IndexError::NotFound(_)) => true,
    Ok(items) => {
      !items.is_empty() && items.iter().all(|i| matches!(i, Err(IndexError::NotFound(_))))
    }
    Err(_) => false,
  }
}

/// Fill in the server-assigned fields of an occurrence about to be created.
fn prepare_occurrence(parent: &ProjectName, mut occurrence: Occurrence) -> Result<Occurrence> {
  let name = OccurrenceName::for_create(parent, &occurrence.name)?;
  NoteName::parse(&occurrence.note_name)?;
  let now = Utc::now();
  occurrence.name = name.to_string();
  occurrence.kind = occurrence.details.kind();
  occurrence.create_time = Some(now);
  occurrence.update_time = Some(now);
  Ok(occurrence)
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// Grafeas storage on an Elasticsearch-compatible index cluster.
///
/// Generic over the [`IndexClient`] so tests can run against
/// [`MemoryIndex`](crate::MemoryIndex).
pub struct ElasticsearchStorage<C> {
  client:  C,
  refresh: Refresh,
  retry:   RetryPolicy,
  reaper:  Reaper,
}

impl<C> ElasticsearchStorage<C>
where
  C: IndexClient + Clone + 'static,
{
  /// Must be called inside a tokio runtime; spawns the cascade reaper.
  pub fn new(client: C, config: &ElasticsearchConfig) -> Self {
    let reaper = Reaper::spawn(client.clone(), config.reaper_concurrency);
    Self { client, refresh: config.refresh, retry: RetryPolicy::default(), reaper }
  }

  pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
    self.retry = retry;
    self
  }

  pub fn client(&self) -> &C { &self.client }

  /// Provision the projects alias if it does not exist yet.
  pub async fn initialize(&self) -> Result<()> {
    self.provision(&IndexNames::projects()).await
  }

  /// Wait until every cascade delete enqueued so far has finished.
  pub async fn settle(&self) { self.reaper.settle().await }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn provision(&self, names: &IndexNames) -> Result<()> {
    migrate::provision(&self.client, names, CURRENT_SCHEMA_VERSION)
      .await
      .map(|_| ())
      .map_err(|e| error::internal(e, &format!("provision {names}")))
  }

  /// Run an idempotent read under the retry policy.
  async fn read<T, F, Fut>(&self, what: &str, op: F) -> Result<T>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = error::Result<T>>,
  {
    match retry::retry_read(self.retry, what, op).await {
      Ok(v) => Ok(v),
      Err(ReadError::Exhausted(e)) => {
        tracing::warn!(error = %e, attempts = self.retry.max_attempts, "{what}: giving up");
        Err(Error::Unavailable(format!(
          "{what}: index cluster unavailable after {} attempts",
          self.retry.max_attempts
        )))
      }
      Err(ReadError::Failed(e)) => Err(error::to_core(e, what)),
    }
  }

  async fn fetch<T: Document>(&self, alias: &str, name: &str) -> Result<Option<T>> {
    let client = &self.client;
    let source = self
      .read(&format!("get {name}"), move || client.get_document(alias, name))
      .await?;
    source.map(decode).transpose()
  }

  async fn require_project(&self, project: &ProjectName) -> Result<()> {
    let name = project.to_string();
    match self.fetch::<Project>(&IndexNames::projects().alias(), &name).await? {
      Some(_) => Ok(()),
      None => Err(Error::FailedPrecondition(format!("parent {name} does not exist"))),
    }
  }

  /// Create a document; a missing alias is provisioned and the write issued
  /// once more.
  async fn create_doc(&self, names: &IndexNames, name: &str, doc: &Value) -> Result<()> {
    let alias = names.alias();
    let mut result = self.client.create_document(&alias, name, doc, self.refresh).await;
    if let Err(IndexError::NotFound(_)) = result {
      self.provision(names).await?;
      result = self.client.create_document(&alias, name, doc, self.refresh).await;
    }
    result.map_err(|e| create_error(e, name))
  }

  async fn replace_doc(&self, alias: &str, name: &str, doc: &Value) -> Result<()> {
    self
      .client
      .put_document(alias, name, doc, self.refresh)
      .await
      .map_err(|e| error::to_core(e, &format!("update {name}")))
  }

  async fn delete_doc(&self, alias: &str, name: &str) -> Result<()> {
    match self.client.delete_document(alias, name, self.refresh).await {
      Ok(true) => Ok(()),
      Ok(false) => Err(missing(name)),
      Err(e) => Err(error::to_core(e, &format!("delete {name}"))),
    }
  }

  /// One page of `names`' documents matching `request`, restricted to names
  /// starting with `scope`.
  async fn list<T: Document>(
    &self,
    names: &IndexNames,
    scope: Option<String>,
    request: &ListRequest,
  ) -> Result<Page<T>> {
    let size = effective_page_size(request.page_size)?;
    let filter = grafeas_filter::compile(names.kind(), &request.filter)?;
    let query = match scope {
      Some(prefix) => Query::prefix(SORT_FIELD, prefix).and(filter),
      None => filter,
    };

    let client = &self.client;
    let alias = names.alias();
    let alias = alias.as_str();

    let bound = self.read("resolve alias", move || client.get_alias(alias)).await?;
    let version = match bound.as_slice() {
      [] => return Ok(Page { items: vec![], next_page_token: String::new() }),
      [one] => names.version_of(one).unwrap_or(CURRENT_SCHEMA_VERSION),
      many => {
        return Err(error::internal(
          format!("alias {alias} points at {} indices", many.len()),
          &format!("list {alias}"),
        ));
      }
    };

    let fingerprint = cursor::fingerprint(alias, version, names.kind(), &request.filter);
    let resume = match request.page_token.as_str() {
      "" => None,
      token => Some(Cursor::decode(token, &fingerprint)?),
    };

    let search = SearchRequest {
      query,
      size: size + 1,
      sort_field: SORT_FIELD.into(),
      search_after: resume.as_ref().map(|c| c.last_key.clone()),
    };
    let search = &search;
    let hits = match self.read("search", move || client.search(alias, search)).await {
      Ok(hits) => hits,
      // Reaped between the alias lookup and the search.
      Err(e) if e.is_not_found() => vec![],
      Err(e) => return Err(e),
    };

    let more = hits.len() > size;
    let items = hits
      .into_iter()
      .take(size)
      .map(|hit| decode::<T>(hit.source))
      .collect::<Result<Vec<_>>>()?;

    let next_page_token = match items.last() {
      Some(last) if more => Cursor {
        offset: resume.map_or(0, |c| c.offset) + items.len() as u64,
        last_key: last.name().to_owned(),
        fingerprint,
      }
      .encode()?,
      _ => String::new(),
    };

    Ok(Page { items, next_page_token })
  }
}

// ─── Storage impl ────────────────────────────────────────────────────────────

#[async_trait]
impl<C> Storage for ElasticsearchStorage<C>
where
  C: IndexClient + Clone + 'static,
{
  // ── Projects ──────────────────────────────────────────────────────────

  async fn create_project(&self, name: &str) -> Result<Project> {
    let parsed = ProjectName::parse(name)?;
    let project = Project { name: parsed.to_string() };
    self.create_doc(&IndexNames::projects(), &project.name, &encode(&project)?).await?;

    // Child writes provision lazily, so a failure here is not fatal.
    for names in [IndexNames::notes(&parsed), IndexNames::occurrences(&parsed)] {
      if let Err(e) = self.provision(&names).await {
        tracing::warn!(project = %project.name, alias = %names, error = %e, "deferring provisioning");
      }
    }
    tracing::debug!(project = %project.name, "created project");
    Ok(project)
  }

  async fn get_project(&self, name: &str) -> Result<Project> {
    let name = ProjectName::parse(name)?.to_string();
    self
      .fetch(&IndexNames::projects().alias(), &name)
      .await?
      .ok_or_else(|| missing(&name))
  }

  async fn list_projects(&self, request: &ListRequest) -> Result<Page<Project>> {
    self.list(&IndexNames::projects(), None, request).await
  }

  async fn delete_project(&self, name: &str) -> Result<()> {
    let parsed = ProjectName::parse(name)?;
    self.delete_doc(&IndexNames::projects().alias(), &parsed.to_string()).await?;
    self.reaper.enqueue(parsed).await;
    Ok(())
  }

  // ── Notes ─────────────────────────────────────────────────────────────

  async fn create_note(&self, parent: &str, note_id: &str, mut note: Note) -> Result<Note> {
    let parent = ProjectName::parse(parent)?;
    let name = NoteName::new(&parent, note_id)?;
    self.require_project(&parent).await?;

    let now = Utc::now();
    note.name = name.to_string();
    note.kind = note.details.kind();
    note.create_time = Some(now);
    note.update_time = Some(now);

    self.create_doc(&IndexNames::notes(&parent), &note.name, &encode(&note)?).await?;
    Ok(note)
  }

  async fn get_note(&self, name: &str) -> Result<Note> {
    let parsed = NoteName::parse(name)?;
    let name = parsed.to_string();
    self
      .fetch(&IndexNames::notes(&parsed.project()).alias(), &name)
      .await?
      .ok_or_else(|| missing(&name))
  }

  async fn list_notes(&self, parent: &str, request: &ListRequest) -> Result<Page<Note>> {
    let parent = ProjectName::parse(parent)?;
    self
      .list(&IndexNames::notes(&parent), Some(parent.notes_prefix()), request)
      .await
  }

  async fn update_note(&self, name: &str, mut note: Note) -> Result<Note> {
    let parsed = NoteName::parse(name)?;
    let name = parsed.to_string();
    let alias = IndexNames::notes(&parsed.project()).alias();
    let existing: Note = self.fetch(&alias, &name).await?.ok_or_else(|| missing(&name))?;

    note.name = name;
    note.kind = note.details.kind();
    note.create_time = existing.create_time;
    note.update_time = Some(Utc::now());

    self.replace_doc(&alias, &note.name, &encode(&note)?).await?;
    Ok(note)
  }

  async fn delete_note(&self, name: &str) -> Result<()> {
    let parsed = NoteName::parse(name)?;
    self
      .delete_doc(&IndexNames::notes(&parsed.project()).alias(), &parsed.to_string())
      .await
  }

  // ── Occurrences ───────────────────────────────────────────────────────

  async fn create_occurrence(&self, parent: &str, occurrence: Occurrence) -> Result<Occurrence> {
    let parent = ProjectName::parse(parent)?;
    let occurrence = prepare_occurrence(&parent, occurrence)?;
    self.require_project(&parent).await?;

    self
      .create_doc(&IndexNames::occurrences(&parent), &occurrence.name, &encode(&occurrence)?)
      .await?;
    Ok(occurrence)
  }

  async fn batch_create_occurrences(
    &self,
    parent: &str,
    occurrences: Vec<Occurrence>,
  ) -> Result<Vec<Result<Occurrence>>> {
    let parent = ProjectName::parse(parent)?;
    if occurrences.is_empty() {
      return Err(Error::invalid("batch must contain at least one occurrence"));
    }
    if occurrences.len() > MAX_BATCH_SIZE {
      return Err(Error::invalid(format!(
        "batch of {} occurrences exceeds the limit of {MAX_BATCH_SIZE}",
        occurrences.len()
      )));
    }
    self.require_project(&parent).await?;

    let mut results: Vec<Result<Occurrence>> = occurrences
      .into_iter()
      .map(|o| prepare_occurrence(&parent, o))
      .collect();

    // Valid items go out in one bulk request; `slots` maps them back.
    let mut docs = Vec::with_capacity(results.len());
    let mut slots = Vec::with_capacity(results.len());
    for (slot, result) in results.iter_mut().enumerate() {
      let Ok(occurrence) = result else { continue };
      match encode(&*occurrence) {
        Ok(doc) => {
          docs.push((occurrence.name.clone(), doc));
          slots.push(slot);
        }
        Err(e) => *result = Err(e),
      }
    }

    if !docs.is_empty() {
      let names = IndexNames::occurrences(&parent);
      let alias = names.alias();
      let mut outcome = self.client.bulk_create(&alias, &docs, self.refresh).await;
      if alias_missing(&outcome) {
        self.provision(&names).await?;
        outcome = self.client.bulk_create(&alias, &docs, self.refresh).await;
      }
      let outcome =
        outcome.map_err(|e| error::to_core(e, &format!("batch create under {parent}")))?;

      for ((slot, (name, _)), item) in slots.into_iter().zip(&docs).zip(outcome) {
        if let Err(e) = item {
          results[slot] = Err(create_error(e, name));
        }
      }
    }

    if results.iter().all(Result::is_err) {
      let first = results.into_iter().find_map(Result::err);
      return Err(first.unwrap_or_else(|| Error::invalid("batch produced no results")));
    }
    Ok(results)
  }

  async fn get_occurrence(&self, name: &str) -> Result<Occurrence> {
    let parsed = OccurrenceName::parse(name)?;
    let name = parsed.to_string();
    self
      .fetch(&IndexNames::occurrences(&parsed.project()).alias(), &name)
      .await?
      .ok_or_else(|| missing(&name))
  }

  async fn list_occurrences(
    &self,
    parent: &str,
    request: &ListRequest,
  ) -> Result<Page<Occurrence>> {
    let parent = ProjectName::parse(parent)?;
    self
      .list(&IndexNames::occurrences(&parent), Some(parent.occurrences_prefix()), request)
      .await
  }

  async fn update_occurrence(&self, name: &str, mut occurrence: Occurrence) -> Result<Occurrence> {
    let parsed = OccurrenceName::parse(name)?;
    NoteName::parse(&occurrence.note_name)?;
    let name = parsed.to_string();
    let alias = IndexNames::occurrences(&parsed.project()).alias();
    let existing: Occurrence = self.fetch(&alias, &name).await?.ok_or_else(|| missing(&name))?;

    occurrence.name = name;
    occurrence.kind = occurrence.details.kind();
    occurrence.create_time = existing.create_time;
    occurrence.update_time = Some(Utc::now());

    self.replace_doc(&alias, &occurrence.name, &encode(&occurrence)?).await?;
    Ok(occurrence)
  }

  async fn delete_occurrence(&self, name: &str) -> Result<()> {
    let parsed = OccurrenceName::parse(name)?;
    self
      .delete_doc(&IndexNames::occurrences(&parsed.project()).alias(), &parsed.to_string())
      .await
  }
}
