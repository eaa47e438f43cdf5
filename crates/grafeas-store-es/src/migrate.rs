//! Index migrator.
//!
//! Moves each managed alias from the schema version of the physical index it
//! currently points at to a target version: create the new physical index,
//! reindex into it, swap the alias in one atomic update, drop the old index.
//! The alias stays bound to exactly one index throughout.
//!
//! The migrator runs before the adapter serves requests and never retries;
//! any failure aborts the pass and the operator re-runs it. Writes issued
//! against an alias while it is being reindexed are not carried over, so
//! writers must be paused for the duration.

use std::fmt;

use grafeas_core::{Error, ProjectName, Result};
use grafeas_filter::Query;

use crate::{
  client::{AliasAction, IndexClient, SearchRequest},
  error::{self, IndexError},
  indices::{IndexNames, SchemaVersion, index_body},
};

/// Projects fetched per search while discovering project-scoped aliases.
const DISCOVERY_PAGE: usize = 500;

// ─── Outcome ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MigrationOutcome {
  /// The alias did not exist; a fresh index was created and bound.
  Created,
  /// The alias already pointed at the target version.
  UpToDate,
  Migrated { from: SchemaVersion },
}

impl fmt::Display for MigrationOutcome {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      MigrationOutcome::Created => f.write_str("created"),
      MigrationOutcome::UpToDate => f.write_str("up to date"),
      MigrationOutcome::Migrated { from } => write!(f, "migrated from {from}"),
    }
  }
}

/// What an alias currently resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasStatus {
  pub alias:   String,
  /// Physical indices bound to the alias; more than one is a broken state.
  pub indices: Vec<String>,
  /// Version of the single bound index, when it follows the naming scheme.
  pub version: Option<SchemaVersion>,
}

// ─── Migrator ────────────────────────────────────────────────────────────────

pub struct Migrator<C> {
  client: C,
  target: SchemaVersion,
}

impl<C: IndexClient> Migrator<C> {
  pub fn new(client: C, target: SchemaVersion) -> Self { Self { client, target } }

  pub fn target(&self) -> SchemaVersion { self.target }

  /// Bring one alias to the target version.
  pub async fn migrate(&self, names: &IndexNames) -> Result<MigrationOutcome> {
    let alias = names.alias();
    let target = names.physical(self.target);
    let fail = |e: IndexError, step: &str| error::internal(e, &format!("migrate {alias}: {step}"));

    let bound = self.client.get_alias(&alias).await.map_err(|e| fail(e, "resolve alias"))?;
    let current = match bound.as_slice() {
      [] => None,
      [one] => Some(one.clone()),
      many => {
        return Err(Error::Internal(format!(
          "alias {alias} points at {} indices ({}); fix it by hand before migrating",
          many.len(),
          many.join(", ")
        )));
      }
    };

    // A target index the alias does not point at is left over from an
    // interrupted run.
    if current.as_deref() != Some(target.as_str())
      && self.client.index_exists(&target).await.map_err(|e| fail(e, "inspect target"))?
    {
      tracing::warn!(%alias, index = %target, "deleting leftover index from an interrupted migration");
      self.client.delete_index(&target).await.map_err(|e| fail(e, "delete leftover"))?;
    }

    let Some(current) = current else {
      self.create(names, &target).await.map_err(|e| fail(e, "create index"))?;
      self
        .client
        .update_aliases(&[AliasAction::Add { index: target.clone(), alias: alias.clone() }])
        .await
        .map_err(|e| fail(e, "bind alias"))?;
      tracing::info!(%alias, index = %target, "created index");
      return Ok(MigrationOutcome::Created);
    };

    let from = names.version_of(&current).ok_or_else(|| {
      Error::FailedPrecondition(format!(
        "alias {alias} points at {current}, which carries no schema version"
      ))
    })?;

    if from == self.target {
      tracing::info!(%alias, index = %current, "up to date");
      return Ok(MigrationOutcome::UpToDate);
    }
    if from > self.target {
      return Err(Error::FailedPrecondition(format!(
        "alias {alias} is at {from}, newer than target {}; refusing to downgrade",
        self.target
      )));
    }

    self.create(names, &target).await.map_err(|e| fail(e, "create index"))?;
    let copied = match self.client.reindex(&current, &target).await {
      Ok(n) => n,
      // Deleting the destination under a live reindex task would race it.
      Err(IndexError::Unfinished(detail)) => {
        tracing::warn!(%alias, index = %target, %detail, "reindex outlived the client timeout");
        return Err(Error::Unavailable(format!(
          "migrate {alias}: {detail}; {target} was kept, re-run the migration once the \
           reindex task has finished"
        )));
      }
      Err(e) => {
        self.discard(&target).await;
        return Err(fail(e, "reindex"));
      }
    };
    tracing::info!(%alias, from = %current, to = %target, copied, "reindexed");

    let swap = [
      AliasAction::Remove { index: current.clone(), alias: alias.clone() },
      AliasAction::Add { index: target.clone(), alias: alias.clone() },
    ];
    if let Err(e) = self.client.update_aliases(&swap).await {
      self.discard(&target).await;
      return Err(fail(e, "swap alias"));
    }
    tracing::info!(%alias, index = %target, "alias swapped");

    // The alias has moved; a stale old index is only clutter.
    if let Err(e) = self.client.delete_index(&current).await {
      tracing::warn!(%alias, index = %current, error = %e, "old index left behind");
    }

    Ok(MigrationOutcome::Migrated { from })
  }

  /// Migrate the projects alias, then every project's notes and occurrences
  /// aliases.
  pub async fn migrate_all(&self) -> Result<Vec<(IndexNames, MigrationOutcome)>> {
    let projects = IndexNames::projects();
    let outcome = self.migrate(&projects).await?;
    let mut outcomes = vec![(projects, outcome)];

    for project in self.projects().await? {
      for names in [IndexNames::notes(&project), IndexNames::occurrences(&project)] {
        let outcome = self.migrate(&names).await?;
        outcomes.push((names, outcome));
      }
    }
    Ok(outcomes)
  }

  /// Current binding of every managed alias.
  pub async fn status(&self) -> Result<Vec<AliasStatus>> {
    let mut all = vec![IndexNames::projects()];
    for project in self.projects().await? {
      all.push(IndexNames::notes(&project));
      all.push(IndexNames::occurrences(&project));
    }

    let mut statuses = Vec::with_capacity(all.len());
    for names in all {
      let alias = names.alias();
      let indices = self
        .client
        .get_alias(&alias)
        .await
        .map_err(|e| error::internal(e, &format!("resolve {alias}")))?;
      let version = match indices.as_slice() {
        [one] => names.version_of(one),
        _ => None,
      };
      statuses.push(AliasStatus { alias, indices, version });
    }
    Ok(statuses)
  }

  async fn create(&self, names: &IndexNames, index: &str) -> Result<(), IndexError> {
    self.client.create_index(index, &index_body(names.kind(), self.target)).await
  }

  async fn discard(&self, index: &str) {
    if let Err(e) = self.client.delete_index(index).await {
      tracing::warn!(%index, error = %e, "could not remove partial index; next run will");
    }
  }

  /// Every stored project, in name order.
  async fn projects(&self) -> Result<Vec<ProjectName>> {
    let alias = IndexNames::projects().alias();
    let mut projects = Vec::new();
    let mut search_after = None;

    loop {
      let request = SearchRequest {
        query: Query::MatchAll,
        size: DISCOVERY_PAGE,
        sort_field: "name".into(),
        search_after,
      };
      let hits = match self.client.search(&alias, &request).await {
        Ok(hits) => hits,
        Err(IndexError::NotFound(_)) => vec![],
        Err(e) => return Err(error::internal(e, "discover projects")),
      };
      let full = hits.len() == DISCOVERY_PAGE;

      search_after = None;
      for hit in hits {
        let Some(name) = hit.source.get("name").and_then(|n| n.as_str()) else {
          tracing::warn!(id = %hit.id, "project document without a name");
          continue;
        };
        search_after = Some(name.to_owned());
        match ProjectName::parse(name) {
          Ok(project) => projects.push(project),
          Err(e) => tracing::warn!(%name, error = %e, "skipping malformed project"),
        }
      }

      if !full || search_after.is_none() {
        return Ok(projects);
      }
    }
  }
}

/// Bind `names`' alias to a fresh physical index at `version` unless the
/// alias already exists. Returns whether anything was created.
///
/// Tolerates a concurrent provisioner creating the same index first.
pub(crate) async fn provision<C: IndexClient>(
  client: &C,
  names: &IndexNames,
  version: SchemaVersion,
) -> Result<bool, IndexError> {
  let alias = names.alias();
  if !client.get_alias(&alias).await?.is_empty() {
    return Ok(false);
  }

  let physical = names.physical(version);
  if let Err(e) = client.create_index(&physical, &index_body(names.kind(), version)).await
    && !client.index_exists(&physical).await?
  {
    return Err(e);
  }
  client
    .update_aliases(&[AliasAction::Add { index: physical.clone(), alias: alias.clone() }])
    .await?;
  tracing::info!(%alias, index = %physical, "provisioned index");
  Ok(true)
}
