//! Asynchronous cascade delete of a project's notes and occurrences.
//!
//! `delete_project` removes the project document and returns; the project's
//! note and occurrence indices are dropped here in the background. Failures
//! are logged and never reach the caller.

use std::sync::Arc;

use grafeas_core::ProjectName;
use tokio::sync::{Semaphore, mpsc, oneshot};

use crate::{client::IndexClient, indices::IndexNames};

/// Pending reaps held before `enqueue` starts waiting.
const QUEUE_CAPACITY: usize = 256;

enum Message {
  Reap(ProjectName),
  /// Reply once every earlier reap has finished.
  Settle(oneshot::Sender<()>),
}

/// Handle to the background reaper task. The task exits when the handle is
/// dropped.
pub(crate) struct Reaper {
  tx: mpsc::Sender<Message>,
}

impl Reaper {
  /// Start the worker on the current tokio runtime.
  pub fn spawn<C>(client: C, concurrency: usize) -> Self
  where
    C: IndexClient + Clone + 'static,
  {
    let (tx, rx) = mpsc::channel(QUEUE_CAPACITY);
    tokio::spawn(run(client, rx, concurrency.max(1)));
    Self { tx }
  }

  pub async fn enqueue(&self, project: ProjectName) {
    let name = project.to_string();
    if self.tx.send(Message::Reap(project)).await.is_err() {
      tracing::warn!(project = %name, "reaper is gone; child indices left behind");
    }
  }

  pub async fn settle(&self) {
    let (done_tx, done_rx) = oneshot::channel();
    if self.tx.send(Message::Settle(done_tx)).await.is_ok() {
      let _ = done_rx.await;
    }
  }
}

async fn run<C>(client: C, mut rx: mpsc::Receiver<Message>, concurrency: usize)
where
  C: IndexClient + Clone + 'static,
{
  let permits = Arc::new(Semaphore::new(concurrency));

  while let Some(message) = rx.recv().await {
    match message {
      Message::Reap(project) => {
        let Ok(permit) = permits.clone().acquire_owned().await else {
          break;
        };
        let client = client.clone();
        tokio::spawn(async move {
          reap_project(&client, &project).await;
          drop(permit);
        });
      }
      Message::Settle(done) => {
        // Holding every permit means no earlier reap is still running.
        if let Ok(all) = permits.acquire_many(concurrency as u32).await {
          drop(all);
        }
        let _ = done.send(());
      }
    }
  }
}

async fn reap_project<C: IndexClient>(client: &C, project: &ProjectName) {
  let name = project.to_string();

  // The project may have been re-created since the delete was acknowledged.
  match client.get_document(&IndexNames::projects().alias(), &name).await {
    Ok(Some(_)) => {
      tracing::info!(project = %name, "project exists again; skipping reap");
      return;
    }
    Ok(None) => {}
    Err(e) => {
      tracing::warn!(project = %name, error = %e, "reap aborted: project lookup failed");
      return;
    }
  }

  for names in [IndexNames::notes(project), IndexNames::occurrences(project)] {
    let alias = names.alias();
    let indices = match client.get_alias(&alias).await {
      Ok(indices) => indices,
      Err(e) => {
        tracing::warn!(%alias, error = %e, "reap: alias lookup failed");
        continue;
      }
    };

    for index in indices {
      match client.delete_index(&index).await {
        Ok(()) => tracing::info!(project = %name, %index, "reaped index"),
        Err(e) => tracing::warn!(project = %name, %index, error = %e, "reap: delete failed"),
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::{MemoryIndex, config::Refresh, indices::CURRENT_SCHEMA_VERSION, migrate};

  async fn provisioned(es: &MemoryIndex, project: &ProjectName) {
    let projects = IndexNames::projects();
    for names in [projects, IndexNames::notes(project), IndexNames::occurrences(project)] {
      migrate::provision(es, &names, CURRENT_SCHEMA_VERSION).await.unwrap();
    }
  }

  #[tokio::test]
  async fn live_project_keeps_its_indices() {
    let es = MemoryIndex::new();
    let project = ProjectName::parse("projects/p").unwrap();
    provisioned(&es, &project).await;
    let doc = json!({ "name": "projects/p" });
    es.put_document("grafeas-projects", "projects/p", &doc, Refresh::False).await.unwrap();

    reap_project(&es, &project).await;

    assert_eq!(es.document_count("grafeas-p-notes"), Some(0));
    assert_eq!(es.document_count("grafeas-p-occurrences"), Some(0));
  }

  #[tokio::test]
  async fn deleted_project_loses_its_indices() {
    let es = MemoryIndex::new();
    let project = ProjectName::parse("projects/p").unwrap();
    provisioned(&es, &project).await;

    reap_project(&es, &project).await;

    assert_eq!(es.indices(), vec!["grafeas-v1beta1-projects-v2"]);
  }
}
