//! Fully qualified resource names.
//!
//! Every stored document is keyed by one of these names:
//!
//! | Kind | Form |
//! |------|------|
//! | Project | `projects/{id}` |
//! | Note | `projects/{id}/notes/{nid}` |
//! | Occurrence | `projects/{id}/occurrences/{oid}` |

use std::fmt;

use uuid::Uuid;

use crate::{Error, Result};

const PROJECTS: &str = "projects";
const NOTES: &str = "notes";
const OCCURRENCES: &str = "occurrences";

// ─── Resource kind ───────────────────────────────────────────────────────────

/// The three resource kinds the host defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
  Project,
  Note,
  Occurrence,
}

impl ResourceKind {
  /// Plural collection segment, also used in index names.
  pub fn collection(self) -> &'static str {
    match self {
      ResourceKind::Project => PROJECTS,
      ResourceKind::Note => NOTES,
      ResourceKind::Occurrence => OCCURRENCES,
    }
  }
}

impl fmt::Display for ResourceKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      ResourceKind::Project => "project",
      ResourceKind::Note => "note",
      ResourceKind::Occurrence => "occurrence",
    };
    f.write_str(s)
  }
}

/// Generate an opaque, collision-resistant resource id.
pub fn generate_id() -> String { Uuid::new_v4().to_string() }

fn valid_segment(s: &str) -> bool { !s.is_empty() && !s.contains('/') }

// ─── Project ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName {
  pub project_id: String,
}

impl ProjectName {
  pub fn new(project_id: impl Into<String>) -> Result<Self> {
    let project_id = project_id.into();
    if !valid_segment(&project_id) {
      return Err(Error::invalid(format!("invalid project id {project_id:?}")));
    }
    Ok(Self { project_id })
  }

  pub fn parse(name: &str) -> Result<Self> {
    match name.split('/').collect::<Vec<_>>().as_slice() {
      [PROJECTS, id] if valid_segment(id) => Ok(Self { project_id: (*id).to_owned() }),
      _ => Err(Error::invalid(format!(
        "project name {name:?} does not match projects/{{id}}"
      ))),
    }
  }

  /// Prefix shared by every note name under this project.
  pub fn notes_prefix(&self) -> String { format!("{self}/{NOTES}/") }

  /// Prefix shared by every occurrence name under this project.
  pub fn occurrences_prefix(&self) -> String { format!("{self}/{OCCURRENCES}/") }
}

impl fmt::Display for ProjectName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{PROJECTS}/{}", self.project_id)
  }
}

// ─── Note ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NoteName {
  pub project_id: String,
  pub note_id:    String,
}

impl NoteName {
  pub fn new(parent: &ProjectName, note_id: impl Into<String>) -> Result<Self> {
    let note_id = note_id.into();
    if !valid_segment(&note_id) {
      return Err(Error::invalid(format!("invalid note id {note_id:?}")));
    }
    Ok(Self { project_id: parent.project_id.clone(), note_id })
  }

  pub fn parse(name: &str) -> Result<Self> {
    match name.split('/').collect::<Vec<_>>().as_slice() {
      [PROJECTS, pid, NOTES, nid] if valid_segment(pid) && valid_segment(nid) => {
        Ok(Self { project_id: (*pid).to_owned(), note_id: (*nid).to_owned() })
      }
      _ => Err(Error::invalid(format!(
        "note name {name:?} does not match projects/{{id}}/notes/{{nid}}"
      ))),
    }
  }

  pub fn project(&self) -> ProjectName {
    ProjectName { project_id: self.project_id.clone() }
  }
}

impl fmt::Display for NoteName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{PROJECTS}/{}/{NOTES}/{}", self.project_id, self.note_id)
  }
}

// ─── Occurrence ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OccurrenceName {
  pub project_id:    String,
  pub occurrence_id: String,
}

impl OccurrenceName {
  /// A fresh name under `parent` with a generated id.
  pub fn generate(parent: &ProjectName) -> Self {
    Self { project_id: parent.project_id.clone(), occurrence_id: generate_id() }
  }

  pub fn parse(name: &str) -> Result<Self> {
    match name.split('/').collect::<Vec<_>>().as_slice() {
      [PROJECTS, pid, OCCURRENCES, oid] if valid_segment(pid) && valid_segment(oid) => {
        Ok(Self {
          project_id:    (*pid).to_owned(),
          occurrence_id: (*oid).to_owned(),
        })
      }
      _ => Err(Error::invalid(format!(
        "occurrence name {name:?} does not match projects/{{id}}/occurrences/{{oid}}"
      ))),
    }
  }

  /// Resolve the name a caller supplied for a new occurrence under `parent`.
  ///
  /// An empty name, or one that stops at the collection segment
  /// (`projects/{id}/occurrences/`), gets a generated id. Any other name must
  /// parse and belong to `parent`.
  pub fn for_create(parent: &ProjectName, supplied: &str) -> Result<Self> {
    if supplied.is_empty() || supplied == parent.occurrences_prefix() {
      return Ok(Self::generate(parent));
    }
    let name = Self::parse(supplied)?;
    if name.project_id != parent.project_id {
      return Err(Error::invalid(format!(
        "occurrence {supplied:?} does not belong to {parent}"
      )));
    }
    Ok(name)
  }

  pub fn project(&self) -> ProjectName {
    ProjectName { project_id: self.project_id.clone() }
  }
}

impl fmt::Display for OccurrenceName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{PROJECTS}/{}/{OCCURRENCES}/{}", self.project_id, self.occurrence_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn project_name_roundtrip() {
    let name = ProjectName::parse("projects/foo").unwrap();
    assert_eq!(name.project_id, "foo");
    assert_eq!(name.to_string(), "projects/foo");
  }

  #[test]
  fn project_name_rejects_malformed() {
    for bad in ["", "projects", "projects/", "project/foo", "projects/foo/bar", "/foo"] {
      let err = ProjectName::parse(bad).unwrap_err();
      assert!(matches!(err, Error::InvalidArgument(_)), "{bad:?}");
    }
  }

  #[test]
  fn note_name_parse_and_parent() {
    let name = NoteName::parse("projects/p1/notes/cve-1").unwrap();
    assert_eq!(name.note_id, "cve-1");
    assert_eq!(name.project().to_string(), "projects/p1");
    assert!(NoteName::parse("projects/p1/occurrences/x").is_err());
    assert!(NoteName::parse("projects/p1/notes/").is_err());
  }

  #[test]
  fn occurrence_name_generated_when_id_omitted() {
    let parent = ProjectName::parse("projects/p1").unwrap();

    let a = OccurrenceName::for_create(&parent, "").unwrap();
    let b = OccurrenceName::for_create(&parent, "projects/p1/occurrences/").unwrap();
    assert_eq!(a.project_id, "p1");
    assert!(!a.occurrence_id.is_empty());
    assert_ne!(a.occurrence_id, b.occurrence_id);

    let kept = OccurrenceName::for_create(&parent, "projects/p1/occurrences/o1").unwrap();
    assert_eq!(kept.occurrence_id, "o1");
  }

  #[test]
  fn occurrence_name_must_match_parent() {
    let parent = ProjectName::parse("projects/p1").unwrap();
    let err = OccurrenceName::for_create(&parent, "projects/p2/occurrences/o1").unwrap_err();
    assert!(matches!(err, Error::InvalidArgument(_)));
  }
}
