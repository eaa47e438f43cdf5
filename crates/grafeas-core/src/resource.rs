//! The three host-defined resources: projects, notes and occurrences.
//!
//! Each is persisted as one JSON document keyed by its fully qualified name.
//! Field names follow the host's JSON encoding (camelCase).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::details::{NoteDetails, NoteKind, OccurrenceDetails};

/// A top-level namespace containing notes and occurrences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelatedUrl {
  pub url:   String,
  pub label: String,
}

// ─── Note ────────────────────────────────────────────────────────────────────

/// A template or definition referenced by occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
  #[serde(default)]
  pub name:               String,
  #[serde(default)]
  pub short_description:  String,
  #[serde(default)]
  pub long_description:   String,
  /// Derived from `details` whenever the note is written.
  #[serde(default)]
  pub kind:               NoteKind,
  #[serde(default)]
  pub related_url:        Vec<RelatedUrl>,
  #[serde(default)]
  pub expiration_time:    Option<DateTime<Utc>>,
  /// Server-assigned.
  #[serde(default)]
  pub create_time:        Option<DateTime<Utc>>,
  /// Server-assigned.
  #[serde(default)]
  pub update_time:        Option<DateTime<Utc>>,
  #[serde(default)]
  pub related_note_names: Vec<String>,
  #[serde(flatten)]
  pub details:            NoteDetails,
}

impl Note {
  pub fn new(details: NoteDetails) -> Self {
    Self {
      name: String::new(),
      short_description: String::new(),
      long_description: String::new(),
      kind: details.kind(),
      related_url: vec![],
      expiration_time: None,
      create_time: None,
      update_time: None,
      related_note_names: vec![],
      details,
    }
  }
}

// ─── Occurrence ──────────────────────────────────────────────────────────────

/// The artifact an occurrence is attached to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Resource {
  pub uri:          String,
  pub name:         String,
  pub content_hash: Option<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hash {
  pub r#type: String,
  pub value:  String,
}

/// An instance of a note attached to a specific resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Occurrence {
  /// Empty on create to have the store generate an id.
  #[serde(default)]
  pub name:        String,
  #[serde(default)]
  pub resource:    Resource,
  /// Fully qualified name of the referenced note.
  pub note_name:   String,
  /// Derived from `details` whenever the occurrence is written.
  #[serde(default)]
  pub kind:        NoteKind,
  #[serde(default)]
  pub remediation: String,
  /// Server-assigned.
  #[serde(default)]
  pub create_time: Option<DateTime<Utc>>,
  /// Server-assigned.
  #[serde(default)]
  pub update_time: Option<DateTime<Utc>>,
  #[serde(flatten)]
  pub details:     OccurrenceDetails,
}

impl Occurrence {
  pub fn new(
    resource_uri: impl Into<String>,
    note_name: impl Into<String>,
    details: OccurrenceDetails,
  ) -> Self {
    Self {
      name: String::new(),
      resource: Resource { uri: resource_uri.into(), ..Resource::default() },
      note_name: note_name.into(),
      kind: details.kind(),
      remediation: String::new(),
      create_time: None,
      update_time: None,
      details,
    }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::details::{BuildDetails, BuildProvenance, NoteKind};

  #[test]
  fn occurrence_details_flatten_beside_fields() {
    let occ = Occurrence::new(
      "git://example.com/repo@abc",
      "projects/p/notes/n",
      OccurrenceDetails::Build(BuildDetails {
        provenance:       Some(BuildProvenance {
          id: "b1".into(),
          ..BuildProvenance::default()
        }),
        provenance_bytes: String::new(),
      }),
    );

    let value = serde_json::to_value(&occ).unwrap();
    assert_eq!(value["kind"], json!("BUILD"));
    assert_eq!(value["noteName"], json!("projects/p/notes/n"));
    assert_eq!(value["resource"]["uri"], json!("git://example.com/repo@abc"));
    assert_eq!(value["build"]["provenance"]["id"], json!("b1"));

    let back: Occurrence = serde_json::from_value(value).unwrap();
    assert_eq!(back, occ);
    assert_eq!(back.details.kind(), NoteKind::Build);
  }

  #[test]
  fn occurrence_without_details_is_rejected() {
    let doc = json!({ "name": "projects/p/occurrences/o", "noteName": "projects/p/notes/n" });
    assert!(serde_json::from_value::<Occurrence>(doc).is_err());
  }
}
