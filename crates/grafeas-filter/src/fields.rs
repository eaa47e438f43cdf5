//! Queryable fields per resource kind.
//!
//! Each entry is a dotted path into the stored JSON document; the index
//! mappings declare every one of them as an exact-match keyword.

use grafeas_core::ResourceKind;

const PROJECT_FIELDS: &[&str] = &["name"];

const NOTE_FIELDS: &[&str] = &["name", "kind", "shortDescription", "relatedNoteNames"];

const OCCURRENCE_FIELDS: &[&str] =
  &["name", "kind", "noteName", "resource.uri", "resource.name"];

pub fn queryable_fields(kind: ResourceKind) -> &'static [&'static str] {
  match kind {
    ResourceKind::Project => PROJECT_FIELDS,
    ResourceKind::Note => NOTE_FIELDS,
    ResourceKind::Occurrence => OCCURRENCE_FIELDS,
  }
}

pub fn is_queryable(kind: ResourceKind, field: &str) -> bool {
  queryable_fields(kind).contains(&field)
}
