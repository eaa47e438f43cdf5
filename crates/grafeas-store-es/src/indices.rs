//! Index naming, schema versions and mappings.
//!
//! Every logical index is addressed through a stable alias; the physical
//! index behind it embeds the schema version that produced it:
//!
//! | Kind | Alias | Physical index |
//! |------|-------|----------------|
//! | Projects | `grafeas-projects` | `grafeas-v1beta1-projects-v2` |
//! | Notes | `grafeas-{p}-notes` | `grafeas-v1beta1-{p}-notes-v2` |
//! | Occurrences | `grafeas-{p}-occurrences` | `grafeas-v1beta1-{p}-occurrences-v2` |
//!
//! `{p}` is the project id passed through [`escape_project`].

use std::{fmt, str::FromStr};

use grafeas_core::{ProjectName, ResourceKind};
use serde_json::{Value, json};

pub const INDEX_PREFIX: &str = "grafeas";

/// API version segment embedded in physical index names.
pub const API_VERSION: &str = "v1beta1";

/// Mapping generation this build writes.
pub const CURRENT_SCHEMA_VERSION: SchemaVersion = SchemaVersion(2);

// ─── Schema version ──────────────────────────────────────────────────────────

/// A mapping generation, written `v{N}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SchemaVersion(pub u32);

impl fmt::Display for SchemaVersion {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "v{}", self.0) }
}

impl FromStr for SchemaVersion {
  type Err = grafeas_core::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    s.strip_prefix('v')
      .and_then(|n| n.parse::<u32>().ok())
      .filter(|n| *n >= 1)
      .map(SchemaVersion)
      .ok_or_else(|| grafeas_core::Error::invalid(format!("invalid schema version {s:?}")))
  }
}

// ─── Names ───────────────────────────────────────────────────────────────────

/// Alias and physical-index naming for one logical index.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexNames {
  kind:  ResourceKind,
  /// Owning project for notes and occurrences.
  scope: Option<String>,
}

impl IndexNames {
  pub fn projects() -> Self { Self { kind: ResourceKind::Project, scope: None } }

  pub fn notes(project: &ProjectName) -> Self {
    Self { kind: ResourceKind::Note, scope: Some(project.project_id.clone()) }
  }

  pub fn occurrences(project: &ProjectName) -> Self {
    Self { kind: ResourceKind::Occurrence, scope: Some(project.project_id.clone()) }
  }

  pub fn kind(&self) -> ResourceKind { self.kind }

  fn scoped(&self) -> String {
    match &self.scope {
      Some(p) => format!("{}-{}", escape_project(p), self.kind.collection()),
      None => self.kind.collection().to_owned(),
    }
  }

  /// The stable read/write target.
  pub fn alias(&self) -> String { format!("{INDEX_PREFIX}-{}", self.scoped()) }

  /// Physical index name without the version suffix.
  fn base(&self) -> String { format!("{INDEX_PREFIX}-{API_VERSION}-{}", self.scoped()) }

  pub fn physical(&self, version: SchemaVersion) -> String {
    format!("{}-{version}", self.base())
  }

  /// Recover the schema version from a physical index name belonging to this
  /// alias. Returns `None` for names that do not follow the scheme.
  pub fn version_of(&self, physical: &str) -> Option<SchemaVersion> {
    physical
      .strip_prefix(&self.base())?
      .strip_prefix('-')?
      .parse()
      .ok()
  }
}

/// Encode a project id into the lowercase `[a-z0-9_-]` alphabet index names
/// allow. Bytes in `[a-z0-9-]` pass through and every other byte becomes
/// `_` plus two hex digits, so distinct ids never share an index and no id
/// can smuggle in a wildcard or a comma-separated index list.
pub fn escape_project(id: &str) -> String {
  let mut out = String::with_capacity(id.len());
  for b in id.bytes() {
    match b {
      b'a'..=b'z' | b'0'..=b'9' | b'-' => out.push(b as char),
      _ => out.push_str(&format!("_{b:02x}")),
    }
  }
  out
}

impl fmt::Display for IndexNames {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.alias()) }
}

// ─── Mappings ────────────────────────────────────────────────────────────────

fn keyword() -> Value { json!({ "type": "keyword" }) }

/// Index body (settings + mappings) for a new physical index of `kind`.
///
/// Every queryable filter field is a keyword so term and prefix queries are
/// exact; everything else is mapped dynamically.
pub fn index_body(kind: ResourceKind, version: SchemaVersion) -> Value {
  let properties = match kind {
    ResourceKind::Project => json!({ "name": keyword() }),
    ResourceKind::Note => json!({
      "name":             keyword(),
      "kind":             keyword(),
      "shortDescription": keyword(),
      "relatedNoteNames": keyword(),
    }),
    ResourceKind::Occurrence => json!({
      "name":     keyword(),
      "kind":     keyword(),
      "noteName": keyword(),
      "resource": {
        "properties": {
          "uri":  keyword(),
          "name": keyword(),
        }
      },
    }),
  };

  json!({
    "mappings": {
      "_meta":      { "version": version.to_string() },
      "dynamic":    true,
      "properties": properties,
    }
  })
}
