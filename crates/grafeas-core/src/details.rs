//! Kind-specific payloads carried by notes and occurrences.
//!
//! Each note and each occurrence carries exactly one variant. The storage
//! layer never inspects payloads beyond deriving [`NoteKind`]; documents are
//! serialised whole.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Discriminant shared by notes and the occurrences that reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteKind {
  #[default]
  NoteKindUnspecified,
  Vulnerability,
  Build,
  Image,
  Package,
  Deployment,
  Discovery,
  Attestation,
}

// ─── Shared sub-types ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
  #[default]
  SeverityUnspecified,
  Minimal,
  Low,
  Medium,
  High,
  Critical,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Version {
  pub epoch:    i32,
  pub name:     String,
  pub revision: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Location {
  pub cpe_uri: String,
  pub version: Option<Version>,
  pub path:    String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Fingerprint {
  pub v1_name: String,
  pub v2_blob: Vec<String>,
  pub v2_name: String,
}

// ─── Vulnerability ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VulnerabilityNote {
  pub cvss_score: f32,
  pub severity:   Severity,
  pub details:    Vec<VulnerabilityNoteDetail>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VulnerabilityNoteDetail {
  pub cpe_uri:      String,
  pub package:      String,
  pub min_affected: Option<Version>,
  pub max_affected: Option<Version>,
  pub description:  String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VulnerabilityDetails {
  pub severity:           Severity,
  pub cvss_score:         f32,
  pub package_issue:      Vec<PackageIssue>,
  pub short_description:  String,
  pub long_description:   String,
  pub effective_severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageIssue {
  pub affected_location: Option<VulnerabilityLocation>,
  pub fixed_location:    Option<VulnerabilityLocation>,
  pub severity_name:     String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VulnerabilityLocation {
  pub cpe_uri: String,
  pub package: String,
  pub version: Option<Version>,
}

// ─── Build ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildNote {
  pub builder_version: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildDetails {
  pub provenance:       Option<BuildProvenance>,
  pub provenance_bytes: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuildProvenance {
  pub id:              String,
  pub project_id:      String,
  pub commands:        Vec<Command>,
  pub built_artifacts: Vec<Artifact>,
  pub create_time:     Option<DateTime<Utc>>,
  pub start_time:      Option<DateTime<Utc>>,
  pub end_time:        Option<DateTime<Utc>>,
  pub creator:         String,
  pub logs_uri:        String,
  pub builder_version: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Command {
  pub name: String,
  pub env:  Vec<String>,
  pub args: Vec<String>,
  pub dir:  String,
  pub id:   String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Artifact {
  pub checksum: String,
  pub id:       String,
  pub names:    Vec<String>,
}

// ─── Image ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BaseImageNote {
  pub resource_url: String,
  pub fingerprint:  Option<Fingerprint>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DerivedImageDetails {
  pub fingerprint:       Option<Fingerprint>,
  pub distance:          i32,
  pub base_resource_url: String,
}

// ─── Package ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PackageNote {
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallationDetails {
  pub name:     String,
  pub location: Vec<Location>,
}

// ─── Deployment ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployableNote {
  pub resource_uri: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeploymentDetails {
  pub user_email:    String,
  pub deploy_time:   Option<DateTime<Utc>>,
  pub undeploy_time: Option<DateTime<Utc>>,
  pub config:        String,
  pub address:       String,
  pub resource_uri:  Vec<String>,
  pub platform:      String,
}

// ─── Discovery ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveryNote {
  pub analysis_kind: NoteKind,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DiscoveredDetails {
  pub continuous_analysis: String,
  pub last_analysis_time:  Option<DateTime<Utc>>,
  pub analysis_status:     String,
}

// ─── Attestation ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttestationAuthorityNote {
  pub human_readable_name: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AttestationDetails {
  pub serialized_payload: String,
  pub content_type:       String,
  pub signatures:         Vec<Signature>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Signature {
  pub signature:     String,
  pub public_key_id: String,
}

// ─── Sum types ───────────────────────────────────────────────────────────────

/// The payload of a note. Serialised as a single camelCase key beside the
/// note's own fields (e.g. `"vulnerability": {…}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NoteDetails {
  Vulnerability(VulnerabilityNote),
  Build(BuildNote),
  BaseImage(BaseImageNote),
  Package(PackageNote),
  Deployable(DeployableNote),
  Discovery(DiscoveryNote),
  AttestationAuthority(AttestationAuthorityNote),
}

impl NoteDetails {
  pub fn kind(&self) -> NoteKind {
    match self {
      NoteDetails::Vulnerability(_) => NoteKind::Vulnerability,
      NoteDetails::Build(_) => NoteKind::Build,
      NoteDetails::BaseImage(_) => NoteKind::Image,
      NoteDetails::Package(_) => NoteKind::Package,
      NoteDetails::Deployable(_) => NoteKind::Deployment,
      NoteDetails::Discovery(_) => NoteKind::Discovery,
      NoteDetails::AttestationAuthority(_) => NoteKind::Attestation,
    }
  }
}

/// The payload of an occurrence. Serialised the same way as
/// [`NoteDetails`] (e.g. `"build": {…}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OccurrenceDetails {
  Vulnerability(VulnerabilityDetails),
  Build(BuildDetails),
  DerivedImage(DerivedImageDetails),
  Installation(InstallationDetails),
  Deployment(DeploymentDetails),
  Discovered(DiscoveredDetails),
  Attestation(AttestationDetails),
}

impl OccurrenceDetails {
  pub fn kind(&self) -> NoteKind {
    match self {
      OccurrenceDetails::Vulnerability(_) => NoteKind::Vulnerability,
      OccurrenceDetails::Build(_) => NoteKind::Build,
      OccurrenceDetails::DerivedImage(_) => NoteKind::Image,
      OccurrenceDetails::Installation(_) => NoteKind::Package,
      OccurrenceDetails::Deployment(_) => NoteKind::Deployment,
      OccurrenceDetails::Discovered(_) => NoteKind::Discovery,
      OccurrenceDetails::Attestation(_) => NoteKind::Attestation,
    }
  }
}
