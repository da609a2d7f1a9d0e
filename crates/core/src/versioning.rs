//! Version lifecycle model.
//!
//! A version moves strictly forward through `draft -> published -> archived`.
//! Its configuration snapshot is fixed at creation and guarded by a content
//! hash so that later reads can prove they see the original bytes.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::approval::ApprovalWorkflow;
use crate::diff::FieldChange;
use crate::hashing;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Label assigned to the first version of an integration.
pub const INITIAL_VERSION_LABEL: &str = "v1.0.0";

/// Tag attached to every version produced by a rollback.
pub const ROLLBACK_TAG: &str = "rollback";

pub const MAX_TAGS: usize = 20;
pub const MAX_TAG_LENGTH: usize = 40;
pub const MAX_RELEASE_NOTES_LENGTH: usize = 10_000;
pub const MAX_IDENTITY_LENGTH: usize = 254;

static VERSION_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^v?(\d+)\.(\d+)\.(\d+)(-[0-9A-Za-z.-]+)?$").expect("valid regex")
});

// ---------------------------------------------------------------------------
// Status machine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Published,
    Archived,
}

impl VersionStatus {
    /// String representation for display, logging, and database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Published => "published",
            Self::Archived => "archived",
        }
    }

    /// Parse the database representation.
    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "draft" => Ok(Self::Draft),
            "published" => Ok(Self::Published),
            "archived" => Ok(Self::Archived),
            other => Err(format!("Unknown version status '{other}'")),
        }
    }

    /// Whether `self -> next` is a legal forward transition.
    pub fn can_transition_to(&self, next: VersionStatus) -> bool {
        matches!(
            (self, next),
            (Self::Draft, Self::Published) | (Self::Published, Self::Archived)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Archived)
    }
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A stored version of an integration's configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: DbId,
    pub integration_id: DbId,
    pub version_label: String,
    pub status: VersionStatus,
    pub created_at: Timestamp,
    pub created_by: String,
    pub updated_at: Timestamp,
    pub published_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
    pub release_notes: String,
    pub tags: Vec<String>,
    pub config_snapshot: Value,
    pub snapshot_hash: String,
    pub changes: Vec<FieldChange>,
    pub approved_by: Option<String>,
    pub approved_at: Option<Timestamp>,
    pub is_rollback: bool,
    pub rollback_from_version: Option<DbId>,
    pub rollback_reason: Option<String>,
}

impl Version {
    /// Recompute the snapshot hash and compare it with the stored one.
    pub fn verify_snapshot(&self) -> bool {
        hashing::canonical_json_hash(&self.config_snapshot) == self.snapshot_hash
    }

    pub fn is_draft(&self) -> bool {
        self.status == VersionStatus::Draft
    }
}

/// Rollback provenance carried by a [`NewVersion`].
#[derive(Debug, Clone, PartialEq)]
pub struct RollbackOrigin {
    pub from_version: DbId,
    pub reason: String,
}

/// Everything a store needs to insert a version.
///
/// Built by the lifecycle service after validation; the snapshot is already
/// resolved and `snapshot_hash` matches it.
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub integration_id: DbId,
    pub version_label: String,
    pub created_by: String,
    pub release_notes: String,
    pub tags: Vec<String>,
    pub config_snapshot: Value,
    pub snapshot_hash: String,
    pub changes: Vec<FieldChange>,
    pub rollback: Option<RollbackOrigin>,
}

/// Partial update for a draft's free-form metadata.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DraftMetadataUpdate {
    pub release_notes: Option<String>,
    pub tags: Option<Vec<String>>,
    /// Optimistic concurrency token; when present it must equal the
    /// version's current `updated_at`.
    pub expected_updated_at: Option<Timestamp>,
}

/// Approval state a publish was authorized against.
///
/// The store re-reads the integration's workflow under its publish lock and
/// refuses with `Conflict` if it no longer equals `workflow`.
#[derive(Debug, Clone)]
pub struct PublishGate {
    pub workflow: ApprovalWorkflow,
    /// Stamped as `approved_by` when the version has no approver yet.
    pub approved_by: Option<String>,
}

/// Result of an atomic publish: the newly live version and the one it
/// displaced, if any.
#[derive(Debug, Clone)]
pub struct PublishOutcome {
    pub published: Version,
    pub archived: Option<Version>,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

/// Validate a semantic version label such as `v1.4.0` or `2.0.0-rc.1`.
pub fn validate_version_label(label: &str) -> Result<(), String> {
    if VERSION_LABEL_RE.is_match(label) {
        Ok(())
    } else {
        Err(format!(
            "Invalid version label '{label}'. Expected a semantic version such as v1.4.0"
        ))
    }
}

/// Derive the label that follows `previous` by bumping its minor component.
///
/// Labels that do not parse fall back to [`INITIAL_VERSION_LABEL`].
pub fn next_version_label(previous: Option<&str>) -> String {
    let Some(caps) = previous.and_then(|p| VERSION_LABEL_RE.captures(p)) else {
        return INITIAL_VERSION_LABEL.to_string();
    };
    let major: u64 = caps[1].parse().unwrap_or(1);
    let minor: u64 = caps[2].parse().unwrap_or(0);
    format!("v{major}.{}.0", minor.saturating_add(1))
}

/// Trim, lower-case, and de-duplicate tags, preserving first-seen order.
pub fn normalize_tags(tags: &[String]) -> Result<Vec<String>, String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let tag = tag.trim().to_lowercase();
        if tag.is_empty() {
            continue;
        }
        if tag.chars().count() > MAX_TAG_LENGTH {
            return Err(format!("Tag '{tag}' exceeds {MAX_TAG_LENGTH} characters"));
        }
        if !out.contains(&tag) {
            out.push(tag);
        }
    }
    if out.len() > MAX_TAGS {
        return Err(format!("At most {MAX_TAGS} tags are allowed"));
    }
    Ok(out)
}

pub fn validate_release_notes(notes: &str) -> Result<(), String> {
    if notes.chars().count() > MAX_RELEASE_NOTES_LENGTH {
        return Err(format!(
            "Release notes exceed {MAX_RELEASE_NOTES_LENGTH} characters"
        ));
    }
    Ok(())
}

/// Normalize an actor or approver identity.
pub fn normalize_identity(identity: &str) -> Result<String, String> {
    let identity = identity.trim();
    if identity.is_empty() {
        return Err("Identity must not be empty".into());
    }
    if identity.len() > MAX_IDENTITY_LENGTH {
        return Err(format!("Identity exceeds {MAX_IDENTITY_LENGTH} characters"));
    }
    Ok(identity.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_transitions_are_allowed() {
        assert!(VersionStatus::Draft.can_transition_to(VersionStatus::Published));
        assert!(VersionStatus::Published.can_transition_to(VersionStatus::Archived));
    }

    #[test]
    fn backward_and_skipping_transitions_are_rejected() {
        use VersionStatus::*;
        for (from, to) in [
            (Published, Draft),
            (Archived, Draft),
            (Archived, Published),
            (Draft, Archived),
            (Draft, Draft),
            (Published, Published),
        ] {
            assert!(!from.can_transition_to(to), "{from} -> {to} must be illegal");
        }
        assert!(Archived.is_terminal());
    }

    #[test]
    fn status_parse_roundtrips_as_str() {
        for status in [
            VersionStatus::Draft,
            VersionStatus::Published,
            VersionStatus::Archived,
        ] {
            assert_eq!(VersionStatus::parse(status.as_str()).unwrap(), status);
        }
        assert!(VersionStatus::parse("deleted").is_err());
    }

    #[test]
    fn version_labels() {
        assert!(validate_version_label("v1.4.0").is_ok());
        assert!(validate_version_label("2.0.0-rc.1").is_ok());
        assert!(validate_version_label("v1.4").is_err());
        assert!(validate_version_label("latest").is_err());
    }

    #[test]
    fn next_label_bumps_minor() {
        assert_eq!(next_version_label(None), "v1.0.0");
        assert_eq!(next_version_label(Some("v1.4.0")), "v1.5.0");
        assert_eq!(next_version_label(Some("2.9.3-beta")), "v2.10.0");
        assert_eq!(next_version_label(Some("garbage")), "v1.0.0");
    }

    #[test]
    fn tags_are_normalized() {
        let tags = vec![
            " Hotfix ".to_string(),
            "hotfix".to_string(),
            "".to_string(),
            "RAG".to_string(),
        ];
        assert_eq!(normalize_tags(&tags).unwrap(), vec!["hotfix", "rag"]);
    }

    #[test]
    fn too_many_tags_rejected() {
        let tags: Vec<String> = (0..=MAX_TAGS).map(|i| format!("t{i}")).collect();
        assert!(normalize_tags(&tags).is_err());
    }

    #[test]
    fn identity_is_trimmed() {
        assert_eq!(normalize_identity("  alice@example.com ").unwrap(), "alice@example.com");
        assert!(normalize_identity("   ").is_err());
    }
}
