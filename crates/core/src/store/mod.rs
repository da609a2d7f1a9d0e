//! Storage traits implemented by every backend.
//!
//! The lifecycle service only talks to storage through these traits, so the
//! PostgreSQL backend (`embedkit-db`) and the in-memory [`MemoryStore`] are
//! interchangeable behind `Arc<dyn ...>` in application state.
//!
//! ## Atomicity
//!
//! Methods that change version status (`publish`, `create_published`) must
//! be atomic per integration: the displaced published version is archived
//! and the target activated in one unit, and two concurrent calls for the
//! same integration must never both leave a version published. A backend may
//! serialize such calls or reject the loser with [`CoreError::Conflict`].
//!
//! ## Thread Safety
//!
//! Implementations must be `Send + Sync + 'static` to be held in axum state
//! and shared across tasks.

mod memory;

pub use memory::MemoryStore;

use async_trait::async_trait;

use crate::approval::{Approval, ApprovalRecord, ApprovalWorkflow};
use crate::audit::{AuditEntry, NewAuditEntry};
use crate::embed_keys::{EmbedKey, NewEmbedKey, UpdateEmbedKey};
use crate::error::CoreError;
use crate::integration::{CreateIntegration, Integration};
use crate::pagination::Page;
use crate::types::{DbId, Timestamp};
use crate::versioning::{DraftMetadataUpdate, NewVersion, PublishGate, PublishOutcome, Version};

/// Durable storage for integrations, their versions, and approvals.
#[async_trait]
pub trait VersionStore: Send + Sync + 'static {
    // ── Integrations ─────────────────────────────────────────────────────

    /// Insert an integration. The input is already normalized.
    async fn create_integration(&self, input: &CreateIntegration)
        -> Result<Integration, CoreError>;

    async fn get_integration(&self, id: DbId) -> Result<Integration, CoreError>;

    async fn list_integrations(&self) -> Result<Vec<Integration>, CoreError>;

    /// Replace an integration's approval workflow (already normalized).
    async fn update_approval_workflow(
        &self,
        id: DbId,
        workflow: &ApprovalWorkflow,
    ) -> Result<Integration, CoreError>;

    // ── Versions ─────────────────────────────────────────────────────────

    /// Insert a new version in `draft` status.
    async fn create_draft(&self, input: &NewVersion) -> Result<Version, CoreError>;

    async fn get_version(&self, id: DbId) -> Result<Version, CoreError>;

    /// Versions of one integration, most recently created first.
    async fn list_versions(&self, integration_id: DbId, page: Page)
        -> Result<Vec<Version>, CoreError>;

    /// The most recently created version of an integration, if any.
    async fn latest_version(&self, integration_id: DbId) -> Result<Option<Version>, CoreError>;

    /// The currently published version of an integration, if any.
    async fn find_published(&self, integration_id: DbId) -> Result<Option<Version>, CoreError>;

    /// Update release notes and tags of a draft.
    ///
    /// Fails with `InvalidState` unless the version is a draft, and with
    /// `Conflict` when `expected_updated_at` is set and stale.
    async fn update_draft_metadata(
        &self,
        id: DbId,
        update: &DraftMetadataUpdate,
    ) -> Result<Version, CoreError>;

    /// Atomically archive the current published version (if any) and publish
    /// `version_id`.
    ///
    /// Fails with `Conflict` when the integration's workflow differs from
    /// `gate.workflow`, and with `InvalidState` unless the target is a draft.
    /// Stamps `gate.approved_by` on a version that has no approver yet.
    async fn publish(
        &self,
        version_id: DbId,
        gate: &PublishGate,
        at: Timestamp,
    ) -> Result<PublishOutcome, CoreError>;

    /// Insert a version and publish it in the same atomic unit.
    async fn create_published(
        &self,
        input: &NewVersion,
        at: Timestamp,
    ) -> Result<PublishOutcome, CoreError>;

    // ── Approvals ────────────────────────────────────────────────────────

    /// Record `approver`'s approval of a draft, idempotently.
    ///
    /// `approval_count` counts only approvals from `workflow.approvers`. When
    /// the workflow is enabled, the count meets its threshold, and
    /// `approved_by` is unset, the version is stamped with the
    /// [completing approver](ApprovalWorkflow::completing_approver) and
    /// `approved_at = at`.
    async fn record_approval(
        &self,
        version_id: DbId,
        approver: &str,
        workflow: &ApprovalWorkflow,
        at: Timestamp,
    ) -> Result<ApprovalRecord, CoreError>;

    /// Approvals of a version in the order they were recorded.
    async fn list_approvals(&self, version_id: DbId) -> Result<Vec<Approval>, CoreError>;
}

/// Storage for widget embed keys.
#[async_trait]
pub trait EmbedKeyStore: Send + Sync + 'static {
    async fn create_key(&self, input: &NewEmbedKey) -> Result<EmbedKey, CoreError>;

    async fn get_key(&self, id: DbId) -> Result<EmbedKey, CoreError>;

    async fn list_keys(&self, integration_id: DbId) -> Result<Vec<EmbedKey>, CoreError>;

    async fn update_key(&self, id: DbId, update: &UpdateEmbedKey) -> Result<EmbedKey, CoreError>;

    /// Replace the stored hash and prefix, stamping `last_rotated_at`.
    async fn rotate_key(
        &self,
        id: DbId,
        key_prefix: &str,
        key_hash: &str,
        at: Timestamp,
    ) -> Result<EmbedKey, CoreError>;

    /// Returns `true` if a key was removed.
    async fn delete_key(&self, id: DbId) -> Result<bool, CoreError>;
}

/// Append-only, hash-chained audit log.
#[async_trait]
pub trait AuditStore: Send + Sync + 'static {
    /// Append an entry, chaining it to the integration's latest entry.
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntry, CoreError>;

    /// Entries of one integration, newest first.
    async fn list_audit(&self, integration_id: DbId, page: Page)
        -> Result<Vec<AuditEntry>, CoreError>;

    /// The full chain of one integration, oldest first.
    async fn audit_chain(&self, integration_id: DbId) -> Result<Vec<AuditEntry>, CoreError>;
}
