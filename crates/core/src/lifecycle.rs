//! Version lifecycle service: approval gate, publish coordinator, and
//! rollback engine on top of any [`VersionStore`].
//!
//! The service owns validation and policy. Storage owns atomicity: every
//! status change goes through a single store call (`publish` or
//! `create_published`) that the backend executes as one unit per
//! integration.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::approval::{Approval, ApprovalWorkflow};
use crate::diff::{self, FieldChange};
use crate::error::CoreError;
use crate::hashing;
use crate::integration::{CreateIntegration, Integration};
use crate::pagination::Page;
use crate::snapshot;
use crate::store::VersionStore;
use crate::types::DbId;
use crate::versioning::{
    next_version_label, normalize_identity, normalize_tags, validate_release_notes,
    validate_version_label, DraftMetadataUpdate, NewVersion, PublishGate, PublishOutcome,
    RollbackOrigin,
    Version, MAX_TAGS, ROLLBACK_TAG,
};

/// Input for creating a draft version.
#[derive(Debug, Clone)]
pub struct CreateDraft {
    pub integration_id: DbId,
    pub version_label: Option<String>,
    pub created_by: String,
    pub release_notes: Option<String>,
    pub tags: Vec<String>,
    pub snapshot: Value,
}

/// Input for a rollback.
#[derive(Debug, Clone)]
pub struct RollbackRequest {
    pub integration_id: DbId,
    pub target_version_id: DbId,
    pub reason: String,
    pub requested_by: String,
}

/// Result of an approval.
#[derive(Debug)]
pub struct ApproveOutcome {
    /// `false` when this approver had already approved the version.
    pub newly_recorded: bool,
    pub approval_count: usize,
    pub satisfied: bool,
    /// The version as of the approval (before any auto-publish).
    pub version: Version,
    /// Present when this approval satisfied the policy and the workflow
    /// publishes automatically. A failure here does not undo the approval.
    pub auto_publish: Option<Result<PublishOutcome, CoreError>>,
}

/// Approval progress of a version.
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalStatus {
    pub version_id: DbId,
    pub enabled: bool,
    pub required_approvers: u32,
    pub approvals: Vec<Approval>,
    /// Approvals from people who are approvers under the current workflow.
    pub approval_count: usize,
    pub satisfied: bool,
}

/// Result of a rollback.
#[derive(Debug)]
pub enum RollbackOutcome {
    /// The rollback version went live immediately.
    Published(PublishOutcome),
    /// The integration gates rollbacks; the version awaits approval.
    PendingApproval(Version),
}

impl RollbackOutcome {
    pub fn version(&self) -> &Version {
        match self {
            Self::Published(outcome) => &outcome.published,
            Self::PendingApproval(version) => version,
        }
    }
}

/// Drives version lifecycle operations against a shared store.
#[derive(Clone)]
pub struct VersionService {
    store: Arc<dyn VersionStore>,
}

impl VersionService {
    pub fn new(store: Arc<dyn VersionStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<dyn VersionStore> {
        &self.store
    }

    // ── Integrations ─────────────────────────────────────────────────────

    pub async fn create_integration(
        &self,
        input: &CreateIntegration,
    ) -> Result<Integration, CoreError> {
        let input = input.normalized().map_err(CoreError::Validation)?;
        self.store.create_integration(&input).await
    }

    pub async fn get_integration(&self, id: DbId) -> Result<Integration, CoreError> {
        self.store.get_integration(id).await
    }

    pub async fn list_integrations(&self) -> Result<Vec<Integration>, CoreError> {
        self.store.list_integrations().await
    }

    pub async fn update_approval_workflow(
        &self,
        id: DbId,
        workflow: &ApprovalWorkflow,
    ) -> Result<Integration, CoreError> {
        let workflow = workflow.normalized().map_err(CoreError::Validation)?;
        self.store.update_approval_workflow(id, &workflow).await
    }

    // ── Version store operations ─────────────────────────────────────────

    /// Validate the snapshot and persist a new draft.
    pub async fn create_draft(&self, input: &CreateDraft) -> Result<Version, CoreError> {
        let config_snapshot = snapshot::resolve_snapshot(&input.snapshot)?;
        let created_by = normalize_identity(&input.created_by)
            .map_err(|e| CoreError::Validation(format!("created_by: {e}")))?;
        let release_notes = input.release_notes.clone().unwrap_or_default();
        validate_release_notes(&release_notes).map_err(CoreError::Validation)?;
        let tags = normalize_tags(&input.tags).map_err(CoreError::Validation)?;

        // Existence check before anything else touches the integration.
        self.store.get_integration(input.integration_id).await?;

        let version_label = match input.version_label.as_deref().map(str::trim) {
            Some(label) if !label.is_empty() => {
                validate_version_label(label).map_err(CoreError::Validation)?;
                label.to_string()
            }
            _ => self.next_label(input.integration_id).await?,
        };

        let changes = self
            .changes_since_published(input.integration_id, &config_snapshot)
            .await?;

        let new_version = NewVersion {
            integration_id: input.integration_id,
            version_label,
            created_by,
            release_notes,
            tags,
            snapshot_hash: hashing::canonical_json_hash(&config_snapshot),
            config_snapshot,
            changes,
            rollback: None,
        };

        let version = self.store.create_draft(&new_version).await?;
        tracing::info!(
            version_id = version.id,
            integration_id = version.integration_id,
            label = %version.version_label,
            "Draft version created"
        );
        Ok(version)
    }

    pub async fn get_version(&self, id: DbId) -> Result<Version, CoreError> {
        self.store.get_version(id).await
    }

    pub async fn list_versions(
        &self,
        integration_id: DbId,
        page: Page,
    ) -> Result<Vec<Version>, CoreError> {
        self.store.list_versions(integration_id, page).await
    }

    pub async fn find_published(&self, integration_id: DbId) -> Result<Option<Version>, CoreError> {
        self.store.get_integration(integration_id).await?;
        self.store.find_published(integration_id).await
    }

    pub async fn update_draft_metadata(
        &self,
        id: DbId,
        update: &DraftMetadataUpdate,
    ) -> Result<Version, CoreError> {
        if let Some(notes) = &update.release_notes {
            validate_release_notes(notes).map_err(CoreError::Validation)?;
        }
        let tags = update
            .tags
            .as_deref()
            .map(normalize_tags)
            .transpose()
            .map_err(CoreError::Validation)?;

        let update = DraftMetadataUpdate {
            release_notes: update.release_notes.clone(),
            tags,
            expected_updated_at: update.expected_updated_at,
        };
        self.store.update_draft_metadata(id, &update).await
    }

    // ── Approval gate ────────────────────────────────────────────────────

    /// Record an approval and, if configured, publish once the policy is met.
    pub async fn approve(&self, version_id: DbId, approver: &str) -> Result<ApproveOutcome, CoreError> {
        let approver = normalize_identity(approver)
            .map_err(|e| CoreError::Validation(format!("approver: {e}")))?;
        let version = self.store.get_version(version_id).await?;
        let workflow = self
            .store
            .get_integration(version.integration_id)
            .await?
            .approval_workflow;

        if !workflow.is_approver(&approver) {
            return Err(CoreError::Unauthorized(format!(
                "'{approver}' is not an approver for integration {}",
                version.integration_id
            )));
        }
        if !version.is_draft() {
            return Err(CoreError::InvalidState(format!(
                "Version {version_id} is {}; only drafts can be approved",
                version.status
            )));
        }

        let record = self
            .store
            .record_approval(version_id, &approver, &workflow, Utc::now())
            .await?;

        let satisfied = workflow.is_satisfied_by(record.approval_count);
        let was_satisfied =
            workflow.is_satisfied_by(record.approval_count.saturating_sub(usize::from(record.inserted)));
        tracing::info!(
            version_id,
            approver = %approver,
            approvals = record.approval_count,
            satisfied,
            "Version approved"
        );

        // `stamped` catches a threshold that was lowered after earlier approvals.
        let first_satisfied = satisfied && (record.stamped || !was_satisfied);
        let auto_publish = if workflow.auto_publish_on_approval && first_satisfied {
            let result = self.publish(version_id).await;
            if let Err(e) = &result {
                tracing::warn!(version_id, error = %e, "Auto-publish after approval failed");
            }
            Some(result)
        } else {
            None
        };

        Ok(ApproveOutcome {
            newly_recorded: record.inserted,
            approval_count: record.approval_count,
            satisfied,
            version: record.version,
            auto_publish,
        })
    }

    pub async fn approval_status(&self, version_id: DbId) -> Result<ApprovalStatus, CoreError> {
        let version = self.store.get_version(version_id).await?;
        let workflow = self
            .store
            .get_integration(version.integration_id)
            .await?
            .approval_workflow;
        let approvals = self.store.list_approvals(version_id).await?;
        Ok(status_of(version_id, &workflow, approvals))
    }

    /// Whether the approval policy currently allows publishing `version_id`.
    pub async fn is_satisfied(&self, version_id: DbId) -> Result<bool, CoreError> {
        Ok(self.approval_status(version_id).await?.satisfied)
    }

    // ── Publish coordinator ──────────────────────────────────────────────

    /// Publish a draft, archiving the integration's current published version.
    pub async fn publish(&self, version_id: DbId) -> Result<PublishOutcome, CoreError> {
        let version = self.store.get_version(version_id).await?;
        let workflow = self
            .store
            .get_integration(version.integration_id)
            .await?
            .approval_workflow;
        let approvals = self.store.list_approvals(version_id).await?;
        let status = status_of(version_id, &workflow, approvals);

        if !status.satisfied {
            return Err(CoreError::ApprovalRequired(format!(
                "Version {version_id} has {} of {} required approvals",
                status.approval_count, status.required_approvers
            )));
        }
        if !version.is_draft() {
            return Err(CoreError::InvalidState(format!(
                "Version {version_id} is {}; only drafts can be published",
                version.status
            )));
        }

        let approved_by = match version.approved_by {
            Some(_) => None,
            None => workflow
                .completing_approver(&status.approvals)
                .map(str::to_string),
        };
        let gate = PublishGate {
            workflow,
            approved_by,
        };
        let outcome = self.store.publish(version_id, &gate, Utc::now()).await?;
        tracing::info!(
            version_id,
            integration_id = outcome.published.integration_id,
            archived_version_id = outcome.archived.as_ref().map(|v| v.id),
            "Version published"
        );
        Ok(outcome)
    }

    // ── Rollback engine ──────────────────────────────────────────────────

    /// Restore an earlier snapshot as a new version.
    pub async fn rollback(&self, request: &RollbackRequest) -> Result<RollbackOutcome, CoreError> {
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(CoreError::Validation("Rollback reason must not be empty".into()));
        }
        let requested_by = normalize_identity(&request.requested_by)
            .map_err(|e| CoreError::Validation(format!("requested_by: {e}")))?;

        let target = self.store.get_version(request.target_version_id).await?;
        if target.integration_id != request.integration_id {
            return Err(CoreError::version_not_found(request.target_version_id));
        }
        if target.is_draft() {
            return Err(CoreError::InvalidState(format!(
                "Version {} is a draft; only published or archived versions can be restored",
                target.id
            )));
        }
        let integration = self.store.get_integration(request.integration_id).await?;

        let mut tags = vec![ROLLBACK_TAG.to_string()];
        tags.extend(target.tags.iter().cloned());
        tags.truncate(MAX_TAGS);
        let tags = normalize_tags(&tags).map_err(CoreError::Validation)?;

        let config_snapshot = target.config_snapshot.clone();
        let new_version = NewVersion {
            integration_id: request.integration_id,
            version_label: self.next_label(request.integration_id).await?,
            created_by: requested_by,
            release_notes: format!(
                "Rollback to {} (version {}): {reason}",
                target.version_label, target.id
            ),
            tags,
            snapshot_hash: hashing::canonical_json_hash(&config_snapshot),
            changes: self
                .changes_since_published(request.integration_id, &config_snapshot)
                .await?,
            config_snapshot,
            rollback: Some(RollbackOrigin {
                from_version: target.id,
                reason: reason.to_string(),
            }),
        };

        let outcome = if integration.approval_workflow.gates_rollback() {
            RollbackOutcome::PendingApproval(self.store.create_draft(&new_version).await?)
        } else {
            RollbackOutcome::Published(self.store.create_published(&new_version, Utc::now()).await?)
        };

        tracing::info!(
            integration_id = request.integration_id,
            target_version_id = target.id,
            version_id = outcome.version().id,
            status = %outcome.version().status,
            "Rollback version created"
        );
        Ok(outcome)
    }

    // ── Diff engine ──────────────────────────────────────────────────────

    /// Changes that turn version `a`'s snapshot into version `b`'s.
    pub async fn diff_versions(&self, a: DbId, b: DbId) -> Result<Vec<FieldChange>, CoreError> {
        let old = self.store.get_version(a).await?;
        let new = self.store.get_version(b).await?;
        Ok(diff::diff(&old.config_snapshot, &new.config_snapshot))
    }

    // ── Helpers ──────────────────────────────────────────────────────────

    async fn next_label(&self, integration_id: DbId) -> Result<String, CoreError> {
        let latest = self.store.latest_version(integration_id).await?;
        Ok(next_version_label(
            latest.as_ref().map(|v| v.version_label.as_str()),
        ))
    }

    async fn changes_since_published(
        &self,
        integration_id: DbId,
        snapshot: &Value,
    ) -> Result<Vec<FieldChange>, CoreError> {
        let empty = Value::Object(Default::default());
        let published = self.store.find_published(integration_id).await?;
        let base = published.as_ref().map_or(&empty, |v| &v.config_snapshot);
        Ok(diff::diff(base, snapshot))
    }
}

fn status_of(version_id: DbId, workflow: &ApprovalWorkflow, approvals: Vec<Approval>) -> ApprovalStatus {
    let approval_count = workflow.counted(&approvals).count();
    ApprovalStatus {
        version_id,
        enabled: workflow.enabled,
        required_approvers: workflow.required_approvers,
        satisfied: workflow.is_satisfied_by(approval_count),
        approval_count,
        approvals,
    }
}
