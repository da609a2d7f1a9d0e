//! In-memory store used for development without PostgreSQL and by tests.
//!
//! All state lives behind one async mutex. Every trait method takes the lock
//! once and does its work synchronously, so multi-step operations such as
//! archive-on-publish are trivially atomic and concurrent publishes are
//! serialized.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Mutex;

use crate::approval::{Approval, ApprovalRecord, ApprovalWorkflow};
use crate::audit::{compute_integrity_hash, AuditEntry, NewAuditEntry};
use crate::embed_keys::{EmbedKey, NewEmbedKey, UpdateEmbedKey};
use crate::error::CoreError;
use crate::integration::{CreateIntegration, Integration};
use crate::pagination::Page;
use crate::store::{AuditStore, EmbedKeyStore, VersionStore};
use crate::types::{DbId, Timestamp};
use crate::versioning::{
    DraftMetadataUpdate, NewVersion, PublishGate, PublishOutcome, Version, VersionStatus,
};

#[derive(Default)]
struct Sequences {
    integration: DbId,
    version: DbId,
    embed_key: DbId,
    audit: DbId,
}

fn next(seq: &mut DbId) -> DbId {
    *seq += 1;
    *seq
}

#[derive(Default)]
struct MemoryState {
    seq: Sequences,
    integrations: BTreeMap<DbId, Integration>,
    versions: BTreeMap<DbId, Version>,
    approvals: BTreeMap<DbId, Vec<Approval>>,
    embed_keys: BTreeMap<DbId, EmbedKey>,
    audit: Vec<AuditEntry>,
}

impl MemoryState {
    fn integration(&self, id: DbId) -> Result<&Integration, CoreError> {
        self.integrations
            .get(&id)
            .ok_or_else(|| CoreError::integration_not_found(id))
    }

    fn version_mut(&mut self, id: DbId) -> Result<&mut Version, CoreError> {
        self.versions
            .get_mut(&id)
            .ok_or_else(|| CoreError::version_not_found(id))
    }

    /// Versions of an integration, newest first.
    fn versions_of(&self, integration_id: DbId) -> Vec<&Version> {
        let mut versions: Vec<&Version> = self
            .versions
            .values()
            .filter(|v| v.integration_id == integration_id)
            .collect();
        versions.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        versions
    }

    fn insert_version(&mut self, input: &NewVersion) -> Result<DbId, CoreError> {
        self.integration(input.integration_id)?;

        let now = Utc::now();
        let id = next(&mut self.seq.version);
        let (rollback_from_version, rollback_reason) = match &input.rollback {
            Some(origin) => (Some(origin.from_version), Some(origin.reason.clone())),
            None => (None, None),
        };
        self.versions.insert(
            id,
            Version {
                id,
                integration_id: input.integration_id,
                version_label: input.version_label.clone(),
                status: VersionStatus::Draft,
                created_at: now,
                created_by: input.created_by.clone(),
                updated_at: now,
                published_at: None,
                archived_at: None,
                release_notes: input.release_notes.clone(),
                tags: input.tags.clone(),
                config_snapshot: input.config_snapshot.clone(),
                snapshot_hash: input.snapshot_hash.clone(),
                changes: input.changes.clone(),
                approved_by: None,
                approved_at: None,
                is_rollback: input.rollback.is_some(),
                rollback_from_version,
                rollback_reason,
            },
        );
        Ok(id)
    }

    fn publish(&mut self, version_id: DbId, at: Timestamp) -> Result<PublishOutcome, CoreError> {
        let target = self.version_mut(version_id)?;
        if !target.status.can_transition_to(VersionStatus::Published) {
            return Err(CoreError::InvalidState(format!(
                "Version {version_id} is {}; only drafts can be published",
                target.status
            )));
        }
        let integration_id = target.integration_id;

        let current = self
            .versions
            .values()
            .find(|v| v.integration_id == integration_id && v.status == VersionStatus::Published)
            .map(|v| v.id);

        let archived = match current {
            Some(id) => {
                let v = self.version_mut(id)?;
                v.status = VersionStatus::Archived;
                v.archived_at = Some(at);
                v.updated_at = at;
                Some(v.clone())
            }
            None => None,
        };

        let target = self.version_mut(version_id)?;
        target.status = VersionStatus::Published;
        target.published_at = Some(at);
        target.updated_at = at;

        Ok(PublishOutcome {
            published: target.clone(),
            archived,
        })
    }
}

/// Process-local implementation of every store trait.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VersionStore for MemoryStore {
    async fn create_integration(
        &self,
        input: &CreateIntegration,
    ) -> Result<Integration, CoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let id = next(&mut state.seq.integration);
        let integration = Integration {
            id,
            name: input.name.clone(),
            description: input.description.clone(),
            approval_workflow: input.approval_workflow.clone().unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };
        state.integrations.insert(id, integration.clone());
        Ok(integration)
    }

    async fn get_integration(&self, id: DbId) -> Result<Integration, CoreError> {
        let state = self.state.lock().await;
        state.integration(id).cloned()
    }

    async fn list_integrations(&self) -> Result<Vec<Integration>, CoreError> {
        let state = self.state.lock().await;
        Ok(state.integrations.values().cloned().collect())
    }

    async fn update_approval_workflow(
        &self,
        id: DbId,
        workflow: &ApprovalWorkflow,
    ) -> Result<Integration, CoreError> {
        let mut state = self.state.lock().await;
        let integration = state
            .integrations
            .get_mut(&id)
            .ok_or_else(|| CoreError::integration_not_found(id))?;
        integration.approval_workflow = workflow.clone();
        integration.updated_at = Utc::now();
        Ok(integration.clone())
    }

    async fn create_draft(&self, input: &NewVersion) -> Result<Version, CoreError> {
        let mut state = self.state.lock().await;
        let id = state.insert_version(input)?;
        Ok(state.versions[&id].clone())
    }

    async fn get_version(&self, id: DbId) -> Result<Version, CoreError> {
        let state = self.state.lock().await;
        state
            .versions
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::version_not_found(id))
    }

    async fn list_versions(
        &self,
        integration_id: DbId,
        page: Page,
    ) -> Result<Vec<Version>, CoreError> {
        let state = self.state.lock().await;
        state.integration(integration_id)?;
        let versions: Vec<Version> = state
            .versions_of(integration_id)
            .into_iter()
            .cloned()
            .collect();
        Ok(page.slice(&versions))
    }

    async fn latest_version(&self, integration_id: DbId) -> Result<Option<Version>, CoreError> {
        let state = self.state.lock().await;
        Ok(state.versions_of(integration_id).first().map(|v| (*v).clone()))
    }

    async fn find_published(&self, integration_id: DbId) -> Result<Option<Version>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .versions
            .values()
            .find(|v| v.integration_id == integration_id && v.status == VersionStatus::Published)
            .cloned())
    }

    async fn update_draft_metadata(
        &self,
        id: DbId,
        update: &DraftMetadataUpdate,
    ) -> Result<Version, CoreError> {
        let mut state = self.state.lock().await;
        let version = state.version_mut(id)?;
        if !version.is_draft() {
            return Err(CoreError::InvalidState(format!(
                "Version {id} is {}; only drafts can be edited",
                version.status
            )));
        }
        if let Some(expected) = update.expected_updated_at {
            if expected != version.updated_at {
                return Err(CoreError::Conflict(format!(
                    "Version {id} was modified concurrently; refetch and retry"
                )));
            }
        }
        if let Some(notes) = &update.release_notes {
            version.release_notes = notes.clone();
        }
        if let Some(tags) = &update.tags {
            version.tags = tags.clone();
        }
        let now = Utc::now();
        version.updated_at = if now > version.updated_at {
            now
        } else {
            version.updated_at + chrono::Duration::microseconds(1)
        };
        Ok(version.clone())
    }

    async fn publish(
        &self,
        version_id: DbId,
        gate: &PublishGate,
        at: Timestamp,
    ) -> Result<PublishOutcome, CoreError> {
        let mut state = self.state.lock().await;
        let integration_id = state.version_mut(version_id)?.integration_id;
        if state.integration(integration_id)?.approval_workflow != gate.workflow {
            return Err(CoreError::Conflict(format!(
                "Approval workflow of integration {integration_id} changed; retry the publish"
            )));
        }

        let target = state.version_mut(version_id)?;
        if target.is_draft() && target.approved_by.is_none() {
            if let Some(approver) = &gate.approved_by {
                target.approved_by = Some(approver.clone());
                target.approved_at = Some(at);
            }
        }
        state.publish(version_id, at)
    }

    async fn create_published(
        &self,
        input: &NewVersion,
        at: Timestamp,
    ) -> Result<PublishOutcome, CoreError> {
        let mut state = self.state.lock().await;
        let id = state.insert_version(input)?;
        state.publish(id, at)
    }

    async fn record_approval(
        &self,
        version_id: DbId,
        approver: &str,
        workflow: &ApprovalWorkflow,
        at: Timestamp,
    ) -> Result<ApprovalRecord, CoreError> {
        let mut state = self.state.lock().await;
        let status = state.version_mut(version_id)?.status;
        if status != VersionStatus::Draft {
            return Err(CoreError::InvalidState(format!(
                "Version {version_id} is {status}; only drafts can be approved"
            )));
        }

        let approvals = state.approvals.entry(version_id).or_default();
        let inserted = !approvals.iter().any(|a| a.approver == approver);
        if inserted {
            approvals.push(Approval {
                version_id,
                approver: approver.to_string(),
                approved_at: at,
            });
        }
        let approval_count = workflow.counted(approvals).count();
        let completing = workflow.completing_approver(approvals).map(str::to_string);

        let version = state.version_mut(version_id)?;
        let mut stamped = false;
        if let (None, Some(completing)) = (&version.approved_by, completing) {
            version.approved_by = Some(completing);
            version.approved_at = Some(at);
            version.updated_at = at;
            stamped = true;
        }

        Ok(ApprovalRecord {
            inserted,
            approval_count,
            stamped,
            version: version.clone(),
        })
    }

    async fn list_approvals(&self, version_id: DbId) -> Result<Vec<Approval>, CoreError> {
        let state = self.state.lock().await;
        if !state.versions.contains_key(&version_id) {
            return Err(CoreError::version_not_found(version_id));
        }
        Ok(state.approvals.get(&version_id).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl EmbedKeyStore for MemoryStore {
    async fn create_key(&self, input: &NewEmbedKey) -> Result<EmbedKey, CoreError> {
        let mut state = self.state.lock().await;
        state.integration(input.integration_id)?;
        let id = next(&mut state.seq.embed_key);
        let key = EmbedKey {
            id,
            integration_id: input.integration_id,
            label: input.label.clone(),
            key_prefix: input.key_prefix.clone(),
            key_hash: input.key_hash.clone(),
            is_active: true,
            created_at: Utc::now(),
            last_rotated_at: None,
        };
        state.embed_keys.insert(id, key.clone());
        Ok(key)
    }

    async fn get_key(&self, id: DbId) -> Result<EmbedKey, CoreError> {
        let state = self.state.lock().await;
        state
            .embed_keys
            .get(&id)
            .cloned()
            .ok_or(CoreError::NotFound {
                entity: "EmbedKey",
                id,
            })
    }

    async fn list_keys(&self, integration_id: DbId) -> Result<Vec<EmbedKey>, CoreError> {
        let state = self.state.lock().await;
        state.integration(integration_id)?;
        Ok(state
            .embed_keys
            .values()
            .filter(|k| k.integration_id == integration_id)
            .cloned()
            .collect())
    }

    async fn update_key(&self, id: DbId, update: &UpdateEmbedKey) -> Result<EmbedKey, CoreError> {
        let mut state = self.state.lock().await;
        let key = state.embed_keys.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "EmbedKey",
            id,
        })?;
        if let Some(label) = &update.label {
            key.label = label.clone();
        }
        if let Some(active) = update.is_active {
            key.is_active = active;
        }
        Ok(key.clone())
    }

    async fn rotate_key(
        &self,
        id: DbId,
        key_prefix: &str,
        key_hash: &str,
        at: Timestamp,
    ) -> Result<EmbedKey, CoreError> {
        let mut state = self.state.lock().await;
        let key = state.embed_keys.get_mut(&id).ok_or(CoreError::NotFound {
            entity: "EmbedKey",
            id,
        })?;
        key.key_prefix = key_prefix.to_string();
        key.key_hash = key_hash.to_string();
        key.last_rotated_at = Some(at);
        Ok(key.clone())
    }

    async fn delete_key(&self, id: DbId) -> Result<bool, CoreError> {
        let mut state = self.state.lock().await;
        Ok(state.embed_keys.remove(&id).is_some())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntry, CoreError> {
        let mut state = self.state.lock().await;
        let prev_hash = state
            .audit
            .iter()
            .rev()
            .find(|e| e.integration_id == entry.integration_id)
            .map(|e| e.integrity_hash.clone());
        let integrity_hash = compute_integrity_hash(prev_hash.as_deref(), &entry.entry_data());
        let id = next(&mut state.seq.audit);
        let stored = AuditEntry {
            id,
            integration_id: entry.integration_id,
            event_type: entry.event_type.clone(),
            entity_type: entry.entity_type.clone(),
            entity_id: entry.entity_id,
            actor: entry.actor.clone(),
            details: entry.details.clone(),
            prev_hash,
            integrity_hash,
            created_at: entry.created_at,
        };
        state.audit.push(stored.clone());
        Ok(stored)
    }

    async fn list_audit(
        &self,
        integration_id: DbId,
        page: Page,
    ) -> Result<Vec<AuditEntry>, CoreError> {
        let state = self.state.lock().await;
        let entries: Vec<AuditEntry> = state
            .audit
            .iter()
            .rev()
            .filter(|e| e.integration_id == integration_id)
            .cloned()
            .collect();
        Ok(page.slice(&entries))
    }

    async fn audit_chain(&self, integration_id: DbId) -> Result<Vec<AuditEntry>, CoreError> {
        let state = self.state.lock().await;
        Ok(state
            .audit
            .iter()
            .filter(|e| e.integration_id == integration_id)
            .cloned()
            .collect())
    }
}
