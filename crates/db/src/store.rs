//! PostgreSQL implementation of the core store traits.
//!
//! Publishing, rollback publishing, approvals, and audit appends each run in
//! one transaction that first locks the owning integration row, so they are
//! serialized per integration. The `uq_versions_one_published` partial index
//! backs the single-published invariant at the schema level.

use async_trait::async_trait;
use embedkit_core::approval::{Approval, ApprovalRecord, ApprovalWorkflow};
use embedkit_core::audit::{compute_integrity_hash, AuditEntry, NewAuditEntry};
use embedkit_core::embed_keys::{EmbedKey, NewEmbedKey, UpdateEmbedKey};
use embedkit_core::error::CoreError;
use embedkit_core::integration::{CreateIntegration, Integration};
use embedkit_core::pagination::Page;
use embedkit_core::store::{AuditStore, EmbedKeyStore, VersionStore};
use embedkit_core::types::{DbId, Timestamp};
use embedkit_core::versioning::{
    DraftMetadataUpdate, NewVersion, PublishGate, PublishOutcome, Version, VersionStatus,
};
use sqlx::PgPool;

use crate::error::to_core_error;
use crate::models::version::VersionRow;
use crate::repositories::{
    ApprovalRepo, AuditLogRepo, EmbedKeyRepo, IntegrationRepo, VersionRepo,
};

type PgTransaction<'a> = sqlx::Transaction<'a, sqlx::Postgres>;

fn embed_key_not_found(id: DbId) -> CoreError {
    CoreError::NotFound {
        entity: "EmbedKey",
        id,
    }
}

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn begin(&self) -> Result<PgTransaction<'static>, CoreError> {
        self.pool.begin().await.map_err(to_core_error)
    }

    async fn lock_integration(tx: &mut PgTransaction<'_>, id: DbId) -> Result<(), CoreError> {
        if IntegrationRepo::lock(tx, id).await.map_err(to_core_error)? {
            Ok(())
        } else {
            Err(CoreError::integration_not_found(id))
        }
    }

    /// Fails with `Conflict` when the integration's workflow differs from
    /// `expected`. The caller holds the integration lock.
    async fn check_workflow(
        tx: &mut PgTransaction<'_>,
        integration_id: DbId,
        expected: &ApprovalWorkflow,
    ) -> Result<(), CoreError> {
        let integration: Integration = IntegrationRepo::find_by_id(&mut **tx, integration_id)
            .await
            .map_err(to_core_error)?
            .map(Integration::from)
            .ok_or_else(|| CoreError::integration_not_found(integration_id))?;
        if integration.approval_workflow != *expected {
            return Err(CoreError::Conflict(format!(
                "Approval workflow of integration {integration_id} changed; retry the publish"
            )));
        }
        Ok(())
    }

    /// Archive the current published version and publish `version_id`.
    /// The caller holds the integration lock.
    async fn publish_in_tx(
        tx: &mut PgTransaction<'_>,
        integration_id: DbId,
        version_id: DbId,
        at: Timestamp,
    ) -> Result<PublishOutcome, CoreError> {
        let target = VersionRepo::find_by_id_for_update(tx, version_id)
            .await
            .map_err(to_core_error)?
            .ok_or_else(|| CoreError::version_not_found(version_id))?;
        let status = VersionStatus::parse(&target.status).map_err(CoreError::Internal)?;
        if !status.can_transition_to(VersionStatus::Published) {
            return Err(CoreError::InvalidState(format!(
                "Version {version_id} is {status}; only drafts can be published"
            )));
        }

        let current = VersionRepo::find_published(&mut **tx, integration_id)
            .await
            .map_err(to_core_error)?;
        let archived = match current {
            Some(current) => Some(Version::try_from(
                VersionRepo::archive(tx, current.id, at)
                    .await
                    .map_err(to_core_error)?,
            )?),
            None => None,
        };

        let published: Version = VersionRepo::mark_published(tx, version_id, at)
            .await
            .map_err(to_core_error)?
            .try_into()?;

        Ok(PublishOutcome {
            published,
            archived,
        })
    }
}

fn into_versions(rows: Vec<VersionRow>) -> Result<Vec<Version>, CoreError> {
    rows.into_iter().map(Version::try_from).collect()
}

#[async_trait]
impl VersionStore for PgStore {
    async fn create_integration(
        &self,
        input: &CreateIntegration,
    ) -> Result<Integration, CoreError> {
        let row = IntegrationRepo::create(&self.pool, input)
            .await
            .map_err(to_core_error)?;
        Ok(row.into())
    }

    async fn get_integration(&self, id: DbId) -> Result<Integration, CoreError> {
        IntegrationRepo::find_by_id(&self.pool, id)
            .await
            .map_err(to_core_error)?
            .map(Integration::from)
            .ok_or_else(|| CoreError::integration_not_found(id))
    }

    async fn list_integrations(&self) -> Result<Vec<Integration>, CoreError> {
        let rows = IntegrationRepo::list(&self.pool)
            .await
            .map_err(to_core_error)?;
        Ok(rows.into_iter().map(Integration::from).collect())
    }

    async fn update_approval_workflow(
        &self,
        id: DbId,
        workflow: &ApprovalWorkflow,
    ) -> Result<Integration, CoreError> {
        IntegrationRepo::update_workflow(&self.pool, id, workflow)
            .await
            .map_err(to_core_error)?
            .map(Integration::from)
            .ok_or_else(|| CoreError::integration_not_found(id))
    }

    async fn create_draft(&self, input: &NewVersion) -> Result<Version, CoreError> {
        self.get_integration(input.integration_id).await?;
        VersionRepo::insert(&self.pool, input)
            .await
            .map_err(to_core_error)?
            .try_into()
    }

    async fn get_version(&self, id: DbId) -> Result<Version, CoreError> {
        VersionRepo::find_by_id(&self.pool, id)
            .await
            .map_err(to_core_error)?
            .ok_or_else(|| CoreError::version_not_found(id))?
            .try_into()
    }

    async fn list_versions(
        &self,
        integration_id: DbId,
        page: Page,
    ) -> Result<Vec<Version>, CoreError> {
        self.get_integration(integration_id).await?;
        let rows =
            VersionRepo::list_by_integration(&self.pool, integration_id, page.limit, page.offset)
                .await
                .map_err(to_core_error)?;
        into_versions(rows)
    }

    async fn latest_version(&self, integration_id: DbId) -> Result<Option<Version>, CoreError> {
        VersionRepo::find_latest(&self.pool, integration_id)
            .await
            .map_err(to_core_error)?
            .map(Version::try_from)
            .transpose()
    }

    async fn find_published(&self, integration_id: DbId) -> Result<Option<Version>, CoreError> {
        VersionRepo::find_published(&self.pool, integration_id)
            .await
            .map_err(to_core_error)?
            .map(Version::try_from)
            .transpose()
    }

    async fn update_draft_metadata(
        &self,
        id: DbId,
        update: &DraftMetadataUpdate,
    ) -> Result<Version, CoreError> {
        let mut tx = self.begin().await?;
        let current: Version = VersionRepo::find_by_id_for_update(&mut tx, id)
            .await
            .map_err(to_core_error)?
            .ok_or_else(|| CoreError::version_not_found(id))?
            .try_into()?;

        if !current.is_draft() {
            return Err(CoreError::InvalidState(format!(
                "Version {id} is {}; only drafts can be edited",
                current.status
            )));
        }
        if let Some(expected) = update.expected_updated_at {
            if expected != current.updated_at {
                return Err(CoreError::Conflict(format!(
                    "Version {id} was modified concurrently; refetch and retry"
                )));
            }
        }

        let row = VersionRepo::update_metadata(
            &mut tx,
            id,
            update.release_notes.as_deref(),
            update.tags.as_deref(),
        )
        .await
        .map_err(to_core_error)?;
        tx.commit().await.map_err(to_core_error)?;
        row.try_into()
    }

    async fn publish(
        &self,
        version_id: DbId,
        gate: &PublishGate,
        at: Timestamp,
    ) -> Result<PublishOutcome, CoreError> {
        let integration_id = self.get_version(version_id).await?.integration_id;

        let mut tx = self.begin().await?;
        Self::lock_integration(&mut tx, integration_id).await?;
        Self::check_workflow(&mut tx, integration_id, &gate.workflow).await?;
        // Only touches drafts with no approver; a non-draft fails below and
        // the dropped transaction discards the stamp.
        if let Some(approver) = &gate.approved_by {
            VersionRepo::stamp_approval(&mut tx, version_id, approver, at)
                .await
                .map_err(to_core_error)?;
        }
        let outcome = Self::publish_in_tx(&mut tx, integration_id, version_id, at).await?;
        tx.commit().await.map_err(to_core_error)?;
        Ok(outcome)
    }

    async fn create_published(
        &self,
        input: &NewVersion,
        at: Timestamp,
    ) -> Result<PublishOutcome, CoreError> {
        let mut tx = self.begin().await?;
        Self::lock_integration(&mut tx, input.integration_id).await?;
        let row = VersionRepo::insert(&mut *tx, input)
            .await
            .map_err(to_core_error)?;
        let outcome = Self::publish_in_tx(&mut tx, input.integration_id, row.id, at).await?;
        tx.commit().await.map_err(to_core_error)?;
        Ok(outcome)
    }

    async fn record_approval(
        &self,
        version_id: DbId,
        approver: &str,
        workflow: &ApprovalWorkflow,
        at: Timestamp,
    ) -> Result<ApprovalRecord, CoreError> {
        let integration_id = self.get_version(version_id).await?.integration_id;

        let mut tx = self.begin().await?;
        // Same lock as publish, so an approval never lands on a version that
        // is being published concurrently.
        Self::lock_integration(&mut tx, integration_id).await?;
        let mut version: Version = VersionRepo::find_by_id_for_update(&mut tx, version_id)
            .await
            .map_err(to_core_error)?
            .ok_or_else(|| CoreError::version_not_found(version_id))?
            .try_into()?;
        if !version.is_draft() {
            return Err(CoreError::InvalidState(format!(
                "Version {version_id} is {}; only drafts can be approved",
                version.status
            )));
        }

        let inserted = ApprovalRepo::insert_if_absent(&mut *tx, version_id, approver, at)
            .await
            .map_err(to_core_error)?;
        let approvals: Vec<Approval> = ApprovalRepo::list_by_version(&mut *tx, version_id)
            .await
            .map_err(to_core_error)?
            .into_iter()
            .map(Approval::from)
            .collect();
        let approval_count = workflow.counted(&approvals).count();

        let mut stamped = false;
        if version.approved_by.is_none() {
            if let Some(completing) = workflow.completing_approver(&approvals) {
                if let Some(row) = VersionRepo::stamp_approval(&mut tx, version_id, completing, at)
                    .await
                    .map_err(to_core_error)?
                {
                    version = row.try_into()?;
                    stamped = true;
                }
            }
        }
        tx.commit().await.map_err(to_core_error)?;

        Ok(ApprovalRecord {
            inserted,
            approval_count,
            stamped,
            version,
        })
    }

    async fn list_approvals(&self, version_id: DbId) -> Result<Vec<Approval>, CoreError> {
        self.get_version(version_id).await?;
        let rows = ApprovalRepo::list_by_version(&self.pool, version_id)
            .await
            .map_err(to_core_error)?;
        Ok(rows.into_iter().map(Approval::from).collect())
    }
}

#[async_trait]
impl EmbedKeyStore for PgStore {
    async fn create_key(&self, input: &NewEmbedKey) -> Result<EmbedKey, CoreError> {
        self.get_integration(input.integration_id).await?;
        let row = EmbedKeyRepo::create(&self.pool, input)
            .await
            .map_err(to_core_error)?;
        Ok(row.into())
    }

    async fn get_key(&self, id: DbId) -> Result<EmbedKey, CoreError> {
        EmbedKeyRepo::find_by_id(&self.pool, id)
            .await
            .map_err(to_core_error)?
            .map(EmbedKey::from)
            .ok_or_else(|| embed_key_not_found(id))
    }

    async fn list_keys(&self, integration_id: DbId) -> Result<Vec<EmbedKey>, CoreError> {
        self.get_integration(integration_id).await?;
        let rows = EmbedKeyRepo::list_by_integration(&self.pool, integration_id)
            .await
            .map_err(to_core_error)?;
        Ok(rows.into_iter().map(EmbedKey::from).collect())
    }

    async fn update_key(&self, id: DbId, update: &UpdateEmbedKey) -> Result<EmbedKey, CoreError> {
        EmbedKeyRepo::update(&self.pool, id, update)
            .await
            .map_err(to_core_error)?
            .map(EmbedKey::from)
            .ok_or_else(|| embed_key_not_found(id))
    }

    async fn rotate_key(
        &self,
        id: DbId,
        key_prefix: &str,
        key_hash: &str,
        at: Timestamp,
    ) -> Result<EmbedKey, CoreError> {
        EmbedKeyRepo::rotate(&self.pool, id, key_prefix, key_hash, at)
            .await
            .map_err(to_core_error)?
            .map(EmbedKey::from)
            .ok_or_else(|| embed_key_not_found(id))
    }

    async fn delete_key(&self, id: DbId) -> Result<bool, CoreError> {
        EmbedKeyRepo::delete(&self.pool, id)
            .await
            .map_err(to_core_error)
    }
}

#[async_trait]
impl AuditStore for PgStore {
    async fn append_audit(&self, entry: &NewAuditEntry) -> Result<AuditEntry, CoreError> {
        let mut tx = self.begin().await?;
        Self::lock_integration(&mut tx, entry.integration_id).await?;
        let prev_hash = AuditLogRepo::last_hash(&mut tx, entry.integration_id)
            .await
            .map_err(to_core_error)?;
        let integrity_hash = compute_integrity_hash(prev_hash.as_deref(), &entry.entry_data());
        let row = AuditLogRepo::insert(&mut tx, entry, prev_hash.as_deref(), &integrity_hash)
            .await
            .map_err(to_core_error)?;
        tx.commit().await.map_err(to_core_error)?;
        Ok(row.into())
    }

    async fn list_audit(
        &self,
        integration_id: DbId,
        page: Page,
    ) -> Result<Vec<AuditEntry>, CoreError> {
        let rows =
            AuditLogRepo::list_by_integration(&self.pool, integration_id, page.limit, page.offset)
                .await
                .map_err(to_core_error)?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }

    async fn audit_chain(&self, integration_id: DbId) -> Result<Vec<AuditEntry>, CoreError> {
        let rows = AuditLogRepo::chain(&self.pool, integration_id)
            .await
            .map_err(to_core_error)?;
        Ok(rows.into_iter().map(AuditEntry::from).collect())
    }
}
