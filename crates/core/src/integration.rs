//! Integration entity: the embeddable widget every version belongs to.

use serde::{Deserialize, Serialize};

use crate::approval::ApprovalWorkflow;
use crate::types::{DbId, Timestamp};

pub const MAX_INTEGRATION_NAME_LENGTH: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub id: DbId,
    pub name: String,
    pub description: Option<String>,
    pub approval_workflow: ApprovalWorkflow,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Input for creating an integration.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateIntegration {
    pub name: String,
    pub description: Option<String>,
    pub approval_workflow: Option<ApprovalWorkflow>,
}

impl CreateIntegration {
    /// Validate and normalize into the form handed to a store.
    pub fn normalized(&self) -> Result<Self, String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Integration name must not be empty".into());
        }
        if name.chars().count() > MAX_INTEGRATION_NAME_LENGTH {
            return Err(format!(
                "Integration name must be at most {MAX_INTEGRATION_NAME_LENGTH} characters"
            ));
        }
        let approval_workflow = self
            .approval_workflow
            .clone()
            .unwrap_or_default()
            .normalized()?;

        Ok(Self {
            name: name.to_string(),
            description: self
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(str::to_string),
            approval_workflow: Some(approval_workflow),
        })
    }
}
