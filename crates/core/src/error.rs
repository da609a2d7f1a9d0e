use crate::types::DbId;

/// Domain error taxonomy shared by every layer.
///
/// Store backends translate their own failures into these variants so that
/// handlers only ever have to classify a `CoreError`.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The operation is not legal for the entity's current status.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The acting identity is not allowed to perform the operation.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Publish attempted before the approval policy was satisfied.
    #[error("Approval required: {0}")]
    ApprovalRequired(String),

    /// A concurrent writer won the race; refetch and retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Shorthand for a [`CoreError::NotFound`] on a version.
    pub fn version_not_found(id: DbId) -> Self {
        Self::NotFound {
            entity: "Version",
            id,
        }
    }

    /// Shorthand for a [`CoreError::NotFound`] on an integration.
    pub fn integration_not_found(id: DbId) -> Self {
        Self::NotFound {
            entity: "Integration",
            id,
        }
    }
}
