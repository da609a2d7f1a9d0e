//! Translation of `sqlx` errors into domain errors.

use embedkit_core::error::CoreError;

/// `unique_violation`
const UNIQUE_VIOLATION: &str = "23505";
/// `restrict_violation`, raised by the version and audit guard triggers.
const RESTRICT_VIOLATION: &str = "23001";
/// `serialization_failure`
const SERIALIZATION_FAILURE: &str = "40001";
/// `lock_not_available`
const LOCK_NOT_AVAILABLE: &str = "55P03";

/// Classify a database error.
///
/// Constraint and lock failures that a concurrent writer can cause become
/// [`CoreError::Conflict`]; guard trigger rejections become
/// [`CoreError::InvalidState`]. Everything else is internal.
pub fn to_core_error(err: sqlx::Error) -> CoreError {
    if let sqlx::Error::Database(ref db_err) = err {
        match db_err.code().as_deref() {
            Some(UNIQUE_VIOLATION) => {
                let constraint = db_err.constraint().unwrap_or("unique constraint");
                return CoreError::Conflict(format!(
                    "Concurrent modification rejected by {constraint}"
                ));
            }
            Some(SERIALIZATION_FAILURE) | Some(LOCK_NOT_AVAILABLE) => {
                return CoreError::Conflict(
                    "Row is locked by a concurrent operation; retry".to_string(),
                );
            }
            Some(RESTRICT_VIOLATION) => {
                return CoreError::InvalidState(db_err.message().to_string());
            }
            _ => {}
        }
    }
    tracing::error!(error = %err, "Database error");
    CoreError::Internal(format!("Database error: {err}"))
}
