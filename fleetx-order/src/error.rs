use fleetx_core::{CoreError, RepositoryError};
use uuid::Uuid;

use crate::lifecycle::TransitionError;

/// Every failure the dispatch operations report. None of them leave a
/// booking half-changed.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Not authorized: {0}")]
    Authorization(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl DispatchError {
    pub fn not_found(entity: &'static str, id: Uuid) -> Self {
        DispatchError::NotFound { entity, id }
    }

    /// True when a refreshed retry could succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DispatchError::Conflict(_))
    }
}

impl From<CoreError> for DispatchError {
    fn from(err: CoreError) -> Self {
        let CoreError::ValidationError(msg) = err;
        DispatchError::Validation(msg)
    }
}

impl From<RepositoryError> for DispatchError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::VersionConflict { .. } => DispatchError::Conflict(err.to_string()),
            RepositoryError::Missing(id) => DispatchError::not_found("booking", id),
            other => DispatchError::Internal(other.to_string()),
        }
    }
}

impl From<TransitionError> for DispatchError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::NotOwner(_) => DispatchError::Authorization(err.to_string()),
            other => DispatchError::InvalidTransition(other.to_string()),
        }
    }
}
