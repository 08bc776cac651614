use thiserror::Error;
use uuid::Uuid;

use crate::persistence::RepositoryError;
use crate::types::position::ValidationError;
use crate::valuation::ValuationError;

/// Failures surfaced by `PositionService`.
#[derive(Error, Debug)]
pub enum PositionError {
    /// Malformed or missing input. Nothing was written.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("position {0} not found")]
    NotFound(Uuid),

    /// Closed position, duplicate position for an order, or a concurrent write.
    #[error("state conflict: {0}")]
    StateConflict(String),

    #[error("{field} out of range: {reason}")]
    InputRange { field: &'static str, reason: String },

    #[error(transparent)]
    Valuation(#[from] ValuationError),

    #[error(transparent)]
    Repository(RepositoryError),
}

impl PositionError {
    pub fn validation(message: impl Into<String>) -> Self {
        PositionError::Validation(ValidationError::new(message))
    }

    pub fn input_range(field: &'static str, reason: impl Into<String>) -> Self {
        PositionError::InputRange {
            field,
            reason: reason.into(),
        }
    }
}

impl From<RepositoryError> for PositionError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(id) => PositionError::NotFound(id),
            RepositoryError::DuplicateOrder(order_id) => PositionError::StateConflict(format!(
                "position already exists for order {}",
                order_id
            )),
            RepositoryError::VersionConflict { id, expected } => {
                PositionError::StateConflict(format!(
                    "position {} was modified concurrently (expected version {})",
                    id, expected
                ))
            }
            other => PositionError::Repository(other),
        }
    }
}

pub type PositionResult<T> = Result<T, PositionError>;
