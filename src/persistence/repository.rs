//! Storage port for positions.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::types::position::{Position, PositionFilter};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("position {0} not found")]
    NotFound(Uuid),

    #[error("position for order {0} already exists")]
    DuplicateOrder(Uuid),

    #[error("position {id} changed since it was read (expected version {expected})")]
    VersionConflict { id: Uuid, expected: i64 },

    /// A stored row could not be turned back into a `Position`.
    #[error("malformed position row: {0}")]
    Malformed(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence for positions. Implementations own timeouts and retries.
#[async_trait]
pub trait PositionRepository: Send + Sync {
    /// Insert a new position. Fails with `DuplicateOrder` if the order already has one.
    async fn create(&self, position: Position) -> Result<Position, RepositoryError>;

    async fn get_by_id(&self, id: Uuid) -> Result<Position, RepositoryError>;

    /// Matching positions newest first, windowed by `offset`/`limit`, plus the total match count.
    async fn get_all(
        &self,
        filter: &PositionFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Position>, usize), RepositoryError>;

    /// Replace the stored position if its version still equals `position.version`.
    /// Returns the stored position with the bumped version.
    async fn update(&self, position: Position) -> Result<Position, RepositoryError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}
