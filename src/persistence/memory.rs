//! In-process position store for tests and database-less runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repository::{PositionRepository, RepositoryError};
use crate::types::position::{Position, PositionFilter};

pub type SharedPositions = Arc<RwLock<HashMap<Uuid, Position>>>;

#[derive(Clone, Default)]
pub struct InMemoryPositionRepository {
    store: SharedPositions,
}

impl InMemoryPositionRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PositionRepository for InMemoryPositionRepository {
    async fn create(&self, position: Position) -> Result<Position, RepositoryError> {
        let mut guard = self.store.write().await;
        if guard.values().any(|p| p.order_id == position.order_id) {
            return Err(RepositoryError::DuplicateOrder(position.order_id));
        }
        guard.insert(position.id, position.clone());
        Ok(position)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Position, RepositoryError> {
        self.store
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    async fn get_all(
        &self,
        filter: &PositionFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Position>, usize), RepositoryError> {
        let guard = self.store.read().await;
        let mut matching: Vec<&Position> = guard.values().filter(|p| filter.matches(p)).collect();
        let total = matching.len();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        let page = matching
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect();
        Ok((page, total))
    }

    async fn update(&self, mut position: Position) -> Result<Position, RepositoryError> {
        let mut guard = self.store.write().await;
        if guard
            .values()
            .any(|p| p.order_id == position.order_id && p.id != position.id)
        {
            return Err(RepositoryError::DuplicateOrder(position.order_id));
        }
        let stored = guard
            .get_mut(&position.id)
            .ok_or(RepositoryError::NotFound(position.id))?;
        if stored.version != position.version {
            return Err(RepositoryError::VersionConflict {
                id: position.id,
                expected: position.version,
            });
        }
        position.version += 1;
        *stored = position.clone();
        Ok(position)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.store
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound(id))
    }
}
