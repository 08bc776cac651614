//! Storage for positions: the repository port, an in-memory store and PostgreSQL.

mod memory;
mod pool;
mod positions;
mod repository;

pub use memory::{InMemoryPositionRepository, SharedPositions};
pub use pool::{create_pool_and_migrate, run_migrations};
pub use positions::{PgPositionRepository, PositionRow, position_row_to_position};
pub use repository::{PositionRepository, RepositoryError};
pub use sqlx::PgPool;
