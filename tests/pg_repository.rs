//! PostgreSQL repository against a live database.
//! Run with `DATABASE_URL=postgres://... cargo test -- --ignored`.

mod common;

use common::stock_position;
use position_engine::persistence::{
    PgPositionRepository, PositionRepository, RepositoryError, create_pool_and_migrate,
};
use position_engine::types::position::{Direction, PositionFilter, PositionStatus};
use rust_decimal_macros::dec;

async fn repo() -> Option<PgPositionRepository> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let pool = create_pool_and_migrate(&url, 2).await.unwrap();
    Some(PgPositionRepository::new(pool))
}

#[tokio::test]
#[ignore]
async fn round_trip_uniqueness_and_versioning() {
    let Some(repo) = repo().await else {
        return;
    };
    let mut p = stock_position("RELIANCE", Direction::Long, dec!(2500.25), 10);
    p.tags = vec!["pg".to_string()];
    let a = stock_position("TCS", Direction::Short, dec!(3500), 2);
    repo.create(p.clone()).await.unwrap();
    repo.create(a.clone()).await.unwrap();

    let stored = repo.get_by_id(p.id).await.unwrap();
    assert_eq!(stored.entry_price, dec!(2500.25));
    assert_eq!(stored.tags, p.tags);
    assert_eq!(stored.version, p.version);

    let mut dup = stock_position("RELIANCE", Direction::Long, dec!(1), 1);
    dup.order_id = p.order_id;
    assert!(matches!(
        repo.create(dup).await.unwrap_err(),
        RepositoryError::DuplicateOrder(_)
    ));

    let (found, total) = repo
        .get_all(&PositionFilter::for_order(p.order_id), 0, 10)
        .await
        .unwrap();
    assert_eq!(total, 1);
    assert_eq!(found[0].id, p.id);

    let mut exit = stored.clone();
    exit.exit_quantity = 4;
    exit.update_status();
    let updated = repo.update(exit).await.unwrap();
    assert_eq!(updated.version, stored.version + 1);
    assert_eq!(
        repo.get_by_id(p.id).await.unwrap().status,
        PositionStatus::Partial
    );

    assert!(matches!(
        repo.update(stored.clone()).await.unwrap_err(),
        RepositoryError::VersionConflict { .. }
    ));

    let mut moved = repo.get_by_id(a.id).await.unwrap();
    moved.order_id = p.order_id;
    assert!(matches!(
        repo.update(moved).await.unwrap_err(),
        RepositoryError::DuplicateOrder(_)
    ));

    repo.delete(p.id).await.unwrap();
    repo.delete(a.id).await.unwrap();
    assert!(matches!(
        repo.get_by_id(p.id).await.unwrap_err(),
        RepositoryError::NotFound(_)
    ));
}
