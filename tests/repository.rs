//! In-memory repository: filters, paging order, uniqueness and versioned updates.

mod common;

use chrono::Duration;
use common::{stock_position, stored_count};
use position_engine::error::PositionError;
use position_engine::persistence::{InMemoryPositionRepository, PositionRepository, RepositoryError};
use position_engine::types::instrument::ProductType;
use position_engine::types::position::{Direction, PositionFilter, PositionStatus};
use rust_decimal_macros::dec;
use uuid::Uuid;

#[tokio::test]
async fn create_rejects_second_position_for_order() {
    let repo = InMemoryPositionRepository::new();
    let first = stock_position("RELIANCE", Direction::Long, dec!(100), 10);
    let mut second = stock_position("RELIANCE", Direction::Long, dec!(101), 5);
    second.order_id = first.order_id;

    repo.create(first.clone()).await.unwrap();
    let err = repo.create(second).await.unwrap_err();

    assert!(matches!(err, RepositoryError::DuplicateOrder(id) if id == first.order_id));
    assert_eq!(stored_count(&repo).await, 1);
}

#[tokio::test]
async fn get_all_is_newest_first_with_total() {
    let repo = InMemoryPositionRepository::new();
    let mut ids = Vec::new();
    for i in 0..5 {
        let mut p = stock_position("RELIANCE", Direction::Long, dec!(100), 1);
        p.created_at = p.created_at + Duration::seconds(i);
        ids.push(p.id);
        repo.create(p).await.unwrap();
    }

    let (page, total) = repo.get_all(&PositionFilter::default(), 1, 2).await.unwrap();

    assert_eq!(total, 5);
    let got: Vec<Uuid> = page.iter().map(|p| p.id).collect();
    assert_eq!(got, vec![ids[3], ids[2]]);

    let (page, total) = repo.get_all(&PositionFilter::default(), 10, 2).await.unwrap();
    assert!(page.is_empty());
    assert_eq!(total, 5);
}

#[tokio::test]
async fn filters_combine() {
    let repo = InMemoryPositionRepository::new();
    let user = Uuid::new_v4();

    let mut a = stock_position("RELIANCE", Direction::Long, dec!(100), 10);
    a.user_id = user;
    a.tags = vec!["swing".to_string(), "nifty50".to_string()];
    a.strategy_id = Some("momentum".to_string());
    let mut b = stock_position("RELIANCE", Direction::Short, dec!(100), 10);
    b.user_id = user;
    b.product_type = ProductType::Mis;
    b.exit_quantity = 10;
    b.update_status();
    let mut c = stock_position("TCS", Direction::Long, dec!(100), 10);
    c.user_id = user;
    c.tags = vec!["hedge".to_string()];
    let other_user = stock_position("RELIANCE", Direction::Long, dec!(100), 10);
    for p in [&a, &b, &c, &other_user] {
        repo.create(p.clone()).await.unwrap();
    }

    let count = |filter: PositionFilter| {
        let repo = repo.clone();
        async move { repo.get_all(&filter, 0, 100).await.unwrap().1 }
    };

    assert_eq!(count(PositionFilter::for_user(user)).await, 3);
    assert_eq!(
        count(PositionFilter {
            user_id: Some(user),
            symbol: Some("RELIANCE".to_string()),
            ..Default::default()
        })
        .await,
        2
    );
    assert_eq!(
        count(PositionFilter {
            status: Some(PositionStatus::Closed),
            ..Default::default()
        })
        .await,
        1
    );
    assert_eq!(
        count(PositionFilter {
            direction: Some(Direction::Long),
            product_type: Some(ProductType::Nrml),
            ..Default::default()
        })
        .await,
        3
    );
    assert_eq!(
        count(PositionFilter {
            tags: vec!["hedge".to_string(), "swing".to_string()],
            ..Default::default()
        })
        .await,
        2
    );
    assert_eq!(
        count(PositionFilter {
            strategy_id: Some("momentum".to_string()),
            ..Default::default()
        })
        .await,
        1
    );
    assert_eq!(count(PositionFilter::for_order(c.order_id)).await, 1);
}

#[tokio::test]
async fn date_range_is_inclusive() {
    let repo = InMemoryPositionRepository::new();
    let p = stock_position("RELIANCE", Direction::Long, dec!(100), 10);
    repo.create(p.clone()).await.unwrap();

    let exact = PositionFilter {
        from_date: Some(p.created_at),
        to_date: Some(p.created_at),
        ..Default::default()
    };
    assert_eq!(repo.get_all(&exact, 0, 10).await.unwrap().1, 1);

    let later = PositionFilter {
        from_date: Some(p.created_at + Duration::seconds(1)),
        ..Default::default()
    };
    assert_eq!(repo.get_all(&later, 0, 10).await.unwrap().1, 0);
}

#[tokio::test]
async fn update_bumps_version_and_rejects_stale_writes() {
    let repo = InMemoryPositionRepository::new();
    let p = stock_position("RELIANCE", Direction::Long, dec!(100), 10);
    repo.create(p.clone()).await.unwrap();

    let mut first = p.clone();
    first.exit_quantity = 4;
    first.update_status();
    let stored = repo.update(first).await.unwrap();
    assert_eq!(stored.version, p.version + 1);

    let mut stale = p.clone();
    stale.exit_quantity = 10;
    stale.update_status();
    let err = repo.update(stale).await.unwrap_err();
    assert!(matches!(err, RepositoryError::VersionConflict { .. }));
    assert!(matches!(
        PositionError::from(err),
        PositionError::StateConflict(_)
    ));

    let current = repo.get_by_id(p.id).await.unwrap();
    assert_eq!(current.exit_quantity, 4);
    assert_eq!(current.status, PositionStatus::Partial);
}

#[tokio::test]
async fn update_rejects_order_id_taken_by_another_position() {
    let repo = InMemoryPositionRepository::new();
    let a = stock_position("RELIANCE", Direction::Long, dec!(100), 10);
    let b = stock_position("TCS", Direction::Long, dec!(3500), 2);
    repo.create(a.clone()).await.unwrap();
    repo.create(b.clone()).await.unwrap();

    let mut moved = b.clone();
    moved.order_id = a.order_id;
    let err = repo.update(moved).await.unwrap_err();

    assert!(matches!(err, RepositoryError::DuplicateOrder(id) if id == a.order_id));
    assert!(matches!(
        PositionError::from(err),
        PositionError::StateConflict(_)
    ));
    assert_eq!(repo.get_by_id(b.id).await.unwrap(), b);
    assert_eq!(
        repo.get_all(&PositionFilter::for_order(a.order_id), 0, 10)
            .await
            .unwrap()
            .1,
        1
    );

    let mut same = b.clone();
    same.tags = vec!["kept".to_string()];
    assert_eq!(repo.update(same).await.unwrap().version, b.version + 1);
}

#[tokio::test]
async fn update_and_delete_of_unknown_are_not_found() {
    let repo = InMemoryPositionRepository::new();
    let p = stock_position("RELIANCE", Direction::Long, dec!(100), 10);

    assert!(matches!(
        repo.update(p.clone()).await.unwrap_err(),
        RepositoryError::NotFound(_)
    ));
    assert!(matches!(
        repo.delete(p.id).await.unwrap_err(),
        RepositoryError::NotFound(_)
    ));

    repo.create(p.clone()).await.unwrap();
    repo.delete(p.id).await.unwrap();
    assert_eq!(stored_count(&repo).await, 0);
    assert!(matches!(
        PositionError::from(repo.get_by_id(p.id).await.unwrap_err()),
        PositionError::NotFound(id) if id == p.id
    ));
}
