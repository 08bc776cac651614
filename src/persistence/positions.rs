//! Position persistence on PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::repository::{PositionRepository, RepositoryError};
use crate::types::position::{Greeks, Position, PositionFilter};

const POSITION_COLUMNS: &str = "id, user_id, order_id, symbol, exchange, product_type, \
     instrument_type, option_type, strike_price, expiry, direction, entry_price, exit_price, \
     quantity, exit_quantity, status, realized_pnl, unrealized_pnl, delta, gamma, theta, vega, \
     portfolio_id, strategy_id, leg_id, tags, created_at, updated_at, version";

#[derive(Debug, FromRow)]
pub struct PositionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub symbol: String,
    pub exchange: String,
    pub product_type: String,
    pub instrument_type: String,
    pub option_type: Option<String>,
    pub strike_price: Option<Decimal>,
    pub expiry: Option<DateTime<Utc>>,
    pub direction: String,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: i64,
    pub exit_quantity: i64,
    pub status: String,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub delta: Decimal,
    pub gamma: Decimal,
    pub theta: Decimal,
    pub vega: Decimal,
    pub portfolio_id: Option<String>,
    pub strategy_id: Option<String>,
    pub leg_id: Option<String>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: i64,
}

fn parse_column<T>(row_id: Uuid, column: &str, value: &str) -> Result<T, RepositoryError>
where
    T: std::str::FromStr<Err = String>,
{
    value
        .parse()
        .map_err(|e| RepositoryError::Malformed(format!("{} on {}: {}", column, row_id, e)))
}

/// Convert a stored row back into a `Position`. Rows with unknown enum values are rejected.
pub fn position_row_to_position(row: PositionRow) -> Result<Position, RepositoryError> {
    let option_type = row
        .option_type
        .as_deref()
        .map(|v| parse_column(row.id, "option_type", v))
        .transpose()?;
    Ok(Position {
        id: row.id,
        user_id: row.user_id,
        order_id: row.order_id,
        product_type: parse_column(row.id, "product_type", &row.product_type)?,
        instrument_type: parse_column(row.id, "instrument_type", &row.instrument_type)?,
        option_type,
        strike_price: row.strike_price,
        expiry: row.expiry,
        direction: parse_column(row.id, "direction", &row.direction)?,
        entry_price: row.entry_price,
        exit_price: row.exit_price,
        quantity: row.quantity,
        exit_quantity: row.exit_quantity,
        status: parse_column(row.id, "status", &row.status)?,
        realized_pnl: row.realized_pnl,
        unrealized_pnl: row.unrealized_pnl,
        greeks: Greeks {
            delta: row.delta,
            gamma: row.gamma,
            theta: row.theta,
            vega: row.vega,
        },
        symbol: row.symbol,
        exchange: row.exchange,
        portfolio_id: row.portfolio_id,
        strategy_id: row.strategy_id,
        leg_id: row.leg_id,
        tags: row.tags,
        created_at: row.created_at,
        updated_at: row.updated_at,
        version: row.version,
    })
}

/// Append `WHERE` clauses for every set filter field.
fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &PositionFilter) {
    qb.push(" WHERE TRUE");
    if let Some(user_id) = filter.user_id {
        qb.push(" AND user_id = ").push_bind(user_id);
    }
    if let Some(symbol) = &filter.symbol {
        qb.push(" AND symbol = ").push_bind(symbol.clone());
    }
    if let Some(status) = filter.status {
        qb.push(" AND status = ").push_bind(status.as_str());
    }
    if let Some(direction) = filter.direction {
        qb.push(" AND direction = ").push_bind(direction.as_str());
    }
    if let Some(product_type) = filter.product_type {
        qb.push(" AND product_type = ").push_bind(product_type.as_str());
    }
    if let Some(instrument_type) = filter.instrument_type {
        qb.push(" AND instrument_type = ")
            .push_bind(instrument_type.as_str());
    }
    if let Some(portfolio_id) = &filter.portfolio_id {
        qb.push(" AND portfolio_id = ").push_bind(portfolio_id.clone());
    }
    if let Some(strategy_id) = &filter.strategy_id {
        qb.push(" AND strategy_id = ").push_bind(strategy_id.clone());
    }
    if let Some(order_id) = filter.order_id {
        qb.push(" AND order_id = ").push_bind(order_id);
    }
    if let Some(from) = filter.from_date {
        qb.push(" AND created_at >= ").push_bind(from);
    }
    if let Some(to) = filter.to_date {
        qb.push(" AND created_at <= ").push_bind(to);
    }
    if !filter.tags.is_empty() {
        qb.push(" AND tags && ").push_bind(filter.tags.clone());
    }
}

#[derive(Clone)]
pub struct PgPositionRepository {
    pool: PgPool,
}

impl PgPositionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, id: Uuid) -> Result<bool, RepositoryError> {
        let found: Option<i32> = sqlx::query_scalar("SELECT 1 FROM positions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }
}

#[async_trait]
impl PositionRepository for PgPositionRepository {
    async fn create(&self, position: Position) -> Result<Position, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO positions (id, user_id, order_id, symbol, exchange, product_type, \
             instrument_type, option_type, strike_price, expiry, direction, entry_price, exit_price, \
             quantity, exit_quantity, status, realized_pnl, unrealized_pnl, delta, gamma, theta, vega, \
             portfolio_id, strategy_id, leg_id, tags, created_at, updated_at, version) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, \
             $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)",
        )
        .bind(position.id)
        .bind(position.user_id)
        .bind(position.order_id)
        .bind(&position.symbol)
        .bind(&position.exchange)
        .bind(position.product_type.as_str())
        .bind(position.instrument_type.as_str())
        .bind(position.option_type.map(|t| t.as_str()))
        .bind(position.strike_price)
        .bind(position.expiry)
        .bind(position.direction.as_str())
        .bind(position.entry_price)
        .bind(position.exit_price)
        .bind(position.quantity)
        .bind(position.exit_quantity)
        .bind(position.status.as_str())
        .bind(position.realized_pnl)
        .bind(position.unrealized_pnl)
        .bind(position.greeks.delta)
        .bind(position.greeks.gamma)
        .bind(position.greeks.theta)
        .bind(position.greeks.vega)
        .bind(&position.portfolio_id)
        .bind(&position.strategy_id)
        .bind(&position.leg_id)
        .bind(&position.tags)
        .bind(position.created_at)
        .bind(position.updated_at)
        .bind(position.version)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(position),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(RepositoryError::DuplicateOrder(position.order_id))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Position, RepositoryError> {
        let sql = format!("SELECT {} FROM positions WHERE id = $1", POSITION_COLUMNS);
        let row = sqlx::query_as::<_, PositionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepositoryError::NotFound(id))?;
        position_row_to_position(row)
    }

    async fn get_all(
        &self,
        filter: &PositionFilter,
        offset: usize,
        limit: usize,
    ) -> Result<(Vec<Position>, usize), RepositoryError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM positions");
        push_filter(&mut count, filter);
        let total: i64 = count.build_query_scalar::<i64>().fetch_one(&self.pool).await?;

        let mut select = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM positions",
            POSITION_COLUMNS
        ));
        push_filter(&mut select, filter);
        select
            .push(" ORDER BY created_at DESC, id LIMIT ")
            .push_bind(limit as i64)
            .push(" OFFSET ")
            .push_bind(offset as i64);
        let rows: Vec<PositionRow> = select.build_query_as::<PositionRow>().fetch_all(&self.pool).await?;

        let positions = rows
            .into_iter()
            .map(position_row_to_position)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((positions, total.max(0) as usize))
    }

    async fn update(&self, mut position: Position) -> Result<Position, RepositoryError> {
        let result = sqlx::query(
            "UPDATE positions SET user_id = $3, order_id = $4, symbol = $5, exchange = $6, \
             product_type = $7, instrument_type = $8, option_type = $9, strike_price = $10, \
             expiry = $11, direction = $12, entry_price = $13, exit_price = $14, quantity = $15, \
             exit_quantity = $16, status = $17, realized_pnl = $18, unrealized_pnl = $19, \
             delta = $20, gamma = $21, theta = $22, vega = $23, portfolio_id = $24, \
             strategy_id = $25, leg_id = $26, tags = $27, updated_at = $28, version = version + 1 \
             WHERE id = $1 AND version = $2",
        )
        .bind(position.id)
        .bind(position.version)
        .bind(position.user_id)
        .bind(position.order_id)
        .bind(&position.symbol)
        .bind(&position.exchange)
        .bind(position.product_type.as_str())
        .bind(position.instrument_type.as_str())
        .bind(position.option_type.map(|t| t.as_str()))
        .bind(position.strike_price)
        .bind(position.expiry)
        .bind(position.direction.as_str())
        .bind(position.entry_price)
        .bind(position.exit_price)
        .bind(position.quantity)
        .bind(position.exit_quantity)
        .bind(position.status.as_str())
        .bind(position.realized_pnl)
        .bind(position.unrealized_pnl)
        .bind(position.greeks.delta)
        .bind(position.greeks.gamma)
        .bind(position.greeks.theta)
        .bind(position.greeks.vega)
        .bind(&position.portfolio_id)
        .bind(&position.strategy_id)
        .bind(&position.leg_id)
        .bind(&position.tags)
        .bind(position.updated_at)
        .execute(&self.pool)
        .await;

        let result = match result {
            Ok(result) => result,
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                return Err(RepositoryError::DuplicateOrder(position.order_id));
            }
            Err(e) => return Err(e.into()),
        };
        if result.rows_affected() == 0 {
            if self.exists(position.id).await? {
                return Err(RepositoryError::VersionConflict {
                    id: position.id,
                    expected: position.version,
                });
            }
            return Err(RepositoryError::NotFound(position.id));
        }
        position.version += 1;
        Ok(position)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM positions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(id));
        }
        Ok(())
    }
}
