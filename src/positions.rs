//! Position lifecycle: create from an executed order, read with fresh valuation,
//! update, partial and full exits, plus exposure and aggregation views.
//! Testable without HTTP.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::aggregation::{self, AggregatedPosition, GroupBy};
use crate::error::{PositionError, PositionResult};
use crate::persistence::PositionRepository;
use crate::types::order::{Order, Price, Qty};
use crate::types::position::{
    Direction, Greeks, INITIAL_VERSION, Position, PositionFilter, PositionStatus,
};
use crate::valuation::{GreeksModel, PriceSource, ValuationError};

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 100;

/// One page of positions, valued at read time.
#[derive(Debug, Clone, Serialize)]
pub struct PositionPage {
    pub positions: Vec<Position>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
}

/// Effective `(page, limit, offset)` for a caller's request.
pub fn normalize_page(page: i64, limit: i64) -> (usize, usize, usize) {
    let page = page.max(1) as usize;
    let limit = if limit < 1 {
        DEFAULT_PAGE_LIMIT
    } else {
        (limit as usize).min(MAX_PAGE_LIMIT)
    };
    (page, limit, (page - 1) * limit)
}

/// `None` when the result does not fit in a `Decimal`.
fn directional_pnl(
    direction: Direction,
    entry: Price,
    current: Price,
    quantity: Qty,
) -> Option<Decimal> {
    let per_unit = match direction {
        Direction::Long => current.checked_sub(entry)?,
        Direction::Short => entry.checked_sub(current)?,
    };
    per_unit.checked_mul(Decimal::from(quantity))
}

fn overflow(what: impl Into<String>) -> PositionError {
    PositionError::Valuation(ValuationError::Overflow(what.into()))
}

#[derive(Clone)]
pub struct PositionService {
    repo: Arc<dyn PositionRepository>,
    prices: Arc<dyn PriceSource>,
    greeks: Arc<dyn GreeksModel>,
}

impl PositionService {
    pub fn new(
        repo: Arc<dyn PositionRepository>,
        prices: Arc<dyn PriceSource>,
        greeks: Arc<dyn GreeksModel>,
    ) -> Self {
        Self {
            repo,
            prices,
            greeks,
        }
    }

    /// Open a position for an order that has been (at least partly) filled.
    #[instrument(skip(self, order), fields(order_id = %order.id, symbol = %order.symbol))]
    pub async fn create_position_from_order(&self, order: &Order) -> PositionResult<Position> {
        if !order.status.has_fills() {
            return Err(PositionError::validation(
                "only executed or partially executed orders can create positions",
            ));
        }
        if order.filled_quantity > order.quantity {
            return Err(PositionError::validation(
                "filled quantity cannot exceed order quantity",
            ));
        }

        let (existing, _) = self
            .repo
            .get_all(&PositionFilter::for_order(order.id), 0, 1)
            .await?;
        if !existing.is_empty() {
            return Err(PositionError::StateConflict(format!(
                "position already exists for order {}",
                order.id
            )));
        }

        let now = Utc::now();
        let mut position = Position {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            order_id: order.id,
            symbol: order.symbol.clone(),
            exchange: order.exchange.clone(),
            product_type: order.product_type,
            instrument_type: order.instrument_type,
            option_type: order.option_type,
            strike_price: order.strike_price,
            expiry: order.expiry,
            direction: order.side.into(),
            entry_price: order.average_price,
            exit_price: Decimal::ZERO,
            quantity: order.filled_quantity,
            exit_quantity: 0,
            status: PositionStatus::Open,
            realized_pnl: Decimal::ZERO,
            unrealized_pnl: Decimal::ZERO,
            greeks: Greeks::default(),
            portfolio_id: order.portfolio_id.clone(),
            strategy_id: order.strategy_id.clone(),
            leg_id: order.leg_id.clone(),
            tags: order.tags.clone(),
            created_at: now,
            updated_at: now,
            version: INITIAL_VERSION,
        };
        position.validate()?;
        self.refresh_valuation(&mut position).await?;

        let created = self.repo.create(position).await?;
        info!(
            position_id = %created.id,
            direction = %created.direction,
            quantity = created.quantity,
            "position opened"
        );
        Ok(created)
    }

    /// Read one position. Without a mark the stored unrealized PnL is returned.
    pub async fn get_position_by_id(&self, id: Uuid) -> PositionResult<Position> {
        let mut position = self.repo.get_by_id(id).await?;
        self.refresh_valuation(&mut position).await?;
        Ok(position)
    }

    /// List positions. A position that cannot be valued keeps its stored figures
    /// rather than failing the whole page.
    pub async fn get_positions(
        &self,
        filter: &PositionFilter,
        page: i64,
        limit: i64,
    ) -> PositionResult<PositionPage> {
        let (page, limit, offset) = normalize_page(page, limit);
        let (mut positions, total) = self.repo.get_all(filter, offset, limit).await?;

        for position in positions.iter_mut() {
            if let Err(e) = self.refresh_valuation(position).await {
                warn!(position_id = %position.id, error = %e, "valuation skipped");
            }
        }

        Ok(PositionPage {
            positions,
            total,
            page,
            limit,
        })
    }

    /// Every position matching `filter`, walking pages of `MAX_PAGE_LIMIT`.
    pub async fn get_all_positions(&self, filter: &PositionFilter) -> PositionResult<Vec<Position>> {
        let mut all = Vec::new();
        let mut page = 1;
        loop {
            let batch = self
                .get_positions(filter, page, MAX_PAGE_LIMIT as i64)
                .await?;
            let fetched = batch.positions.len();
            all.extend(batch.positions);
            if fetched < batch.limit || all.len() >= batch.total {
                break;
            }
            page += 1;
        }
        Ok(all)
    }

    /// Replace a non-closed position. Ownership (`order_id`, `user_id`), `created_at` and the
    /// version come from the stored record.
    #[instrument(skip(self, position), fields(position_id = %position.id))]
    pub async fn update_position(&self, mut position: Position) -> PositionResult<Position> {
        position.validate()?;

        let existing = self.repo.get_by_id(position.id).await?;
        if existing.is_closed() {
            return Err(PositionError::StateConflict(format!(
                "closed position {} cannot be updated",
                existing.id
            )));
        }

        position.order_id = existing.order_id;
        position.user_id = existing.user_id;
        position.created_at = existing.created_at;
        position.updated_at = Utc::now();
        position.version = existing.version;
        position.update_status();
        self.refresh_valuation(&mut position).await?;

        let updated = self.repo.update(position).await?;
        debug!(status = %updated.status, version = updated.version, "position updated");
        Ok(updated)
    }

    /// Record an exit. `exit_quantity` is the cumulative amount exited so far, not a delta.
    #[instrument(skip(self))]
    pub async fn close_position(
        &self,
        id: Uuid,
        exit_price: Price,
        exit_quantity: Qty,
    ) -> PositionResult<Position> {
        let mut position = self.repo.get_by_id(id).await?;
        if position.is_closed() {
            return Err(PositionError::StateConflict(format!(
                "position {} is already closed",
                id
            )));
        }
        if exit_price <= Decimal::ZERO {
            return Err(PositionError::input_range(
                "exit_price",
                "must be greater than zero",
            ));
        }
        if exit_quantity <= 0 {
            return Err(PositionError::input_range(
                "exit_quantity",
                "must be greater than zero",
            ));
        }
        if exit_quantity > position.quantity {
            return Err(PositionError::input_range(
                "exit_quantity",
                format!("{} exceeds position quantity {}", exit_quantity, position.quantity),
            ));
        }

        position.exit_price = exit_price;
        position.exit_quantity = exit_quantity;
        position.updated_at = Utc::now();
        position.realized_pnl =
            directional_pnl(position.direction, position.entry_price, exit_price, exit_quantity)
                .ok_or_else(|| {
                    PositionError::input_range("exit_price", "realized pnl is out of range")
                })?;
        position.update_status();

        if position.status == PositionStatus::Partial {
            match self.prices.current_price(&position.symbol).await {
                Ok(current) => {
                    // Value the full quantity first, then keep the remaining fraction.
                    position.unrealized_pnl = directional_pnl(
                        position.direction,
                        position.entry_price,
                        current,
                        position.quantity,
                    )
                    .and_then(|full| full.checked_mul(Decimal::from(position.remaining_quantity())))
                    .and_then(|scaled| scaled.checked_div(Decimal::from(position.quantity)))
                    .ok_or_else(|| overflow(format!("unrealized pnl of position {}", id)))?;
                }
                Err(ValuationError::PriceUnavailable(symbol)) => {
                    warn!(position_id = %id, %symbol, "no mark, keeping stored unrealized pnl");
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            position.unrealized_pnl = Decimal::ZERO;
        }
        position.greeks = self.calculate_greeks(&position)?;

        let closed = self.repo.update(position).await?;
        info!(
            position_id = %closed.id,
            status = %closed.status,
            realized_pnl = %closed.realized_pnl,
            "position exit recorded"
        );
        Ok(closed)
    }

    /// Realized PnL for a closed position, otherwise mark-to-market on the remaining quantity.
    pub async fn calculate_pnl(&self, position: &Position) -> PositionResult<Decimal> {
        if position.is_closed() {
            return Ok(position.realized_pnl);
        }
        let current = self.prices.current_price(&position.symbol).await?;
        directional_pnl(
            position.direction,
            position.entry_price,
            current,
            position.remaining_quantity(),
        )
        .ok_or_else(|| overflow(format!("pnl of position {}", position.id)))
    }

    pub fn calculate_greeks(&self, position: &Position) -> PositionResult<Greeks> {
        Ok(self.greeks.greeks(position)?)
    }

    pub fn calculate_exposure(&self, positions: &[Position]) -> PositionResult<Decimal> {
        aggregation::gross_exposure(positions).ok_or_else(|| overflow("gross exposure"))
    }

    pub fn aggregate_positions(
        &self,
        positions: &[Position],
        group_by: &str,
    ) -> PositionResult<BTreeMap<String, AggregatedPosition>> {
        let group_by: GroupBy = group_by.parse().map_err(PositionError::validation)?;
        aggregation::aggregate(positions, group_by)
            .ok_or_else(|| overflow(format!("{} aggregates", group_by)))
    }

    /// Recompute Greeks and unrealized PnL. A closed position carries no unrealized PnL.
    /// Without a mark for the symbol the stored unrealized PnL is kept.
    async fn refresh_valuation(&self, position: &mut Position) -> PositionResult<()> {
        position.greeks = self.calculate_greeks(position)?;
        if position.is_closed() {
            position.unrealized_pnl = Decimal::ZERO;
            return Ok(());
        }
        match self.calculate_pnl(position).await {
            Ok(pnl) => position.unrealized_pnl = pnl,
            Err(PositionError::Valuation(ValuationError::PriceUnavailable(symbol))) => {
                warn!(position_id = %position.id, %symbol, "no mark, keeping stored unrealized pnl");
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }
}
