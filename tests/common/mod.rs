#![allow(dead_code)]

use chrono::{Duration, Utc};
use position_engine::persistence::{InMemoryPositionRepository, PositionRepository};
use position_engine::positions::PositionService;
use position_engine::types::instrument::{InstrumentType, OptionType, ProductType};
use position_engine::types::order::{Order, OrderSide, OrderStatus};
use position_engine::types::position::{
    Direction, Greeks, INITIAL_VERSION, Position, PositionFilter, PositionStatus,
};
use position_engine::valuation::{SimpleGreeksModel, StaticPriceSource};
use rust_decimal::Decimal;
use std::sync::Arc;
use uuid::Uuid;

pub fn executed_order(symbol: &str, side: OrderSide, price: Decimal, qty: i64) -> Order {
    Order {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        exchange: "NSE".to_string(),
        side,
        quantity: qty,
        filled_quantity: qty,
        average_price: price,
        status: OrderStatus::Executed,
        product_type: ProductType::Nrml,
        instrument_type: InstrumentType::Stock,
        option_type: None,
        strike_price: None,
        expiry: None,
        portfolio_id: None,
        strategy_id: None,
        leg_id: None,
        tags: Vec::new(),
    }
}

pub fn option_order(side: OrderSide, option_type: OptionType, price: Decimal, qty: i64) -> Order {
    Order {
        instrument_type: InstrumentType::Option,
        option_type: Some(option_type),
        strike_price: Some(Decimal::from(22000)),
        expiry: Some(Utc::now() + Duration::days(30)),
        ..executed_order("NIFTY24DEC22000CE", side, price, qty)
    }
}

pub fn stock_position(symbol: &str, direction: Direction, entry: Decimal, qty: i64) -> Position {
    let now = Utc::now();
    Position {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        order_id: Uuid::new_v4(),
        symbol: symbol.to_string(),
        exchange: "NSE".to_string(),
        product_type: ProductType::Nrml,
        instrument_type: InstrumentType::Stock,
        option_type: None,
        strike_price: None,
        expiry: None,
        direction,
        entry_price: entry,
        exit_price: Decimal::ZERO,
        quantity: qty,
        exit_quantity: 0,
        status: PositionStatus::Open,
        realized_pnl: Decimal::ZERO,
        unrealized_pnl: Decimal::ZERO,
        greeks: Greeks::default(),
        portfolio_id: None,
        strategy_id: None,
        leg_id: None,
        tags: Vec::new(),
        created_at: now,
        updated_at: now,
        version: INITIAL_VERSION,
    }
}

pub fn option_position(
    option_type: OptionType,
    direction: Direction,
    entry: Decimal,
    qty: i64,
) -> Position {
    Position {
        instrument_type: InstrumentType::Option,
        option_type: Some(option_type),
        strike_price: Some(Decimal::from(22000)),
        expiry: Some(Utc::now() + Duration::days(30)),
        ..stock_position("NIFTY24DEC22000CE", direction, entry, qty)
    }
}

pub struct Harness {
    pub service: PositionService,
    pub repo: InMemoryPositionRepository,
    pub prices: StaticPriceSource,
}

pub fn harness(prices: &[(&str, Decimal)]) -> Harness {
    let repo = InMemoryPositionRepository::new();
    let prices = StaticPriceSource::with_prices(prices.iter().copied());
    let service = PositionService::new(
        Arc::new(repo.clone()),
        Arc::new(prices.clone()),
        Arc::new(SimpleGreeksModel),
    );
    Harness {
        service,
        repo,
        prices,
    }
}

pub async fn stored_count(repo: &InMemoryPositionRepository) -> usize {
    repo.get_all(&PositionFilter::default(), 0, usize::MAX)
        .await
        .unwrap()
        .1
}
