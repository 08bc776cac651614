use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::instrument::{InstrumentType, OptionType, ProductType};

pub type Price = Decimal;
pub type Qty = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    PartiallyExecuted,
    Executed,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    /// Only orders with at least one fill can open a position.
    pub fn has_fills(self) -> bool {
        matches!(self, OrderStatus::Executed | OrderStatus::PartiallyExecuted)
    }
}

/// An order as reported by order management once the venue has filled it (fully or in part).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub symbol: String,
    pub exchange: String,
    pub side: OrderSide,
    /// Quantity originally requested; `filled_quantity` never exceeds it.
    pub quantity: Qty,
    pub filled_quantity: Qty,
    /// Volume-weighted fill price.
    pub average_price: Price,
    pub status: OrderStatus,
    pub product_type: ProductType,
    pub instrument_type: InstrumentType,
    #[serde(default)]
    pub option_type: Option<OptionType>,
    #[serde(default)]
    pub strike_price: Option<Price>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    #[serde(default)]
    pub portfolio_id: Option<String>,
    #[serde(default)]
    pub strategy_id: Option<String>,
    #[serde(default)]
    pub leg_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
