//! Position entity and the invariants every lifecycle operation preserves.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

use crate::types::instrument::{InstrumentType, OptionType, ProductType};
use crate::types::order::{OrderSide, Price, Qty};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PositionStatus {
    Open,
    Partial,
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl PositionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PositionStatus::Open => "open",
            PositionStatus::Partial => "partial",
            PositionStatus::Closed => "closed",
        }
    }

    /// Derive the status from how much of the position has been exited.
    pub fn from_quantities(quantity: Qty, exit_quantity: Qty) -> Self {
        if exit_quantity >= quantity {
            PositionStatus::Closed
        } else if exit_quantity > 0 {
            PositionStatus::Partial
        } else {
            PositionStatus::Open
        }
    }
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Long => "long",
            Direction::Short => "short",
        }
    }

    /// +1 for long, -1 for short.
    pub fn sign(self) -> Decimal {
        match self {
            Direction::Long => Decimal::ONE,
            Direction::Short => Decimal::NEGATIVE_ONE,
        }
    }
}

impl From<OrderSide> for Direction {
    fn from(side: OrderSide) -> Self {
        match side {
            OrderSide::Buy => Direction::Long,
            OrderSide::Sell => Direction::Short,
        }
    }
}

impl fmt::Display for PositionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PositionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(PositionStatus::Open),
            "partial" => Ok(PositionStatus::Partial),
            "closed" => Ok(PositionStatus::Closed),
            other => Err(format!("unknown position status '{}'", other)),
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "long" => Ok(Direction::Long),
            "short" => Ok(Direction::Short),
            other => Err(format!("unknown direction '{}'", other)),
        }
    }
}

/// Risk sensitivities of a position, already scaled by its remaining quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: Decimal,
    pub gamma: Decimal,
    pub theta: Decimal,
    pub vega: Decimal,
}

impl Greeks {
    /// Per-unit sensitivities times `quantity`. `None` on overflow.
    pub fn scaled(self, quantity: Qty) -> Option<Self> {
        let q = Decimal::from(quantity);
        Some(Greeks {
            delta: self.delta.checked_mul(q)?,
            gamma: self.gamma.checked_mul(q)?,
            theta: self.theta.checked_mul(q)?,
            vega: self.vega.checked_mul(q)?,
        })
    }

    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        Some(Greeks {
            delta: self.delta.checked_add(rhs.delta)?,
            gamma: self.gamma.checked_add(rhs.gamma)?,
            theta: self.theta.checked_add(rhs.theta)?,
            vega: self.vega.checked_add(rhs.vega)?,
        })
    }
}

/// The first rule a position violated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: Uuid,
    pub user_id: Uuid,
    pub order_id: Uuid,
    pub symbol: String,
    pub exchange: String,
    pub product_type: ProductType,
    pub instrument_type: InstrumentType,
    #[serde(default)]
    pub option_type: Option<OptionType>,
    #[serde(default)]
    pub strike_price: Option<Price>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
    pub direction: Direction,
    pub entry_price: Price,
    #[serde(default)]
    pub exit_price: Price,
    pub quantity: Qty,
    #[serde(default)]
    pub exit_quantity: Qty,
    pub status: PositionStatus,
    #[serde(default)]
    pub realized_pnl: Decimal,
    #[serde(default)]
    pub unrealized_pnl: Decimal,
    #[serde(default)]
    pub greeks: Greeks,
    #[serde(default)]
    pub portfolio_id: Option<String>,
    #[serde(default)]
    pub strategy_id: Option<String>,
    #[serde(default)]
    pub leg_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every accepted update; a stale value makes the write fail.
    #[serde(default = "initial_version")]
    pub version: i64,
}

pub const INITIAL_VERSION: i64 = 1;

fn initial_version() -> i64 {
    INITIAL_VERSION
}

impl Position {
    /// Check required identity, numeric bounds and option fields. Stops at the first failure.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.user_id.is_nil() {
            return Err(ValidationError::new("user ID is required"));
        }
        if self.symbol.trim().is_empty() {
            return Err(ValidationError::new("symbol is required"));
        }
        if self.exchange.trim().is_empty() {
            return Err(ValidationError::new("exchange is required"));
        }
        if self.entry_price <= Decimal::ZERO {
            return Err(ValidationError::new("entry price must be greater than zero"));
        }
        if self.quantity <= 0 {
            return Err(ValidationError::new("quantity must be greater than zero"));
        }
        if self.entry_notional().is_none() {
            return Err(ValidationError::new("entry notional is out of range"));
        }
        if self.exit_quantity < 0 {
            return Err(ValidationError::new("exit quantity cannot be negative"));
        }
        if self.exit_quantity > self.quantity {
            return Err(ValidationError::new(
                "exit quantity cannot exceed position quantity",
            ));
        }

        if self.instrument_type == InstrumentType::Option {
            if self.option_type.is_none() {
                return Err(ValidationError::new("option type is required for options"));
            }
            match self.strike_price {
                Some(strike) if strike > Decimal::ZERO => {}
                _ => {
                    return Err(ValidationError::new(
                        "strike price must be greater than zero",
                    ));
                }
            }
            if self.expiry.is_none() {
                return Err(ValidationError::new("expiry is required for options"));
            }
        }

        Ok(())
    }

    /// Realized plus unrealized. `None` on overflow.
    pub fn total_pnl(&self) -> Option<Decimal> {
        self.realized_pnl.checked_add(self.unrealized_pnl)
    }

    fn entry_notional(&self) -> Option<Decimal> {
        self.entry_price.checked_mul(Decimal::from(self.quantity))
    }

    /// Total PnL as a percentage of the entry notional; 0 when there is no notional.
    /// `None` on overflow.
    pub fn pnl_percentage(&self) -> Option<Decimal> {
        let invested = self.entry_notional()?;
        if invested.is_zero() {
            return Some(Decimal::ZERO);
        }
        self.total_pnl()?
            .checked_div(invested)?
            .checked_mul(Decimal::ONE_HUNDRED)
    }

    pub fn days_till_expiry(&self) -> i64 {
        self.days_till_expiry_at(Utc::now())
    }

    /// Whole days until expiry as seen from `now`. Never negative.
    pub fn days_till_expiry_at(&self, now: DateTime<Utc>) -> i64 {
        if !self.instrument_type.is_derivative() {
            return 0;
        }
        match self.expiry {
            Some(expiry) if expiry > now => (expiry - now).num_days(),
            _ => 0,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        if !self.instrument_type.is_derivative() {
            return false;
        }
        self.expiry.is_some_and(|expiry| now > expiry)
    }

    pub fn remaining_quantity(&self) -> Qty {
        self.quantity - self.exit_quantity
    }

    /// Remaining quantity signed by direction: positive long, negative short.
    pub fn signed_remaining_quantity(&self) -> Qty {
        match self.direction {
            Direction::Long => self.remaining_quantity(),
            Direction::Short => -self.remaining_quantity(),
        }
    }

    /// Entry notional of the quantity still held. `None` on overflow.
    pub fn notional_value(&self) -> Option<Decimal> {
        self.entry_price
            .checked_mul(Decimal::from(self.remaining_quantity()))
    }

    pub fn is_closed(&self) -> bool {
        self.status == PositionStatus::Closed
    }

    pub fn is_fully_closed(&self) -> bool {
        self.status == PositionStatus::Closed || self.exit_quantity >= self.quantity
    }

    pub fn is_partially_exited(&self) -> bool {
        self.exit_quantity > 0 && self.exit_quantity < self.quantity
    }

    /// Re-derive `status` from `exit_quantity`. Call after every change to the exited amount.
    pub fn update_status(&mut self) {
        self.status = PositionStatus::from_quantities(self.quantity, self.exit_quantity);
    }
}

/// Listing criteria. Every set field must match; `tags` matches if any tag is shared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionFilter {
    pub user_id: Option<Uuid>,
    pub symbol: Option<String>,
    pub status: Option<PositionStatus>,
    pub direction: Option<Direction>,
    pub product_type: Option<ProductType>,
    pub instrument_type: Option<InstrumentType>,
    pub portfolio_id: Option<String>,
    pub strategy_id: Option<String>,
    pub order_id: Option<Uuid>,
    pub from_date: Option<DateTime<Utc>>,
    pub to_date: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl PositionFilter {
    pub fn for_order(order_id: Uuid) -> Self {
        Self {
            order_id: Some(order_id),
            ..Default::default()
        }
    }

    pub fn for_user(user_id: Uuid) -> Self {
        Self {
            user_id: Some(user_id),
            ..Default::default()
        }
    }

    pub fn matches(&self, p: &Position) -> bool {
        self.user_id.is_none_or(|id| p.user_id == id)
            && self.symbol.as_ref().is_none_or(|s| &p.symbol == s)
            && self.status.is_none_or(|s| p.status == s)
            && self.direction.is_none_or(|d| p.direction == d)
            && self.product_type.is_none_or(|t| p.product_type == t)
            && self.instrument_type.is_none_or(|t| p.instrument_type == t)
            && self
                .portfolio_id
                .as_ref()
                .is_none_or(|id| p.portfolio_id.as_ref() == Some(id))
            && self
                .strategy_id
                .as_ref()
                .is_none_or(|id| p.strategy_id.as_ref() == Some(id))
            && self.order_id.is_none_or(|id| p.order_id == id)
            && self.from_date.is_none_or(|from| p.created_at >= from)
            && self.to_date.is_none_or(|to| p.created_at <= to)
            && (self.tags.is_empty() || p.tags.iter().any(|t| self.tags.contains(t)))
    }
}
