//! Cross-position analytics: gross exposure and grouped aggregates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::types::order::Qty;
use crate::types::position::{Direction, Greeks, Position};

/// Bucket used for positions whose grouping field is unset.
pub const UNKNOWN_BUCKET: &str = "unknown";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupBy {
    #[serde(rename = "symbol")]
    Symbol,
    #[serde(rename = "instrumentType")]
    InstrumentType,
    #[serde(rename = "productType")]
    ProductType,
    #[serde(rename = "strategy")]
    Strategy,
    #[serde(rename = "portfolio")]
    Portfolio,
}

impl GroupBy {
    pub fn as_str(self) -> &'static str {
        match self {
            GroupBy::Symbol => "symbol",
            GroupBy::InstrumentType => "instrumentType",
            GroupBy::ProductType => "productType",
            GroupBy::Strategy => "strategy",
            GroupBy::Portfolio => "portfolio",
        }
    }

    fn key_of(self, position: &Position) -> String {
        let key = match self {
            GroupBy::Symbol => Some(position.symbol.clone()),
            GroupBy::InstrumentType => Some(position.instrument_type.as_str().to_string()),
            GroupBy::ProductType => Some(position.product_type.as_str().to_string()),
            GroupBy::Strategy => position.strategy_id.clone(),
            GroupBy::Portfolio => position.portfolio_id.clone(),
        };
        match key {
            Some(k) if !k.is_empty() => k,
            _ => UNKNOWN_BUCKET.to_string(),
        }
    }
}

impl fmt::Display for GroupBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GroupBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "symbol" => Ok(GroupBy::Symbol),
            "instrumentType" => Ok(GroupBy::InstrumentType),
            "productType" => Ok(GroupBy::ProductType),
            "strategy" => Ok(GroupBy::Strategy),
            "portfolio" => Ok(GroupBy::Portfolio),
            other => Err(format!("invalid groupBy parameter '{}'", other)),
        }
    }
}

/// Per-bucket totals over the open and partial positions that share a grouping key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedPosition {
    pub key: String,
    pub group_by: GroupBy,
    pub position_count: usize,
    pub total_quantity: Qty,
    pub net_quantity: Qty,
    pub total_value: Decimal,
    pub net_value: Decimal,
    pub pnl: Decimal,
    pub greeks: Greeks,
}

impl AggregatedPosition {
    fn empty(key: String, group_by: GroupBy) -> Self {
        Self {
            key,
            group_by,
            position_count: 0,
            total_quantity: 0,
            net_quantity: 0,
            total_value: Decimal::ZERO,
            net_value: Decimal::ZERO,
            pnl: Decimal::ZERO,
            greeks: Greeks::default(),
        }
    }

    fn add(&mut self, position: &Position) -> Option<()> {
        let remaining = position.remaining_quantity();
        let value = position.notional_value()?;

        self.position_count += 1;
        self.total_quantity = self.total_quantity.checked_add(remaining)?;
        self.total_value = self.total_value.checked_add(value)?;
        match position.direction {
            Direction::Long => {
                self.net_quantity = self.net_quantity.checked_add(remaining)?;
                self.net_value = self.net_value.checked_add(value)?;
            }
            Direction::Short => {
                self.net_quantity = self.net_quantity.checked_sub(remaining)?;
                self.net_value = self.net_value.checked_sub(value)?;
            }
        }
        self.pnl = self.pnl.checked_add(position.total_pnl()?)?;
        self.greeks = self.greeks.checked_add(position.greeks)?;
        Some(())
    }
}

/// Entry notional of everything still held, shorts counted positive. `None` on overflow.
pub fn gross_exposure(positions: &[Position]) -> Option<Decimal> {
    positions
        .iter()
        .filter(|p| !p.is_closed())
        .try_fold(Decimal::ZERO, |total, p| total.checked_add(p.notional_value()?))
}

/// Group non-closed positions by `group_by`. Greeks and PnL are summed as stored on each position.
/// `None` if any bucket total overflows.
pub fn aggregate(
    positions: &[Position],
    group_by: GroupBy,
) -> Option<BTreeMap<String, AggregatedPosition>> {
    let mut buckets: BTreeMap<String, AggregatedPosition> = BTreeMap::new();
    for position in positions.iter().filter(|p| !p.is_closed()) {
        let key = group_by.key_of(position);
        buckets
            .entry(key.clone())
            .or_insert_with(|| AggregatedPosition::empty(key, group_by))
            .add(position)?;
    }
    Some(buckets)
}
