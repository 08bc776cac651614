//! Valuation collaborators: where current prices and Greeks come from.
//!
//! The service never prices anything itself. It asks a `PriceSource` for the mark
//! and a `GreeksModel` for sensitivities, so a real pricing engine can replace
//! `SimpleGreeksModel` without touching the lifecycle code.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::types::instrument::{InstrumentType, OptionType};
use crate::types::order::Price;
use crate::types::position::{Direction, Greeks, Position};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValuationError {
    #[error("no price available for symbol {0}")]
    PriceUnavailable(String),

    #[error("cannot compute greeks: {0}")]
    Greeks(String),

    #[error("arithmetic overflow computing {0}")]
    Overflow(String),
}

/// Supplies the mark used for unrealized PnL.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn current_price(&self, symbol: &str) -> Result<Price, ValuationError>;
}

/// Computes risk sensitivities for a position, scaled by its remaining quantity.
pub trait GreeksModel: Send + Sync {
    fn greeks(&self, position: &Position) -> Result<Greeks, ValuationError>;
}

/// Marks held in memory, keyed by upper-cased symbol.
#[derive(Clone, Default)]
pub struct StaticPriceSource {
    prices: Arc<RwLock<HashMap<String, Price>>>,
}

impl StaticPriceSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prices<I, S>(prices: I) -> Self
    where
        I: IntoIterator<Item = (S, Price)>,
        S: AsRef<str>,
    {
        let map = prices
            .into_iter()
            .map(|(symbol, price)| (symbol.as_ref().to_uppercase(), price))
            .collect();
        Self {
            prices: Arc::new(RwLock::new(map)),
        }
    }

    pub async fn set_price(&self, symbol: &str, price: Price) {
        self.prices
            .write()
            .await
            .insert(symbol.to_uppercase(), price);
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn current_price(&self, symbol: &str) -> Result<Price, ValuationError> {
        self.prices
            .read()
            .await
            .get(&symbol.to_uppercase())
            .copied()
            .ok_or_else(|| ValuationError::PriceUnavailable(symbol.to_string()))
    }
}

const OPTION_GAMMA: Decimal = dec!(0.05);
const OPTION_THETA: Decimal = dec!(-0.1);
const OPTION_VEGA: Decimal = dec!(0.2);
const CALL_DELTA: Decimal = dec!(0.6);
const PUT_DELTA: Decimal = dec!(0.4);

/// Fixed per-unit sensitivities. Not a pricing model.
///
/// Options: delta is +0.6 for long calls and -0.6 for short calls, -0.4 for long
/// puts and +0.4 for short puts; gamma, theta and vega do not depend on the side.
/// Everything else is delta one in the direction of the position.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleGreeksModel;

impl SimpleGreeksModel {
    fn unit_greeks(position: &Position) -> Result<Greeks, ValuationError> {
        if position.instrument_type != InstrumentType::Option {
            return Ok(Greeks {
                delta: position.direction.sign(),
                ..Greeks::default()
            });
        }

        let delta = match (position.option_type, position.direction) {
            (Some(OptionType::Call), Direction::Long) => CALL_DELTA,
            (Some(OptionType::Call), Direction::Short) => -CALL_DELTA,
            (Some(OptionType::Put), Direction::Long) => -PUT_DELTA,
            (Some(OptionType::Put), Direction::Short) => PUT_DELTA,
            (None, _) => {
                return Err(ValuationError::Greeks(format!(
                    "option position {} has no option type",
                    position.id
                )));
            }
        };

        Ok(Greeks {
            delta,
            gamma: OPTION_GAMMA,
            theta: OPTION_THETA,
            vega: OPTION_VEGA,
        })
    }
}

impl GreeksModel for SimpleGreeksModel {
    fn greeks(&self, position: &Position) -> Result<Greeks, ValuationError> {
        Self::unit_greeks(position)?
            .scaled(position.remaining_quantity())
            .ok_or_else(|| ValuationError::Overflow(format!("greeks of position {}", position.id)))
    }
}
