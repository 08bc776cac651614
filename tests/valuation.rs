//! Price source and Greeks model behaviour.

mod common;

use common::{option_position, stock_position};
use position_engine::types::instrument::{InstrumentType, OptionType};
use position_engine::types::position::{Direction, Greeks};
use position_engine::valuation::{
    GreeksModel, PriceSource, SimpleGreeksModel, StaticPriceSource, ValuationError,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

#[tokio::test]
async fn static_prices_are_case_insensitive() {
    let prices = StaticPriceSource::with_prices([("reliance", dec!(2500))]);
    assert_eq!(prices.current_price("RELIANCE").await.unwrap(), dec!(2500));

    prices.set_price("Tcs", dec!(3500.5)).await;
    assert_eq!(prices.current_price("tcs").await.unwrap(), dec!(3500.5));

    prices.set_price("TCS", dec!(3400)).await;
    assert_eq!(prices.current_price("TCS").await.unwrap(), dec!(3400));
}

#[tokio::test]
async fn missing_price_is_an_error() {
    let prices = StaticPriceSource::new();
    assert_eq!(
        prices.current_price("INFY").await.unwrap_err(),
        ValuationError::PriceUnavailable("INFY".to_string())
    );
}

#[test]
fn option_delta_depends_on_type_and_side() {
    let model = SimpleGreeksModel;
    let cases = [
        (OptionType::Call, Direction::Long, dec!(6)),
        (OptionType::Call, Direction::Short, dec!(-6)),
        (OptionType::Put, Direction::Long, dec!(-4)),
        (OptionType::Put, Direction::Short, dec!(4)),
    ];
    for (option_type, direction, delta) in cases {
        let p = option_position(option_type, direction, dec!(100), 10);
        let g = model.greeks(&p).unwrap();
        assert_eq!(g.delta, delta, "{} {}", option_type, direction);
        assert_eq!(g.gamma, dec!(0.5));
        assert_eq!(g.theta, dec!(-1));
        assert_eq!(g.vega, dec!(2));
    }
}

#[test]
fn greeks_scale_with_remaining_quantity() {
    let mut p = option_position(OptionType::Call, Direction::Long, dec!(100), 10);
    p.exit_quantity = 5;
    let g = SimpleGreeksModel.greeks(&p).unwrap();
    assert_eq!(g.delta, dec!(3));
    assert_eq!(g.gamma, dec!(0.25));

    p.exit_quantity = 10;
    assert_eq!(SimpleGreeksModel.greeks(&p).unwrap(), Greeks::default());
}

#[test]
fn non_options_are_delta_one() {
    let long = stock_position("RELIANCE", Direction::Long, dec!(100), 7);
    let g = SimpleGreeksModel.greeks(&long).unwrap();
    assert_eq!(g.delta, dec!(7));
    assert_eq!(g.gamma, Decimal::ZERO);
    assert_eq!(g.theta, Decimal::ZERO);
    assert_eq!(g.vega, Decimal::ZERO);

    let mut future = stock_position("NIFTYFUT", Direction::Short, dec!(22000), 3);
    future.instrument_type = InstrumentType::Future;
    assert_eq!(SimpleGreeksModel.greeks(&future).unwrap().delta, dec!(-3));
}

#[test]
fn option_without_type_cannot_be_valued() {
    let mut p = option_position(OptionType::Call, Direction::Long, dec!(100), 10);
    p.option_type = None;
    assert!(matches!(
        SimpleGreeksModel.greeks(&p),
        Err(ValuationError::Greeks(_))
    ));
}
