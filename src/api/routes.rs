use axum::{
    Router,
    routing::{get, post, put},
};

use crate::api::handlers;
use crate::positions::PositionService;
use crate::valuation::StaticPriceSource;

/// Shared state for all handlers.
#[derive(Clone)]
pub struct AppState {
    pub positions: PositionService,
    /// The price source behind `positions`, exposed so marks can be set over HTTP.
    pub marks: StaticPriceSource,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/positions", get(handlers::list_positions))
        .route(
            "/positions/from-order",
            post(handlers::create_position_from_order),
        )
        .route("/positions/exposure", get(handlers::exposure))
        .route("/positions/aggregate", get(handlers::aggregate))
        .route(
            "/positions/{id}",
            get(handlers::get_position).put(handlers::update_position),
        )
        .route("/positions/{id}/close", post(handlers::close_position))
        .route("/positions/{id}/pnl", get(handlers::position_pnl))
        .route("/positions/{id}/greeks", get(handlers::position_greeks))
        .route("/prices/{symbol}", put(handlers::set_price))
        .with_state(state)
}
