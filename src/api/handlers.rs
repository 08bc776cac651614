use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregation::AggregatedPosition;
use crate::api::error::ApiError;
use crate::api::routes::AppState;
use crate::types::instrument::{InstrumentType, ProductType};
use crate::types::order::{Order, Price, Qty};
use crate::types::position::{Direction, Greeks, Position, PositionFilter, PositionStatus};

pub async fn health() -> &'static str {
    "healthy"
}

pub async fn create_position_from_order(
    State(state): State<AppState>,
    Json(order): Json<Order>,
) -> Result<(StatusCode, Json<Position>), ApiError> {
    let position = state.positions.create_position_from_order(&order).await?;
    Ok((StatusCode::CREATED, Json(position)))
}

/// Query string for `GET /positions`. `tags` is comma separated.
#[derive(Debug, Default, Deserialize)]
pub struct ListPositionsQuery {
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
    pub tags: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ListPositionsQuery {
    fn filter(&self) -> PositionFilter {
        PositionFilter {
            user_id: self.user_id,
            symbol: self.symbol.clone(),
            status: self.status,
            direction: self.direction,
            product_type: self.product_type,
            instrument_type: self.instrument_type,
            portfolio_id: self.portfolio_id.clone(),
            strategy_id: self.strategy_id.clone(),
            order_id: self.order_id,
            from_date: self.from_date,
            to_date: self.to_date,
            tags: self
                .tags
                .as_deref()
                .map(|t| {
                    t.split(',')
                        .map(str::trim)
                        .filter(|t| !t.is_empty())
                        .map(String::from)
                        .collect()
                })
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListPositionsResponse {
    pub positions: Vec<Position>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub has_next_page: bool,
}

pub async fn list_positions(
    State(state): State<AppState>,
    Query(query): Query<ListPositionsQuery>,
) -> Result<Json<ListPositionsResponse>, ApiError> {
    let page = state
        .positions
        .get_positions(&query.filter(), query.page.unwrap_or(1), query.limit.unwrap_or(0))
        .await?;
    Ok(Json(ListPositionsResponse {
        total_pages: page.total.div_ceil(page.limit),
        has_next_page: page.page * page.limit < page.total,
        positions: page.positions,
        total: page.total,
        page: page.page,
        limit: page.limit,
    }))
}

pub async fn get_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Position>, ApiError> {
    Ok(Json(state.positions.get_position_by_id(id).await?))
}

pub async fn update_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(mut position): Json<Position>,
) -> Result<Json<Position>, ApiError> {
    position.id = id;
    Ok(Json(state.positions.update_position(position).await?))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClosePositionRequest {
    pub exit_price: Price,
    /// Total exited so far, including earlier partial exits.
    pub exit_quantity: Qty,
}

pub async fn close_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClosePositionRequest>,
) -> Result<Json<Position>, ApiError> {
    Ok(Json(
        state
            .positions
            .close_position(id, req.exit_price, req.exit_quantity)
            .await?,
    ))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PnlResponse {
    pub position_id: Uuid,
    pub pnl: Decimal,
}

pub async fn position_pnl(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<PnlResponse>, ApiError> {
    let position = state.positions.get_position_by_id(id).await?;
    let pnl = state.positions.calculate_pnl(&position).await?;
    Ok(Json(PnlResponse {
        position_id: id,
        pnl,
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GreeksResponse {
    pub position_id: Uuid,
    pub greeks: Greeks,
}

pub async fn position_greeks(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<GreeksResponse>, ApiError> {
    let position = state.positions.get_position_by_id(id).await?;
    let greeks = state.positions.calculate_greeks(&position)?;
    Ok(Json(GreeksResponse {
        position_id: id,
        greeks,
    }))
}

#[derive(Debug, Deserialize)]
pub struct ExposureQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ExposureResponse {
    pub user_id: Option<Uuid>,
    pub exposure: Decimal,
}

/// Gross exposure across every open or partial position of the user.
pub async fn exposure(
    State(state): State<AppState>,
    Query(query): Query<ExposureQuery>,
) -> Result<Json<ExposureResponse>, ApiError> {
    let filter = PositionFilter {
        user_id: query.user_id,
        ..Default::default()
    };
    let positions = state.positions.get_all_positions(&filter).await?;
    Ok(Json(ExposureResponse {
        user_id: query.user_id,
        exposure: state.positions.calculate_exposure(&positions)?,
    }))
}

#[derive(Debug, Deserialize)]
pub struct AggregateQuery {
    pub user_id: Option<Uuid>,
    pub group_by: Option<String>,
}

pub async fn aggregate(
    State(state): State<AppState>,
    Query(query): Query<AggregateQuery>,
) -> Result<Json<Vec<AggregatedPosition>>, ApiError> {
    let group_by = query.group_by.as_deref().unwrap_or("symbol");
    let filter = PositionFilter {
        user_id: query.user_id,
        ..Default::default()
    };
    let positions = state.positions.get_all_positions(&filter).await?;
    let buckets = state.positions.aggregate_positions(&positions, group_by)?;
    Ok(Json(buckets.into_values().collect()))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SetPriceRequest {
    pub price: Price,
}

pub async fn set_price(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Json(req): Json<SetPriceRequest>,
) -> Result<StatusCode, ApiError> {
    if req.price <= Decimal::ZERO {
        return Err(ApiError::bad_request("price must be greater than zero"));
    }
    state.marks.set_price(&symbol, req.price).await;
    Ok(StatusCode::NO_CONTENT)
}
