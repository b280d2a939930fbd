//! Exchange listing endpoints, read-only.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::domain::ExchangeId;
use crate::storage::repositories::Exchange;

/// Decimals stay strings end to end so clients see exactly what was stored.
#[derive(Debug, Serialize)]
pub struct ExchangeResponse {
    pub id: String,
    pub name: String,
    pub trading_volume: String,
    pub coins_listed: i64,
    pub rating: String,
}

impl From<Exchange> for ExchangeResponse {
    fn from(exchange: Exchange) -> Self {
        Self {
            id: exchange.id.into_string(),
            name: exchange.name,
            trading_volume: exchange.trading_volume,
            coins_listed: exchange.coins_listed,
            rating: exchange.rating,
        }
    }
}

#[instrument(skip(state), name = "http_list_exchanges")]
pub async fn list_exchanges(
    State(state): State<ApiState>,
) -> Result<Json<Vec<ExchangeResponse>>, ApiError> {
    let exchanges = state.exchanges.list_exchanges().await?;
    Ok(Json(exchanges.into_iter().map(ExchangeResponse::from).collect()))
}

#[instrument(skip(state), name = "http_get_exchange")]
pub async fn get_exchange(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ExchangeResponse>, ApiError> {
    let id = ExchangeId::from_string(id);
    let exchange = state
        .exchanges
        .get_exchange(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("exchange '{}' not found", id)))?;

    Ok(Json(exchange.into()))
}
