//! Cryptocurrency listing endpoints, read-only.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::instrument;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::domain::CoinId;
use crate::storage::repositories::CryptoCoin;

#[derive(Debug, Serialize)]
pub struct CoinResponse {
    pub id: String,
    pub name: String,
    pub pair: String,
}

impl From<CryptoCoin> for CoinResponse {
    fn from(coin: CryptoCoin) -> Self {
        Self { id: coin.id.into_string(), name: coin.name, pair: coin.pair }
    }
}

#[instrument(skip(state), name = "http_list_coins")]
pub async fn list_coins(State(state): State<ApiState>) -> Result<Json<Vec<CoinResponse>>, ApiError> {
    let coins = state.coins.list_coins().await?;
    Ok(Json(coins.into_iter().map(CoinResponse::from).collect()))
}

#[instrument(skip(state), name = "http_get_coin")]
pub async fn get_coin(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<CoinResponse>, ApiError> {
    let id = CoinId::from_string(id);
    let coin = state
        .coins
        .get_coin(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("cryptocurrency '{}' not found", id)))?;

    Ok(Json(coin.into()))
}
