//! Exchange listing persistence. The REST surface is read-only; writes come
//! from out-of-band tooling and the test suite.

use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

use crate::domain::ExchangeId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;

/// An exchange listing. Volume and rating are decimal strings; they are
/// stored and served verbatim so no precision is lost in transit.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub id: ExchangeId,
    pub name: String,
    pub trading_volume: String,
    pub coins_listed: i64,
    pub rating: String,
}

#[derive(Debug, Clone)]
pub struct NewExchange {
    pub id: ExchangeId,
    pub name: String,
    pub trading_volume: String,
    pub coins_listed: i64,
    pub rating: String,
}

#[async_trait]
pub trait ExchangeRepository: Send + Sync {
    async fn create_exchange(&self, new_exchange: NewExchange) -> Result<Exchange>;
    async fn get_exchange(&self, id: &ExchangeId) -> Result<Option<Exchange>>;
    async fn list_exchanges(&self) -> Result<Vec<Exchange>>;
}

pub struct SqlxExchangeRepository {
    pool: DbPool,
}

impl SqlxExchangeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct ExchangeRow {
    id: String,
    name: String,
    trading_volume: String,
    coins_listed: i64,
    rating: String,
}

fn row_to_exchange(row: ExchangeRow) -> Exchange {
    Exchange {
        id: ExchangeId::from_string(row.id),
        name: row.name,
        trading_volume: row.trading_volume,
        coins_listed: row.coins_listed,
        rating: row.rating,
    }
}

#[async_trait]
impl ExchangeRepository for SqlxExchangeRepository {
    #[instrument(skip(self, new_exchange), fields(name = %new_exchange.name), name = "db_create_exchange")]
    async fn create_exchange(&self, new_exchange: NewExchange) -> Result<Exchange> {
        sqlx::query(
            "INSERT INTO exchanges (id, name, trading_volume, coins_listed, rating) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(new_exchange.id.as_str())
        .bind(&new_exchange.name)
        .bind(&new_exchange.trading_volume)
        .bind(new_exchange.coins_listed)
        .bind(&new_exchange.rating)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to create exchange"))?;

        self.get_exchange(&new_exchange.id)
            .await?
            .ok_or_else(|| Error::internal("Exchange disappeared immediately after insert"))
    }

    #[instrument(skip(self), fields(exchange_id = %id), name = "db_get_exchange")]
    async fn get_exchange(&self, id: &ExchangeId) -> Result<Option<Exchange>> {
        let row = sqlx::query_as::<_, ExchangeRow>(
            "SELECT id, name, trading_volume, coins_listed, rating FROM exchanges WHERE id = $1",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to fetch exchange"))?;

        Ok(row.map(row_to_exchange))
    }

    #[instrument(skip(self), name = "db_list_exchanges")]
    async fn list_exchanges(&self) -> Result<Vec<Exchange>> {
        let rows = sqlx::query_as::<_, ExchangeRow>(
            "SELECT id, name, trading_volume, coins_listed, rating FROM exchanges ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to list exchanges"))?;

        Ok(rows.into_iter().map(row_to_exchange).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn repository() -> SqlxExchangeRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        SqlxExchangeRepository::new(pool)
    }

    #[tokio::test]
    async fn decimal_strings_survive_round_trip() {
        let repo = repository().await;
        let created = repo
            .create_exchange(NewExchange {
                id: ExchangeId::new(),
                name: "Binance".into(),
                trading_volume: "12345678901.123456789".into(),
                coins_listed: 350,
                rating: "9.9".into(),
            })
            .await
            .unwrap();

        let fetched = repo.get_exchange(&created.id).await.unwrap().unwrap();
        assert_eq!(fetched.trading_volume, "12345678901.123456789");
        assert_eq!(fetched.rating, "9.9");
        assert_eq!(fetched.coins_listed, 350);
    }

    #[tokio::test]
    async fn listing_is_sorted_by_name() {
        let repo = repository().await;
        for name in ["Kraken", "Binance"] {
            repo.create_exchange(NewExchange {
                id: ExchangeId::new(),
                name: name.into(),
                trading_volume: "1.0".into(),
                coins_listed: 10,
                rating: "5.0".into(),
            })
            .await
            .unwrap();
        }

        let names: Vec<String> =
            repo.list_exchanges().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["Binance", "Kraken"]);
    }
}
