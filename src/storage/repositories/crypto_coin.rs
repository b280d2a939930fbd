//! Cryptocurrency listing persistence. Read-only over REST, like exchanges.

use async_trait::async_trait;
use sqlx::FromRow;
use tracing::instrument;

use crate::domain::CoinId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;

/// A listed coin and its trading pair (for example "BTC/USDT").
#[derive(Debug, Clone)]
pub struct CryptoCoin {
    pub id: CoinId,
    pub name: String,
    pub pair: String,
}

#[derive(Debug, Clone)]
pub struct NewCryptoCoin {
    pub id: CoinId,
    pub name: String,
    pub pair: String,
}

#[async_trait]
pub trait CryptoCoinRepository: Send + Sync {
    async fn create_coin(&self, new_coin: NewCryptoCoin) -> Result<CryptoCoin>;
    async fn get_coin(&self, id: &CoinId) -> Result<Option<CryptoCoin>>;
    async fn list_coins(&self) -> Result<Vec<CryptoCoin>>;
}

pub struct SqlxCryptoCoinRepository {
    pool: DbPool,
}

impl SqlxCryptoCoinRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct CoinRow {
    id: String,
    name: String,
    pair: String,
}

fn row_to_coin(row: CoinRow) -> CryptoCoin {
    CryptoCoin { id: CoinId::from_string(row.id), name: row.name, pair: row.pair }
}

#[async_trait]
impl CryptoCoinRepository for SqlxCryptoCoinRepository {
    #[instrument(skip(self, new_coin), fields(pair = %new_coin.pair), name = "db_create_coin")]
    async fn create_coin(&self, new_coin: NewCryptoCoin) -> Result<CryptoCoin> {
        sqlx::query("INSERT INTO crypto_coins (id, name, pair) VALUES ($1, $2, $3)")
            .bind(new_coin.id.as_str())
            .bind(&new_coin.name)
            .bind(&new_coin.pair)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if let sqlx::Error::Database(ref db) = e {
                    if db.is_unique_violation() {
                        return Error::conflict("Trading pair already listed", "crypto_coin");
                    }
                }
                Error::database(e, "Failed to create coin")
            })?;

        self.get_coin(&new_coin.id)
            .await?
            .ok_or_else(|| Error::internal("Coin disappeared immediately after insert"))
    }

    #[instrument(skip(self), fields(coin_id = %id), name = "db_get_coin")]
    async fn get_coin(&self, id: &CoinId) -> Result<Option<CryptoCoin>> {
        let row =
            sqlx::query_as::<_, CoinRow>("SELECT id, name, pair FROM crypto_coins WHERE id = $1")
                .bind(id.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| Error::database(e, "Failed to fetch coin"))?;

        Ok(row.map(row_to_coin))
    }

    #[instrument(skip(self), name = "db_list_coins")]
    async fn list_coins(&self) -> Result<Vec<CryptoCoin>> {
        let rows =
            sqlx::query_as::<_, CoinRow>("SELECT id, name, pair FROM crypto_coins ORDER BY name")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::database(e, "Failed to list coins"))?;

        Ok(rows.into_iter().map(row_to_coin).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn repository() -> SqlxCryptoCoinRepository {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        SqlxCryptoCoinRepository::new(pool)
    }

    #[tokio::test]
    async fn duplicate_pair_is_a_conflict() {
        let repo = repository().await;
        repo.create_coin(NewCryptoCoin {
            id: CoinId::new(),
            name: "Bitcoin".into(),
            pair: "BTC/USDT".into(),
        })
        .await
        .unwrap();

        let err = repo
            .create_coin(NewCryptoCoin {
                id: CoinId::new(),
                name: "Bitcoin Again".into(),
                pair: "BTC/USDT".into(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Conflict { .. }));
    }

    #[tokio::test]
    async fn listing_returns_all_coins() {
        let repo = repository().await;
        for (name, pair) in [("Ethereum", "ETH/USDT"), ("Bitcoin", "BTC/USDT")] {
            repo.create_coin(NewCryptoCoin { id: CoinId::new(), name: name.into(), pair: pair.into() })
                .await
                .unwrap();
        }

        let names: Vec<String> =
            repo.list_coins().await.unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Bitcoin", "Ethereum"]);
    }
}
