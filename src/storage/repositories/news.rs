//! News article persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::domain::{NewsId, UserId};
use crate::errors::{Error, Result};
use crate::storage::DbPool;

/// A news article joined with its author's login for display.
#[derive(Debug, Clone)]
pub struct News {
    pub id: NewsId,
    pub title: String,
    pub content: String,
    pub photo: Option<Vec<u8>>,
    pub published_at: DateTime<Utc>,
    pub author_id: UserId,
    pub author_login: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNews {
    pub id: NewsId,
    pub title: String,
    pub content: String,
    pub photo: Option<Vec<u8>>,
    pub published_at: DateTime<Utc>,
    pub author_id: UserId,
}

#[derive(Debug, Clone, Default)]
pub struct UpdateNews {
    pub title: Option<String>,
    pub content: Option<String>,
    pub photo: Option<Option<Vec<u8>>>,
    pub published_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait NewsRepository: Send + Sync {
    async fn create_news(&self, new_news: NewNews) -> Result<News>;
    async fn get_news(&self, id: &NewsId) -> Result<Option<News>>;

    /// All articles, newest publication first.
    async fn list_news(&self) -> Result<Vec<News>>;
    async fn update_news(&self, id: &NewsId, update: UpdateNews) -> Result<News>;
    async fn delete_news(&self, id: &NewsId) -> Result<()>;
}

pub struct SqlxNewsRepository {
    pool: DbPool,
}

impl SqlxNewsRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct NewsRow {
    id: String,
    title: String,
    content: String,
    photo: Option<Vec<u8>>,
    published_at: DateTime<Utc>,
    author_id: String,
    author_login: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_news(row: NewsRow) -> News {
    News {
        id: NewsId::from_string(row.id),
        title: row.title,
        content: row.content,
        photo: row.photo,
        published_at: row.published_at,
        author_id: UserId::from_string(row.author_id),
        author_login: row.author_login,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

const SELECT_NEWS: &str = "SELECT n.id, n.title, n.content, n.photo, n.published_at, n.author_id, u.login AS author_login, n.created_at, n.updated_at FROM news n JOIN users u ON u.id = n.author_id";

#[async_trait]
impl NewsRepository for SqlxNewsRepository {
    #[instrument(skip(self, new_news), fields(author_id = %new_news.author_id), name = "db_create_news")]
    async fn create_news(&self, new_news: NewNews) -> Result<News> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO news (id, title, content, photo, published_at, author_id, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(new_news.id.as_str())
        .bind(&new_news.title)
        .bind(&new_news.content)
        .bind(&new_news.photo)
        .bind(new_news.published_at)
        .bind(new_news.author_id.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to create news article"))?;

        self.get_news(&new_news.id)
            .await?
            .ok_or_else(|| Error::internal("News article disappeared immediately after insert"))
    }

    #[instrument(skip(self), fields(news_id = %id), name = "db_get_news")]
    async fn get_news(&self, id: &NewsId) -> Result<Option<News>> {
        let row = sqlx::query_as::<_, NewsRow>(&format!("{} WHERE n.id = $1", SELECT_NEWS))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to fetch news article"))?;

        Ok(row.map(row_to_news))
    }

    #[instrument(skip(self), name = "db_list_news")]
    async fn list_news(&self) -> Result<Vec<News>> {
        let rows =
            sqlx::query_as::<_, NewsRow>(&format!("{} ORDER BY n.published_at DESC", SELECT_NEWS))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| Error::database(e, "Failed to list news articles"))?;

        Ok(rows.into_iter().map(row_to_news).collect())
    }

    #[instrument(skip(self, update), fields(news_id = %id), name = "db_update_news")]
    async fn update_news(&self, id: &NewsId, update: UpdateNews) -> Result<News> {
        let existing = self
            .get_news(id)
            .await?
            .ok_or_else(|| Error::not_found("news", id.as_str()))?;

        let title = update.title.unwrap_or(existing.title);
        let content = update.content.unwrap_or(existing.content);
        let photo = update.photo.unwrap_or(existing.photo);
        let published_at = update.published_at.unwrap_or(existing.published_at);

        sqlx::query(
            "UPDATE news SET title = $1, content = $2, photo = $3, published_at = $4, updated_at = $5 WHERE id = $6",
        )
        .bind(&title)
        .bind(&content)
        .bind(&photo)
        .bind(published_at)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to update news article"))?;

        self.get_news(id)
            .await?
            .ok_or_else(|| Error::not_found("news", id.as_str()))
    }

    #[instrument(skip(self), fields(news_id = %id), name = "db_delete_news")]
    async fn delete_news(&self, id: &NewsId) -> Result<()> {
        let result = sqlx::query("DELETE FROM news WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to delete news article"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("news", id.as_str()));
        }

        Ok(())
    }
}
