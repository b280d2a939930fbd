//! News endpoints. Reads are public; create requires a session and
//! update/delete are owner-or-admin.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::models::CurrentUser;
use crate::auth::ownership::authorize_mutation;
use crate::domain::NewsId;
use crate::storage::repositories::{NewNews, News, UpdateNews};

fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateNewsBody {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Base64-encoded image
    pub photo: Option<String>,
    /// RFC 3339 timestamp; defaults to now
    pub published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNewsBody {
    pub title: Option<String>,
    pub content: Option<String>,
    #[serde(default, deserialize_with = "explicit_null")]
    pub photo: Option<Option<String>>,
    pub published_at: Option<String>,
}

/// Article as the client sees it; the photo travels as base64.
#[derive(Debug, Serialize)]
pub struct NewsResponse {
    pub id: String,
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    pub published_at: DateTime<Utc>,
    pub author_id: String,
    pub author_login: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<News> for NewsResponse {
    fn from(news: News) -> Self {
        Self {
            id: news.id.into_string(),
            title: news.title,
            content: news.content,
            photo: news.photo.map(|bytes| STANDARD.encode(bytes)),
            published_at: news.published_at,
            author_id: news.author_id.into_string(),
            author_login: news.author_login,
            created_at: news.created_at,
            updated_at: news.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn read_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn decode_photo(encoded: &str) -> Result<Vec<u8>, ApiError> {
    STANDARD.decode(encoded).map_err(|_| ApiError::bad_request("photo must be valid base64"))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::bad_request("published_at must be an RFC 3339 timestamp"))
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ApiError> {
    match value {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(ApiError::bad_request(format!("{} must not be empty", field))),
    }
}

#[instrument(skip(state), name = "http_list_news")]
pub async fn list_news(State(state): State<ApiState>) -> Result<Json<Vec<NewsResponse>>, ApiError> {
    let articles = state.news.list_news().await?;
    Ok(Json(articles.into_iter().map(NewsResponse::from).collect()))
}

#[instrument(skip(state), name = "http_get_news")]
pub async fn get_news(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<NewsResponse>, ApiError> {
    let id = NewsId::from_string(id);
    let article = state
        .news
        .get_news(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("news '{}' not found", id)))?;

    Ok(Json(article.into()))
}

#[instrument(skip(state, current, body), fields(author = %current.0.id), name = "http_create_news")]
pub async fn create_news(
    State(state): State<ApiState>,
    Extension(current): Extension<CurrentUser>,
    body: Result<Json<CreateNewsBody>, JsonRejection>,
) -> Result<(StatusCode, Json<NewsResponse>), ApiError> {
    let body = read_body(body)?;

    let title = required_text(body.title, "title")?;
    let content = required_text(body.content, "content")?;
    let photo = body.photo.as_deref().map(decode_photo).transpose()?;
    let published_at = match body.published_at.as_deref() {
        Some(raw) => parse_timestamp(raw)?,
        None => Utc::now(),
    };

    let article = state
        .news
        .create_news(NewNews {
            id: NewsId::new(),
            title,
            content,
            photo,
            published_at,
            author_id: current.0.id.clone(),
        })
        .await?;

    info!(news_id = %article.id, "Article created");
    Ok((StatusCode::CREATED, Json(article.into())))
}

#[instrument(skip(state, current, body), fields(requester = %current.0.id), name = "http_update_news")]
pub async fn update_news(
    State(state): State<ApiState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<UpdateNewsBody>, JsonRejection>,
) -> Result<Json<NewsResponse>, ApiError> {
    let body = read_body(body)?;
    let id = NewsId::from_string(id);

    let existing = state
        .news
        .get_news(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("news '{}' not found", id)))?;
    authorize_mutation(&existing.author_id, &current.0)?;

    if let Some(title) = &body.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("title must not be empty"));
        }
    }
    if let Some(content) = &body.content {
        if content.trim().is_empty() {
            return Err(ApiError::bad_request("content must not be empty"));
        }
    }

    let photo = match body.photo {
        Some(Some(encoded)) => Some(Some(decode_photo(&encoded)?)),
        Some(None) => Some(None),
        None => None,
    };
    let published_at = body.published_at.as_deref().map(parse_timestamp).transpose()?;

    let updated = state
        .news
        .update_news(
            &id,
            UpdateNews { title: body.title, content: body.content, photo, published_at },
        )
        .await?;

    info!(news_id = %id, "Article updated");
    Ok(Json(updated.into()))
}

#[instrument(skip(state, current), fields(requester = %current.0.id), name = "http_delete_news")]
pub async fn delete_news(
    State(state): State<ApiState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = NewsId::from_string(id);

    let existing = state
        .news
        .get_news(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("news '{}' not found", id)))?;
    authorize_mutation(&existing.author_id, &current.0)?;

    state.news.delete_news(&id).await?;
    info!(news_id = %id, "Article deleted");

    Ok(Json(MessageResponse { message: "News deleted".to_string() }))
}
