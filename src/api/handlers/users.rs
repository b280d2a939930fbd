//! User account endpoints. Reads are public; mutation is self-or-admin.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::Json;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::models::CurrentUser;
use crate::auth::ownership::authorize_mutation;
use crate::auth::user::{UpdateUser, User, UserSummary};
use crate::domain::UserId;

/// Distinguishes an absent field from an explicit `null` in PATCH-style
/// bodies: absent leaves the column alone, `null` clears it.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserBody {
    #[validate(length(min = 3, max = 64, message = "login must be 3 to 64 characters"))]
    pub login: Option<String>,
    #[validate(email(message = "email must be a valid address"))]
    pub email: Option<String>,
    pub profile: Option<serde_json::Value>,
    /// Base64-encoded image, or `null` to clear the stored one
    #[serde(default, deserialize_with = "explicit_null")]
    pub avatar: Option<Option<String>>,
    /// Admin only
    pub is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn read_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

fn decode_avatar(encoded: &str) -> Result<Vec<u8>, ApiError> {
    STANDARD.decode(encoded).map_err(|_| ApiError::bad_request("avatar must be valid base64"))
}

#[instrument(skip(state), name = "http_get_user")]
pub async fn get_user(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<UserSummary>, ApiError> {
    let id = UserId::from_string(id);
    let user = state
        .users
        .get_user(&id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("user '{}' not found", id)))?;

    Ok(Json(UserSummary::from(&user)))
}

#[instrument(skip(state, current, body), fields(requester = %current.0.id), name = "http_update_user")]
pub async fn update_user(
    State(state): State<ApiState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
    body: Result<Json<UpdateUserBody>, JsonRejection>,
) -> Result<Json<UserSummary>, ApiError> {
    let body = read_body(body)?;
    body.validate().map_err(crate::errors::Error::from)?;

    let id = UserId::from_string(id);
    authorize_mutation(&id, &current.0)?;

    if body.is_active.is_some() && !current.0.role.is_admin() {
        return Err(ApiError::forbidden("Only admins may change account activation"));
    }

    let avatar = match body.avatar {
        Some(Some(encoded)) => Some(Some(decode_avatar(&encoded)?)),
        Some(None) => Some(None),
        None => None,
    };

    let updated = state
        .users
        .update_user(
            &id,
            UpdateUser {
                login: body.login,
                email: body.email.map(|e| User::normalize_email(&e)),
                profile: body.profile,
                avatar,
                is_active: body.is_active,
            },
        )
        .await?;

    info!(user_id = %id, "Account updated");
    Ok(Json(UserSummary::from(&updated)))
}

#[instrument(skip(state, current), fields(requester = %current.0.id), name = "http_delete_user")]
pub async fn delete_user(
    State(state): State<ApiState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let id = UserId::from_string(id);
    authorize_mutation(&id, &current.0)?;

    state.users.delete_user(&id).await?;
    info!(user_id = %id, "Account deleted");

    Ok(Json(MessageResponse { message: "User deleted".to_string() }))
}
