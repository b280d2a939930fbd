//! Account lifecycle endpoints: register, login, refresh, logout, profile,
//! and email confirmation.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};
use validator::Validate;

use crate::api::error::ApiError;
use crate::api::routes::ApiState;
use crate::auth::confirmation::ConfirmationError;
use crate::auth::hashing::hash_password;
use crate::auth::models::CurrentUser;
use crate::auth::session::TokenPair;
use crate::auth::user::{NewUser, Role, User, UserSummary};
use crate::domain::UserId;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterBody {
    #[validate(length(min = 3, max = 64, message = "login must be 3 to 64 characters"))]
    pub login: String,
    #[validate(email(message = "email must be a valid address"))]
    pub email: String,
    #[validate(length(min = 8, max = 128, message = "password must be 8 to 128 characters"))]
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginBody {
    #[validate(length(min = 1, message = "login_or_email must not be empty"))]
    pub login_or_email: String,
    #[validate(length(min = 1, message = "password must not be empty"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RefreshBody {
    pub refresh_token: String,
}

/// Account summary plus the freshly minted token pair.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserSummary,
    #[serde(flatten)]
    pub tokens: TokenPair,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

fn read_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    body.map(|Json(value)| value).map_err(|rejection| ApiError::bad_request(rejection.body_text()))
}

#[instrument(skip(state, body), name = "http_register")]
pub async fn register(
    State(state): State<ApiState>,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let body = read_body(body)?;
    body.validate().map_err(crate::errors::Error::from)?;

    let role = match body.role.as_deref() {
        Some(raw) => raw.parse::<Role>().map_err(ApiError::from)?,
        None => Role::User,
    };
    let email = User::normalize_email(&body.email);

    // Pre-checks give the caller a field-specific message; the unique indexes
    // still back this up under concurrency.
    if state.users.find_by_login(&body.login).await?.is_some() {
        return Err(ApiError::bad_request("Login already exists"));
    }
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError::bad_request("Email already exists"));
    }

    let require_confirmation = state.config.auth.require_email_confirmation;
    let user = state
        .users
        .create_user(NewUser {
            id: UserId::new(),
            login: body.login.clone(),
            email: email.clone(),
            password_hash: hash_password(&body.password)?,
            role,
            is_active: !require_confirmation,
            profile: serde_json::json!({}),
        })
        .await?;

    if require_confirmation {
        // Email delivery is an external concern; the token is logged so
        // operators can hand it out while no mailer is wired up.
        let token = state.confirmations.sign(&email, Utc::now());
        info!(user_id = %user.id, confirmation_token = %token, "Account awaiting email confirmation");
    }

    let tokens = state.sessions.issue(&user).await?;
    info!(user_id = %user.id, login = %user.login, "Account registered");

    Ok((StatusCode::CREATED, Json(AuthResponse { user: UserSummary::from(&user), tokens })))
}

#[instrument(skip(state, body), name = "http_login")]
pub async fn login(
    State(state): State<ApiState>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let body = read_body(body)?;
    body.validate().map_err(crate::errors::Error::from)?;

    let user = state
        .verifier
        .authenticate(&body.login_or_email, &body.password)
        .await?
        .ok_or_else(|| ApiError::unauthorized("Invalid credentials"))?;

    if !user.is_active {
        return Err(ApiError::forbidden("Email address has not been confirmed"));
    }

    let tokens = state.sessions.issue(&user).await?;
    info!(user_id = %user.id, "Login succeeded");

    Ok(Json(AuthResponse { user: UserSummary::from(&user), tokens }))
}

#[instrument(skip(state, body), name = "http_refresh")]
pub async fn refresh(
    State(state): State<ApiState>,
    body: Result<Json<RefreshBody>, JsonRejection>,
) -> Result<Json<TokenPair>, ApiError> {
    let body = read_body(body)?;
    if body.refresh_token.is_empty() {
        return Err(ApiError::bad_request("refresh_token must not be empty"));
    }

    let (_, tokens) = state.sessions.refresh(&body.refresh_token).await?;
    Ok(Json(tokens))
}

#[instrument(skip_all, fields(user_id = %current.0.id), name = "http_logout")]
pub async fn logout(
    State(state): State<ApiState>,
    Extension(current): Extension<CurrentUser>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.sessions.revoke(&current.0).await?;
    Ok(Json(MessageResponse { message: "Logged out".to_string() }))
}

#[instrument(skip_all, fields(user_id = %current.0.id), name = "http_profile")]
pub async fn profile(
    Extension(current): Extension<CurrentUser>,
) -> Json<UserSummary> {
    Json(UserSummary::from(&current.0))
}

#[instrument(skip(state, token), name = "http_confirm_email")]
pub async fn confirm(
    State(state): State<ApiState>,
    Path(token): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = state.confirmations.verify(&token, Utc::now()).map_err(|e| match e {
        ConfirmationError::Expired => ApiError::bad_request("Confirmation token has expired"),
        ConfirmationError::Invalid => ApiError::bad_request("Confirmation token is invalid"),
    })?;

    // Re-confirming an already-active account lands here too and succeeds.
    if !state.users.activate_by_email(&email).await? {
        return Err(ApiError::not_found("No account with that email address"));
    }

    info!("Email address confirmed");
    Ok(Json(MessageResponse { message: "Email confirmed".to_string() }))
}
