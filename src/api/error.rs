//! HTTP-facing error type.
//!
//! Every failure leaves the process as `{ "error": <stable code>, "message":
//! <reason> }`. Internal details are logged server-side; the client only sees
//! the short reason.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use tracing::error;

use crate::auth::models::AuthError;
use crate::errors::{AuthErrorType, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request<S: Into<String>>(message: S) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found<S: Into<String>>(message: S) -> Self {
        Self::NotFound(message.into())
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Unauthorized(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::NotFound(_) => "not_found",
            ApiError::Internal(_) => "internal_error",
        }
    }

    fn message(&self) -> &str {
        match self {
            ApiError::BadRequest(m)
            | ApiError::Unauthorized(m)
            | ApiError::Forbidden(m)
            | ApiError::NotFound(m)
            | ApiError::Internal(m) => m,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'static str,
    message: &'a str,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody { error: self.code(), message: self.message() };
        (self.status(), Json(body)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::Validation(message) => ApiError::BadRequest(message),
            Error::Serialization { context, .. } => ApiError::BadRequest(context),
            // Duplicate unique fields surface as 400 on this API, not 409.
            Error::Conflict { message, .. } => ApiError::BadRequest(message),
            Error::Auth { message, error_type } => match error_type {
                AuthErrorType::EmailNotConfirmed => ApiError::Forbidden(message),
                _ => ApiError::Unauthorized(message),
            },
            Error::NotFound { resource_type, id } => {
                ApiError::NotFound(format!("{} '{}' not found", resource_type, id))
            }
            other => {
                error!(error = %other, "request failed with internal error");
                ApiError::Internal("Internal server error".to_string())
            }
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Forbidden | AuthError::Inactive => ApiError::forbidden(err.to_string()),
            AuthError::Persistence(inner) => inner.into(),
            other => ApiError::unauthorized(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_maps_to_bad_request() {
        let api: ApiError = Error::conflict("login taken", "user").into();
        assert_eq!(api, ApiError::BadRequest("login taken".into()));
        assert_eq!(api.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn auth_subtype_drives_the_status() {
        let unauthorized: ApiError =
            Error::auth("bad token", AuthErrorType::InvalidToken).into();
        assert_eq!(unauthorized.status(), StatusCode::UNAUTHORIZED);

        let forbidden: ApiError =
            Error::auth("confirm first", AuthErrorType::EmailNotConfirmed).into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_details_are_hidden() {
        let api: ApiError = Error::internal("db password leaked here").into();
        assert_eq!(api, ApiError::Internal("Internal server error".into()));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(ApiError::bad_request("x").code(), "bad_request");
        assert_eq!(ApiError::unauthorized("x").code(), "unauthorized");
        assert_eq!(ApiError::forbidden("x").code(), "forbidden");
        assert_eq!(ApiError::not_found("x").code(), "not_found");
        assert_eq!(ApiError::internal("x").code(), "internal_error");
    }
}
