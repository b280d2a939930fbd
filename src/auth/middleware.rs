//! Axum middleware for bearer-token authentication.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, HeaderMap, Method, Request},
    middleware::Next,
    response::Response,
};
use tracing::{info_span, warn};

use crate::api::error::ApiError;
use crate::auth::claims::{TokenCodec, TokenDecodeError};
use crate::auth::models::{AuthError, CurrentUser, Identity};
use crate::storage::repositories::UserRepository;

/// Shared state for the request guard.
pub struct AuthState {
    pub codec: Arc<TokenCodec>,
    pub users: Arc<dyn UserRepository>,
}

impl AuthState {
    pub fn new(codec: Arc<TokenCodec>, users: Arc<dyn UserRepository>) -> Self {
        Self { codec, users }
    }

    /// Resolve an access token to its live account. The identity snapshot in
    /// the claims is not trusted; the account is re-read so role changes,
    /// deactivation, and deletion take effect immediately.
    pub async fn resolve_access_token(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.codec.decode(token).map_err(|e| match e {
            TokenDecodeError::Expired => AuthError::ExpiredToken,
            TokenDecodeError::Invalid => AuthError::InvalidToken,
        })?;

        if !claims.is_access() {
            return Err(AuthError::NotAccessToken);
        }

        let user = self
            .users
            .get_user(&claims.user_id)
            .await?
            .ok_or(AuthError::UnknownUser)?;
        if !user.is_active {
            return Err(AuthError::Inactive);
        }

        Ok(CurrentUser(user))
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(AUTHORIZATION)
        .ok_or(AuthError::MissingBearer)?
        .to_str()
        .map_err(|_| AuthError::MalformedBearer)?;

    match header.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::MalformedBearer),
    }
}

/// Guard for the protected route tree. Inserts [`CurrentUser`] into request
/// extensions on success.
pub async fn authenticate(
    State(state): State<Arc<AuthState>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if request.method() == Method::OPTIONS {
        return Ok(next.run(request).await);
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let span = info_span!("auth_middleware", http.method = %method, http.path = %path);
    let _guard = span.enter();

    let result = match bearer_token(request.headers()) {
        Ok(token) => state.resolve_access_token(token).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(current_user) => {
            request.extensions_mut().insert(current_user);
            Ok(next.run(request).await)
        }
        Err(err) => {
            warn!(error = %err, "authentication failed");
            Err(err.into())
        }
    }
}

/// Resolve the identity behind a WebSocket handshake. The token may arrive
/// in a `token` query parameter or an authorization header; absent or
/// unusable tokens degrade to [`Identity::Anonymous`].
pub async fn identity_from_handshake(
    state: &AuthState,
    query_token: Option<&str>,
    headers: &HeaderMap,
) -> Identity {
    let token = match query_token {
        Some(token) if !token.is_empty() => Some(token),
        _ => bearer_token(headers).ok(),
    };

    match token {
        Some(token) => match state.resolve_access_token(token).await {
            Ok(CurrentUser(user)) => Identity::User(user),
            Err(err) => {
                warn!(error = %err, "handshake token rejected, continuing anonymously");
                Identity::Anonymous
            }
        },
        None => Identity::Anonymous,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn bearer_token_accepts_case_insensitive_scheme() {
        assert_eq!(bearer_token(&headers_with("Bearer abc")).unwrap(), "abc");
        assert_eq!(bearer_token(&headers_with("bearer abc")).unwrap(), "abc");
    }

    #[test]
    fn bearer_token_rejects_other_shapes() {
        assert!(matches!(bearer_token(&HeaderMap::new()), Err(AuthError::MissingBearer)));
        assert!(matches!(bearer_token(&headers_with("abc")), Err(AuthError::MalformedBearer)));
        assert!(matches!(
            bearer_token(&headers_with("Basic dXNlcg==")),
            Err(AuthError::MalformedBearer)
        ));
        assert!(matches!(bearer_token(&headers_with("Bearer ")), Err(AuthError::MalformedBearer)));
    }
}
