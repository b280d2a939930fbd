//! Request-scoped authentication types.

use crate::auth::user::User;
use crate::errors::Error;

/// The authenticated account for the current request, inserted into request
/// extensions by the bearer-token middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Who is on the other end of a WebSocket handshake. Handshakes without a
/// usable token proceed as [`Identity::Anonymous`] instead of being rejected;
/// the socket handler decides what anonymous peers may do.
#[derive(Debug, Clone)]
pub enum Identity {
    User(User),
    Anonymous,
}

/// Failures raised while authenticating or authorizing a request.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingBearer,
    #[error("malformed authorization header")]
    MalformedBearer,
    #[error("token is invalid")]
    InvalidToken,
    #[error("token has expired")]
    ExpiredToken,
    #[error("token cannot be used to authenticate requests")]
    NotAccessToken,
    #[error("account no longer exists")]
    UnknownUser,
    #[error("account is deactivated")]
    Inactive,
    #[error("insufficient permissions")]
    Forbidden,
    #[error("auth backend error: {0}")]
    Persistence(#[from] Error),
}
