//! Session lifecycle: issuing, refreshing, and revoking token pairs.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::auth::claims::{Claims, TokenCodec, TokenDecodeError};
use crate::auth::user::User;
use crate::errors::{AuthErrorType, Error, Result};
use crate::storage::repositories::UserRepository;

/// Tokens returned to the client on login, registration, and refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: String,
    /// Access-token lifetime in seconds
    pub expires_in: u64,
}

pub struct SessionService {
    codec: Arc<TokenCodec>,
    user_repository: Arc<dyn UserRepository>,
    access_lifetime_seconds: u64,
    refresh_lifetime_seconds: u64,
}

impl SessionService {
    pub fn new(
        codec: Arc<TokenCodec>,
        user_repository: Arc<dyn UserRepository>,
        access_lifetime_seconds: u64,
        refresh_lifetime_seconds: u64,
    ) -> Self {
        Self { codec, user_repository, access_lifetime_seconds, refresh_lifetime_seconds }
    }

    fn mint_pair(&self, user: &User) -> Result<TokenPair> {
        let now = Utc::now();
        let access = self.codec.encode(&Claims::access(user, self.access_lifetime_seconds, now))?;
        let refresh = self
            .codec
            .encode(&Claims::refresh(user.id.clone(), self.refresh_lifetime_seconds, now))?;

        Ok(TokenPair {
            access_token: access,
            refresh_token: refresh,
            token_type: "Bearer".to_string(),
            expires_in: self.access_lifetime_seconds,
        })
    }

    /// Mint a fresh token pair and store the refresh token as the account's
    /// only live one. Any previously issued refresh token stops working.
    #[instrument(skip(self, user), fields(user_id = %user.id), name = "session_issue")]
    pub async fn issue(&self, user: &User) -> Result<TokenPair> {
        let pair = self.mint_pair(user)?;
        self.user_repository.set_refresh_token(&user.id, Some(&pair.refresh_token)).await?;

        info!(user_id = %user.id, "Session issued");
        Ok(pair)
    }

    /// Exchange a refresh token for a new pair, rotating the stored token.
    ///
    /// The presented token must decode, carry the `refresh` type, belong to
    /// an existing account, and still match the account's stored slot. The
    /// slot swap is a single conditional update so a concurrent refresh with
    /// the same token succeeds for exactly one caller.
    #[instrument(skip(self, refresh_token), name = "session_refresh")]
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, TokenPair)> {
        let claims = self.codec.decode(refresh_token).map_err(|e| match e {
            TokenDecodeError::Expired => {
                Error::auth("Refresh token has expired", AuthErrorType::ExpiredToken)
            }
            TokenDecodeError::Invalid => {
                Error::auth("Refresh token is invalid", AuthErrorType::InvalidToken)
            }
        })?;

        if !claims.is_refresh() {
            return Err(Error::auth("Token is not a refresh token", AuthErrorType::InvalidToken));
        }

        let user = self
            .user_repository
            .get_user(&claims.user_id)
            .await?
            .ok_or_else(|| Error::not_found("user", claims.user_id.as_str()))?;

        if user.refresh_token.as_deref() != Some(refresh_token) {
            warn!(user_id = %user.id, "Refresh token no longer matches the stored slot");
            return Err(Error::auth("Token is no longer valid", AuthErrorType::StaleToken));
        }

        if !user.is_active {
            return Err(Error::auth(
                "Email address has not been confirmed",
                AuthErrorType::EmailNotConfirmed,
            ));
        }

        let pair = self.mint_pair(&user)?;
        let rotated = self
            .user_repository
            .rotate_refresh_token(&user.id, refresh_token, &pair.refresh_token)
            .await?;

        if !rotated {
            // Lost a race with a concurrent refresh or a logout.
            warn!(user_id = %user.id, "Refresh token rotated concurrently");
            return Err(Error::auth("Token is no longer valid", AuthErrorType::StaleToken));
        }

        info!(user_id = %user.id, "Session refreshed");
        Ok((user, pair))
    }

    /// Clear the account's refresh-token slot. Outstanding access tokens keep
    /// working until they expire; no further refresh is possible.
    #[instrument(skip(self, user), fields(user_id = %user.id), name = "session_revoke")]
    pub async fn revoke(&self, user: &User) -> Result<()> {
        self.user_repository.set_refresh_token(&user.id, None).await?;
        info!(user_id = %user.id, "Session revoked");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user::{NewUser, Role};
    use crate::domain::UserId;
    use crate::storage::repositories::SqlxUserRepository;
    use crate::storage::run_migrations;
    use sqlx::sqlite::SqlitePoolOptions;

    const SECRET: &str = "a-test-secret-that-is-long-enough-0000";

    async fn service() -> (SessionService, Arc<SqlxUserRepository>, User) {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();

        let repo = Arc::new(SqlxUserRepository::new(pool));
        let user = repo
            .create_user(NewUser {
                id: UserId::new(),
                login: "alice".into(),
                email: "alice@example.com".into(),
                password_hash: "$argon2id$fake".into(),
                role: Role::User,
                is_active: true,
                profile: serde_json::json!({}),
            })
            .await
            .unwrap();

        let session =
            SessionService::new(Arc::new(TokenCodec::new(SECRET)), repo.clone(), 3600, 604800);
        (session, repo, user)
    }

    #[tokio::test]
    async fn issue_stores_the_refresh_token() {
        let (session, repo, user) = service().await;
        let pair = session.issue(&user).await.unwrap();

        assert_eq!(pair.token_type, "Bearer");
        assert_eq!(pair.expires_in, 3600);

        let stored = repo.get_user(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.refresh_token.as_deref(), Some(pair.refresh_token.as_str()));
    }

    #[tokio::test]
    async fn refresh_rotates_and_invalidates_the_old_token() {
        let (session, _, user) = service().await;
        let first = session.issue(&user).await.unwrap();

        let (_, second) = session.refresh(&first.refresh_token).await.unwrap();
        assert_ne!(first.refresh_token, second.refresh_token);

        // Replaying the consumed token fails.
        let err = session.refresh(&first.refresh_token).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth { error_type: AuthErrorType::StaleToken, .. }
        ));

        // The rotated token still works.
        assert!(session.refresh(&second.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn a_new_login_invalidates_the_previous_session() {
        let (session, _, user) = service().await;
        let old = session.issue(&user).await.unwrap();
        let _new = session.issue(&user).await.unwrap();

        let err = session.refresh(&old.refresh_token).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth { error_type: AuthErrorType::StaleToken, .. }
        ));
    }

    #[tokio::test]
    async fn revoke_blocks_further_refreshes() {
        let (session, _, user) = service().await;
        let pair = session.issue(&user).await.unwrap();

        session.revoke(&user).await.unwrap();

        let err = session.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth { error_type: AuthErrorType::StaleToken, .. }
        ));
    }

    #[tokio::test]
    async fn access_token_is_not_accepted_for_refresh() {
        let (session, _, user) = service().await;
        let pair = session.issue(&user).await.unwrap();

        let err = session.refresh(&pair.access_token).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth { error_type: AuthErrorType::InvalidToken, .. }
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let (session, _, _) = service().await;

        let err = session.refresh("not.a.token").await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth { error_type: AuthErrorType::InvalidToken, .. }
        ));
    }

    #[tokio::test]
    async fn deleted_account_is_not_found() {
        let (session, repo, user) = service().await;
        let pair = session.issue(&user).await.unwrap();

        repo.delete_user(&user.id).await.unwrap();

        let err = session.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[tokio::test]
    async fn inactive_account_cannot_refresh() {
        let (session, repo, user) = service().await;
        let pair = session.issue(&user).await.unwrap();

        repo.update_user(
            &user.id,
            crate::auth::user::UpdateUser { is_active: Some(false), ..Default::default() },
        )
        .await
        .unwrap();

        let err = session.refresh(&pair.refresh_token).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Auth { error_type: AuthErrorType::EmailNotConfirmed, .. }
        ));
    }
}
