//! User persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use tracing::instrument;

use crate::auth::user::{NewUser, Role, UpdateUser, User};
use crate::domain::UserId;
use crate::errors::{Error, Result};
use crate::storage::DbPool;

/// Storage operations for user accounts.
///
/// Password hashes are only exposed through the `find_with_password_*`
/// lookups; every other read strips them.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create_user(&self, new_user: NewUser) -> Result<User>;
    async fn get_user(&self, id: &UserId) -> Result<Option<User>>;
    async fn find_by_login(&self, login: &str) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_with_password_by_login(&self, login: &str) -> Result<Option<(User, String)>>;
    async fn find_with_password_by_email(&self, email: &str) -> Result<Option<(User, String)>>;
    async fn update_user(&self, id: &UserId, update: UpdateUser) -> Result<User>;
    async fn delete_user(&self, id: &UserId) -> Result<()>;

    /// Overwrite the account's refresh-token slot unconditionally. Used on
    /// login (store the new token) and logout (clear with `None`).
    async fn set_refresh_token(&self, id: &UserId, token: Option<&str>) -> Result<()>;

    /// Replace the stored refresh token only if it still equals `old`.
    /// Returns `false` when no row matched, meaning the presented token has
    /// already been rotated or revoked.
    async fn rotate_refresh_token(&self, id: &UserId, old: &str, new: &str) -> Result<bool>;

    /// Mark the account with this email as active. Returns `false` when no
    /// such account exists.
    async fn activate_by_email(&self, email: &str) -> Result<bool>;
}

pub struct SqlxUserRepository {
    pool: DbPool,
}

impl SqlxUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: String,
    login: String,
    email: String,
    password_hash: String,
    role: String,
    is_active: bool,
    profile: String,
    avatar: Option<Vec<u8>>,
    refresh_token: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn row_to_user(row: &UserRow) -> Result<User> {
    let role = row.role.parse::<Role>()?;
    let profile: serde_json::Value = serde_json::from_str(&row.profile)
        .map_err(|e| Error::serialization(e, format!("Invalid profile JSON for user {}", row.id)))?;

    Ok(User {
        id: UserId::from_string(row.id.clone()),
        login: row.login.clone(),
        email: row.email.clone(),
        role,
        is_active: row.is_active,
        profile,
        avatar: row.avatar.clone(),
        refresh_token: row.refresh_token.clone(),
        created_at: row.created_at,
        updated_at: row.updated_at,
    })
}

const SELECT_USER: &str = "SELECT id, login, email, password_hash, role, is_active, profile, avatar, refresh_token, created_at, updated_at FROM users";

fn map_insert_error(e: sqlx::Error) -> Error {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return Error::conflict("Login or email already registered", "user");
        }
    }
    Error::database(e, "Failed to create user")
}

#[async_trait]
impl UserRepository for SqlxUserRepository {
    #[instrument(skip(self, new_user), fields(login = %new_user.login), name = "db_create_user")]
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let now = Utc::now();
        let profile = serde_json::to_string(&new_user.profile)
            .map_err(|e| Error::serialization(e, "Failed to encode profile JSON"))?;

        sqlx::query(
            "INSERT INTO users (id, login, email, password_hash, role, is_active, profile, created_at, updated_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(new_user.id.as_str())
        .bind(&new_user.login)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .bind(new_user.is_active)
        .bind(&profile)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_insert_error)?;

        self.get_user(&new_user.id)
            .await?
            .ok_or_else(|| Error::internal("User disappeared immediately after insert"))
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_get_user")]
    async fn get_user(&self, id: &UserId) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE id = $1", SELECT_USER))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to fetch user"))?;

        row.as_ref().map(row_to_user).transpose()
    }

    #[instrument(skip(self), name = "db_find_user_by_login")]
    async fn find_by_login(&self, login: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE login = $1", SELECT_USER))
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to fetch user by login"))?;

        row.as_ref().map(row_to_user).transpose()
    }

    #[instrument(skip(self, email), name = "db_find_user_by_email")]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE email = $1", SELECT_USER))
            .bind(User::normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to fetch user by email"))?;

        row.as_ref().map(row_to_user).transpose()
    }

    #[instrument(skip(self), name = "db_find_credentials_by_login")]
    async fn find_with_password_by_login(&self, login: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE login = $1", SELECT_USER))
            .bind(login)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to fetch credentials by login"))?;

        row.as_ref().map(|r| row_to_user(r).map(|u| (u, r.password_hash.clone()))).transpose()
    }

    #[instrument(skip(self, email), name = "db_find_credentials_by_email")]
    async fn find_with_password_by_email(&self, email: &str) -> Result<Option<(User, String)>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("{} WHERE email = $1", SELECT_USER))
            .bind(User::normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to fetch credentials by email"))?;

        row.as_ref().map(|r| row_to_user(r).map(|u| (u, r.password_hash.clone()))).transpose()
    }

    #[instrument(skip(self, update), fields(user_id = %id), name = "db_update_user")]
    async fn update_user(&self, id: &UserId, update: UpdateUser) -> Result<User> {
        let existing = self
            .get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("user", id.as_str()))?;

        let login = update.login.unwrap_or(existing.login);
        let email = update.email.map(|e| User::normalize_email(&e)).unwrap_or(existing.email);
        let profile = update.profile.unwrap_or(existing.profile);
        let avatar = update.avatar.unwrap_or(existing.avatar);
        let is_active = update.is_active.unwrap_or(existing.is_active);
        let profile_json = serde_json::to_string(&profile)
            .map_err(|e| Error::serialization(e, "Failed to encode profile JSON"))?;

        let result = sqlx::query(
            "UPDATE users SET login = $1, email = $2, profile = $3, avatar = $4, is_active = $5, updated_at = $6 WHERE id = $7",
        )
        .bind(&login)
        .bind(&email)
        .bind(&profile_json)
        .bind(&avatar)
        .bind(is_active)
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db) = e {
                if db.is_unique_violation() {
                    return Error::conflict("Login or email already registered", "user");
                }
            }
            Error::database(e, "Failed to update user")
        })?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", id.as_str()));
        }

        self.get_user(id)
            .await?
            .ok_or_else(|| Error::not_found("user", id.as_str()))
    }

    #[instrument(skip(self), fields(user_id = %id), name = "db_delete_user")]
    async fn delete_user(&self, id: &UserId) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| Error::database(e, "Failed to delete user"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", id.as_str()));
        }

        Ok(())
    }

    #[instrument(skip(self, token), fields(user_id = %id), name = "db_set_refresh_token")]
    async fn set_refresh_token(&self, id: &UserId, token: Option<&str>) -> Result<()> {
        let result =
            sqlx::query("UPDATE users SET refresh_token = $1, updated_at = $2 WHERE id = $3")
                .bind(token)
                .bind(Utc::now())
                .bind(id.as_str())
                .execute(&self.pool)
                .await
                .map_err(|e| Error::database(e, "Failed to store refresh token"))?;

        if result.rows_affected() == 0 {
            return Err(Error::not_found("user", id.as_str()));
        }

        Ok(())
    }

    #[instrument(skip(self, old, new), fields(user_id = %id), name = "db_rotate_refresh_token")]
    async fn rotate_refresh_token(&self, id: &UserId, old: &str, new: &str) -> Result<bool> {
        // Single conditional update; a concurrent rotation with the same old
        // token makes exactly one of the two writers win.
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $1, updated_at = $2 WHERE id = $3 AND refresh_token = $4",
        )
        .bind(new)
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(old)
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to rotate refresh token"))?;

        Ok(result.rows_affected() == 1)
    }

    #[instrument(skip(self, email), name = "db_activate_user_by_email")]
    async fn activate_by_email(&self, email: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET is_active = 1, updated_at = $1 WHERE email = $2",
        )
        .bind(Utc::now())
        .bind(User::normalize_email(email))
        .execute(&self.pool)
        .await
        .map_err(|e| Error::database(e, "Failed to activate user"))?;

        Ok(result.rows_affected() > 0)
    }
}
