//! User account model and role definitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::UserId;
use crate::errors::Error;

/// User roles for authorization decisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "user" => Ok(Role::User),
            "admin" => Ok(Role::Admin),
            other => Err(Error::validation(format!("Invalid role: {}", other))),
        }
    }
}

/// A registered account.
///
/// `refresh_token` is the single live refresh-token slot: at most one refresh
/// token is valid per account at any time. `profile` is an opaque JSON object
/// for per-account extensible data.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub login: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub profile: serde_json::Value,
    pub avatar: Option<Vec<u8>>,
    pub refresh_token: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Normalize an email address for storage and lookup
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

/// New user database payload. The password is already hashed by the caller;
/// the clear-text secret never reaches the storage layer.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub login: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
    pub profile: serde_json::Value,
}

/// Update payload for an existing user
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub login: Option<String>,
    pub email: Option<String>,
    pub profile: Option<serde_json::Value>,
    pub avatar: Option<Option<Vec<u8>>>,
    pub is_active: Option<bool>,
}

/// Client-facing account summary. Never carries the password hash or the
/// refresh token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: UserId,
    pub login: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub profile: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        use base64::{engine::general_purpose::STANDARD, Engine};

        Self {
            id: user.id.clone(),
            login: user.login.clone(),
            email: user.email.clone(),
            role: user.role,
            is_active: user.is_active,
            profile: user.profile.clone(),
            avatar: user.avatar.as_ref().map(|bytes| STANDARD.encode(bytes)),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trip() {
        for (input, expected) in [("user", Role::User), ("admin", Role::Admin)] {
            let parsed = input.parse::<Role>().unwrap();
            assert_eq!(parsed, expected);
            assert_eq!(parsed.to_string(), input);
        }

        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(User::normalize_email("  Alice@Example.COM "), "alice@example.com");
    }

    #[test]
    fn summary_never_leaks_secrets() {
        let user = User {
            id: UserId::new(),
            login: "alice".into(),
            email: "a@x.com".into(),
            role: Role::User,
            is_active: true,
            profile: serde_json::json!({}),
            avatar: None,
            refresh_token: Some("secret-refresh".into()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let summary = UserSummary::from(&user);
        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("secret-refresh"));
        assert!(!json.contains("password"));
    }
}
