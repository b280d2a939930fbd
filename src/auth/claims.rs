//! JWT claims and the shared encode/decode codec.

use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::user::User;
use crate::domain::UserId;

pub const TOKEN_TYPE_ACCESS: &str = "access";
pub const TOKEN_TYPE_REFRESH: &str = "refresh";

/// Claims carried by both token kinds. Access tokens embed the identity
/// snapshot (login, email, role); refresh tokens carry only the user id and
/// the `refresh` type marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: UserId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub iat: i64,
    pub exp: i64,
    /// Unique token id; two tokens minted in the same second still differ.
    pub jti: String,
    #[serde(rename = "type")]
    pub token_type: String,
}

impl Claims {
    /// Build access-token claims for a user. Expiry is exactly
    /// `issued_at + lifetime`; no leeway is added here or at validation.
    pub fn access(user: &User, lifetime_seconds: u64, issued_at: DateTime<Utc>) -> Self {
        let iat = issued_at.timestamp();
        Self {
            user_id: user.id.clone(),
            login: Some(user.login.clone()),
            email: Some(user.email.clone()),
            role: Some(user.role.to_string()),
            iat,
            exp: iat + lifetime_seconds as i64,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: TOKEN_TYPE_ACCESS.to_string(),
        }
    }

    /// Build refresh-token claims. Identity fields are deliberately absent;
    /// the holder must be resolved against current storage on use.
    pub fn refresh(user_id: UserId, lifetime_seconds: u64, issued_at: DateTime<Utc>) -> Self {
        let iat = issued_at.timestamp();
        Self {
            user_id,
            login: None,
            email: None,
            role: None,
            iat,
            exp: iat + lifetime_seconds as i64,
            jti: uuid::Uuid::new_v4().to_string(),
            token_type: TOKEN_TYPE_REFRESH.to_string(),
        }
    }

    pub fn is_access(&self) -> bool {
        self.token_type == TOKEN_TYPE_ACCESS
    }

    pub fn is_refresh(&self) -> bool {
        self.token_type == TOKEN_TYPE_REFRESH
    }
}

/// Why a presented token was rejected. Expired tokens are reported separately
/// so callers can surface a distinct message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenDecodeError {
    Expired,
    Invalid,
}

impl std::fmt::Display for TokenDecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenDecodeError::Expired => write!(f, "Token has expired"),
            TokenDecodeError::Invalid => write!(f, "Token is invalid"),
        }
    }
}

impl std::error::Error for TokenDecodeError {}

/// Stateless HS256 codec shared by the session service and the request guard.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    header: Header,
}

impl TokenCodec {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is exact; the library default allows 60 seconds of drift.
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            header: Header::new(Algorithm::HS256),
        }
    }

    pub fn encode(&self, claims: &Claims) -> crate::errors::Result<String> {
        jsonwebtoken::encode(&self.header, claims, &self.encoding_key)
            .map_err(|e| crate::errors::Error::internal(format!("Failed to sign token: {}", e)))
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenDecodeError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenDecodeError::Expired,
                _ => TokenDecodeError::Invalid,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::user::Role;

    fn sample_user() -> User {
        User {
            id: UserId::new(),
            login: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::User,
            is_active: true,
            profile: serde_json::json!({}),
            avatar: None,
            refresh_token: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn access_claims_carry_identity_snapshot() {
        let user = sample_user();
        let now = Utc::now();
        let claims = Claims::access(&user, 3600, now);

        assert!(claims.is_access());
        assert_eq!(claims.login.as_deref(), Some("alice"));
        assert_eq!(claims.role.as_deref(), Some("user"));
        assert_eq!(claims.exp, claims.iat + 3600);
    }

    #[test]
    fn refresh_claims_carry_only_the_id() {
        let claims = Claims::refresh(UserId::new(), 604800, Utc::now());

        assert!(claims.is_refresh());
        assert!(claims.login.is_none());
        assert!(claims.email.is_none());
        assert!(claims.role.is_none());
    }

    #[test]
    fn codec_round_trips_claims() {
        let codec = TokenCodec::new("a-test-secret-that-is-long-enough-0000");
        let user = sample_user();
        let token = codec.encode(&Claims::access(&user, 3600, Utc::now())).unwrap();

        let decoded = codec.decode(&token).unwrap();
        assert_eq!(decoded.user_id, user.id);
        assert_eq!(decoded.token_type, TOKEN_TYPE_ACCESS);
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        let codec = TokenCodec::new("a-test-secret-that-is-long-enough-0000");
        let user = sample_user();
        let issued = Utc::now() - chrono::Duration::seconds(7200);
        let token = codec.encode(&Claims::access(&user, 3600, issued)).unwrap();

        assert_eq!(codec.decode(&token), Err(TokenDecodeError::Expired));
    }

    #[test]
    fn tampered_token_is_invalid() {
        let codec = TokenCodec::new("a-test-secret-that-is-long-enough-0000");
        let other = TokenCodec::new("a-different-secret-entirely-1111111111");
        let user = sample_user();
        let token = other.encode(&Claims::access(&user, 3600, Utc::now())).unwrap();

        assert_eq!(codec.decode(&token), Err(TokenDecodeError::Invalid));
        assert_eq!(codec.decode("not.a.jwt"), Err(TokenDecodeError::Invalid));
    }

    #[test]
    fn tokens_minted_back_to_back_differ() {
        let codec = TokenCodec::new("a-test-secret-that-is-long-enough-0000");
        let id = UserId::new();
        let now = Utc::now();

        let a = codec.encode(&Claims::refresh(id.clone(), 60, now)).unwrap();
        let b = codec.encode(&Claims::refresh(id, 60, now)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn wire_format_uses_type_field() {
        let claims = Claims::refresh(UserId::new(), 60, Utc::now());
        let json = serde_json::to_value(&claims).unwrap();
        assert_eq!(json["type"], "refresh");
        assert!(json.get("login").is_none());
    }
}
