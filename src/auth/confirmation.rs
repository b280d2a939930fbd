//! Email confirmation tokens.
//!
//! A token is `base64url(email).timestamp.base64url(signature)` where the
//! signature is HMAC-SHA256 over the salt, the email, and the issue
//! timestamp, keyed with the application secret. Tokens are self-contained;
//! nothing is stored server-side until the account is activated.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

// Scopes confirmation signatures away from every other use of the secret.
const CONFIRMATION_SALT: &str = "auth.email_confirmation";

/// Why a confirmation token was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationError {
    /// Malformed token or signature mismatch
    Invalid,
    /// Signature verified but the token is older than the allowed age
    Expired,
}

impl std::fmt::Display for ConfirmationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfirmationError::Invalid => write!(f, "Confirmation token is invalid"),
            ConfirmationError::Expired => write!(f, "Confirmation token has expired"),
        }
    }
}

impl std::error::Error for ConfirmationError {}

pub struct EmailConfirmationSigner {
    secret: Vec<u8>,
    max_age_seconds: u64,
}

impl EmailConfirmationSigner {
    pub fn new(secret: &str, max_age_seconds: u64) -> Self {
        Self { secret: secret.as_bytes().to_vec(), max_age_seconds }
    }

    fn mac_for(&self, email: &str, timestamp: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("HMAC accepts keys of any length");
        mac.update(CONFIRMATION_SALT.as_bytes());
        mac.update(b"\n");
        mac.update(email.as_bytes());
        mac.update(b"\n");
        mac.update(timestamp.to_string().as_bytes());
        mac
    }

    /// Mint a confirmation token for an email address.
    pub fn sign(&self, email: &str, issued_at: DateTime<Utc>) -> String {
        let timestamp = issued_at.timestamp();
        let signature = self.mac_for(email, timestamp).finalize().into_bytes();
        format!(
            "{}.{}.{}",
            URL_SAFE_NO_PAD.encode(email.as_bytes()),
            timestamp,
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Verify a token and return the email it was minted for.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<String, ConfirmationError> {
        let mut parts = token.splitn(3, '.');
        let (email_part, ts_part, sig_part) = match (parts.next(), parts.next(), parts.next()) {
            (Some(a), Some(b), Some(c)) => (a, b, c),
            _ => return Err(ConfirmationError::Invalid),
        };

        let email_bytes =
            URL_SAFE_NO_PAD.decode(email_part).map_err(|_| ConfirmationError::Invalid)?;
        let email = String::from_utf8(email_bytes).map_err(|_| ConfirmationError::Invalid)?;
        let timestamp: i64 = ts_part.parse().map_err(|_| ConfirmationError::Invalid)?;
        let presented_sig =
            URL_SAFE_NO_PAD.decode(sig_part).map_err(|_| ConfirmationError::Invalid)?;

        self.mac_for(&email, timestamp)
            .verify_slice(&presented_sig)
            .map_err(|_| ConfirmationError::Invalid)?;

        let age = now.timestamp() - timestamp;
        if age < 0 || age as u64 > self.max_age_seconds {
            return Err(ConfirmationError::Expired);
        }

        Ok(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn signer() -> EmailConfirmationSigner {
        EmailConfirmationSigner::new("a-test-secret-that-is-long-enough-0000", 86400)
    }

    #[test]
    fn sign_and_verify_round_trip() {
        let signer = signer();
        let now = Utc::now();
        let token = signer.sign("alice@example.com", now);

        let email = signer.verify(&token, now + Duration::hours(1)).unwrap();
        assert_eq!(email, "alice@example.com");
    }

    #[test]
    fn old_token_is_expired() {
        let signer = signer();
        let issued = Utc::now();
        let token = signer.sign("alice@example.com", issued);

        let result = signer.verify(&token, issued + Duration::seconds(86401));
        assert_eq!(result, Err(ConfirmationError::Expired));
    }

    #[test]
    fn tampered_email_fails_verification() {
        let signer = signer();
        let token = signer.sign("alice@example.com", Utc::now());

        let mut parts: Vec<&str> = token.split('.').collect();
        let forged_email = URL_SAFE_NO_PAD.encode(b"mallory@example.com");
        parts[0] = &forged_email;
        let forged = parts.join(".");

        assert_eq!(signer.verify(&forged, Utc::now()), Err(ConfirmationError::Invalid));
    }

    #[test]
    fn different_secret_fails_verification() {
        let token = signer().sign("alice@example.com", Utc::now());
        let other = EmailConfirmationSigner::new("another-secret-another-secret-000000", 86400);

        assert_eq!(other.verify(&token, Utc::now()), Err(ConfirmationError::Invalid));
    }

    #[test]
    fn garbage_is_invalid() {
        let signer = signer();
        for junk in ["", "a.b", "not-a-token", "a.b.c"] {
            assert_eq!(signer.verify(junk, Utc::now()), Err(ConfirmationError::Invalid));
        }
    }
}
