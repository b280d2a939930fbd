//! Credential verification for the login endpoint.

use std::sync::{Arc, LazyLock};

use tracing::instrument;

use crate::auth::hashing::{hash_password, verify_password};
use crate::auth::user::User;
use crate::errors::Result;
use crate::storage::repositories::UserRepository;

// Verified against when no account matches the identifier, so unknown and
// known identifiers cost the same amount of time.
static DUMMY_HASH: LazyLock<String> = LazyLock::new(|| {
    hash_password("dummy-password-for-timing-equalization")
        .expect("hashing a static password cannot fail")
});

pub struct CredentialVerifier {
    user_repository: Arc<dyn UserRepository>,
}

impl CredentialVerifier {
    pub fn new(user_repository: Arc<dyn UserRepository>) -> Self {
        Self { user_repository }
    }

    /// Verify an identifier/password pair. The identifier is tried as a login
    /// first and then as an email address. Returns `Ok(None)` when the pair
    /// does not verify; `Err` is reserved for storage failures.
    #[instrument(skip(self, password), fields(identifier = %identifier), name = "verify_credentials")]
    pub async fn authenticate(&self, identifier: &str, password: &str) -> Result<Option<User>> {
        let found = match self.user_repository.find_with_password_by_login(identifier).await? {
            Some(pair) => Some(pair),
            None => self.user_repository.find_with_password_by_email(identifier).await?,
        };

        match found {
            Some((user, stored_hash)) => {
                if verify_password(password, &stored_hash)? {
                    Ok(Some(user))
                } else {
                    Ok(None)
                }
            }
            None => {
                let _ = verify_password(password, &DUMMY_HASH);
                Ok(None)
            }
        }
    }
}
