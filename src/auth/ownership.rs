//! Ownership checks for mutating endpoints.

use crate::auth::models::AuthError;
use crate::auth::user::User;
use crate::domain::UserId;

/// A resource may be mutated by its owner or by an admin.
pub fn authorize_mutation(owner_id: &UserId, requester: &User) -> Result<(), AuthError> {
    if requester.role.is_admin() || &requester.id == owner_id {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
