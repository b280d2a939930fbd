//! Authentication and authorization: JWT claims, credential verification,
//! session lifecycle, email confirmation, and the request guard.

pub mod claims;
pub mod confirmation;
pub mod credentials;
pub mod hashing;
pub mod middleware;
pub mod models;
pub mod ownership;
pub mod session;
pub mod user;

pub use claims::{Claims, TokenCodec, TokenDecodeError};
pub use confirmation::{ConfirmationError, EmailConfirmationSigner};
pub use credentials::CredentialVerifier;
pub use middleware::{authenticate, identity_from_handshake, AuthState};
pub use models::{AuthError, CurrentUser, Identity};
pub use session::{SessionService, TokenPair};
pub use user::{NewUser, Role, UpdateUser, User, UserSummary};
