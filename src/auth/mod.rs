pub mod extractors;
pub mod guard;
pub mod middleware;
pub mod password;
pub mod token;

use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::auth::password::MAX_PASSWORD_BYTES;
use crate::models::AccountSummary;

// Re-export necessary items
pub use extractors::{AuthenticatedUserId, IdentityError};
pub use guard::{require_owned, OwnerScope};
pub use middleware::AuthMiddleware;
pub use password::{PasswordError, PasswordHasher};
pub use token::{Claims, TokenError, TokenService};

lazy_static! {
    // Regex for username validation: alphanumeric, dots, underscores, hyphens
    static ref USERNAME_REGEX: regex::Regex = regex::Regex::new(r"^[a-zA-Z0-9._-]+$").unwrap();
}

/// Represents the payload for a login request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct LoginRequest {
    /// Account email address. Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// Account password. Must not be empty.
    #[validate(length(min = 1))]
    pub password: String,
}

/// Represents the payload for a new account registration request.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Desired username for the new account.
    /// Between 1 and 50 characters: letters, digits, dots, underscores or hyphens.
    #[validate(
        length(min = 1, max = 50),
        regex(
            path = "USERNAME_REGEX",
            message = "Username may only contain letters, digits, dots, underscores or hyphens"
        )
    )]
    pub username: String,
    /// Email address for the new account. Must be a valid email format.
    #[validate(email)]
    pub email: String,
    /// Password for the new account.
    /// At least 6 characters and at most 72 bytes, the most bcrypt reads.
    #[validate(length(min = 6), custom = "validate_password_bytes")]
    pub password: String,
}

/// Response after a successful login: the session token and the account it belongs to.
#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    /// The JWT for session authentication.
    pub token: String,
    pub user: AccountSummary,
}

fn validate_password_bytes(password: &str) -> Result<(), ValidationError> {
    if password.len() > MAX_PASSWORD_BYTES {
        let mut error = ValidationError::new("password_too_long");
        error.message = Some("Password must be at most 72 bytes".into());
        return Err(error);
    }
    Ok(())
}

/// Trims and lowercases an email so that lookups and uniqueness ignore case.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
