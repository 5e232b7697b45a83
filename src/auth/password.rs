use bcrypt::{hash, verify};
use thiserror::Error;

pub use bcrypt::DEFAULT_COST;

/// Lowest cost bcrypt accepts. Only suitable for tests.
pub const MIN_COST: u32 = 4;

/// bcrypt only reads this many bytes of input; anything after is silently ignored.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Errors raised by the credential hasher. A password mismatch is not one of them.
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),
}

/// Salted, cost-adaptive password hashing backed by bcrypt.
///
/// The salt is generated per call and embedded in the produced hash, so a hash is
/// all that is needed to verify a password later. The hasher also carries a decoy
/// hash used to spend the same amount of work when a login names an unknown account.
#[derive(Clone)]
pub struct PasswordHasher {
    cost: u32,
    decoy_hash: String,
}

impl PasswordHasher {
    /// Creates a hasher with the given bcrypt cost (4..=31).
    ///
    /// # Errors
    /// Returns `PasswordError::HashingFailed` if the cost is out of range.
    pub fn new(cost: u32) -> Result<Self, PasswordError> {
        let decoy_hash = hash("decoy-password-for-unknown-accounts", cost)
            .map_err(|e| PasswordError::HashingFailed(e.to_string()))?;
        Ok(Self { cost, decoy_hash })
    }

    /// Hashes `password`. Inputs longer than [`MAX_PASSWORD_BYTES`] are refused
    /// rather than truncated.
    pub fn hash(&self, password: &str) -> Result<String, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::HashingFailed(format!(
                "password exceeds {} bytes",
                MAX_PASSWORD_BYTES
            )));
        }
        hash(password, self.cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
    }

    /// Checks `password` against a stored bcrypt hash.
    ///
    /// Returns `Ok(false)` on mismatch. An error means the stored hash itself is unusable.
    /// A password over [`MAX_PASSWORD_BYTES`] never matches, since bcrypt would only
    /// compare its prefix.
    pub fn verify(&self, password: &str, hashed_password: &str) -> Result<bool, PasswordError> {
        if password.len() > MAX_PASSWORD_BYTES {
            self.verify_decoy(password);
            return Ok(false);
        }
        verify(password, hashed_password)
            .map_err(|e| PasswordError::VerificationFailed(e.to_string()))
    }

    /// Burns one verification against the decoy hash. The outcome is discarded.
    pub fn verify_decoy(&self, password: &str) {
        let _ = verify(password, &self.decoy_hash);
    }
}
