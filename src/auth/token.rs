use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::AccountId;

/// Default lifetime of a session token.
pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24;

/// Algorithm used to sign tokens.
const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Algorithms accepted on verification. All HMAC; anything else is rejected.
const ACCEPTED_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Error type for token issuance and verification.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum TokenError {
    /// The signing secret is absent or empty.
    #[error("JWT secret is not configured")]
    MissingSecret,

    #[error("Failed to generate token: {0}")]
    Encoding(String),

    /// Malformed token, bad signature, unexpected algorithm or missing claims.
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Well-formed and correctly signed, but past its expiry.
    #[error("Token is expired")]
    Expired,
}

/// Represents the claims encoded within a session token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Always `true` on tokens issued by this service.
    #[serde(default)]
    pub authorized: bool,
    /// The account the token was issued to.
    pub user_id: AccountId,
    /// Issued-at timestamp (seconds since epoch).
    #[serde(default)]
    pub iat: i64,
    /// Expiration timestamp (seconds since epoch).
    pub exp: i64,
}

/// Issues and verifies HMAC-signed session tokens.
///
/// The keys are derived once from the server secret at startup; the service is
/// immutable afterwards and safe to share between workers.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
}

impl TokenService {
    /// Creates a token service keyed by `secret`.
    ///
    /// # Arguments
    /// * `secret` - Server-held signing secret
    /// * `ttl` - Lifetime of issued tokens
    ///
    /// # Errors
    /// Returns `TokenError::MissingSecret` if `secret` is empty.
    pub fn new(secret: &str, ttl: Duration) -> Result<Self, TokenError> {
        if secret.is_empty() {
            return Err(TokenError::MissingSecret);
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        })
    }

    /// Issues a token for `account_id` valid for the configured lifetime from now.
    pub fn issue(&self, account_id: AccountId) -> Result<String, TokenError> {
        self.issue_at(account_id, self.ttl, Utc::now())
    }

    /// Issues a token for `account_id` as if it were `issued_at`, valid for `ttl`.
    ///
    /// # Errors
    /// Returns `TokenError::Encoding` if signing fails.
    pub fn issue_at(
        &self,
        account_id: AccountId,
        ttl: Duration,
        issued_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            authorized: true,
            user_id: account_id,
            iat: issued_at.timestamp(),
            exp: (issued_at + ttl).timestamp(),
        };

        encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verifies `token` against the current time and returns its subject.
    pub fn verify(&self, token: &str) -> Result<AccountId, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verifies `token` as of `now` and returns its subject.
    ///
    /// The signature and header algorithm are checked by `jsonwebtoken`; expiry is
    /// compared here against `now` so that the clock can be controlled.
    ///
    /// # Errors
    /// * `TokenError::Invalid` - malformed, bad signature, non-HMAC algorithm,
    ///   missing claims or not authorized
    /// * `TokenError::Expired` - `now` is past the token's `exp`
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<AccountId, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &Self::validation())
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                kind => TokenError::Invalid(format!("{:?}", kind)),
            })?;

        if now.timestamp() > claims.exp {
            return Err(TokenError::Expired);
        }
        if !claims.authorized {
            return Err(TokenError::Invalid("token is not authorized".into()));
        }

        Ok(claims.user_id)
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.algorithms = ACCEPTED_ALGORITHMS.to_vec();
        validation.validate_exp = false;
        validation.set_required_spec_claims(&["exp"]);
        validation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // Header {"alg":"none","typ":"JWT"} and a payload for user 1 expiring in 2100.
    const NONE_HEADER: &str = "eyJhbGciOiJub25lIiwidHlwIjoiSldUIn0";
    const RS256_HEADER: &str = "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9";
    const USER_1_PAYLOAD: &str =
        "eyJhdXRob3JpemVkIjp0cnVlLCJ1c2VyX2lkIjoxLCJpYXQiOjE3MDAwMDAwMDAsImV4cCI6NDEwMjQ0NDgwMH0";

    fn service(secret: &str) -> TokenService {
        TokenService::new(secret, Duration::hours(DEFAULT_TOKEN_TTL_HOURS)).unwrap()
    }

    #[test]
    fn test_token_generation_and_verification() {
        let tokens = service("test_secret_for_gen_verify");
        let token = tokens.issue(AccountId(1)).unwrap();
        assert_eq!(tokens.verify(&token).unwrap(), AccountId(1));
    }

    #[test]
    fn test_payload_carries_expected_claims() {
        let tokens = service("claims-secret");
        let issued_at = Utc::now();
        let token = tokens
            .issue_at(AccountId(42), Duration::hours(24), issued_at)
            .unwrap();

        let mut validation = TokenService::validation();
        validation.insecure_disable_signature_validation();
        let claims = decode::<Claims>(&token, &DecodingKey::from_secret(&[]), &validation)
            .unwrap()
            .claims;

        assert!(claims.authorized);
        assert_eq!(claims.user_id, AccountId(42));
        assert_eq!(claims.iat, issued_at.timestamp());
        assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
    }

    #[test]
    fn test_token_expiry_boundary() {
        let tokens = service("test_secret_for_expiration");
        let issued_at = Utc::now() - Duration::days(3);
        let token = tokens
            .issue_at(AccountId(2), Duration::hours(24), issued_at)
            .unwrap();

        let just_before = issued_at + Duration::hours(23) + Duration::minutes(59);
        assert_eq!(tokens.verify_at(&token, just_before), Ok(AccountId(2)));

        let just_after = issued_at + Duration::hours(24) + Duration::minutes(1);
        assert_eq!(tokens.verify_at(&token, just_after), Err(TokenError::Expired));

        // Wall clock is well past expiry as well.
        assert_eq!(tokens.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn test_invalid_token_signature() {
        let token = service("secret-one").issue(AccountId(3)).unwrap();
        match service("a_completely_different_secret").verify(&token) {
            Err(TokenError::Invalid(reason)) => assert!(reason.contains("InvalidSignature")),
            other => panic!("Expected InvalidSignature, got {:?}", other),
        }
    }

    #[test]
    fn test_none_algorithm_is_rejected() {
        let token = format!("{}.{}.", NONE_HEADER, USER_1_PAYLOAD);
        assert!(matches!(
            service("any-secret").verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_non_hmac_algorithm_is_rejected() {
        let token = format!("{}.{}.c2lnbmF0dXJl", RS256_HEADER, USER_1_PAYLOAD);
        match service("any-secret").verify(&token) {
            Err(TokenError::Invalid(reason)) => assert!(reason.contains("InvalidAlgorithm")),
            other => panic!("Expected InvalidAlgorithm, got {:?}", other),
        }
    }

    #[test]
    fn test_other_hmac_variants_are_accepted() {
        let secret = "hmac-family-secret";
        let claims = Claims {
            authorized: true,
            user_id: AccountId(9),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS512),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert_eq!(service(secret).verify(&token), Ok(AccountId(9)));
    }

    #[test]
    fn test_unauthorized_claim_is_rejected() {
        let secret = "authorized-flag-secret";
        let claims = Claims {
            authorized: false,
            user_id: AccountId(5),
            iat: Utc::now().timestamp(),
            exp: (Utc::now() + Duration::hours(1)).timestamp(),
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap();

        assert!(matches!(
            service(secret).verify(&token),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert!(matches!(
            service("s").verify("not-a-token"),
            Err(TokenError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_secret() {
        assert_eq!(
            TokenService::new("", Duration::hours(1)).err(),
            Some(TokenError::MissingSecret)
        );
    }
}
