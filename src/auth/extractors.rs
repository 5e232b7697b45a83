use actix_web::dev::Payload;
use actix_web::{Error as ActixError, FromRequest, HttpMessage, HttpRequest};
use std::future::{ready, Ready};
use thiserror::Error;

use crate::auth::token::{TokenError, TokenService};
use crate::error::AppError;
use crate::models::AccountId;

/// The only accepted credential scheme. Compared case-sensitively.
pub const BEARER_SCHEME: &str = "Bearer";

/// Reasons a request fails to authenticate. They are logged, never returned:
/// every variant becomes the same `401 Unauthorized` response.
#[derive(Debug, Error, PartialEq)]
pub enum IdentityError {
    #[error("Authorization header is required")]
    MissingCredentials,

    #[error("Authorization header format must be Bearer {{token}}")]
    MalformedCredentials,

    #[error("Token rejected: {0}")]
    Unauthenticated(#[from] TokenError),
}

impl From<IdentityError> for AppError {
    fn from(_: IdentityError) -> AppError {
        AppError::Unauthorized
    }
}

/// Splits an `Authorization` header value into its token.
///
/// The value must be exactly `Bearer <token>`: two parts separated by a single
/// space, with the scheme spelled exactly `Bearer`.
pub fn bearer_token(header: Option<&str>) -> Result<&str, IdentityError> {
    let header = header.ok_or(IdentityError::MissingCredentials)?;
    let parts: Vec<&str> = header.split(' ').collect();
    match parts.as_slice() {
        [scheme, token] if *scheme == BEARER_SCHEME && !token.is_empty() => Ok(*token),
        _ => Err(IdentityError::MalformedCredentials),
    }
}

/// Resolves an `Authorization` header value into a verified subject.
pub fn authenticate(
    header: Option<&str>,
    tokens: &TokenService,
) -> Result<AuthenticatedUserId, IdentityError> {
    let token = bearer_token(header)?;
    let account_id = tokens.verify(token)?;
    Ok(AuthenticatedUserId(account_id))
}

/// The authenticated subject of the current request.
///
/// `AuthMiddleware` inserts this value into the request extensions after verifying
/// the bearer token. Handlers take it as an argument; because request extensions
/// live and die with the request, the identity never leaks into another request.
///
/// If the value is missing (e.g. the handler was mounted outside the middleware),
/// extraction fails with `AppError::Unauthorized`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthenticatedUserId(AccountId);

impl AuthenticatedUserId {
    pub(crate) fn new(account_id: AccountId) -> Self {
        Self(account_id)
    }

    pub fn account_id(&self) -> AccountId {
        self.0
    }
}

impl FromRequest for AuthenticatedUserId {
    type Error = ActixError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match req.extensions().get::<AuthenticatedUserId>().copied() {
            Some(subject) => ready(Ok(subject)),
            None => {
                log::error!(
                    "no authenticated subject on {}; is AuthMiddleware mounted?",
                    req.path()
                );
                ready(Err(AppError::Unauthorized.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::dev::Payload;
    use actix_web::http::StatusCode;
    use actix_web::test as actix_test;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn tokens() -> TokenService {
        TokenService::new("extractor-secret", Duration::hours(24)).unwrap()
    }

    #[test]
    fn test_bearer_token_shapes() {
        assert_eq!(bearer_token(None), Err(IdentityError::MissingCredentials));
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Ok("abc.def.ghi"));

        for malformed in [
            "",
            "Bearer",
            "Bearer ",
            "bearer abc",
            "BEARER abc",
            "Basic abc",
            "Bearer  abc",
            "Bearer abc def",
            "abc",
        ] {
            assert_eq!(
                bearer_token(Some(malformed)),
                Err(IdentityError::MalformedCredentials),
                "{:?} should be malformed",
                malformed
            );
        }
    }

    #[test]
    fn test_authenticate_resolves_subject() {
        let tokens = tokens();
        let header = format!("Bearer {}", tokens.issue(AccountId(11)).unwrap());
        let subject = authenticate(Some(&header), &tokens).unwrap();
        assert_eq!(subject.account_id(), AccountId(11));
    }

    #[test]
    fn test_authenticate_rejects_foreign_token() {
        let foreign = TokenService::new("other-secret", Duration::hours(24)).unwrap();
        let header = format!("Bearer {}", foreign.issue(AccountId(11)).unwrap());
        assert!(matches!(
            authenticate(Some(&header), &tokens()),
            Err(IdentityError::Unauthenticated(TokenError::Invalid(_)))
        ));
    }

    #[actix_rt::test]
    async fn test_authenticated_user_id_extractor_success() {
        let req = actix_test::TestRequest::default().to_http_request();
        req.extensions_mut()
            .insert(AuthenticatedUserId::new(AccountId(123)));

        let mut payload = Payload::None;
        let extracted = AuthenticatedUserId::from_request(&req, &mut payload)
            .await
            .unwrap();
        assert_eq!(extracted.account_id(), AccountId(123));
    }

    #[actix_rt::test]
    async fn test_authenticated_user_id_extractor_failure() {
        let req = actix_test::TestRequest::default().to_http_request();
        // A bare integer is not an identity.
        req.extensions_mut().insert(123_i32);

        let mut payload = Payload::None;
        let err = AuthenticatedUserId::from_request(&req, &mut payload)
            .await
            .unwrap_err();
        assert_eq!(err.error_response().status(), StatusCode::UNAUTHORIZED);
    }
}
