//!
//! # Custom Error Handling
//!
//! This module defines the custom error type `AppError` used throughout the application.
//! Every failure that leaves a service or a handler is one of these categories, and each
//! category renders a fixed, caller-safe message. Internal detail (driver errors, file
//! system errors, hashing failures) is carried only for logging and never reaches the
//! response body.
//!
//! `AppError` implements `actix_web::error::ResponseError` to seamlessly convert
//! application errors into appropriate HTTP responses with JSON bodies.
//! It also provides `From` implementations for the error types of the layers below
//! (`validator`, the token and password services, the stores and the file storage),
//! allowing for easy conversion using the `?` operator.

use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use serde_json::json;
use std::fmt;
use validator::ValidationErrors;

use crate::auth::password::PasswordError;
use crate::auth::token::TokenError;
use crate::files::StorageError;
use crate::store::StoreError;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized";
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid email or password";
pub const DUPLICATE_ACCOUNT_MESSAGE: &str = "Email or username already exists";
pub const NOT_FOUND_MESSAGE: &str = "Todo not found or you don't have permission";
pub const INTERNAL_MESSAGE: &str = "Internal server error";

/// Represents all possible errors that can occur within the application.
#[derive(Debug)]
pub enum AppError {
    /// Missing, malformed, invalid or expired credentials (HTTP 401).
    /// The cause is logged where it is detected; the response is always the same.
    Unauthorized,
    /// Login with an unknown email or a wrong password (HTTP 401).
    InvalidCredentials,
    /// A malformed request that is not a field validation failure (HTTP 400).
    BadRequest(String),
    /// Failed input validation, reported per field (HTTP 400).
    ValidationError(ValidationErrors),
    /// Registration collided with an existing username or email (HTTP 409).
    DuplicateAccount,
    /// The record does not exist or belongs to another account (HTTP 404).
    NotFound,
    /// An unexpected server-side error (HTTP 500).
    /// The message is logged and replaced by a generic one in the response.
    InternalServerError(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            AppError::Unauthorized => write!(f, "{}", UNAUTHORIZED_MESSAGE),
            AppError::InvalidCredentials => write!(f, "{}", INVALID_CREDENTIALS_MESSAGE),
            AppError::BadRequest(msg) => write!(f, "Bad Request: {}", msg),
            AppError::ValidationError(errors) => write!(f, "Validation Error: {}", errors),
            AppError::DuplicateAccount => write!(f, "{}", DUPLICATE_ACCOUNT_MESSAGE),
            AppError::NotFound => write!(f, "{}", NOT_FOUND_MESSAGE),
            AppError::InternalServerError(msg) => write!(f, "Internal Server Error: {}", msg),
        }
    }
}

/// Converts `AppError` variants into `HttpResponse` objects.
///
/// This implementation allows Actix Web to automatically translate `AppError`
/// results from handlers and middleware into the correct HTTP status codes and
/// JSON error responses.
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::DuplicateAccount => StatusCode::CONFLICT,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut builder = HttpResponse::build(self.status_code());
        match self {
            AppError::Unauthorized => builder.json(json!({ "error": UNAUTHORIZED_MESSAGE })),
            AppError::InvalidCredentials => {
                builder.json(json!({ "error": INVALID_CREDENTIALS_MESSAGE }))
            }
            AppError::BadRequest(msg) => builder.json(json!({ "error": msg })),
            AppError::ValidationError(errors) => builder.json(json!({
                "error": "Validation failed",
                "fields": errors.field_errors()
            })),
            AppError::DuplicateAccount => {
                builder.json(json!({ "error": DUPLICATE_ACCOUNT_MESSAGE }))
            }
            AppError::NotFound => builder.json(json!({ "error": NOT_FOUND_MESSAGE })),
            AppError::InternalServerError(msg) => {
                log::error!("internal error: {}", msg);
                builder.json(json!({ "error": INTERNAL_MESSAGE }))
            }
        }
    }
}

/// Converts `validator::ValidationErrors` into `AppError::ValidationError`.
///
/// The per-field errors are preserved and rendered in the response.
impl From<ValidationErrors> for AppError {
    fn from(error: ValidationErrors) -> AppError {
        AppError::ValidationError(error)
    }
}

/// Rejected tokens become `Unauthorized`; a token service that cannot sign is an
/// internal failure.
impl From<TokenError> for AppError {
    fn from(error: TokenError) -> AppError {
        match error {
            TokenError::Invalid(_) | TokenError::Expired => AppError::Unauthorized,
            TokenError::MissingSecret | TokenError::Encoding(_) => {
                AppError::InternalServerError(error.to_string())
            }
        }
    }
}

impl From<PasswordError> for AppError {
    fn from(error: PasswordError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

/// Store failures are internal. Uniqueness violations are only meaningful for
/// account registration, which maps them itself before reaching this conversion.
impl From<StoreError> for AppError {
    fn from(error: StoreError) -> AppError {
        AppError::InternalServerError(error.to_string())
    }
}

impl From<StorageError> for AppError {
    fn from(error: StorageError) -> AppError {
        match error {
            StorageError::InvalidName(name) => {
                AppError::BadRequest(format!("Invalid file name: {}", name))
            }
            other => AppError::InternalServerError(other.to_string()),
        }
    }
}

impl From<actix_multipart::MultipartError> for AppError {
    fn from(error: actix_multipart::MultipartError) -> AppError {
        AppError::BadRequest(format!("Invalid multipart body: {}", error))
    }
}
