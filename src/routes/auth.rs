use actix_web::{post, web, HttpResponse, Responder};

use crate::{
    auth::{LoginRequest, RegisterRequest},
    error::AppError,
    state::AppState,
};

/// Register a new account
///
/// ## Responses:
/// - `201 Created`: the account view (never the password hash).
/// - `400 Bad Request`: validation failed, with per-field details.
/// - `409 Conflict`: the username or email is already registered.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    let account = state.accounts.register(register_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(account))
}

/// Log in with email and password
///
/// ## Responses:
/// - `200 OK`: `{token, user: {id, username, email}}`.
/// - `401 Unauthorized`: "Invalid email or password", for an unknown email and a
///   wrong password alike.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    let response = state.accounts.login(login_data.into_inner()).await?;
    Ok(HttpResponse::Ok().json(response))
}
