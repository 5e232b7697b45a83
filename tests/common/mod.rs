#![allow(dead_code)]

use actix_http::Request;
use actix_web::{
    body::MessageBody,
    dev::{Service, ServiceFactory, ServiceRequest, ServiceResponse},
    http::{header, StatusCode},
    test, web, App, ResponseError,
};
use chrono::Duration;
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;

use todolist::auth::password::MIN_COST;
use todolist::auth::{PasswordHasher, TokenService};
use todolist::files::LocalFileStorage;
use todolist::routes;
use todolist::state::AppState;
use todolist::store::MemoryStore;

pub const TEST_SECRET: &str = "integration-test-secret";

/// App state over an in-memory store and a throwaway upload directory.
/// Keep the `TempDir` alive for as long as the app is used.
pub fn test_state() -> (web::Data<AppState>, TempDir) {
    let dir = tempfile::tempdir().unwrap();
    let state = AppState::new(
        Arc::new(MemoryStore::new()),
        Arc::new(LocalFileStorage::new(dir.path())),
        PasswordHasher::new(MIN_COST).unwrap(),
        TokenService::new(TEST_SECRET, Duration::hours(24)).unwrap(),
        1024,
    );
    (web::Data::new(state), dir)
}

pub fn app(
    state: web::Data<AppState>,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new().app_data(state).configure(routes::config)
}

/// Calls the app and returns status and raw body. Errors raised by middleware
/// are rendered the same way the HTTP server would render them.
pub async fn call<S, B>(app: &S, req: Request) -> (StatusCode, web::Bytes)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    match test::try_call_service(app, req).await {
        Ok(resp) => {
            let status = resp.status();
            (status, test::read_body(resp).await)
        }
        Err(err) => {
            let resp = err.as_response_error().error_response();
            let status = resp.status();
            let body = actix_web::body::to_bytes(resp.into_body()).await.unwrap();
            (status, body)
        }
    }
}

pub async fn call_json<S, B>(app: &S, req: Request) -> (StatusCode, Value)
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let (status, body) = call(app, req).await;
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

pub async fn register<S, B>(app: &S, username: &str, email: &str, password: &str) -> Value
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/register")
        .set_json(json!({ "username": username, "email": email, "password": password }))
        .to_request();
    let (status, body) = call_json(app, req).await;
    assert_eq!(status, StatusCode::CREATED, "register failed: {}", body);
    body
}

pub async fn login<S, B>(app: &S, email: &str, password: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/v1/login")
        .set_json(json!({ "email": email, "password": password }))
        .to_request();
    let (status, body) = call_json(app, req).await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body["token"].as_str().unwrap().to_string()
}

/// Registers `username` and returns a bearer token for it.
pub async fn sign_up<S, B>(app: &S, username: &str) -> String
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
    B: MessageBody,
{
    let email = format!("{}@x.com", username);
    register(app, username, &email, "secret1").await;
    login(app, &email, "secret1").await
}

pub fn bearer(token: &str) -> (header::HeaderName, String) {
    (header::AUTHORIZATION, format!("Bearer {}", token))
}
