use actix_web::{get, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

/// Health check endpoint
///
/// Returns the current status of the API and timestamp.
#[get("/health")]
pub async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "timestamp": Utc::now()
    }))
}

/// Liveness check.
#[get("/ping")]
pub async fn ping() -> impl Responder {
    HttpResponse::Ok().json(json!({ "message": "pong" }))
}
