pub mod auth;
pub mod health;
pub mod todos;

use actix_web::{
    error::{JsonPayloadError, PathError, QueryPayloadError},
    web, HttpRequest,
};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Renders JSON body errors through `AppError` so they share the error body shape.
fn json_error_handler(err: JsonPayloadError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("rejected JSON body on {}: {}", req.path(), err);
    AppError::BadRequest(format!("Invalid JSON body: {}", err)).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid query string: {}", err)).into()
}

/// An id that does not parse cannot name a visible todo.
fn path_error_handler(err: PathError, req: &HttpRequest) -> actix_web::Error {
    log::debug!("unparseable id in {}: {}", req.path(), err);
    AppError::NotFound.into()
}

/// Registers every route of the API.
///
/// `/health` and `/ping` are public, as are registration and login. The todo
/// scope sits behind `AuthMiddleware`. `/stats` is registered before `/{id}` so
/// it is not parsed as an id.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .service(health::health)
        .service(health::ping)
        .service(
            web::scope("/api/v1")
                .service(auth::register)
                .service(auth::login)
                .service(
                    web::scope("/todos")
                        .wrap(AuthMiddleware)
                        .app_data(web::QueryConfig::default().error_handler(query_error_handler))
                        .app_data(web::PathConfig::default().error_handler(path_error_handler))
                        .service(todos::get_todos)
                        .service(todos::create_todo)
                        .service(todos::get_stats)
                        .service(todos::get_todo)
                        .service(todos::update_todo)
                        .service(todos::delete_todo)
                        .service(todos::upload_attachment),
                ),
        );
}
