use actix_multipart::Multipart;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use futures::TryStreamExt;
use uuid::Uuid;

use crate::{
    auth::AuthenticatedUserId,
    error::AppError,
    models::{TodoInput, TodoQuery, TodoUpdate},
    state::AppState,
};

/// Multipart field that carries the attachment.
pub const ATTACHMENT_FIELD: &str = "attachment";

/// Lists the caller's todos, newest first.
///
/// ## Query Parameters:
/// - `completed` (optional): only todos in this completion state.
/// - `search` (optional): case-insensitive match on title or description.
#[get("")]
pub async fn get_todos(
    state: web::Data<AppState>,
    subject: AuthenticatedUserId,
    query: web::Query<TodoQuery>,
) -> Result<impl Responder, AppError> {
    let todos = state.todos.list(subject, &query).await?;
    Ok(HttpResponse::Ok().json(todos))
}

/// Creates a todo owned by the caller.
///
/// ## Responses:
/// - `201 Created`: the new todo.
/// - `400 Bad Request`: empty or overlong title, overlong description.
#[post("")]
pub async fn create_todo(
    state: web::Data<AppState>,
    subject: AuthenticatedUserId,
    todo_data: web::Json<TodoInput>,
) -> Result<impl Responder, AppError> {
    let todo = state.todos.create(subject, todo_data.into_inner()).await?;
    Ok(HttpResponse::Created().json(todo))
}

/// `{total, completed, active}` for the caller's todos.
#[get("/stats")]
pub async fn get_stats(
    state: web::Data<AppState>,
    subject: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let stats = state.todos.stats(subject).await?;
    Ok(HttpResponse::Ok().json(stats))
}

/// Retrieves one todo.
///
/// ## Responses:
/// - `200 OK`: the todo.
/// - `404 Not Found`: no such todo, or it belongs to another account. The two
///   cases are indistinguishable.
#[get("/{id}")]
pub async fn get_todo(
    state: web::Data<AppState>,
    subject: AuthenticatedUserId,
    todo_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    let todo = state.todos.get(subject, todo_id.into_inner()).await?;
    Ok(HttpResponse::Ok().json(todo))
}

/// Partially updates a todo. Fields missing from the body keep their values;
/// `"due_date": null` clears the due date.
#[put("/{id}")]
pub async fn update_todo(
    state: web::Data<AppState>,
    subject: AuthenticatedUserId,
    todo_id: web::Path<Uuid>,
    changes: web::Json<TodoUpdate>,
) -> Result<impl Responder, AppError> {
    let todo = state
        .todos
        .update(subject, todo_id.into_inner(), changes.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(todo))
}

/// Deletes a todo and its attachment.
///
/// ## Responses:
/// - `204 No Content`: deleted.
/// - `404 Not Found`: no such todo visible to the caller.
#[delete("/{id}")]
pub async fn delete_todo(
    state: web::Data<AppState>,
    subject: AuthenticatedUserId,
    todo_id: web::Path<Uuid>,
) -> Result<impl Responder, AppError> {
    state.todos.delete(subject, todo_id.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Uploads a file into the `attachment` multipart field and links it to the todo.
///
/// The body is read in chunks and rejected once it exceeds `max_upload_bytes`.
/// Other fields are drained and ignored.
#[post("/{id}/upload")]
pub async fn upload_attachment(
    state: web::Data<AppState>,
    subject: AuthenticatedUserId,
    todo_id: web::Path<Uuid>,
    mut payload: Multipart,
) -> Result<impl Responder, AppError> {
    let mut upload: Option<(String, Vec<u8>)> = None;

    while let Some(mut field) = payload.try_next().await? {
        let (name, file_name) = {
            let disposition = field.content_disposition();
            (
                disposition.get_name().map(str::to_string),
                disposition.get_filename().map(str::to_string),
            )
        };

        let wanted = upload.is_none() && name.as_deref() == Some(ATTACHMENT_FIELD);
        let file_name = match file_name {
            Some(file_name) if wanted => file_name,
            _ => {
                while field.try_next().await?.is_some() {}
                continue;
            }
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.try_next().await? {
            if bytes.len() + chunk.len() > state.max_upload_bytes {
                return Err(AppError::BadRequest(format!(
                    "File exceeds the {} byte limit",
                    state.max_upload_bytes
                )));
            }
            bytes.extend_from_slice(&chunk);
        }
        upload = Some((file_name, bytes));
    }

    let (file_name, bytes) =
        upload.ok_or_else(|| AppError::BadRequest("File not provided".into()))?;
    let todo = state
        .todos
        .attach(subject, todo_id.into_inner(), &file_name, &bytes)
        .await?;
    Ok(HttpResponse::Ok().json(todo))
}
