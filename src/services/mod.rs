pub mod accounts;
pub mod todos;

pub use accounts::AccountService;
pub use todos::TodoService;

use crate::error::AppError;

/// Runs CPU-heavy work (bcrypt) on the blocking thread pool.
pub(crate) async fn run_blocking<F, R>(work: F) -> Result<R, AppError>
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    actix_web::web::block(work)
        .await
        .map_err(|e| AppError::InternalServerError(format!("blocking task failed: {}", e)))
}
