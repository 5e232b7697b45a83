//! Persistence capabilities consumed by the services.
//!
//! The services only see these traits. `PgStore` backs them with PostgreSQL;
//! `MemoryStore` keeps everything in process and is used by the test suites.
//! Every single-record todo operation takes an [`OwnerScope`] and must apply its
//! id and owner in the same statement.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::auth::OwnerScope;
use crate::models::{
    Account, AccountId, AttachmentSwap, NewAccount, Todo, TodoQuery, TodoUpdate,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Store-level failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// An insert collided with a unique constraint.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("Database error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let Some(db_err) = error.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(
                    db_err.constraint().unwrap_or("unknown").to_string(),
                );
            }
        }
        StoreError::Backend(error.to_string())
    }
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Inserts an account.
    ///
    /// # Errors
    /// * `UniqueViolation` - username or email is already taken
    /// * `Backend` - the store failed
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError>;

    /// Looks up an account by its (normalized) email.
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;
}

#[async_trait]
pub trait TodoStore: Send + Sync {
    /// Lists the owner's todos, newest first.
    async fn list_todos(&self, owner: AccountId, query: &TodoQuery)
        -> Result<Vec<Todo>, StoreError>;

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, StoreError>;

    async fn find_todo(&self, scope: OwnerScope) -> Result<Option<Todo>, StoreError>;

    /// Applies a partial update. Returns `None` if no todo matches the scope.
    async fn update_todo(
        &self,
        scope: OwnerScope,
        changes: &TodoUpdate,
    ) -> Result<Option<Todo>, StoreError>;

    /// Records the stored attachment name and returns the name it replaced, read
    /// atomically with the write. Returns `None` if no todo matches the scope.
    async fn set_attachment(
        &self,
        scope: OwnerScope,
        attachment: &str,
    ) -> Result<Option<AttachmentSwap>, StoreError>;

    /// Deletes the todo and returns it as it was at deletion.
    /// Returns `None` if no todo matches the scope.
    async fn delete_todo(&self, scope: OwnerScope) -> Result<Option<Todo>, StoreError>;

    /// Counts the owner's todos, optionally only those with the given completion state.
    async fn count_todos(
        &self,
        owner: AccountId,
        completed: Option<bool>,
    ) -> Result<i64, StoreError>;
}
