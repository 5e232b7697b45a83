use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::{require_owned, AuthenticatedUserId, OwnerScope};
use crate::error::AppError;
use crate::files::FileStorage;
use crate::models::{Todo, TodoInput, TodoQuery, TodoStats, TodoUpdate};
use crate::store::TodoStore;

/// Todo operations for one authenticated caller.
///
/// Every method takes the caller's `AuthenticatedUserId`; single-record methods
/// turn it into an `OwnerScope` before the store is touched.
#[derive(Clone)]
pub struct TodoService {
    store: Arc<dyn TodoStore>,
    files: Arc<dyn FileStorage>,
}

impl TodoService {
    pub fn new(store: Arc<dyn TodoStore>, files: Arc<dyn FileStorage>) -> Self {
        Self { store, files }
    }

    pub async fn list(
        &self,
        subject: AuthenticatedUserId,
        query: &TodoQuery,
    ) -> Result<Vec<Todo>, AppError> {
        let todos = self.store.list_todos(subject.account_id(), query).await?;
        log::debug!(
            "listed {} todos for account {}",
            todos.len(),
            subject.account_id()
        );
        Ok(todos)
    }

    pub async fn create(
        &self,
        subject: AuthenticatedUserId,
        input: TodoInput,
    ) -> Result<Todo, AppError> {
        input.validate()?;
        let todo = self
            .store
            .insert_todo(Todo::new(input, subject.account_id()))
            .await?;
        log::info!("account {} created todo {}", subject.account_id(), todo.id);
        Ok(todo)
    }

    pub async fn get(&self, subject: AuthenticatedUserId, id: Uuid) -> Result<Todo, AppError> {
        let scope = OwnerScope::new(subject, id);
        require_owned(self.store.find_todo(scope).await?, &scope)
    }

    /// Applies a partial update. Omitted fields keep their stored values.
    pub async fn update(
        &self,
        subject: AuthenticatedUserId,
        id: Uuid,
        changes: TodoUpdate,
    ) -> Result<Todo, AppError> {
        changes.validate()?;
        let scope = OwnerScope::new(subject, id);
        let todo = require_owned(self.store.update_todo(scope, &changes).await?, &scope)?;
        log::info!("account {} updated todo {}", scope.owner(), id);
        Ok(todo)
    }

    /// Deletes the todo and, if it had one, its attachment file.
    pub async fn delete(&self, subject: AuthenticatedUserId, id: Uuid) -> Result<(), AppError> {
        let scope = OwnerScope::new(subject, id);
        let deleted = require_owned(self.store.delete_todo(scope).await?, &scope)?;
        if let Some(attachment) = deleted.attachment_url {
            self.discard(&attachment).await;
        }
        log::info!("account {} deleted todo {}", scope.owner(), id);
        Ok(())
    }

    /// Stores `bytes` as the todo's attachment, replacing any previous one.
    ///
    /// Ownership is checked before anything is written. If the todo disappears
    /// between the check and the update, the freshly stored file is removed again.
    /// The file being replaced is the one the store reports from the update itself,
    /// so an upload racing this one cannot leave its file behind.
    pub async fn attach(
        &self,
        subject: AuthenticatedUserId,
        id: Uuid,
        file_name: &str,
        bytes: &[u8],
    ) -> Result<Todo, AppError> {
        let scope = OwnerScope::new(subject, id);
        require_owned(self.store.find_todo(scope).await?, &scope)?;

        let stored_name = self.files.save(id, file_name, bytes).await?;
        let swap = match self.store.set_attachment(scope, &stored_name).await {
            Ok(Some(swap)) => swap,
            Ok(None) => {
                self.discard(&stored_name).await;
                return require_owned(None, &scope);
            }
            Err(e) => {
                self.discard(&stored_name).await;
                return Err(e.into());
            }
        };

        if let Some(previous) = swap.previous_attachment {
            if previous != stored_name {
                self.discard(&previous).await;
            }
        }
        Ok(swap.todo)
    }

    pub async fn stats(&self, subject: AuthenticatedUserId) -> Result<TodoStats, AppError> {
        let owner = subject.account_id();
        let total = self.store.count_todos(owner, None).await?;
        let completed = self.store.count_todos(owner, Some(true)).await?;
        Ok(TodoStats::from_counts(total, completed))
    }

    async fn discard(&self, stored_name: &str) {
        if let Err(e) = self.files.remove(stored_name).await {
            log::warn!("could not remove attachment {}: {}", stored_name, e);
        }
    }
}
