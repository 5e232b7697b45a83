use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::OwnerScope;
use crate::models::{
    Account, AccountId, AttachmentSwap, NewAccount, Todo, TodoQuery, TodoUpdate,
};
use crate::store::{AccountStore, StoreError, TodoStore};

#[derive(Default)]
struct Tables {
    next_account_id: i32,
    accounts: Vec<Account>,
    todos: HashMap<Uuid, Todo>,
}

/// In-process store with the same contract as `PgStore`.
///
/// Each operation holds the table lock for its whole duration, which gives the
/// same per-record atomicity the single SQL statements give in PostgreSQL.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn scoped<'a>(tables: &'a mut Tables, scope: &OwnerScope) -> Option<&'a mut Todo> {
    tables
        .todos
        .get_mut(&scope.id())
        .filter(|todo| todo.user_id == scope.owner())
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.accounts.iter().any(|a| a.username == account.username) {
            return Err(StoreError::UniqueViolation("users_username_key".into()));
        }
        if tables.accounts.iter().any(|a| a.email == account.email) {
            return Err(StoreError::UniqueViolation("users_email_key".into()));
        }

        tables.next_account_id += 1;
        let now = Utc::now();
        let created = Account {
            id: AccountId(tables.next_account_id),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            created_at: now,
            updated_at: now,
        };
        tables.accounts.push(created.clone());
        Ok(created)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let tables = self.tables.lock().await;
        Ok(tables.accounts.iter().find(|a| a.email == email).cloned())
    }
}

#[async_trait]
impl TodoStore for MemoryStore {
    async fn list_todos(
        &self,
        owner: AccountId,
        query: &TodoQuery,
    ) -> Result<Vec<Todo>, StoreError> {
        let tables = self.tables.lock().await;
        let mut todos: Vec<Todo> = tables
            .todos
            .values()
            .filter(|todo| todo.user_id == owner && query.matches(todo))
            .cloned()
            .collect();
        todos.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(todos)
    }

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, StoreError> {
        let mut tables = self.tables.lock().await;
        if tables.todos.contains_key(&todo.id) {
            return Err(StoreError::UniqueViolation("todos_pkey".into()));
        }
        tables.todos.insert(todo.id, todo.clone());
        Ok(todo)
    }

    async fn find_todo(&self, scope: OwnerScope) -> Result<Option<Todo>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(scoped(&mut tables, &scope).map(|todo| todo.clone()))
    }

    async fn update_todo(
        &self,
        scope: OwnerScope,
        changes: &TodoUpdate,
    ) -> Result<Option<Todo>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(scoped(&mut tables, &scope).map(|todo| {
            changes.apply(todo, Utc::now());
            todo.clone()
        }))
    }

    async fn set_attachment(
        &self,
        scope: OwnerScope,
        attachment: &str,
    ) -> Result<Option<AttachmentSwap>, StoreError> {
        let mut tables = self.tables.lock().await;
        Ok(scoped(&mut tables, &scope).map(|todo| {
            let previous_attachment = todo.attachment_url.replace(attachment.to_string());
            todo.updated_at = Utc::now();
            AttachmentSwap {
                todo: todo.clone(),
                previous_attachment,
            }
        }))
    }

    async fn delete_todo(&self, scope: OwnerScope) -> Result<Option<Todo>, StoreError> {
        let mut tables = self.tables.lock().await;
        if scoped(&mut tables, &scope).is_none() {
            return Ok(None);
        }
        Ok(tables.todos.remove(&scope.id()))
    }

    async fn count_todos(
        &self,
        owner: AccountId,
        completed: Option<bool>,
    ) -> Result<i64, StoreError> {
        let tables = self.tables.lock().await;
        let count = tables
            .todos
            .values()
            .filter(|todo| todo.user_id == owner)
            .filter(|todo| completed.map_or(true, |c| todo.completed == c))
            .count();
        Ok(count as i64)
    }
}
