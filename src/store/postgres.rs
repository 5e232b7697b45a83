use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;

use crate::auth::OwnerScope;
use crate::models::{
    Account, AccountId, AttachmentSwap, NewAccount, Todo, TodoQuery, TodoUpdate,
};
use crate::store::{AccountStore, StoreError, TodoStore};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at";
const TODO_COLUMNS: &str =
    "id, user_id, title, description, completed, due_date, attachment_url, created_at, updated_at";
const TODO_COLUMNS_QUALIFIED: &str = "t.id, t.user_id, t.title, t.description, t.completed, \
     t.due_date, t.attachment_url, t.created_at, t.updated_at";

/// Escapes `LIKE` wildcards so a search term matches literally.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// PostgreSQL-backed store. The pool is created once at startup and cloned cheaply.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn insert_account(&self, account: NewAccount) -> Result<Account, StoreError> {
        let sql = format!(
            "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING {}",
            ACCOUNT_COLUMNS
        );
        let created = sqlx::query_as::<_, Account>(&sql)
            .bind(&account.username)
            .bind(&account.email)
            .bind(&account.password_hash)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", ACCOUNT_COLUMNS);
        let account = sqlx::query_as::<_, Account>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(account)
    }
}

#[async_trait]
impl TodoStore for PgStore {
    async fn list_todos(
        &self,
        owner: AccountId,
        query: &TodoQuery,
    ) -> Result<Vec<Todo>, StoreError> {
        // Optional filters are bound as NULL when absent, so the statement is fixed.
        let sql = format!(
            "SELECT {} FROM todos \
             WHERE user_id = $1 \
               AND ($2::BOOLEAN IS NULL OR completed = $2) \
               AND ($3::TEXT IS NULL OR title ILIKE $3 OR description ILIKE $3) \
             ORDER BY created_at DESC",
            TODO_COLUMNS
        );
        let search_pattern = query
            .search
            .as_deref()
            .map(|s| format!("%{}%", escape_like(s)));
        let todos = sqlx::query_as::<_, Todo>(&sql)
            .bind(owner)
            .bind(query.completed)
            .bind(search_pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(todos)
    }

    async fn insert_todo(&self, todo: Todo) -> Result<Todo, StoreError> {
        let sql = format!(
            "INSERT INTO todos (id, user_id, title, description, completed, due_date, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {}",
            TODO_COLUMNS
        );
        let created = sqlx::query_as::<_, Todo>(&sql)
            .bind(todo.id)
            .bind(todo.user_id)
            .bind(&todo.title)
            .bind(&todo.description)
            .bind(todo.completed)
            .bind(todo.due_date)
            .bind(todo.created_at)
            .bind(todo.updated_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn find_todo(&self, scope: OwnerScope) -> Result<Option<Todo>, StoreError> {
        let sql = format!(
            "SELECT {} FROM todos WHERE id = $1 AND user_id = $2",
            TODO_COLUMNS
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(scope.id())
            .bind(scope.owner())
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn update_todo(
        &self,
        scope: OwnerScope,
        changes: &TodoUpdate,
    ) -> Result<Option<Todo>, StoreError> {
        // Ownership filter and write in one statement.
        let sql = format!(
            "UPDATE todos SET \
                title = COALESCE($3, title), \
                description = COALESCE($4, description), \
                completed = COALESCE($5, completed), \
                due_date = CASE WHEN $6::BOOLEAN THEN $7::TIMESTAMPTZ ELSE due_date END, \
                updated_at = $8 \
             WHERE id = $1 AND user_id = $2 \
             RETURNING {}",
            TODO_COLUMNS
        );
        let todo = sqlx::query_as::<_, Todo>(&sql)
            .bind(scope.id())
            .bind(scope.owner())
            .bind(changes.title.as_deref())
            .bind(changes.description.as_deref())
            .bind(changes.completed)
            .bind(changes.due_date.is_some())
            .bind(changes.due_date.flatten())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        Ok(todo)
    }

    async fn set_attachment(
        &self,
        scope: OwnerScope,
        attachment: &str,
    ) -> Result<Option<AttachmentSwap>, StoreError> {
        // The row lock makes concurrent uploads see each other's names.
        let sql = format!(
            "WITH previous AS ( \
                 SELECT id, attachment_url FROM todos \
                 WHERE id = $1 AND user_id = $2 \
                 FOR UPDATE \
             ) \
             UPDATE todos t SET attachment_url = $3, updated_at = $4 \
             FROM previous \
             WHERE t.id = previous.id \
             RETURNING {}, previous.attachment_url AS previous_attachment",
            TODO_COLUMNS_QUALIFIED
        );
        let swap = sqlx::query_as::<_, AttachmentSwap>(&sql)
            .bind(scope.id())
            .bind(scope.owner())
            .bind(attachment)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await?;
        Ok(swap)
    }

    async fn delete_todo(&self, scope: OwnerScope) -> Result<Option<Todo>, StoreError> {
        let sql = format!(
            "DELETE FROM todos WHERE id = $1 AND user_id = $2 RETURNING {}",
            TODO_COLUMNS
        );
        let deleted = sqlx::query_as::<_, Todo>(&sql)
            .bind(scope.id())
            .bind(scope.owner())
            .fetch_optional(&self.pool)
            .await?;
        Ok(deleted)
    }

    async fn count_todos(
        &self,
        owner: AccountId,
        completed: Option<bool>,
    ) -> Result<i64, StoreError> {
        let (count,) = sqlx::query_as::<_, (i64,)>(
            "SELECT COUNT(*) FROM todos \
             WHERE user_id = $1 AND ($2::BOOLEAN IS NULL OR completed = $2)",
        )
        .bind(owner)
        .bind(completed)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50% off"), "50\\% off");
        assert_eq!(escape_like("snake_case"), "snake\\_case");
        assert_eq!(escape_like("plain"), "plain");
    }
}
