use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::AccountId;

/// Input structure for creating a todo.
/// Contains validation rules for its fields.
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct TodoInput {
    /// The title of the todo.
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub title: String,

    /// An optional description. Maximum length of 1000 characters.
    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: Option<String>,

    /// Initial completion state, `false` when omitted.
    #[serde(default)]
    pub completed: Option<bool>,

    /// Optional due date for the todo.
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

/// Partial update of a todo.
///
/// Omitted fields are left unchanged. `due_date` distinguishes an omitted field
/// (`None`) from an explicit `null` (`Some(None)`), which clears the due date.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct TodoUpdate {
    #[validate(length(min = 1, max = 200))]
    #[serde(default)]
    pub title: Option<String>,

    #[validate(length(max = 1000))]
    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub completed: Option<bool>,

    #[serde(default, deserialize_with = "present")]
    pub due_date: Option<Option<DateTime<Utc>>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TodoUpdate {
    /// Applies the supplied fields to `todo` and bumps `updated_at`.
    pub fn apply(&self, todo: &mut Todo, now: DateTime<Utc>) {
        if let Some(title) = &self.title {
            todo.title = title.clone();
        }
        if let Some(description) = &self.description {
            todo.description = description.clone();
        }
        if let Some(completed) = self.completed {
            todo.completed = completed;
        }
        if let Some(due_date) = self.due_date {
            todo.due_date = due_date;
        }
        todo.updated_at = now;
    }
}

/// Represents a todo as stored in the database and returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Todo {
    /// Unique identifier for the todo (UUID v4).
    pub id: Uuid,
    /// Identifier of the account that owns the todo.
    pub user_id: AccountId,
    pub title: String,
    pub description: String,
    pub completed: bool,
    pub due_date: Option<DateTime<Utc>>,
    /// Stored name of the attached file, served under `/uploads/`.
    pub attachment_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    /// Creates a new `Todo` owned by `owner` from validated input.
    pub fn new(input: TodoInput, owner: AccountId) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id: owner,
            title: input.title,
            description: input.description.unwrap_or_default(),
            completed: input.completed.unwrap_or(false),
            due_date: input.due_date,
            attachment_url: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of recording a new attachment: the updated todo and the stored name it
/// replaced, both read in the same write.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct AttachmentSwap {
    #[sqlx(flatten)]
    pub todo: Todo,
    pub previous_attachment: Option<String>,
}

/// Query parameters for listing todos. Listing is always scoped to the caller.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TodoQuery {
    /// Filter by completion state.
    pub completed: Option<bool>,
    /// Case-insensitive match against title or description.
    pub search: Option<String>,
}

impl TodoQuery {
    pub fn matches(&self, todo: &Todo) -> bool {
        if let Some(completed) = self.completed {
            if todo.completed != completed {
                return false;
            }
        }
        match self.search.as_deref().map(str::to_lowercase) {
            Some(needle) => {
                todo.title.to_lowercase().contains(&needle)
                    || todo.description.to_lowercase().contains(&needle)
            }
            None => true,
        }
    }
}

/// Completion statistics for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodoStats {
    pub total: i64,
    pub completed: i64,
    pub active: i64,
}

impl TodoStats {
    /// Builds stats from two counts. The counts come from separate queries, so
    /// `completed` is capped at `total` to keep `active` non-negative.
    pub fn from_counts(total: i64, completed: i64) -> Self {
        let completed = completed.min(total);
        Self {
            total,
            completed,
            active: total - completed,
        }
    }
}
