use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenService};
use crate::files::FileStorage;
use crate::services::{AccountService, TodoService};
use crate::store::{AccountStore, TodoStore};

/// Shared application state, built once at startup and registered as
/// `web::Data<AppState>`. Read-only after construction.
#[derive(Clone)]
pub struct AppState {
    pub accounts: AccountService,
    pub todos: TodoService,
    pub tokens: Arc<TokenService>,
    /// Upper bound for a single attachment upload.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new<S>(
        store: Arc<S>,
        files: Arc<dyn FileStorage>,
        hasher: PasswordHasher,
        tokens: TokenService,
        max_upload_bytes: usize,
    ) -> Self
    where
        S: AccountStore + TodoStore + 'static,
    {
        let tokens = Arc::new(tokens);
        let accounts: Arc<dyn AccountStore> = store.clone();
        let todos: Arc<dyn TodoStore> = store;
        Self {
            accounts: AccountService::new(accounts, hasher, tokens.clone()),
            todos: TodoService::new(todos, files),
            tokens,
            max_upload_bytes,
        }
    }
}
