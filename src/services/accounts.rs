use std::sync::Arc;
use validator::Validate;

use crate::auth::{normalize_email, LoginRequest, LoginResponse, PasswordHasher, RegisterRequest};
use crate::auth::TokenService;
use crate::error::AppError;
use crate::models::{AccountSummary, AccountView, NewAccount};
use crate::services::run_blocking;
use crate::store::{AccountStore, StoreError};

/// Registration and login.
///
/// Every failure leaves this service as one of the uniform `AppError` categories:
/// a taken username and a taken email are the same `DuplicateAccount`, and an
/// unknown email and a wrong password are the same `InvalidCredentials`.
#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn AccountStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenService>,
}

impl AccountService {
    pub fn new(
        store: Arc<dyn AccountStore>,
        hasher: PasswordHasher,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Creates an account and returns its public view.
    ///
    /// # Errors
    /// * `ValidationError` - username, email or password fails validation
    /// * `DuplicateAccount` - username or email is already registered
    /// * `InternalServerError` - hashing or the store failed
    pub async fn register(&self, request: RegisterRequest) -> Result<AccountView, AppError> {
        request.validate()?;

        let hasher = self.hasher.clone();
        let password = request.password;
        let password_hash = run_blocking(move || hasher.hash(&password)).await??;

        let new_account = NewAccount {
            username: request.username,
            email: normalize_email(&request.email),
            password_hash,
        };

        match self.store.insert_account(new_account).await {
            Ok(account) => {
                log::info!("registered account {}", account.id);
                Ok(AccountView::from(&account))
            }
            Err(StoreError::UniqueViolation(constraint)) => {
                log::info!("registration rejected by {}", constraint);
                Err(AppError::DuplicateAccount)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Verifies credentials and issues a session token.
    ///
    /// An unknown email still costs one bcrypt verification (against a decoy hash),
    /// so both failure paths take comparable time as well as returning the same error.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, AppError> {
        request.validate()?;

        let email = normalize_email(&request.email);
        let account = self.store.find_account_by_email(&email).await?;

        let hasher = self.hasher.clone();
        let password = request.password;
        let (account, verified) = run_blocking(move || match account {
            Some(account) => {
                let verified = hasher.verify(&password, &account.password_hash);
                (Some(account), verified)
            }
            None => {
                hasher.verify_decoy(&password);
                (None, Ok(false))
            }
        })
        .await?;

        match (account, verified?) {
            (Some(account), true) => {
                let token = self.tokens.issue(account.id)?;
                log::info!("account {} logged in", account.id);
                Ok(LoginResponse {
                    token,
                    user: AccountSummary::from(&account),
                })
            }
            _ => {
                log::info!("failed login attempt");
                Err(AppError::InvalidCredentials)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::MIN_COST;
    use crate::models::AccountId;
    use crate::store::MemoryStore;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    fn service() -> (AccountService, Arc<TokenService>) {
        let tokens = Arc::new(TokenService::new("account-secret", Duration::hours(24)).unwrap());
        let service = AccountService::new(
            Arc::new(MemoryStore::new()),
            PasswordHasher::new(MIN_COST).unwrap(),
            tokens.clone(),
        );
        (service, tokens)
    }

    fn register_request(username: &str, email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: username.into(),
            email: email.into(),
            password: password.into(),
        }
    }

    fn login_request(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[actix_rt::test]
    async fn test_register_returns_view() {
        let (service, _) = service();
        let view = service
            .register(register_request("alice", "alice@x.com", "secret1"))
            .await
            .unwrap();

        assert_eq!(view.id, AccountId(1));
        assert_eq!(view.username, "alice");
        assert_eq!(view.email, "alice@x.com");
    }

    #[actix_rt::test]
    async fn test_duplicate_email_or_username() {
        let (service, _) = service();
        service
            .register(register_request("alice", "alice@x.com", "secret1"))
            .await
            .unwrap();

        let same_email = service
            .register(register_request("alice2", "ALICE@x.com", "secret1"))
            .await;
        assert!(matches!(same_email, Err(AppError::DuplicateAccount)));

        let same_username = service
            .register(register_request("alice", "other@x.com", "secret1"))
            .await;
        assert!(matches!(same_username, Err(AppError::DuplicateAccount)));
    }

    #[actix_rt::test]
    async fn test_register_validation() {
        let (service, _) = service();
        let short_password = service
            .register(register_request("bob", "bob@x.com", "12345"))
            .await;
        assert!(matches!(short_password, Err(AppError::ValidationError(_))));

        let bad_email = service
            .register(register_request("bob", "not-an-email", "secret1"))
            .await;
        assert!(matches!(bad_email, Err(AppError::ValidationError(_))));
    }

    #[actix_rt::test]
    async fn test_login_issues_verifiable_token() {
        let (service, tokens) = service();
        let view = service
            .register(register_request("alice", "alice@x.com", "secret1"))
            .await
            .unwrap();

        let response = service
            .login(login_request("alice@x.com", "secret1"))
            .await
            .unwrap();
        assert!(!response.token.is_empty());
        assert_eq!(response.user.id, view.id);
        assert_eq!(tokens.verify(&response.token).unwrap(), view.id);
    }

    #[actix_rt::test]
    async fn test_multibyte_password_prefix_does_not_log_in() {
        let (service, _) = service();
        let overlong = service
            .register(register_request("dana", "dana@x.com", &"é".repeat(50)))
            .await;
        assert!(matches!(overlong, Err(AppError::ValidationError(_))));

        let stored = "é".repeat(36);
        service
            .register(register_request("dana", "dana@x.com", &stored))
            .await
            .unwrap();

        let same_prefix = format!("{}DIFFERENT", stored);
        let result = service.login(login_request("dana@x.com", &same_prefix)).await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));

        service.login(login_request("dana@x.com", &stored)).await.unwrap();
    }

    #[actix_rt::test]
    async fn test_login_failures_are_indistinguishable() {
        let (service, _) = service();
        service
            .register(register_request("alice", "alice@x.com", "secret1"))
            .await
            .unwrap();

        let wrong_password = service.login(login_request("alice@x.com", "wrongpass")).await;
        let unknown_email = service.login(login_request("nobody@x.com", "secret1")).await;

        assert!(matches!(wrong_password, Err(AppError::InvalidCredentials)));
        assert!(matches!(unknown_email, Err(AppError::InvalidCredentials)));
    }
}
