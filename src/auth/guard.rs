//! Ownership scoping for single-record operations.
//!
//! A record is addressed by its id together with the authenticated owner, and
//! the pair is handed to the store as one compound filter. There is no way to
//! build an [`OwnerScope`] without an [`AuthenticatedUserId`], so a handler
//! cannot reach a record by id alone.

use uuid::Uuid;

use crate::auth::extractors::AuthenticatedUserId;
use crate::error::AppError;
use crate::models::AccountId;

/// Compound `(id, owner)` filter for one record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerScope {
    id: Uuid,
    owner: AccountId,
}

impl OwnerScope {
    pub fn new(subject: AuthenticatedUserId, id: Uuid) -> Self {
        Self {
            id,
            owner: subject.account_id(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner(&self) -> AccountId {
        self.owner
    }
}

/// Turns the outcome of a scoped lookup into the merged "not found or not yours"
/// error. Callers never learn whether the id exists under another owner.
pub fn require_owned<T>(record: Option<T>, scope: &OwnerScope) -> Result<T, AppError> {
    record.ok_or_else(|| {
        log::debug!(
            "no record {} visible to account {}",
            scope.id(),
            scope.owner()
        );
        AppError::NotFound
    })
}
