//! Principal and task storage (collaborators of the authorization core).
//!
//! The traits the core consumes (`PrincipalStore`, `ResourceStore`) live in
//! `taskgate-auth`; this module adds the account-management surface used by
//! registration/login and provides in-memory and Postgres implementations.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use taskgate_auth::{PrincipalStore, ResourceStore, StoreError, UserAccount};
use taskgate_core::{NewTask, Task, TaskPatch};

pub use in_memory::{InMemoryAccountStore, InMemoryTaskStore};
pub use postgres::{PostgresAccountStore, PostgresTaskStore};

/// Task storage as consumed by the ownership gate.
pub type DynTaskStore = dyn ResourceStore<Resource = Task, Draft = NewTask, Patch = TaskPatch>;

/// Account registry: principal lookup plus registration/login queries.
#[async_trait]
pub trait AccountStore: PrincipalStore {
    /// Lookup by normalized email.
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError>;

    /// Persist a new account. A taken email yields `StoreError::Conflict`.
    async fn insert(&self, account: UserAccount) -> Result<UserAccount, StoreError>;
}

#[async_trait]
impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    async fn find_by_email(&self, email: &str) -> Result<Option<UserAccount>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn insert(&self, account: UserAccount) -> Result<UserAccount, StoreError> {
        (**self).insert(account).await
    }
}
