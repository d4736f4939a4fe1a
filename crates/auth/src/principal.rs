use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use taskgate_core::PrincipalId;

use crate::{AuthError, StoreError, UserAccount};

/// The identity making a request, resolved from a verified credential.
///
/// Only constructed from a live account record, so holding a `Principal`
/// implies the authentication record was present at resolution time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Principal {
    pub id: PrincipalId,
    pub email: String,
}

impl From<UserAccount> for Principal {
    fn from(account: UserAccount) -> Self {
        Self {
            id: account.id,
            email: account.email,
        }
    }
}

/// Lookup of principals by identifier (external collaborator).
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    async fn get_by_id(&self, id: PrincipalId) -> Result<Option<UserAccount>, StoreError>;
}

#[async_trait]
impl<S> PrincipalStore for Arc<S>
where
    S: PrincipalStore + ?Sized,
{
    async fn get_by_id(&self, id: PrincipalId) -> Result<Option<UserAccount>, StoreError> {
        (**self).get_by_id(id).await
    }
}

/// Turns a verified credential subject into a live principal.
///
/// Resolution always hits the store: an account deleted after its tokens were
/// issued stops authenticating on the next request.
#[derive(Clone)]
pub struct PrincipalResolver {
    store: Arc<dyn PrincipalStore>,
}

impl PrincipalResolver {
    pub fn new(store: Arc<dyn PrincipalStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, id: PrincipalId) -> Result<Principal, AuthError> {
        self.store
            .get_by_id(id)
            .await?
            .map(Principal::from)
            .ok_or(AuthError::PrincipalNotFound)
    }
}
