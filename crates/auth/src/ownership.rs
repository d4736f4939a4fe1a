//! Ownership policy: which principal may touch which resource.
//!
//! | Operation | Policy |
//! |---|---|
//! | Create | owner := principal, unconditionally |
//! | Read / Update / Delete | fetch, then 404 if absent, 403 if foreign |
//! | List | filtered by owner inside the store |
//!
//! Mutations carry the owner predicate into the store call itself
//! (`update_if_owner` / `delete_if_owner`), so there is no window between the
//! ownership check and the write.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;

use taskgate_core::{OwnedResource, PrincipalId};

use crate::{AuditLog, AuthError, AuthorizedContext, Denial, DenyReason, Principal, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Read,
    Update,
    Delete,
    List,
}

impl Operation {
    /// Whether the operation addresses a single existing resource by id.
    pub fn targets_resource(self) -> bool {
        matches!(self, Operation::Read | Operation::Update | Operation::Delete)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Create => "create",
            Operation::Read => "read",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::List => "list",
        }
    }
}

impl core::fmt::Display for Operation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Allow,
    Deny,
}

/// Per-request verdict of the gate. Never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AuthorizationDecision {
    pub outcome: Outcome,
    pub reason: Option<DenyReason>,
}

impl AuthorizationDecision {
    pub fn allow() -> Self {
        Self {
            outcome: Outcome::Allow,
            reason: None,
        }
    }

    pub fn deny(reason: DenyReason) -> Self {
        Self {
            outcome: Outcome::Deny,
            reason: Some(reason),
        }
    }

    pub fn is_allowed(&self) -> bool {
        self.outcome == Outcome::Allow
    }
}

/// Owned-record storage (external collaborator).
///
/// Implementations must apply the owner predicate inside the same operation
/// as the read or write for `list_by_owner`, `update_if_owner` and
/// `delete_if_owner`.
#[async_trait]
pub trait ResourceStore: Send + Sync {
    type Resource: OwnedResource + Send + Sync;
    type Draft: Send + 'static;
    type Patch: Send + Sync + 'static;

    async fn get_by_id(
        &self,
        id: &<Self::Resource as OwnedResource>::Id,
    ) -> Result<Option<Self::Resource>, StoreError>;

    async fn list_by_owner(&self, owner: PrincipalId) -> Result<Vec<Self::Resource>, StoreError>;

    async fn create_with_owner(
        &self,
        owner: PrincipalId,
        draft: Self::Draft,
    ) -> Result<Self::Resource, StoreError>;

    /// `None` when no resource with `id` is owned by `owner`.
    async fn update_if_owner(
        &self,
        id: &<Self::Resource as OwnedResource>::Id,
        owner: PrincipalId,
        patch: Self::Patch,
    ) -> Result<Option<Self::Resource>, StoreError>;

    /// `false` when no resource with `id` is owned by `owner`.
    async fn delete_if_owner(
        &self,
        id: &<Self::Resource as OwnedResource>::Id,
        owner: PrincipalId,
    ) -> Result<bool, StoreError>;
}

type IdOf<S> = <<S as ResourceStore>::Resource as OwnedResource>::Id;

/// Central ownership policy engine.
///
/// Holds the audit sink so that a record vanishing between the pipeline's
/// check and the guarded write is still recorded as a denial.
pub struct OwnershipGate<S: ResourceStore + ?Sized> {
    store: Arc<S>,
    audit: Arc<dyn AuditLog>,
}

impl<S: ResourceStore + ?Sized> Clone for OwnershipGate<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<S: ResourceStore + ?Sized> OwnershipGate<S> {
    pub fn new(store: Arc<S>, audit: Arc<dyn AuditLog>) -> Self {
        Self { store, audit }
    }

    /// Fetch-then-check for a single resource.
    ///
    /// The resource is returned only alongside an `Allow` decision; a foreign
    /// record never leaves this function.
    pub async fn check(
        &self,
        principal: &Principal,
        id: &IdOf<S>,
    ) -> Result<(AuthorizationDecision, Option<S::Resource>), StoreError> {
        let Some(resource) = self.store.get_by_id(id).await? else {
            return Ok((AuthorizationDecision::deny(DenyReason::ResourceNotFound), None));
        };

        if !resource.is_owned_by(principal.id) {
            return Ok((AuthorizationDecision::deny(DenyReason::OwnershipMismatch), None));
        }

        Ok((AuthorizationDecision::allow(), Some(resource)))
    }

    /// Create a resource owned by the context's principal.
    pub async fn create(
        &self,
        ctx: &AuthorizedContext<S::Resource>,
        draft: S::Draft,
    ) -> Result<S::Resource, AuthError> {
        ctx.require(Operation::Create)?;
        Ok(self.store.create_with_owner(ctx.principal().id, draft).await?)
    }

    /// All resources owned by the context's principal.
    pub async fn list(&self, ctx: &AuthorizedContext<S::Resource>) -> Result<Vec<S::Resource>, AuthError> {
        ctx.require(Operation::List)?;
        Ok(self.store.list_by_owner(ctx.principal().id).await?)
    }

    /// The resource the context was authorized for.
    pub fn read(&self, ctx: AuthorizedContext<S::Resource>) -> Result<S::Resource, AuthError> {
        ctx.require(Operation::Read)?;
        ctx.into_resource().ok_or(AuthError::ResourceNotFound)
    }

    pub async fn update(
        &self,
        ctx: &AuthorizedContext<S::Resource>,
        patch: S::Patch,
    ) -> Result<S::Resource, AuthError> {
        ctx.require(Operation::Update)?;
        let id = ctx.resource().map(|r| r.id().clone()).ok_or(AuthError::ResourceNotFound)?;

        match self.store.update_if_owner(&id, ctx.principal().id, patch).await? {
            Some(updated) => Ok(updated),
            None => Err(self.vanished(ctx, &id)),
        }
    }

    pub async fn delete(&self, ctx: &AuthorizedContext<S::Resource>) -> Result<(), AuthError> {
        ctx.require(Operation::Delete)?;
        let id = ctx.resource().map(|r| r.id().clone()).ok_or(AuthError::ResourceNotFound)?;

        if self.store.delete_if_owner(&id, ctx.principal().id).await? {
            Ok(())
        } else {
            Err(self.vanished(ctx, &id))
        }
    }

    /// The authorized record is gone (deleted concurrently).
    fn vanished(&self, ctx: &AuthorizedContext<S::Resource>, id: &IdOf<S>) -> AuthError {
        self.audit.record(&Denial {
            principal_id: Some(ctx.principal().id),
            resource_id: Some(id.to_string()),
            operation: Some(ctx.operation()),
            reason: DenyReason::ResourceNotFound,
            timestamp: Utc::now(),
        });
        AuthError::ResourceNotFound
    }
}
