//! The per-request gate every protected operation goes through.
//!
//! `TokenCodec::verify` → `PrincipalResolver::resolve` → `OwnershipGate::check`
//! (for operations addressing a single resource). Each stage short-circuits,
//! and every denial is written to the audit log exactly once.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use taskgate_core::{OwnedResource, PrincipalId};

use crate::{
    AuditLog, AuthError, Denial, Operation, OwnershipGate, Principal, PrincipalResolver,
    ResourceStore, TokenCodec,
};

/// Proof that the pipeline authorized `operation` for `principal`.
///
/// Fields are private and there is no public constructor: guarded operations
/// on [`OwnershipGate`] take this as an argument, so skipping authorization is
/// a type error rather than a convention.
#[derive(Debug, Clone)]
pub struct AuthorizedContext<R> {
    principal: Principal,
    operation: Operation,
    resource: Option<R>,
}

impl<R> AuthorizedContext<R> {
    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// The owned resource, present for Read/Update/Delete.
    pub fn resource(&self) -> Option<&R> {
        self.resource.as_ref()
    }

    pub(crate) fn require(&self, requested: Operation) -> Result<(), AuthError> {
        if self.operation != requested {
            tracing::error!(
                granted = %self.operation,
                requested = %requested,
                "authorized context reused for a different operation"
            );
            return Err(AuthError::OperationNotGranted {
                granted: self.operation,
                requested,
            });
        }
        Ok(())
    }

    pub(crate) fn into_resource(self) -> Option<R> {
        self.resource
    }
}

pub struct AuthorizationPipeline<S: ResourceStore + ?Sized> {
    codec: Arc<TokenCodec>,
    resolver: PrincipalResolver,
    gate: OwnershipGate<S>,
    audit: Arc<dyn AuditLog>,
}

impl<S: ResourceStore + ?Sized> Clone for AuthorizationPipeline<S> {
    fn clone(&self) -> Self {
        Self {
            codec: self.codec.clone(),
            resolver: self.resolver.clone(),
            gate: self.gate.clone(),
            audit: self.audit.clone(),
        }
    }
}

impl<S: ResourceStore + ?Sized> AuthorizationPipeline<S> {
    /// Wire the stages. `audit` receives every denial, including those the
    /// gate's guarded operations detect.
    pub fn new(
        codec: Arc<TokenCodec>,
        resolver: PrincipalResolver,
        store: Arc<S>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            codec,
            resolver,
            gate: OwnershipGate::new(store, audit.clone()),
            audit,
        }
    }

    pub fn gate(&self) -> &OwnershipGate<S> {
        &self.gate
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Verify the bearer credential and resolve its principal.
    pub async fn authenticate(
        &self,
        bearer: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Principal, AuthError> {
        self.identify(bearer, None, None, now).await
    }

    /// Authorize `operation`, optionally against the resource `resource_id`.
    ///
    /// Read/Update/Delete without a resource id are denied as
    /// `ResourceNotFound`; Create/List ignore `resource_id`.
    pub async fn authorize(
        &self,
        bearer: Option<&str>,
        operation: Operation,
        resource_id: Option<&<S::Resource as OwnedResource>::Id>,
        now: DateTime<Utc>,
    ) -> Result<AuthorizedContext<S::Resource>, AuthError> {
        let resource_label = resource_id.map(ToString::to_string);
        let principal = self
            .identify(bearer, Some(operation), resource_label.clone(), now)
            .await?;

        if !operation.targets_resource() {
            debug!(principal_id = %principal.id, operation = %operation, "authorized");
            return Ok(AuthorizedContext {
                principal,
                operation,
                resource: None,
            });
        }

        let Some(id) = resource_id else {
            return Err(self.denied(
                AuthError::ResourceNotFound,
                Some(principal.id),
                Some(operation),
                None,
                now,
            ));
        };

        let (decision, resource) = match self.gate.check(&principal, id).await {
            Ok(checked) => checked,
            Err(e) => {
                return Err(self.denied(e.into(), Some(principal.id), Some(operation), resource_label, now));
            }
        };

        if let Some(reason) = decision.reason {
            return Err(self.denied(
                reason.into(),
                Some(principal.id),
                Some(operation),
                resource_label,
                now,
            ));
        }

        debug!(
            principal_id = %principal.id,
            operation = %operation,
            resource_id = resource_label.as_deref().unwrap_or("-"),
            "authorized"
        );
        Ok(AuthorizedContext {
            principal,
            operation,
            resource,
        })
    }

    async fn identify(
        &self,
        bearer: Option<&str>,
        operation: Option<Operation>,
        resource_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Principal, AuthError> {
        let verified = match bearer {
            Some(raw) => self.codec.verify(raw, now),
            None => Err(AuthError::TokenMissing),
        };
        let subject = match verified {
            Ok(subject) => subject,
            Err(e) => return Err(self.denied(e, None, operation, resource_id, now)),
        };

        match self.resolver.resolve(subject).await {
            Ok(principal) => Ok(principal),
            Err(e) => Err(self.denied(e, Some(subject), operation, resource_id, now)),
        }
    }

    /// Audit a denial (or log a collaborator failure) and hand the error back.
    fn denied(
        &self,
        err: AuthError,
        principal_id: Option<PrincipalId>,
        operation: Option<Operation>,
        resource_id: Option<String>,
        now: DateTime<Utc>,
    ) -> AuthError {
        match err.deny_reason() {
            Some(reason) => self.audit.record(&Denial {
                principal_id,
                resource_id,
                operation,
                reason,
                timestamp: now,
            }),
            None => tracing::error!(error = %err, "collaborator failure during authorization"),
        }
        err
    }
}
