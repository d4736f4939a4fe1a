//! `taskgate-auth`: the request authorization core (zero-trust).
//!
//! This crate is intentionally decoupled from HTTP and storage: the stores it
//! consults are traits implemented in `taskgate-infra`.

pub mod audit;
pub mod claims;
pub mod error;
pub mod ownership;
pub mod pipeline;
pub mod principal;
pub mod token;
pub mod user;

pub use audit::{AuditLog, CompositeAuditLog, Denial, InMemoryAuditLog, TracingAuditLog};
pub use claims::Credential;
pub use error::{AuthError, DenyReason, StoreError};
pub use ownership::{AuthorizationDecision, Operation, Outcome, OwnershipGate, ResourceStore};
pub use pipeline::{AuthorizationPipeline, AuthorizedContext};
pub use principal::{Principal, PrincipalResolver, PrincipalStore};
pub use taskgate_core::PrincipalId;
pub use token::{
    IssueError, IssuedCredential, Keyring, KeyringError, RetiredKey, SigningKey, TokenCodec,
};
pub use user::UserAccount;
