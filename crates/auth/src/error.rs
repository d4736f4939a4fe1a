use serde::Serialize;
use thiserror::Error;

use crate::Operation;

/// Failure of an external collaborator (principal or resource store).
///
/// These are never authorization decisions: callers map them to 5xx.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The store could not be reached (pool timeout, closed pool, I/O).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store rejected the write because of a uniqueness constraint.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Any other backend failure.
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Every way the authorization pipeline can refuse a request.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("no bearer credential presented")]
    TokenMissing,

    #[error("credential could not be parsed")]
    TokenMalformed,

    #[error("credential signature is invalid")]
    SignatureInvalid,

    #[error("credential has expired")]
    TokenExpired,

    #[error("credential subject no longer resolves to a principal")]
    PrincipalNotFound,

    #[error("resource not found")]
    ResourceNotFound,

    #[error("resource is owned by another principal")]
    OwnershipMismatch,

    #[error("context was authorized for {granted}, not {requested}")]
    OperationNotGranted {
        granted: Operation,
        requested: Operation,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AuthError {
    /// The audit reason for this failure.
    ///
    /// `None` for failures that are not authorization decisions: collaborator
    /// errors, and misuse of an authorized context by the calling code.
    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AuthError::TokenMissing => Some(DenyReason::TokenMissing),
            AuthError::TokenMalformed => Some(DenyReason::TokenMalformed),
            AuthError::SignatureInvalid => Some(DenyReason::SignatureInvalid),
            AuthError::TokenExpired => Some(DenyReason::TokenExpired),
            AuthError::PrincipalNotFound => Some(DenyReason::PrincipalNotFound),
            AuthError::ResourceNotFound => Some(DenyReason::ResourceNotFound),
            AuthError::OwnershipMismatch => Some(DenyReason::OwnershipMismatch),
            AuthError::OperationNotGranted { .. } | AuthError::Store(_) => None,
        }
    }

    /// Whether the caller failed to authenticate (all of these surface as 401).
    pub fn is_authentication_failure(&self) -> bool {
        matches!(
            self,
            AuthError::TokenMissing
                | AuthError::TokenMalformed
                | AuthError::SignatureInvalid
                | AuthError::TokenExpired
                | AuthError::PrincipalNotFound
        )
    }
}

/// Precise, internal-only reason for a denial (audit trail).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    TokenMissing,
    TokenMalformed,
    SignatureInvalid,
    TokenExpired,
    PrincipalNotFound,
    ResourceNotFound,
    OwnershipMismatch,
}

impl DenyReason {
    pub fn as_str(self) -> &'static str {
        match self {
            DenyReason::TokenMissing => "token_missing",
            DenyReason::TokenMalformed => "token_malformed",
            DenyReason::SignatureInvalid => "signature_invalid",
            DenyReason::TokenExpired => "token_expired",
            DenyReason::PrincipalNotFound => "principal_not_found",
            DenyReason::ResourceNotFound => "resource_not_found",
            DenyReason::OwnershipMismatch => "ownership_mismatch",
        }
    }
}

impl core::fmt::Display for DenyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<DenyReason> for AuthError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::TokenMissing => AuthError::TokenMissing,
            DenyReason::TokenMalformed => AuthError::TokenMalformed,
            DenyReason::SignatureInvalid => AuthError::SignatureInvalid,
            DenyReason::TokenExpired => AuthError::TokenExpired,
            DenyReason::PrincipalNotFound => AuthError::PrincipalNotFound,
            DenyReason::ResourceNotFound => AuthError::ResourceNotFound,
            DenyReason::OwnershipMismatch => AuthError::OwnershipMismatch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_deny_reason_round_trips_through_auth_error() {
        let reasons = [
            DenyReason::TokenMissing,
            DenyReason::TokenMalformed,
            DenyReason::SignatureInvalid,
            DenyReason::TokenExpired,
            DenyReason::PrincipalNotFound,
            DenyReason::ResourceNotFound,
            DenyReason::OwnershipMismatch,
        ];
        for reason in reasons {
            assert_eq!(AuthError::from(reason).deny_reason(), Some(reason));
        }
    }

    #[test]
    fn collaborator_failures_are_not_denials() {
        let err = AuthError::from(StoreError::Unavailable("pool timed out".into()));
        assert_eq!(err.deny_reason(), None);
        assert!(!err.is_authentication_failure());
    }

    #[test]
    fn token_and_principal_failures_are_authentication_failures() {
        assert!(AuthError::TokenExpired.is_authentication_failure());
        assert!(AuthError::PrincipalNotFound.is_authentication_failure());
        assert!(!AuthError::OwnershipMismatch.is_authentication_failure());
        assert!(!AuthError::ResourceNotFound.is_authentication_failure());
    }
}
