//! Security audit trail for authorization denials.
//!
//! Entries carry identifiers and the decision reason only: never the raw
//! credential, never resource payloads. Successful authorizations are not
//! recorded.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;

use taskgate_core::PrincipalId;

use crate::{DenyReason, Operation};

/// One denied request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Denial {
    /// Known only once the credential verified.
    pub principal_id: Option<PrincipalId>,
    pub resource_id: Option<String>,
    /// `None` for plain authentication (no data operation requested).
    pub operation: Option<Operation>,
    pub reason: DenyReason,
    pub timestamp: DateTime<Utc>,
}

/// Sink for denials. Called exactly once per denied request.
pub trait AuditLog: Send + Sync {
    fn record(&self, denial: &Denial);
}

/// Emits each denial as a structured `warn` event on the `taskgate::audit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditLog;

impl AuditLog for TracingAuditLog {
    fn record(&self, denial: &Denial) {
        let principal_id = denial.principal_id.map(|p| p.to_string());
        tracing::warn!(
            target: "taskgate::audit",
            principal_id = principal_id.as_deref().unwrap_or("-"),
            resource_id = denial.resource_id.as_deref().unwrap_or("-"),
            operation = denial.operation.map(Operation::as_str).unwrap_or("authenticate"),
            reason = denial.reason.as_str(),
            timestamp = %denial.timestamp.to_rfc3339(),
            "authorization denied"
        );
    }
}

/// In-memory audit log for tests/dev.
///
/// With a non-zero capacity the oldest entries are dropped first.
#[derive(Debug, Default)]
pub struct InMemoryAuditLog {
    entries: RwLock<Vec<Denial>>,
    max_entries: usize,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            max_entries,
        }
    }

    pub fn entries(&self) -> Vec<Denial> {
        match self.entries.read() {
            Ok(entries) => entries.clone(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

impl AuditLog for InMemoryAuditLog {
    fn record(&self, denial: &Denial) {
        if let Ok(mut entries) = self.entries.write() {
            if self.max_entries > 0 && entries.len() >= self.max_entries {
                entries.remove(0);
            }
            entries.push(denial.clone());
        }
    }
}

/// Forwards every denial to each inner log, in order.
#[derive(Clone, Default)]
pub struct CompositeAuditLog {
    sinks: Vec<Arc<dyn AuditLog>>,
}

impl CompositeAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AuditLog>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl AuditLog for CompositeAuditLog {
    fn record(&self, denial: &Denial) {
        for sink in &self.sinks {
            sink.record(denial);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn denial(reason: DenyReason) -> Denial {
        Denial {
            principal_id: Some(PrincipalId::new()),
            resource_id: Some("42".to_string()),
            operation: Some(Operation::Read),
            reason,
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn memory_log_keeps_entries_in_order() {
        let log = InMemoryAuditLog::new();
        log.record(&denial(DenyReason::OwnershipMismatch));
        log.record(&denial(DenyReason::ResourceNotFound));

        let reasons: Vec<_> = log.entries().iter().map(|d| d.reason).collect();
        assert_eq!(reasons, vec![DenyReason::OwnershipMismatch, DenyReason::ResourceNotFound]);

        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn capacity_evicts_oldest() {
        let log = InMemoryAuditLog::with_capacity(2);
        log.record(&denial(DenyReason::TokenMissing));
        log.record(&denial(DenyReason::TokenExpired));
        log.record(&denial(DenyReason::SignatureInvalid));

        let reasons: Vec<_> = log.entries().iter().map(|d| d.reason).collect();
        assert_eq!(reasons, vec![DenyReason::TokenExpired, DenyReason::SignatureInvalid]);
    }

    #[test]
    fn composite_fans_out() {
        let a = Arc::new(InMemoryAuditLog::new());
        let b = Arc::new(InMemoryAuditLog::new());
        let log = CompositeAuditLog::new()
            .with(a.clone())
            .with(b.clone())
            .with(Arc::new(TracingAuditLog));

        log.record(&denial(DenyReason::OwnershipMismatch));
        assert_eq!(a.len(), 1);
        assert_eq!(b.len(), 1);
    }

    #[test]
    fn serialized_entry_has_only_identifiers() {
        let entry = denial(DenyReason::OwnershipMismatch);
        let json = serde_json::to_value(&entry).unwrap();
        let mut keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        keys.sort();
        assert_eq!(
            keys,
            vec!["operation", "principal_id", "reason", "resource_id", "timestamp"]
        );
        assert_eq!(json["reason"], "ownership_mismatch");
    }
}
