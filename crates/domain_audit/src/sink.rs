//! Where services publish audit entries

use async_trait::async_trait;

use crate::dispatcher::AuditDispatcher;
use crate::event::AuditEntry;
use crate::recorder::AuditRecorder;

/// Destination for audit entries
///
/// Implementations never fail: recording problems stay inside the audit
/// domain and are only logged.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn submit(&self, entry: AuditEntry);
}

/// Records and fans out before returning
#[async_trait]
impl AuditSink for AuditRecorder {
    async fn submit(&self, entry: AuditEntry) {
        self.record(entry).await;
    }
}

/// Enqueues and returns immediately
#[async_trait]
impl AuditSink for AuditDispatcher {
    async fn submit(&self, entry: AuditEntry) {
        self.emit(entry);
    }
}
