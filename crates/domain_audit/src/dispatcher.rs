//! Channel-backed audit dispatch
//!
//! Fire-and-forget: [`AuditDispatcher::emit`] never blocks and never fails.
//! A worker task drains the channel into an [`AuditRecorder`]. When the
//! channel is full the entry is dropped, counted and logged.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::event::AuditEntry;
use crate::recorder::AuditRecorder;

/// Default channel capacity
pub const DEFAULT_CAPACITY: usize = 1024;

/// Receiving end handed to the worker
pub type AuditReceiver = mpsc::Receiver<AuditEntry>;

/// Counters for monitoring the dispatcher
#[derive(Debug, Default)]
pub struct DispatcherStats {
    emitted: AtomicU64,
    dropped: AtomicU64,
    recorded: AtomicU64,
}

impl DispatcherStats {
    /// Entries offered to the channel
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }

    /// Entries lost because the channel was full or closed
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Entries the worker has handed to the recorder
    pub fn recorded(&self) -> u64 {
        self.recorded.load(Ordering::Relaxed)
    }
}

/// Sending side of the audit channel
#[derive(Clone)]
pub struct AuditDispatcher {
    sender: mpsc::Sender<AuditEntry>,
    stats: Arc<DispatcherStats>,
}

impl AuditDispatcher {
    /// Creates a dispatcher and its receiver without starting a worker
    pub fn with_capacity(capacity: usize) -> (Self, AuditReceiver) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let dispatcher = Self {
            sender,
            stats: Arc::new(DispatcherStats::default()),
        };
        (dispatcher, receiver)
    }

    /// Creates a dispatcher and spawns the worker that feeds `recorder`
    ///
    /// The worker exits once every dispatcher clone has been dropped and the
    /// channel is drained.
    pub fn spawn(recorder: AuditRecorder, capacity: usize) -> (Self, JoinHandle<()>) {
        let (dispatcher, receiver) = Self::with_capacity(capacity);
        let stats = Arc::clone(&dispatcher.stats);
        let handle = tokio::spawn(drain(receiver, recorder, stats));
        (dispatcher, handle)
    }

    /// Offers an entry to the channel without waiting
    pub fn emit(&self, entry: AuditEntry) {
        self.stats.emitted.fetch_add(1, Ordering::Relaxed);

        if let Err(e) = self.sender.try_send(entry) {
            self.stats.dropped.fetch_add(1, Ordering::Relaxed);
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "channel full",
                mpsc::error::TrySendError::Closed(_) => "channel closed",
            };
            warn!(reason, dropped = self.stats.dropped(), "audit entry dropped");
        }
    }

    pub fn stats(&self) -> &DispatcherStats {
        &self.stats
    }
}

async fn drain(mut receiver: AuditReceiver, recorder: AuditRecorder, stats: Arc<DispatcherStats>) {
    while let Some(entry) = receiver.recv().await {
        recorder.record(entry).await;
        stats.recorded.fetch_add(1, Ordering::Relaxed);
    }
    debug!("audit dispatcher worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{AuditAction, EntityRef};
    use crate::fanout::NotificationFanOut;
    use crate::ports::mock::{InMemoryAuditStore, InMemoryNotificationStore, InMemoryUserDirectory};

    fn entry(n: usize) -> AuditEntry {
        AuditEntry::new(AuditAction::AddNote, EntityRef::customer_file(format!("CF-{n}"), "x"))
    }

    #[tokio::test]
    async fn test_emit_never_blocks() {
        let (dispatcher, _receiver) = AuditDispatcher::with_capacity(2);
        for n in 0..10 {
            dispatcher.emit(entry(n));
        }
        assert_eq!(dispatcher.stats().emitted(), 10);
        assert_eq!(dispatcher.stats().dropped(), 8);
    }

    #[tokio::test]
    async fn test_worker_drains_into_recorder() {
        let audit = InMemoryAuditStore::new();
        let fanout = NotificationFanOut::new(
            Arc::new(InMemoryUserDirectory::new()),
            Arc::new(InMemoryNotificationStore::new()),
        );
        let recorder = AuditRecorder::new(Arc::new(audit.clone()), fanout);

        let (dispatcher, handle) = AuditDispatcher::spawn(recorder, 16);
        for n in 0..5 {
            dispatcher.emit(entry(n));
        }
        drop(dispatcher);
        handle.await.unwrap();

        assert_eq!(audit.events().await.len(), 5);
    }
}
