//! Audit Domain
//!
//! Records who did what to which entity and tells the right people about it.
//!
//! - **event**: audit actions, entries and persisted events
//! - **notification**: notification rows and recipient batches
//! - **fanout**: maps an event to recipient batches and writes notifications
//! - **recorder**: persists events, fans out, runs the retention purge
//! - **dispatcher**: channel-backed sink that moves recording off the request path
//! - **sink**: the seam the lifecycle service publishes entries through
//! - **ports**: audit store, notification store and user directory

pub mod event;
pub mod notification;
pub mod fanout;
pub mod recorder;
pub mod dispatcher;
pub mod sink;
pub mod ports;
pub mod error;

pub use event::{AuditAction, AuditEntry, AuditEvent, Audience, EntityRef};
pub use notification::{Notification, NotificationBatch, NotificationType, Recipients};
pub use fanout::{plan, NotificationFanOut};
pub use recorder::AuditRecorder;
pub use dispatcher::{AuditDispatcher, DispatcherStats};
pub use sink::AuditSink;
pub use ports::{AuditStore, DirectoryUser, NotificationStore, UserDirectory};
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::{InMemoryAuditStore, InMemoryNotificationStore, InMemoryUserDirectory};
pub use error::AuditError;
