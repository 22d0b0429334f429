//! Claim File Lifecycle Domain
//!
//! A customer file moves from intake to closure through a small set of
//! statuses. Document uploads drive the early stages automatically; later
//! stages are set by office staff; closure settles the money and locks the
//! file for good.
//!
//! - **customer_file**: the file aggregate, its statuses and the write patch
//! - **file_type**: document templates
//! - **document**, **payment**, **note**: records attached to a file
//! - **completeness**: the required-document evaluator
//! - **lifecycle**: the service every mutation goes through
//! - **closure**: settlement reconciliation and the closing write
//! - **ports**: the claims store
//! - **config** / **telemetry**: environment configuration and log setup
//!
//! # Status flow
//!
//! ```text
//!   Reviewing ─┐
//!              ├─(all required documents)─▶ ApplicationStage ─▶ ... ─▶ Closed (locked)
//!   DocumentStage ┘
//! ```

pub mod customer_file;
pub mod file_type;
pub mod document;
pub mod payment;
pub mod note;
pub mod completeness;
pub mod lifecycle;
pub mod closure;
pub mod ports;
pub mod config;
pub mod telemetry;
pub mod error;

pub use customer_file::{
    Closure, CustomerFile, DocumentStatus, FileDetails, FileDetailsUpdate, FileIntake, FilePatch,
    FileStatus, Settlement,
};
pub use file_type::{DocumentRequirement, FileType};
pub use document::{ApprovalStatus, Document, DocumentUpload};
pub use payment::{NewPayment, Payment, PaymentKind};
pub use note::Note;
pub use completeness::{evaluate, Completeness, MatchMode};
pub use lifecycle::{DocumentChange, DocumentReport, LifecycleService, RequirementState};
pub use closure::{reconcile, ClosedFile, SettlementInput};
pub use ports::ClaimsStore;
#[cfg(any(test, feature = "mock"))]
pub use ports::mock::InMemoryClaimsStore;
pub use config::EngineConfig;
pub use error::ClaimError;
