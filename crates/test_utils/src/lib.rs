//! Test Utilities Crate
//!
//! Shared test infrastructure for the claim file engine.
//!
//! # Modules
//!
//! - `fixtures`: the fixture office, applicants and file types
//! - `builders`: builders for intakes, stored files and documents
//! - `harness`: a lifecycle service wired to in-memory stores
//! - `database`: Docker-backed PostgreSQL for adapter tests
//! - `assertions`: assertion helpers for files, settlements and inboxes
//! - `generators`: proptest strategies for applicants and money

pub mod fixtures;
pub mod builders;
pub mod harness;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use harness::EngineHarness;
pub use database::{TestDatabase, TestDatabaseConfig};
pub use assertions::*;
pub use generators::*;
