//! # cfgsaga-core — Foundational Types for the Configuration Saga
//!
//! This crate is the bedrock of the configuration transaction saga core.
//! It defines the identifiers, origin metadata, timestamp conventions, and
//! structured-log record model shared by every other crate in the workspace;
//! it depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype identifiers.** `TransactionId` is a newtype over `uuid::Uuid`.
//!    No bare strings or raw `Uuid`s cross crate boundaries for transaction
//!    identity.
//!
//! 2. **UTC-only timestamps.** `Timestamp` wraps `chrono::DateTime<Utc>` so
//!    every recorded instant in the saga (creation, log records, transition
//!    records) is unambiguous and directly comparable.
//!
//! 3. **`tracing::Level` as the single level type.** Internal log records use
//!    `tracing::Level` directly rather than a bespoke level enum, so the
//!    per-transaction log ring and the process-wide `tracing` subscriber
//!    agree on what a level means.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `cfgsaga-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod ids;
pub mod interpolate;
pub mod logging;
pub mod origin;
pub mod temporal;

pub use ids::{CorrelationId, TransactionId};
pub use logging::{AttrValue, LogRecord, LogSink, TxLogger};
pub use origin::{Origin, OriginKind};
pub use temporal::Timestamp;
