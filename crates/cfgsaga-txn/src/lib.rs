//! # cfgsaga-txn — The Configuration Transaction
//!
//! Defines the `Transaction` object: its lifecycle API, derived-artifact
//! construction from a domain configuration, the participant collection it
//! owns, and the source adapters (`from_file`/`from_api`/`from_test`) that
//! attach provenance before constructing one. The domain configuration
//! schemas themselves (echo/script/MCP/composite apps, middleware configs)
//! are an external contract — see `config` — not implemented here.

pub mod config;
pub mod error;
pub mod participant;
pub mod sources;
pub mod transaction;

pub use config::{
    AppSpec, AppVariant, CompiledEvaluator, CompiledMcpServer, DomainConfig, EndpointSpec,
    MiddlewareSpec, MiddlewareType, RouteSpec, RuntimeApp, RuntimeMiddleware,
};
pub use error::{SourceError, TransactionError};
pub use participant::{Participant, ParticipantCollection};
pub use sources::{from_api, from_file, from_test, DEFAULT_LOG_RING_CAPACITY};
pub use transaction::{DiagnosticLogRecord, Transaction, TransactionRecord};
