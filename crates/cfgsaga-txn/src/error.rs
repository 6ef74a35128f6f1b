//! # Transaction-Level Errors
//!
//! Two flat, sentinel-carrying enums: `TransactionError` for everything
//! that can go wrong once a transaction exists, and `SourceError` for the
//! narrower set of failures a source adapter (`from_file`/`from_api`/
//! `from_test`) can raise before a `Transaction` exists at all.

use cfgsaga_fsm::FsmError;
use thiserror::Error;

/// Errors surfaced by transaction construction and lifecycle operations.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Construction was given no domain configuration.
    #[error("no domain configuration supplied")]
    NilConfig,

    /// Validation failed; carries every per-field error collected.
    #[error("validation failed: {0:?}")]
    ValidationFailed(Vec<String>),

    /// A post-validation operation was attempted on a transaction that was
    /// never validated.
    #[error("transaction has not been validated")]
    NotValidated,

    /// The lifecycle FSM rejected a transition.
    #[error("invalid transition: {0}")]
    InvalidTransition(#[from] FsmError),

    /// Two apps in the domain configuration share an identifier.
    #[error("duplicate app id: {0}")]
    DuplicateAppId(String),

    /// An app's config variant has no known builder.
    #[error("unknown app type: {0}")]
    UnknownAppType(String),

    /// A builder for a recognized app type returned an error.
    #[error("app creation failed for {id}: {reason}")]
    AppCreationFailed {
        /// The app id whose builder failed.
        id: String,
        /// The builder's failure reason.
        reason: String,
    },

    /// The composite app variant was encountered; explicitly unsupported.
    #[error("composite app variant is not supported: {0}")]
    CompositeNotSupported(String),

    /// A script app was declared without a pre-compiled evaluator.
    #[error("script app {0} has no pre-compiled evaluator")]
    EvaluatorNil(String),

    /// An MCP app was declared without a pre-compiled server.
    #[error("mcp app {0} has no compiled server")]
    CompiledEvaluatorNil(String),

    /// Two middleware instances claim the same exclusive resource (e.g.
    /// two console loggers writing to the same output path).
    #[error("resource conflict: {0:?}")]
    ResourceConflict(Vec<String>),

    /// The cancellation token fired during an async lifecycle phase.
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors raised by a source adapter before a `Transaction` is constructed.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No domain configuration was supplied.
    #[error("no domain configuration supplied")]
    NilConfig,

    /// The file path given to `from_file` does not exist.
    #[error("config file not found: {0}")]
    NotFound(String),

    /// Transaction construction failed once a config was available.
    #[error("transaction construction failed: {0}")]
    Construction(#[from] TransactionError),
}
