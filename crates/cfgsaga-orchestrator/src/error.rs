//! # Orchestrator and Runner Errors

use cfgsaga_txn::TransactionError;
use thiserror::Error;

/// Errors raised by participant registration and per-transaction
/// processing.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A participant implements both the saga hook trait and the external
    /// reload marker trait; Rust has no runtime reflection to disambiguate,
    /// so this combination is rejected outright.
    #[error("participant {0} is ambiguous: implements both saga hooks and the reload marker")]
    AmbiguousParticipant(String),

    /// A participant with this name is already registered.
    #[error("participant already registered: {0}")]
    DuplicateParticipant(String),

    /// The transaction's own lifecycle rejected an operation.
    #[error("transaction error: {0}")]
    Transaction(#[from] TransactionError),

    /// One or more participant hooks failed; errors are joined rather than
    /// truncated.
    #[error("participant hook failures: {0:?}")]
    ParticipantFailures(Vec<String>),

    /// The cancellation token fired during a processing phase.
    #[error("operation cancelled")]
    Cancelled,
}

/// Errors raised by the runner's lifecycle and shutdown.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The runner's lifecycle FSM rejected a transition.
    #[error("runner lifecycle error: {0}")]
    Lifecycle(#[from] cfgsaga_fsm::FsmError),

    /// Shutdown did not complete within the configured timeout.
    #[error("shutdown deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// Processing a handed-off transaction failed.
    #[error("transaction processing failed: {0}")]
    Orchestrator(#[from] OrchestratorError),

    /// The siphon's receive end was dropped before the send could be
    /// acknowledged.
    #[error("siphon closed")]
    SiphonClosed,
}
