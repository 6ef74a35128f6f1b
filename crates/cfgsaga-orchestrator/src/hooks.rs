//! # Participant Saga Hooks
//!
//! The trait a registered participant implements, plus the structural
//! ambiguity check `register_participant` enforces. Rust has no runtime
//! reflection over trait implementation, so the "does this participant
//! also belong to the surrounding runnable-supervisor framework's reload
//! machinery" check is modeled as an explicit second constructor path the
//! caller must choose, rather than introspection.

use std::sync::Arc;

use async_trait::async_trait;
use cfgsaga_txn::Transaction;
use tokio_util::sync::CancellationToken;

/// The three saga-phase hooks a participant implements.
#[async_trait]
pub trait SagaParticipant: Send + Sync {
    /// Stage the new configuration. Errors here trigger compensation of
    /// every participant that already succeeded.
    async fn execute_config(&self, cancel: CancellationToken, tx: &Transaction) -> Result<(), String>;

    /// Undo a previously staged configuration. Called only on participants
    /// that reached `succeeded` before a later participant failed.
    async fn compensate_config(&self, cancel: CancellationToken, tx: &Transaction) -> Result<(), String>;

    /// Commit the staged configuration once every participant has
    /// succeeded. Failure here is unrecoverable — the saga cannot roll
    /// back a commit already in progress.
    async fn apply_pending_config(&self, cancel: CancellationToken) -> Result<(), String>;
}

/// A marker belonging to the surrounding runnable-supervisor framework's
/// own reload machinery. A participant that implements both this and
/// `SagaParticipant` is structurally ambiguous to the orchestrator.
pub trait Reload: Send + Sync {}

/// What a caller hands to `register_participant`. The `Reloadable` variant
/// exists so the ambiguity check has something concrete to reject — it can
/// only be constructed by pairing a hook implementation with a `Reload`
/// implementation, and registration always rejects it.
pub enum ParticipantHandle {
    /// An unambiguous participant: only the saga hooks.
    Plain(Arc<dyn SagaParticipant>),
    /// A participant that also claims the external reload marker.
    /// Always rejected by `register_participant`.
    Reloadable(Arc<dyn SagaParticipant>, Arc<dyn Reload>),
}
