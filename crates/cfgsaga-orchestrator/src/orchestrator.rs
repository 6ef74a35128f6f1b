//! # Saga Orchestrator
//!
//! Serial processor: drives exactly one transaction at a time through
//! validate, execute, reload, and (when needed) compensate, invoking every
//! registered participant's hooks in deterministic order.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use cfgsaga_fsm::FsmState;
use cfgsaga_txn::Transaction;
use tokio_util::sync::CancellationToken;

use crate::config::StorageConfig;
use crate::error::OrchestratorError;
use crate::hooks::{ParticipantHandle, SagaParticipant};
use crate::storage::TransactionStorage;

/// The serial saga coordinator.
pub struct Orchestrator {
    storage: TransactionStorage,
    participants: RwLock<BTreeMap<String, Arc<dyn SagaParticipant>>>,
}

impl Orchestrator {
    /// Construct an orchestrator with empty storage and no registered
    /// participants.
    pub fn new(storage_config: StorageConfig) -> Self {
        Self {
            storage: TransactionStorage::new(storage_config),
            participants: RwLock::new(BTreeMap::new()),
        }
    }

    /// Access the underlying transaction storage, for diagnostics.
    pub fn storage(&self) -> &TransactionStorage {
        &self.storage
    }

    /// Register a participant under `name`. Rejects the `Reloadable`
    /// variant outright — a participant claiming both the saga hooks and
    /// the external reload marker is structurally ambiguous.
    pub fn register_participant(
        &self,
        name: impl Into<String>,
        handle: ParticipantHandle,
    ) -> Result<(), OrchestratorError> {
        let name = name.into();
        let hooks = match handle {
            ParticipantHandle::Plain(hooks) => hooks,
            ParticipantHandle::Reloadable(..) => {
                return Err(OrchestratorError::AmbiguousParticipant(name))
            }
        };
        let mut participants = self.participants.write().expect("participants lock poisoned");
        if participants.contains_key(&name) {
            return Err(OrchestratorError::DuplicateParticipant(name));
        }
        participants.insert(name, hooks);
        Ok(())
    }

    fn participants_in_order(&self) -> Vec<(String, Arc<dyn SagaParticipant>)> {
        self.participants
            .read()
            .expect("participants lock poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Drive `tx` through validate -> execute -> reload (-> compensate on
    /// failure), invoking every registered participant in order. Returns
    /// once the transaction reaches a terminal state.
    pub async fn process_one_transaction(
        &self,
        tx: Arc<Transaction>,
        cancel: CancellationToken,
    ) -> Result<(), OrchestratorError> {
        self.storage.set_current(tx.clone());

        if tx.run_validation().is_err() {
            return Ok(());
        }

        tx.begin_execution()?;

        let ordered = self.participants_in_order();
        let mut failure: Option<String> = None;

        for (name, hooks) in &ordered {
            if cancel.is_cancelled() {
                failure = Some("cancelled before participant executed".to_string());
                break;
            }
            let participant = tx.participants().get_or_create(name).await;
            participant.execute().map_err(|e| OrchestratorError::Transaction(e.into()))?;
            match hooks.execute_config(cancel.clone(), &tx).await {
                Ok(()) => {
                    participant
                        .mark_succeeded()
                        .map_err(|e| OrchestratorError::Transaction(e.into()))?;
                }
                Err(e) => {
                    let _ = participant.mark_failed(e.clone());
                    failure = Some(e);
                    break;
                }
            }
        }

        match failure {
            None => {
                tx.mark_succeeded()?;
                self.trigger_reload(&tx, &ordered, cancel).await
            }
            Some(err) => self.compensate(&tx, cancel, err).await,
        }
    }

    async fn trigger_reload(
        &self,
        tx: &Arc<Transaction>,
        ordered: &[(String, Arc<dyn SagaParticipant>)],
        cancel: CancellationToken,
    ) -> Result<(), OrchestratorError> {
        tx.begin_reload()?;
        let mut errs = vec![];
        for (name, hooks) in ordered {
            if let Err(e) = hooks.apply_pending_config(cancel.clone()).await {
                errs.push(format!("{name}: {e}"));
            }
        }
        if errs.is_empty() {
            tx.mark_completed()?;
            Ok(())
        } else {
            tx.mark_error(format!("{errs:?}"))?;
            Err(OrchestratorError::ParticipantFailures(errs))
        }
    }

    async fn compensate(
        &self,
        tx: &Arc<Transaction>,
        cancel: CancellationToken,
        cause: String,
    ) -> Result<(), OrchestratorError> {
        tx.mark_failed(&cancel, cause.clone())?;
        tx.begin_compensation()?;

        // Flip every succeeded participant to `compensating` in one sweep
        // before invoking any hook, so `participant_states()` reflects
        // compensation as soon as it starts rather than only once a hook
        // returns.
        if let Err(errs) = tx.participants().begin_compensation().await {
            tracing::warn!(errors = ?errs, "some participants failed to enter compensating");
        }

        let mut errs = vec![];
        for participant in tx.participants().in_reverse_order().await {
            if participant.state() != cfgsaga_fsm::ParticipantState::Compensating {
                continue;
            }
            let hooks = self
                .participants
                .read()
                .expect("participants lock poisoned")
                .get(participant.name())
                .cloned();
            if let Some(hooks) = hooks {
                match hooks.compensate_config(cancel.clone(), tx).await {
                    Ok(()) => {
                        let _ = participant.mark_compensated();
                    }
                    Err(e) => {
                        errs.push(format!("{}: {e}", participant.name()));
                        let _ = participant.mark_error(e);
                    }
                }
            }
        }

        if errs.is_empty() {
            tx.mark_compensated()?;
            Ok(())
        } else {
            tx.mark_error(format!("{errs:?}"))?;
            Err(OrchestratorError::ParticipantFailures(errs))
        }
    }

    /// Block until the current transaction (if any) reaches a terminal
    /// state. Returns immediately if there is none, or it already is one.
    pub async fn wait_for_completion(&self, cancel: CancellationToken) -> Result<(), OrchestratorError> {
        if let Some(tx) = self.storage.current() {
            if !tx.state().is_terminal() {
                tx.wait_for_completion(cancel)
                    .await
                    .map_err(|_| OrchestratorError::Cancelled)?;
            }
        }
        Ok(())
    }
}
