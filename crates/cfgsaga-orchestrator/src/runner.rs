//! # Runner — the Siphon Loop
//!
//! A single cooperative loop that ingests transactions through an
//! unbuffered handoff channel (the "siphon"), hands each one to the
//! orchestrator in strict FIFO order, and drives graceful shutdown with a
//! bounded wait for the in-flight transaction to finish.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cfgsaga_fsm::{Fsm, FsmState};
use cfgsaga_txn::Transaction;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex};
use tokio_util::sync::CancellationToken;

use crate::config::RunnerConfig;
use crate::error::RunnerError;
use crate::orchestrator::Orchestrator;

/// Runner lifecycle states. Not one of the two generic FSM schemas the
/// saga core defines (those are `cfgsaga_fsm::{SagaState, ParticipantState}`)
/// — this is a third schema, local to the runner, reusing the same
/// generic engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Booting,
    Running,
    Reloading,
    Stopping,
    Stopped,
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunnerState::Booting => "booting",
            RunnerState::Running => "running",
            RunnerState::Reloading => "reloading",
            RunnerState::Stopping => "stopping",
            RunnerState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

impl FsmState for RunnerState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => RunnerState::Booting,
            1 => RunnerState::Running,
            2 => RunnerState::Reloading,
            3 => RunnerState::Stopping,
            4 => RunnerState::Stopped,
            other => unreachable!("invalid runner state discriminant: {other}"),
        }
    }

    fn can_transition_to(self, target: Self) -> bool {
        use RunnerState::*;
        matches!(
            (self, target),
            (Booting, Running) | (Running, Reloading) | (Reloading, Running) | (Running, Stopping) | (Reloading, Stopping) | (Stopping, Stopped)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, RunnerState::Stopped)
    }
}

struct SiphonItem {
    tx: Arc<Transaction>,
    ack: oneshot::Sender<()>,
}

/// The rendezvous send end of the siphon. Producers block on `send` until
/// the runner's loop has actually picked the item up — the runner's
/// acknowledgment is the producer's synchronization signal.
#[derive(Clone)]
pub struct Siphon {
    sender: mpsc::Sender<SiphonItem>,
}

impl Siphon {
    /// Hand a transaction to the runner. Resolves once the runner has
    /// received it (not once it has finished processing it).
    pub async fn send(&self, tx: Arc<Transaction>) -> Result<(), RunnerError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.sender
            .send(SiphonItem { tx, ack: ack_tx })
            .await
            .map_err(|_| RunnerError::SiphonClosed)?;
        ack_rx.await.map_err(|_| RunnerError::SiphonClosed)
    }
}

/// The runner: one siphon loop per process, driving the orchestrator.
pub struct Runner {
    orchestrator: Arc<Orchestrator>,
    fsm: Fsm<RunnerState>,
    shutdown_timeout: Duration,
    sender: mpsc::Sender<SiphonItem>,
    receiver: AsyncMutex<mpsc::Receiver<SiphonItem>>,
    internal_token: CancellationToken,
}

impl Runner {
    /// Construct a runner over `orchestrator`, booting.
    pub fn new(orchestrator: Arc<Orchestrator>, config: RunnerConfig) -> Self {
        let (sender, receiver) = mpsc::channel(1);
        Self {
            orchestrator,
            fsm: Fsm::new(RunnerState::Booting),
            shutdown_timeout: config.shutdown_timeout,
            sender,
            receiver: AsyncMutex::new(receiver),
            internal_token: CancellationToken::new(),
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> RunnerState {
        self.fsm.state()
    }

    /// The rendezvous send end of the siphon.
    pub fn siphon(&self) -> Siphon {
        Siphon {
            sender: self.sender.clone(),
        }
    }

    /// Cancel the runner's internal token, initiating shutdown on the next
    /// loop iteration. Idempotent.
    pub fn stop(&self) {
        self.internal_token.cancel();
    }

    /// Transition to `running`, then loop selecting over cancellation and
    /// siphon receive until one of them ends the loop, then shut down.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), RunnerError> {
        self.fsm.transition(RunnerState::Running)?;
        {
            let mut receiver = self.receiver.lock().await;
            'outer: loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = self.internal_token.cancelled() => break,
                    maybe_item = receiver.recv() => {
                        match maybe_item {
                            Some(item) => {
                                let _ = item.ack.send(());
                                // Race processing against cancellation rather than
                                // awaiting it inline: a hook that never returns must
                                // not block shutdown past `shutdown_timeout`. Dropping
                                // this future on cancellation leaves the transaction
                                // non-terminal; `shutdown`'s bounded wait below is
                                // what actually reports the deadline miss.
                                tokio::select! {
                                    biased;
                                    _ = cancel.cancelled() => {
                                        tracing::warn!("cancelled with a transaction in flight");
                                        break 'outer;
                                    }
                                    _ = self.internal_token.cancelled() => {
                                        tracing::warn!("stopped with a transaction in flight");
                                        break 'outer;
                                    }
                                    result = self.orchestrator.process_one_transaction(item.tx, cancel.clone()) => {
                                        if let Err(e) = result {
                                            tracing::error!(error = %e, "transaction processing failed");
                                        }
                                    }
                                }
                            }
                            None => break,
                        }
                    }
                }
            }
        }
        self.shutdown().await
    }

    async fn shutdown(&self) -> Result<(), RunnerError> {
        self.fsm.transition(RunnerState::Stopping)?;
        tracing::info!("runner shutting down");
        let fresh = CancellationToken::new();
        let result = tokio::time::timeout(self.shutdown_timeout, self.orchestrator.wait_for_completion(fresh)).await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(RunnerError::Orchestrator(e)),
            Err(_elapsed) => return Err(RunnerError::DeadlineExceeded(self.shutdown_timeout)),
        }
        self.fsm.transition(RunnerState::Stopped)?;
        tracing::info!("runner stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageConfig;
    use crate::hooks::{ParticipantHandle, SagaParticipant};
    use async_trait::async_trait;
    use cfgsaga_core::Origin;
    use cfgsaga_txn::config::{AppSpec, DomainConfig, EndpointSpec};

    #[derive(Debug)]
    struct EmptyConfig;
    impl DomainConfig for EmptyConfig {
        fn validate(&self) -> Vec<String> {
            vec![]
        }
        fn apps(&self) -> &[AppSpec] {
            &[]
        }
        fn endpoints(&self) -> &[EndpointSpec] {
            &[]
        }
    }

    struct NoopParticipant;

    #[async_trait]
    impl SagaParticipant for NoopParticipant {
        async fn execute_config(&self, _cancel: CancellationToken, _tx: &Transaction) -> Result<(), String> {
            Ok(())
        }
        async fn compensate_config(&self, _cancel: CancellationToken, _tx: &Transaction) -> Result<(), String> {
            Ok(())
        }
        async fn apply_pending_config(&self, _cancel: CancellationToken) -> Result<(), String> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_processes_one_transaction_then_stops() {
        let orchestrator = Arc::new(Orchestrator::new(StorageConfig::default()));
        orchestrator
            .register_participant("listener", ParticipantHandle::Plain(Arc::new(NoopParticipant)))
            .unwrap();
        let runner = Arc::new(Runner::new(orchestrator.clone(), RunnerConfig::default()));

        let cancel = CancellationToken::new();
        let run_runner = runner.clone();
        let run_cancel = cancel.clone();
        let handle = tokio::spawn(async move { run_runner.run(run_cancel).await });

        let siphon = runner.siphon();
        let tx = Arc::new(Transaction::construct(Origin::test("t"), Some(Arc::new(EmptyConfig)), 16).unwrap());
        siphon.send(tx.clone()).await.unwrap();

        // give the loop a tick to finish processing before shutdown
        tokio::task::yield_now().await;
        runner.stop();
        handle.await.unwrap().unwrap();

        assert_eq!(runner.state(), RunnerState::Stopped);
    }

    #[test]
    fn test_runner_state_transitions() {
        let fsm = Fsm::new(RunnerState::Booting);
        fsm.transition(RunnerState::Running).unwrap();
        fsm.transition(RunnerState::Stopping).unwrap();
        fsm.transition(RunnerState::Stopped).unwrap();
        assert!(RunnerState::Stopped.is_terminal());
    }
}
