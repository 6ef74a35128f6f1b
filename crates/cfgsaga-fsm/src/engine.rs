//! # Generic FSM Engine
//!
//! A small, atomically-updated, subscribable finite state machine generic
//! over any state type implementing [`FsmState`]. States are stored as a
//! `u8` discriminant in an `AtomicU8` so `transition` can be expressed as a
//! compare-and-swap retry loop: under contention exactly one caller wins,
//! the rest observe `InvalidTransition` against whatever state actually won.
//!
//! Subscribers ride a single `tokio::sync::watch` channel shared by the
//! whole FSM; every concurrent subscriber observes every transition in the
//! same order.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// A state usable inside the generic FSM engine.
///
/// Implementors are expected to be small `Copy` enums; the `u8` round trip
/// only ever decodes values this module itself encoded, so `from_u8` may
/// panic on an out-of-range input without that ever being reachable.
pub trait FsmState: Copy + Eq + fmt::Display + fmt::Debug + Send + Sync + 'static {
    /// Encode as a `u8` discriminant.
    fn to_u8(self) -> u8;
    /// Decode from a `u8` discriminant previously produced by `to_u8`.
    fn from_u8(v: u8) -> Self;
    /// Whether `self -> target` is a legal transition in this state's schema.
    fn can_transition_to(self, target: Self) -> bool;
    /// Whether this state has no legal outbound transitions.
    fn is_terminal(self) -> bool;
}

/// Errors raised by FSM operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsmError {
    /// The requested transition is not legal from the observed current
    /// state (or the compare-and-swap lost a race against a concurrent
    /// transition).
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
    /// The supplied cancellation token fired before the operation completed.
    #[error("operation cancelled")]
    Cancelled,
}

/// A generic, concurrency-safe, subscribable finite state machine.
pub struct Fsm<S: FsmState> {
    state: AtomicU8,
    tx: watch::Sender<u8>,
    _marker: std::marker::PhantomData<S>,
}

impl<S: FsmState> Fsm<S> {
    /// Construct a new FSM in the given initial state.
    pub fn new(initial: S) -> Self {
        let (tx, _rx) = watch::channel(initial.to_u8());
        Self {
            state: AtomicU8::new(initial.to_u8()),
            tx,
            _marker: std::marker::PhantomData,
        }
    }

    /// Lock-free read of the current state label.
    pub fn state(&self) -> S {
        S::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Move to `target` if `current -> target` is legal. Concurrency-safe
    /// via a compare-and-swap retry loop; under contention exactly one
    /// concurrent caller succeeds.
    pub fn transition(&self, target: S) -> Result<(), FsmError> {
        loop {
            let current_raw = self.state.load(Ordering::SeqCst);
            let current = S::from_u8(current_raw);
            if !current.can_transition_to(target) {
                tracing::debug!(from = %current, to = %target, "rejected invalid state transition");
                return Err(FsmError::InvalidTransition {
                    from: current.to_string(),
                    to: target.to_string(),
                });
            }
            if self
                .state
                .compare_exchange(current_raw, target.to_u8(), Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                let _ = self.tx.send(target.to_u8());
                return Ok(());
            }
            // Lost the race to a concurrent transition; retry against
            // whatever state actually won.
        }
    }

    /// Conditional transition: succeeds only if the observed current state
    /// is exactly `from` and `from -> to` is legal.
    pub fn transition_if_current(&self, from: S, to: S) -> Result<(), FsmError> {
        if !from.can_transition_to(to) {
            return Err(FsmError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        match self.state.compare_exchange(
            from.to_u8(),
            to.to_u8(),
            Ordering::SeqCst,
            Ordering::SeqCst,
        ) {
            Ok(_) => {
                let _ = self.tx.send(to.to_u8());
                Ok(())
            }
            Err(observed) => Err(FsmError::InvalidTransition {
                from: S::from_u8(observed).to_string(),
                to: to.to_string(),
            }),
        }
    }

    /// Subscribe to subsequent state changes. The returned handle closes
    /// once `cancel` fires. Multiple concurrent subscribers are supported
    /// and all observe the same transition order; the state at subscription
    /// time is not guaranteed to be replayed.
    pub fn subscribe(&self, cancel: CancellationToken) -> FsmSubscription<S> {
        FsmSubscription {
            rx: self.tx.subscribe(),
            cancel,
            _marker: std::marker::PhantomData,
        }
    }

    /// Block until the FSM enters a terminal state. Returns immediately if
    /// already terminal. Cancellation yields `FsmError::Cancelled`.
    pub async fn wait_for_completion(&self, cancel: CancellationToken) -> Result<S, FsmError> {
        let current = self.state();
        if current.is_terminal() {
            return Ok(current);
        }
        let mut sub = self.subscribe(cancel.clone());
        loop {
            match sub.recv().await {
                Some(s) if s.is_terminal() => return Ok(s),
                Some(_) => continue,
                None => return Err(FsmError::Cancelled),
            }
        }
    }
}

/// A live subscription to an [`Fsm`]'s state-change stream.
pub struct FsmSubscription<S: FsmState> {
    rx: watch::Receiver<u8>,
    cancel: CancellationToken,
    _marker: std::marker::PhantomData<S>,
}

impl<S: FsmState> FsmSubscription<S> {
    /// Await the next state change, or `None` if cancelled or the FSM was
    /// dropped.
    pub async fn recv(&mut self) -> Option<S> {
        tokio::select! {
            _ = self.cancel.cancelled() => None,
            changed = self.rx.changed() => match changed {
                Ok(()) => Some(S::from_u8(*self.rx.borrow())),
                Err(_) => None,
            },
        }
    }
}
