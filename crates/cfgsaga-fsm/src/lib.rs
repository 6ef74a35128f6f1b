//! # cfgsaga-fsm — Runtime Finite State Machines
//!
//! A generic, atomically-updated FSM engine (`engine`), plus the two
//! concrete schemas the saga coordinator runs: the transaction-level saga
//! lifecycle (`saga`) and the per-participant lifecycle (`participant`).
//! States are runtime labels rather than compile-time typestates so a
//! single `Transaction` can hold a collection of participants whose states
//! are only known at runtime, and so the current state can be serialized
//! into diagnostics and log records directly.

pub mod engine;
pub mod participant;
pub mod saga;

pub use engine::{Fsm, FsmError, FsmState, FsmSubscription};
pub use participant::ParticipantState;
pub use saga::SagaState;
