//! # Participant and Participant Collection
//!
//! A participant is a named handle tracking one external subsystem's
//! progress through a saga, independent of the saga's own FSM: one
//! participant failing does not retract another participant's `succeeded`
//! state, and a participant with a captured error remains visible for
//! diagnostics without blocking the saga's own terminal-state progression.

use std::collections::BTreeMap;
use std::sync::Arc;

use cfgsaga_fsm::{Fsm, ParticipantState};
use tokio::sync::RwLock;

/// A single participant's tracked state.
pub struct Participant {
    name: String,
    fsm: Fsm<ParticipantState>,
    error: std::sync::Mutex<Option<String>>,
    last_transition: std::sync::Mutex<cfgsaga_core::Timestamp>,
}

impl std::fmt::Debug for Participant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Participant")
            .field("name", &self.name)
            .field("state", &self.fsm.state())
            .finish()
    }
}

impl Participant {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fsm: Fsm::new(ParticipantState::NotStarted),
            error: std::sync::Mutex::new(None),
            last_transition: std::sync::Mutex::new(cfgsaga_core::Timestamp::now()),
        }
    }

    /// This participant's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current state.
    pub fn state(&self) -> ParticipantState {
        self.fsm.state()
    }

    /// Captured error, if this participant ever failed or errored.
    pub fn error(&self) -> Option<String> {
        self.error.lock().expect("participant error mutex poisoned").clone()
    }

    /// Timestamp of the most recent transition.
    pub fn last_transition(&self) -> cfgsaga_core::Timestamp {
        *self.last_transition.lock().expect("participant timestamp mutex poisoned")
    }

    fn record_transition(&self) {
        *self.last_transition.lock().expect("participant timestamp mutex poisoned") = cfgsaga_core::Timestamp::now();
    }

    /// `not_started -> executing`.
    pub fn execute(&self) -> Result<(), cfgsaga_fsm::FsmError> {
        self.fsm.transition(ParticipantState::Executing)?;
        self.record_transition();
        Ok(())
    }

    /// `executing -> succeeded`.
    pub fn mark_succeeded(&self) -> Result<(), cfgsaga_fsm::FsmError> {
        self.fsm.transition(ParticipantState::Succeeded)?;
        self.record_transition();
        Ok(())
    }

    /// `executing -> failed`, capturing the error.
    pub fn mark_failed(&self, err: impl Into<String>) -> Result<(), cfgsaga_fsm::FsmError> {
        self.fsm.transition(ParticipantState::Failed)?;
        *self.error.lock().expect("participant error mutex poisoned") = Some(err.into());
        self.record_transition();
        Ok(())
    }

    /// `succeeded -> compensating`; a no-op (not an error) when not in
    /// `succeeded`.
    pub fn begin_compensation(&self) -> Result<(), cfgsaga_fsm::FsmError> {
        if self.fsm.state() != ParticipantState::Succeeded {
            return Ok(());
        }
        self.fsm.transition(ParticipantState::Compensating)?;
        self.record_transition();
        Ok(())
    }

    /// `compensating -> compensated`.
    pub fn mark_compensated(&self) -> Result<(), cfgsaga_fsm::FsmError> {
        self.fsm.transition(ParticipantState::Compensated)?;
        self.record_transition();
        Ok(())
    }

    /// Any non-terminal -> `error`.
    pub fn mark_error(&self, err: impl Into<String>) -> Result<(), cfgsaga_fsm::FsmError> {
        self.fsm.transition(ParticipantState::Error)?;
        *self.error.lock().expect("participant error mutex poisoned") = Some(err.into());
        self.record_transition();
        Ok(())
    }
}

/// A name-keyed, concurrency-safe collection of participants, owned by a
/// transaction. Names are unique within one collection.
#[derive(Default)]
pub struct ParticipantCollection {
    inner: RwLock<BTreeMap<String, Arc<Participant>>>,
}

impl std::fmt::Debug for ParticipantCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticipantCollection").finish()
    }
}

impl ParticipantCollection {
    /// Construct an empty collection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the existing participant named `name`, or create one in
    /// state `not_started`.
    pub async fn get_or_create(&self, name: &str) -> Arc<Participant> {
        if let Some(p) = self.inner.read().await.get(name) {
            return p.clone();
        }
        let mut guard = self.inner.write().await;
        guard
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(Participant::new(name)))
            .clone()
    }

    /// As `get_or_create`, but fails if a participant named `name` already
    /// exists.
    pub async fn add_participant(&self, name: &str) -> Result<Arc<Participant>, String> {
        let mut guard = self.inner.write().await;
        if guard.contains_key(name) {
            return Err(format!("participant already registered: {name}"));
        }
        let p = Arc::new(Participant::new(name));
        guard.insert(name.to_string(), p.clone());
        Ok(p)
    }

    /// True iff every participant is in state `succeeded` (vacuously true
    /// on an empty collection).
    pub async fn all_participants_succeeded(&self) -> bool {
        self.inner
            .read()
            .await
            .values()
            .all(|p| p.state() == ParticipantState::Succeeded)
    }

    /// Participants in lexicographic name order.
    pub async fn in_order(&self) -> Vec<Arc<Participant>> {
        self.inner.read().await.values().cloned().collect()
    }

    /// Participants in reverse lexicographic name order.
    pub async fn in_reverse_order(&self) -> Vec<Arc<Participant>> {
        let mut v: Vec<_> = self.inner.read().await.values().cloned().collect();
        v.reverse();
        v
    }

    /// Start compensation on every participant currently in `succeeded`;
    /// participants in other states are skipped. Errors from individual
    /// transitions are joined rather than aborting the sweep.
    pub async fn begin_compensation(&self) -> Result<(), Vec<String>> {
        let mut errs = vec![];
        for p in self.inner.read().await.values() {
            if p.state() == ParticipantState::Succeeded {
                if let Err(e) = p.begin_compensation() {
                    errs.push(format!("{}: {e}", p.name()));
                }
            }
        }
        if errs.is_empty() {
            Ok(())
        } else {
            Err(errs)
        }
    }

    /// Snapshot of participant name -> state, for diagnostics.
    pub async fn participant_states(&self) -> BTreeMap<String, ParticipantState> {
        self.inner
            .read()
            .await
            .iter()
            .map(|(name, p)| (name.clone(), p.state()))
            .collect()
    }

    /// Snapshot of participant name -> captured error, for diagnostics.
    pub async fn participant_errors(&self) -> BTreeMap<String, String> {
        self.inner
            .read()
            .await
            .iter()
            .filter_map(|(name, p)| p.error().map(|e| (name.clone(), e)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let coll = ParticipantCollection::new();
        let a = coll.get_or_create("listener").await;
        let b = coll.get_or_create("listener").await;
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_add_participant_rejects_duplicate() {
        let coll = ParticipantCollection::new();
        coll.add_participant("listener").await.unwrap();
        assert!(coll.add_participant("listener").await.is_err());
    }

    #[tokio::test]
    async fn test_all_succeeded_vacuously_true_on_empty() {
        let coll = ParticipantCollection::new();
        assert!(coll.all_participants_succeeded().await);
    }

    #[tokio::test]
    async fn test_failed_participant_is_not_compensated() {
        let coll = ParticipantCollection::new();
        let p = coll.get_or_create("listener").await;
        p.execute().unwrap();
        p.mark_failed("boom").unwrap();
        coll.begin_compensation().await.unwrap();
        assert_eq!(p.state(), ParticipantState::Failed);
    }

    #[tokio::test]
    async fn test_succeeded_participant_is_compensated() {
        let coll = ParticipantCollection::new();
        let p = coll.get_or_create("listener").await;
        p.execute().unwrap();
        p.mark_succeeded().unwrap();
        coll.begin_compensation().await.unwrap();
        assert_eq!(p.state(), ParticipantState::Compensating);
    }

    #[tokio::test]
    async fn test_lexicographic_and_reverse_order() {
        let coll = ParticipantCollection::new();
        coll.get_or_create("charlie").await;
        coll.get_or_create("alpha").await;
        coll.get_or_create("bravo").await;
        let names: Vec<_> = coll.in_order().await.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["alpha", "bravo", "charlie"]);
        let rev: Vec<_> = coll.in_reverse_order().await.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(rev, vec!["charlie", "bravo", "alpha"]);
    }
}
