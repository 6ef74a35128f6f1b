//! # Saga Transaction FSM Schema
//!
//! The twelve states a configuration transaction moves through from
//! construction to a terminal outcome, and the transition table between
//! them.

use std::fmt;

use crate::engine::FsmState;

/// A state in the saga transaction lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SagaState {
    Created,
    Validating,
    Validated,
    Invalid,
    Executing,
    Succeeded,
    Reloading,
    Completed,
    Failed,
    Compensating,
    Compensated,
    Error,
}

impl fmt::Display for SagaState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SagaState::Created => "created",
            SagaState::Validating => "validating",
            SagaState::Validated => "validated",
            SagaState::Invalid => "invalid",
            SagaState::Executing => "executing",
            SagaState::Succeeded => "succeeded",
            SagaState::Reloading => "reloading",
            SagaState::Completed => "completed",
            SagaState::Failed => "failed",
            SagaState::Compensating => "compensating",
            SagaState::Compensated => "compensated",
            SagaState::Error => "error",
        };
        f.write_str(s)
    }
}

impl FsmState for SagaState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => SagaState::Created,
            1 => SagaState::Validating,
            2 => SagaState::Validated,
            3 => SagaState::Invalid,
            4 => SagaState::Executing,
            5 => SagaState::Succeeded,
            6 => SagaState::Reloading,
            7 => SagaState::Completed,
            8 => SagaState::Failed,
            9 => SagaState::Compensating,
            10 => SagaState::Compensated,
            11 => SagaState::Error,
            other => unreachable!("invalid saga state discriminant: {other}"),
        }
    }

    fn can_transition_to(self, target: Self) -> bool {
        use SagaState::*;
        matches!(
            (self, target),
            (Created, Validating)
                | (Created, Error)
                | (Validating, Validated)
                | (Validating, Invalid)
                | (Validating, Error)
                | (Validated, Executing)
                | (Validated, Error)
                | (Executing, Succeeded)
                | (Executing, Failed)
                | (Executing, Error)
                | (Succeeded, Reloading)
                | (Succeeded, Failed)
                | (Succeeded, Error)
                | (Reloading, Completed)
                | (Reloading, Error)
                | (Failed, Compensating)
                | (Failed, Error)
                | (Compensating, Compensated)
                | (Compensating, Error)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(
            self,
            SagaState::Invalid | SagaState::Completed | SagaState::Compensated | SagaState::Error
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Fsm;

    #[test]
    fn test_happy_path_transitions() {
        let fsm = Fsm::new(SagaState::Created);
        fsm.transition(SagaState::Validating).unwrap();
        fsm.transition(SagaState::Validated).unwrap();
        fsm.transition(SagaState::Executing).unwrap();
        fsm.transition(SagaState::Succeeded).unwrap();
        fsm.transition(SagaState::Reloading).unwrap();
        fsm.transition(SagaState::Completed).unwrap();
        assert_eq!(fsm.state(), SagaState::Completed);
        assert!(SagaState::Completed.is_terminal());
    }

    #[test]
    fn test_failure_compensation_path() {
        let fsm = Fsm::new(SagaState::Created);
        fsm.transition(SagaState::Validating).unwrap();
        fsm.transition(SagaState::Validated).unwrap();
        fsm.transition(SagaState::Executing).unwrap();
        fsm.transition(SagaState::Failed).unwrap();
        fsm.transition(SagaState::Compensating).unwrap();
        fsm.transition(SagaState::Compensated).unwrap();
        assert_eq!(fsm.state(), SagaState::Compensated);
    }

    #[test]
    fn test_terminal_states_reject_every_outbound() {
        for terminal in [
            SagaState::Invalid,
            SagaState::Completed,
            SagaState::Compensated,
            SagaState::Error,
        ] {
            for target in all_states() {
                assert!(!terminal.can_transition_to(target), "{terminal} -> {target} should be illegal");
            }
        }
    }

    fn all_states() -> Vec<SagaState> {
        vec![
            SagaState::Created,
            SagaState::Validating,
            SagaState::Validated,
            SagaState::Invalid,
            SagaState::Executing,
            SagaState::Succeeded,
            SagaState::Reloading,
            SagaState::Completed,
            SagaState::Failed,
            SagaState::Compensating,
            SagaState::Compensated,
            SagaState::Error,
        ]
    }
}
