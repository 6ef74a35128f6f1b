//! # Participant FSM Schema
//!
//! The per-participant lifecycle: a participant tracks one external
//! subsystem's progress through a saga independent of the saga's own FSM,
//! so one participant entering `failed` does not itself retract another
//! participant's `succeeded` state.

use std::fmt;

use crate::engine::FsmState;

/// A state in a single participant's lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParticipantState {
    NotStarted,
    Executing,
    Succeeded,
    Failed,
    Compensating,
    Compensated,
    Error,
}

impl fmt::Display for ParticipantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ParticipantState::NotStarted => "not_started",
            ParticipantState::Executing => "executing",
            ParticipantState::Succeeded => "succeeded",
            ParticipantState::Failed => "failed",
            ParticipantState::Compensating => "compensating",
            ParticipantState::Compensated => "compensated",
            ParticipantState::Error => "error",
        };
        f.write_str(s)
    }
}

impl FsmState for ParticipantState {
    fn to_u8(self) -> u8 {
        self as u8
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => ParticipantState::NotStarted,
            1 => ParticipantState::Executing,
            2 => ParticipantState::Succeeded,
            3 => ParticipantState::Failed,
            4 => ParticipantState::Compensating,
            5 => ParticipantState::Compensated,
            6 => ParticipantState::Error,
            other => unreachable!("invalid participant state discriminant: {other}"),
        }
    }

    fn can_transition_to(self, target: Self) -> bool {
        use ParticipantState::*;
        matches!(
            (self, target),
            (NotStarted, Executing)
                | (NotStarted, Error)
                | (Executing, Succeeded)
                | (Executing, Failed)
                | (Executing, Error)
                | (Succeeded, Compensating)
                | (Succeeded, Error)
                | (Failed, Error)
                | (Compensating, Compensated)
                | (Compensating, Error)
        )
    }

    fn is_terminal(self) -> bool {
        matches!(self, ParticipantState::Compensated | ParticipantState::Error)
    }
}
