//! Per-question state machine.
//!
//! Each question moves through:
//! - Idle -> Pending (question shown, request issued)
//! - Pending -> Idle (answer committed, or question rolled back)
//!
//! There is no failed state: a question that cannot be answered is removed.

use std::fmt;

/// Whether a question is awaiting its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AskState {
    /// No question outstanding. Ready to ask.
    #[default]
    Idle,
    /// A question is shown and its request is in flight.
    Pending,
}

impl fmt::Display for AskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AskState::Idle => write!(f, "Idle"),
            AskState::Pending => write!(f, "Pending"),
        }
    }
}

impl AskState {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &AskState) -> bool {
        matches!(
            (self, target),
            (AskState::Idle, AskState::Pending) | (AskState::Pending, AskState::Idle)
        )
    }
}

/// How a pending question left the `Pending` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AskOutcome {
    Committed,
    RolledBack,
}

impl fmt::Display for AskOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AskOutcome::Committed => write!(f, "commit"),
            AskOutcome::RolledBack => write!(f, "rollback"),
        }
    }
}
