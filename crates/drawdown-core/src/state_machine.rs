use crate::error::StateMachineError;
use serde::{Deserialize, Serialize};

/// Lifecycle phase of a form instance
///
/// `Valid` and `Invalid` are the two sub-states of "ready".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormPhase {
    Loading,
    Valid,
    Invalid,
    Submitting,
    Completed,
    Failed,
    LoadError,
}

impl FormPhase {
    /// Either ready sub-state
    #[inline]
    #[must_use]
    pub fn is_ready(self) -> bool {
        matches!(self, Self::Valid | Self::Invalid)
    }

    /// No further transitions possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        allowed_transitions(self).is_empty()
    }

    /// Ready sub-state for a validity flag
    #[inline]
    #[must_use]
    pub fn ready(valid: bool) -> Self {
        if valid {
            Self::Valid
        } else {
            Self::Invalid
        }
    }
}

impl std::fmt::Display for FormPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Loading => "loading",
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Submitting => "submitting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::LoadError => "load error",
        };
        f.write_str(name)
    }
}

/// Validates a phase transition.
pub fn validate_transition(from: FormPhase, to: FormPhase) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// Phases reachable from `from`
pub fn allowed_transitions(from: FormPhase) -> Vec<FormPhase> {
    use FormPhase::*;
    match from {
        Loading => vec![Loading, Valid, Invalid, LoadError],
        Valid => vec![Valid, Invalid, Submitting, Loading],
        Invalid => vec![Valid, Invalid, Loading],
        Submitting => vec![Completed, Failed],
        Completed => vec![],
        Failed => vec![Invalid],
        // Only an identifier change gets out of a failed load.
        LoadError => vec![Loading, LoadError],
    }
}

fn allowed(from: FormPhase, to: FormPhase) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}
