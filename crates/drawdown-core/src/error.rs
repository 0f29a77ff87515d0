//! Error types for the drawdown validator
//!
//! Provides error handling for:
//! - Record store failures (fetch and update)
//! - Form operation failures (load, persistence, validation, gating)
//! - Illegal phase transitions
//! - Configuration loading

use crate::state_machine::FormPhase;
use crate::types::{FieldTypeError, RecordId};
use crate::validation::ValidationError;

/// Message shown when a failure carries no message of its own
pub const FALLBACK_ERROR_MESSAGE: &str = "Unknown error occurred.";

/// Errors reported by a record store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// No record with this id
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// Store refused the request; the message, if any, is meant for the user
    #[error("request rejected: {}", .message.as_deref().unwrap_or("no message"))]
    Rejected {
        /// User-facing message from the store
        message: Option<String>,
    },

    /// Store could not be reached
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    /// Rejection with a user-facing message
    #[inline]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: Some(message.into()),
        }
    }

    /// Message suitable for display, if the store supplied one
    #[must_use]
    pub fn user_message(&self) -> Option<String> {
        match self {
            Self::NotFound(_) => Some(self.to_string()),
            Self::Rejected { message } => message.clone().filter(|m| !m.trim().is_empty()),
            Self::Unavailable(message) if message.trim().is_empty() => None,
            Self::Unavailable(message) => Some(message.clone()),
        }
    }

    /// Check if retrying the same request may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Which record a load was for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    /// The activity being edited
    Activity,
    /// The parent case holding the capacity limit
    Case,
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Activity => f.write_str("activity"),
            Self::Case => f.write_str("case"),
        }
    }
}

/// Main form error type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormError {
    /// Record fetch failed
    #[error("failed to load {kind}: {source}")]
    Load {
        /// Record that failed to load
        kind: RecordKind,
        /// Store failure
        #[source]
        source: StoreError,
    },

    /// Loaded record holds a field of the wrong type
    #[error("failed to read {kind}: {source}")]
    Field {
        /// Record holding the field
        kind: RecordKind,
        /// Type mismatch
        #[source]
        source: FieldTypeError,
    },

    /// Update call failed
    #[error("failed to save drawdown amount: {0}")]
    Persistence(#[source] StoreError),

    /// Amount rejected by the live check
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Submit is not possible in the current phase
    #[error("submit unavailable while {0}")]
    SubmitUnavailable(FormPhase),

    /// No activity id has been supplied
    #[error("no activity record id supplied")]
    MissingRecordId,

    /// Phase transition rejected
    #[error(transparent)]
    Transition(#[from] StateMachineError),

    /// Event driver has shut down
    #[error("form driver closed")]
    DriverClosed,
}

impl FormError {
    /// Message to show the user, falling back when the failure carries none
    #[must_use]
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Self::Load { source, .. } | Self::Persistence(source) => {
                source.user_message().unwrap_or_else(|| fallback.to_string())
            }
            other => other.to_string(),
        }
    }

    /// Check if the error is raised to the host as a notification
    ///
    /// Validation and gating errors only show inline.
    #[inline]
    #[must_use]
    pub fn notifies(&self) -> bool {
        matches!(
            self,
            Self::Load { .. } | Self::Field { .. } | Self::Persistence(_)
        )
    }

    /// Check if the user can retry by submitting again
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence(source) | Self::Load { source, .. } => source.is_retryable(),
            Self::Validation(_) => true,
            _ => false,
        }
    }
}

/// State machine errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StateMachineError {
    /// Transition not in the allowed table
    #[error("illegal phase transition: {from} -> {to}")]
    IllegalTransition {
        /// Phase before
        from: FormPhase,
        /// Requested phase
        to: FormPhase,
    },
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// TOML could not be parsed
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// A required setting is empty
    #[error("configuration value `{0}` must not be empty")]
    Empty(&'static str),
}
