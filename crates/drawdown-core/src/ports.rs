//! Boundary contracts with the hosting environment
//!
//! The form only talks to the outside world through three seams:
//! - [`RecordStore`] for fetching and updating records
//! - [`NotificationSink`] for toast-style notifications
//! - [`WorkflowHost`] for the actions the surrounding flow offers

use crate::error::StoreError;
use crate::types::{FieldValues, Record, RecordId};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Record store contract
///
/// Implement this trait to connect the form to a concrete record backend.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Fetch the named fields of a record
    async fn fetch(&self, id: &RecordId, fields: &[String]) -> Result<Record, StoreError>;

    /// Write field values to a record
    async fn update(&self, id: &RecordId, values: FieldValues) -> Result<(), StoreError>;
}

/// Notification severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

/// A user-visible notification raised to the host
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    /// Create new notification
    #[inline]
    #[must_use]
    pub fn new(title: impl Into<String>, message: impl Into<String>, severity: Severity) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            severity,
        }
    }
}

/// Fire-and-forget notification channel to the host
pub trait NotificationSink: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Navigation actions a workflow host can offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FlowAction {
    /// Move to the next step
    Next,
    /// Move to the previous step
    Back,
    /// Pause the flow
    Pause,
    /// Finish the flow
    Finish,
}

impl FlowAction {
    /// Host token for this action
    #[must_use]
    pub fn as_token(self) -> &'static str {
        match self {
            Self::Next => "NEXT",
            Self::Back => "BACK",
            Self::Pause => "PAUSE",
            Self::Finish => "FINISH",
        }
    }

    /// Parse host tokens, dropping any the form does not understand
    pub fn parse_tokens<I, S>(tokens: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        tokens
            .into_iter()
            .filter_map(|token| {
                let token = token.as_ref();
                match token.parse() {
                    Ok(action) => Some(action),
                    Err(_) => {
                        tracing::debug!("Ignoring unknown flow action token: {}", token);
                        None
                    }
                }
            })
            .collect()
    }
}

impl FromStr for FlowAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NEXT" => Ok(Self::Next),
            "BACK" => Ok(Self::Back),
            "PAUSE" => Ok(Self::Pause),
            "FINISH" => Ok(Self::Finish),
            other => Err(format!("unknown flow action: {other}")),
        }
    }
}

impl std::fmt::Display for FlowAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_token())
    }
}

/// The workflow hosting the form
pub trait WorkflowHost: Send + Sync {
    /// Actions the host currently offers
    fn available_actions(&self) -> Vec<FlowAction>;

    /// Ask the host to move to the next step
    fn advance(&self);
}
