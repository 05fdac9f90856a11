use serde::{Deserialize, Serialize};

use crate::orchestration::error_classifier::ErrorCategory;

/// Reason attached to a `skip` or `fail` transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionReason {
    pub message: String,
    pub category: Option<ErrorCategory>,
}

impl TransitionReason {
    pub fn new(message: impl Into<String>, category: Option<ErrorCategory>) -> Self {
        Self {
            message: message.into(),
            category,
        }
    }
}

/// Events that can trigger automation state transitions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum AutomationEvent {
    /// Lead enters automation with a resolved action
    Start,
    /// Action finished successfully
    Complete,
    /// Action was not executed
    Skip(TransitionReason),
    /// Action raised an error
    Fail(TransitionReason),
    /// Operator requested another attempt
    Reset,
}

impl AutomationEvent {
    /// Get a string representation of the event type for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Complete => "complete",
            Self::Skip(_) => "skip",
            Self::Fail(_) => "fail",
            Self::Reset => "reset",
        }
    }

    /// Extract the recorded reason for skip/fail events
    pub fn reason(&self) -> Option<&TransitionReason> {
        match self {
            Self::Skip(reason) | Self::Fail(reason) => Some(reason),
            _ => None,
        }
    }

    /// Check if this event represents a terminal transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Skip(_) | Self::Fail(_))
    }

    /// Create a failure event
    pub fn fail_with(message: impl Into<String>, category: ErrorCategory) -> Self {
        Self::Fail(TransitionReason::new(message, Some(category)))
    }

    /// Create a skip event
    pub fn skip_with(message: impl Into<String>, category: Option<ErrorCategory>) -> Self {
        Self::Skip(TransitionReason::new(message, category))
    }
}
