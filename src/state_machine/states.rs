use serde::{Deserialize, Serialize};
use std::fmt;

/// Automation lifecycle states stored in `leads.automation_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutomationState {
    /// Lead has not entered automation (or was reset for retry)
    #[default]
    Pending,
    /// Resolved action is executing or waiting on an external callback
    Processing,
    /// Action finished successfully
    Completed,
    /// Action raised an error
    Failed,
    /// Action was not executed (configuration problem, manual review, ineligible)
    Skipped,
}

impl AutomationState {
    /// Check if this is a terminal state (no automatic transitions out)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Skipped)
    }

    /// Check if an operator may reset this state for another attempt
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::Failed | Self::Skipped)
    }

    /// Check if this is an active state (automation running)
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Processing)
    }

    /// Failed and skipped leads surface in the operator error queue
    pub fn needs_attention(&self) -> bool {
        self.is_retriable()
    }
}

impl fmt::Display for AutomationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Processing => write!(f, "processing"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

impl std::str::FromStr for AutomationState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "processing" => Ok(Self::Processing),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "skipped" => Ok(Self::Skipped),
            _ => Err(format!("Invalid automation state: {s}")),
        }
    }
}
