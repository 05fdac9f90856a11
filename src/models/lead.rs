use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::intentions;
use crate::orchestration::error_classifier::ErrorCategory;
use crate::state_machine::AutomationState;

/// Lifecycle of a lead's intention classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentionStatus {
    #[default]
    Pending,
    Finalized,
    SentToClient,
}

impl fmt::Display for IntentionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Finalized => write!(f, "finalized"),
            Self::SentToClient => write!(f, "sent_to_client"),
        }
    }
}

impl std::str::FromStr for IntentionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "finalized" => Ok(Self::Finalized),
            "sent_to_client" => Ok(Self::SentToClient),
            _ => Err(format!("Invalid intention status: {s}")),
        }
    }
}

/// Normalized reading of the free-text `intention` column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentionKind {
    Interested,
    NotInterested,
    Other,
}

impl IntentionKind {
    /// Case and whitespace insensitive; `"not interested"` is accepted too
    pub fn classify(intention: Option<&str>) -> Self {
        let Some(raw) = intention else {
            return Self::Other;
        };
        let normalized = raw.trim().to_ascii_lowercase().replace(' ', "_");
        match normalized.as_str() {
            intentions::INTERESTED => Self::Interested,
            intentions::NOT_INTERESTED => Self::NotInterested,
            _ => Self::Other,
        }
    }
}

/// Lead row with automation and assignment bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub id: i64,
    pub phone: String,
    pub campaign_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub assignment_error: Option<String>,
    pub intention: Option<String>,
    pub intention_status: IntentionStatus,
    pub intention_origin: Option<String>,
    pub automation_status: AutomationState,
    pub automation_attempts: i32,
    pub automation_error: Option<String>,
    pub automation_error_category: Option<ErrorCategory>,
    pub option_selected: Option<String>,
    pub last_automation_run_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Lead {
    pub fn new(id: i64, phone: impl Into<String>, campaign_id: Option<i64>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            phone: phone.into(),
            campaign_id,
            assigned_to: None,
            assigned_at: None,
            assignment_error: None,
            intention: None,
            intention_status: IntentionStatus::Pending,
            intention_origin: None,
            automation_status: AutomationState::Pending,
            automation_attempts: 0,
            automation_error: None,
            automation_error_category: None,
            option_selected: None,
            last_automation_run_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn intention_kind(&self) -> IntentionKind {
        IntentionKind::classify(self.intention.as_deref())
    }

    /// Finalized and interested
    pub fn is_sales_ready(&self) -> bool {
        self.intention_status == IntentionStatus::Finalized
            && self.intention_kind() == IntentionKind::Interested
    }

    /// A sales-ready lead must carry an assignee or a recorded reason why not
    pub fn satisfies_assignment_invariant(&self) -> bool {
        !self.is_sales_ready() || self.assigned_to.is_some() || self.assignment_error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intention_classification() {
        assert_eq!(IntentionKind::classify(Some("interested")), IntentionKind::Interested);
        assert_eq!(IntentionKind::classify(Some("  Interested ")), IntentionKind::Interested);
        assert_eq!(
            IntentionKind::classify(Some("Not Interested")),
            IntentionKind::NotInterested
        );
        assert_eq!(
            IntentionKind::classify(Some("not_interested")),
            IntentionKind::NotInterested
        );
        assert_eq!(IntentionKind::classify(Some("maybe")), IntentionKind::Other);
        assert_eq!(IntentionKind::classify(None), IntentionKind::Other);
    }

    #[test]
    fn test_sales_ready_requires_finalized_interest() {
        let mut lead = Lead::new(1, "+5511999990000", Some(1), Utc::now());
        lead.intention = Some("interested".into());
        assert!(!lead.is_sales_ready());

        lead.intention_status = IntentionStatus::Finalized;
        assert!(lead.is_sales_ready());
        assert!(!lead.satisfies_assignment_invariant());

        lead.assignment_error = Some("No active assignees configured for campaign".into());
        assert!(lead.satisfies_assignment_invariant());
    }

    #[test]
    fn test_intention_status_parse() {
        assert_eq!(
            "sent_to_client".parse::<IntentionStatus>().unwrap(),
            IntentionStatus::SentToClient
        );
        assert!("done".parse::<IntentionStatus>().is_err());
    }
}
