use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What caused an assignment change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentTrigger {
    Manual,
    AutoRoundRobin,
    Unassigned,
}

impl fmt::Display for AssignmentTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::AutoRoundRobin => write!(f, "auto_round_robin"),
            Self::Unassigned => write!(f, "unassigned"),
        }
    }
}

impl std::str::FromStr for AssignmentTrigger {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "auto_round_robin" => Ok(Self::AutoRoundRobin),
            "unassigned" => Ok(Self::Unassigned),
            _ => Err(format!("Invalid assignment trigger: {s}")),
        }
    }
}

/// Immutable audit record of an assignment change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeadAssignmentLog {
    pub id: i64,
    pub lead_id: i64,
    pub campaign_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub previous_assignee: Option<i64>,
    pub trigger: AssignmentTrigger,
    pub actor_id: Option<i64>,
    pub cursor_index: Option<i32>,
    pub created_at: DateTime<Utc>,
}

/// Audit record before it has been stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLeadAssignmentLog {
    pub lead_id: i64,
    pub campaign_id: Option<i64>,
    pub assigned_to: Option<i64>,
    pub previous_assignee: Option<i64>,
    pub trigger: AssignmentTrigger,
    pub actor_id: Option<i64>,
    pub cursor_index: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl NewLeadAssignmentLog {
    pub fn into_log(self, id: i64) -> LeadAssignmentLog {
        LeadAssignmentLog {
            id,
            lead_id: self.lead_id,
            campaign_id: self.campaign_id,
            assigned_to: self.assigned_to,
            previous_assignee: self.previous_assignee,
            trigger: self.trigger,
            actor_id: self.actor_id,
            cursor_index: self.cursor_index,
            created_at: self.created_at,
        }
    }
}
