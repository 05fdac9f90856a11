use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Typed per-option action configuration, unique on `(campaign_id, option_key)`.
///
/// `action` is kept as the stored string; the resolver validates it so that
/// an unknown action type ends resolution instead of failing the row load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignOption {
    pub id: i64,
    pub campaign_id: i64,
    pub option_key: String,
    pub action: String,
    pub source_id: Option<i64>,
    pub template_id: Option<String>,
    pub message: Option<String>,
    pub agent_id: Option<String>,
    pub delay_seconds: i32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CampaignOption {
    /// New enabled option with no parameters
    pub fn new(
        id: i64,
        campaign_id: i64,
        option_key: impl Into<String>,
        action: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            campaign_id,
            option_key: option_key.into(),
            action: action.into(),
            source_id: None,
            template_id: None,
            message: None,
            agent_id: None,
            delay_seconds: 0,
            enabled: true,
            created_at: now,
            updated_at: now,
        }
    }
}
