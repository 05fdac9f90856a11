use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sales rep participating in a campaign's round-robin pool.
///
/// `(campaign_id, user_id)` is unique. Only active rows rotate, ordered by
/// `sort_order` then by `id` (insertion order).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignAssignee {
    pub id: i64,
    pub campaign_id: i64,
    pub user_id: i64,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
}

impl CampaignAssignee {
    /// Ordering key used for the rotation sequence
    pub fn rotation_key(&self) -> (i32, i64) {
        (self.sort_order, self.id)
    }
}
