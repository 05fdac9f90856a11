use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WhatsApp message recorded after a successful send.
///
/// `provider_message_id` is unique, which is what suppresses duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub id: i64,
    pub lead_id: i64,
    pub source_id: i64,
    pub provider_message_id: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOutboundMessage {
    pub lead_id: i64,
    pub source_id: i64,
    pub provider_message_id: String,
    pub created_at: DateTime<Utc>,
}
