use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::campaign_option::CampaignOption;

/// How a campaign decides which option applies to an incoming lead
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStrategy {
    /// Single trigger for every lead (option key `"0"`)
    Direct,
    /// IVR branch selected by the lead (`1`, `2`, `i`, `t`, ...)
    Dynamic,
}

impl fmt::Display for CampaignStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Direct => write!(f, "direct"),
            Self::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl std::str::FromStr for CampaignStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "dynamic" => Ok(Self::Dynamic),
            _ => Err(format!("Invalid campaign strategy: {s}")),
        }
    }
}

/// Which finalized intentions are exported to the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportRule {
    None,
    #[default]
    InterestedOnly,
    NotInterestedOnly,
    Both,
}

impl ExportRule {
    /// Parse a stored rule; unrecognized values behave as `interested_only`
    pub fn parse_lenient(value: &str) -> Self {
        value.parse().unwrap_or_default()
    }
}

impl fmt::Display for ExportRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::InterestedOnly => write!(f, "interested_only"),
            Self::NotInterestedOnly => write!(f, "not_interested_only"),
            Self::Both => write!(f, "both"),
        }
    }
}

impl std::str::FromStr for ExportRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "none" => Ok(Self::None),
            "interested_only" => Ok(Self::InterestedOnly),
            "not_interested_only" => Ok(Self::NotInterestedOnly),
            "both" => Ok(Self::Both),
            _ => Err(format!("Invalid export rule: {s}")),
        }
    }
}

/// Campaign aggregate as seen by the automation engine.
///
/// `options` holds the typed per-option rows. `direct_trigger_config` and
/// `option_actions` are the older JSON configuration blobs still honoured
/// by the resolver when no typed row applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: i64,
    pub name: String,
    pub strategy: CampaignStrategy,
    pub export_rule: ExportRule,
    pub auto_process_enabled: bool,
    pub direct_trigger_config: Option<serde_json::Value>,
    pub option_actions: Option<serde_json::Value>,
    pub fallback_action: Option<String>,
    pub whatsapp_source_id: Option<i64>,
    pub export_source_id: Option<i64>,
    #[serde(default)]
    pub options: Vec<CampaignOption>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Campaign {
    /// Build a campaign with no actions configured
    pub fn new(id: i64, name: impl Into<String>, strategy: CampaignStrategy, now: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            strategy,
            export_rule: ExportRule::default(),
            auto_process_enabled: true,
            direct_trigger_config: None,
            option_actions: None,
            fallback_action: None,
            whatsapp_source_id: None,
            export_source_id: None,
            options: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Look up the typed option row for a key
    pub fn option(&self, option_key: &str) -> Option<&CampaignOption> {
        self.options.iter().find(|o| o.option_key == option_key)
    }

    /// Legacy JSON entry for an option key, if present
    pub fn legacy_option_config(&self, option_key: &str) -> Option<&serde_json::Value> {
        self.option_actions
            .as_ref()
            .and_then(|actions| actions.get(option_key))
            .filter(|value| !value.is_null())
    }

    pub fn is_direct(&self) -> bool {
        self.strategy == CampaignStrategy::Direct
    }
}
