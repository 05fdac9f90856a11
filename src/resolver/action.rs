use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::CampaignOption;

/// Action types a campaign option can be configured with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Whatsapp,
    CallAi,
    WebhookCrm,
    ManualReview,
    Skip,
}

impl ActionType {
    /// Upper-case code used in error codes and metrics labels
    pub fn code(&self) -> &'static str {
        match self {
            Self::Whatsapp => "WHATSAPP",
            Self::CallAi => "CALL_AI",
            Self::WebhookCrm => "WEBHOOK_CRM",
            Self::ManualReview => "MANUAL_REVIEW",
            Self::Skip => "SKIP",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whatsapp => write!(f, "whatsapp"),
            Self::CallAi => write!(f, "call_ai"),
            Self::WebhookCrm => write!(f, "webhook_crm"),
            Self::ManualReview => write!(f, "manual_review"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

impl std::str::FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "whatsapp" => Ok(Self::Whatsapp),
            "call_ai" => Ok(Self::CallAi),
            "webhook_crm" => Ok(Self::WebhookCrm),
            "manual_review" => Ok(Self::ManualReview),
            "skip" => Ok(Self::Skip),
            _ => Err(format!("Invalid action type: {s}")),
        }
    }
}

/// Action to execute, carrying only the parameters its type uses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionKind {
    Whatsapp {
        source_id: Option<i64>,
        template_id: Option<String>,
        message: Option<String>,
    },
    CallAi {
        agent_id: Option<String>,
    },
    WebhookCrm {
        source_id: Option<i64>,
    },
    ManualReview,
    Skip,
}

/// Raw parameters as found in any configuration source
#[derive(Debug, Clone, Default)]
pub struct ActionParams {
    pub source_id: Option<i64>,
    pub template_id: Option<String>,
    pub message: Option<String>,
    pub agent_id: Option<String>,
}

impl ActionKind {
    /// Keep the parameters relevant to `action_type`, drop the rest
    pub fn build(action_type: ActionType, params: ActionParams) -> Self {
        match action_type {
            ActionType::Whatsapp => Self::Whatsapp {
                source_id: params.source_id,
                template_id: non_blank(params.template_id),
                message: non_blank(params.message),
            },
            ActionType::CallAi => Self::CallAi {
                agent_id: non_blank(params.agent_id),
            },
            ActionType::WebhookCrm => Self::WebhookCrm {
                source_id: params.source_id,
            },
            ActionType::ManualReview => Self::ManualReview,
            ActionType::Skip => Self::Skip,
        }
    }

    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Whatsapp { .. } => ActionType::Whatsapp,
            Self::CallAi { .. } => ActionType::CallAi,
            Self::WebhookCrm { .. } => ActionType::WebhookCrm,
            Self::ManualReview => ActionType::ManualReview,
            Self::Skip => ActionType::Skip,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Which configuration source produced a resolved action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionOrigin {
    OptionRow,
    LegacyTrigger,
    LegacyOptionConfig,
    CampaignFallback,
}

/// Normalized action for a lead; derived on every resolution, never stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedAction {
    pub kind: ActionKind,
    pub delay_seconds: u32,
    pub enabled: bool,
    pub origin: ResolutionOrigin,
}

impl ResolvedAction {
    pub fn new(kind: ActionKind, origin: ResolutionOrigin) -> Self {
        Self {
            kind,
            delay_seconds: 0,
            enabled: true,
            origin,
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay_seconds: i64) -> Self {
        self.delay_seconds = u32::try_from(delay_seconds.max(0)).unwrap_or(u32::MAX);
        self
    }

    /// Build from a typed option row; fails on an unknown action type
    pub fn from_option_row(option: &CampaignOption) -> Result<Self, String> {
        let action_type: ActionType = option.action.parse()?;
        let kind = ActionKind::build(
            action_type,
            ActionParams {
                source_id: option.source_id,
                template_id: option.template_id.clone(),
                message: option.message.clone(),
                agent_id: option.agent_id.clone(),
            },
        );
        let mut resolved =
            Self::new(kind, ResolutionOrigin::OptionRow).with_delay(i64::from(option.delay_seconds));
        resolved.enabled = option.enabled;
        Ok(resolved)
    }

    pub fn action_type(&self) -> ActionType {
        self.kind.action_type()
    }

    pub fn is_skip(&self) -> bool {
        matches!(self.kind, ActionKind::Skip)
    }

    pub fn source_id(&self) -> Option<i64> {
        match &self.kind {
            ActionKind::Whatsapp { source_id, .. } | ActionKind::WebhookCrm { source_id } => {
                *source_id
            }
            _ => None,
        }
    }

    pub fn template_id(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Whatsapp { template_id, .. } => template_id.as_deref(),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Whatsapp { message, .. } => message.as_deref(),
            _ => None,
        }
    }

    pub fn agent_id(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::CallAi { agent_id } => agent_id.as_deref(),
            _ => None,
        }
    }
}
