//! Legacy JSON action configuration.
//!
//! Older campaigns store their actions as free-form JSON: a top-level
//! `direct_trigger_config` for direct campaigns, and an `option_actions`
//! object keyed by option string for dynamic ones. Ids were written both
//! as numbers and as strings, so parsing here is lenient.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::action::ActionParams;

/// One legacy action entry
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LegacyActionConfig {
    pub action: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_id")]
    pub source_id: Option<i64>,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub template_id: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub message: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_string")]
    pub agent_id: Option<String>,
    #[serde(deserialize_with = "deserialize_lenient_id")]
    pub delay_seconds: Option<i64>,
    pub enabled: Option<bool>,
}

impl LegacyActionConfig {
    /// Accepts either an object or a bare action string (`"whatsapp"`)
    pub fn from_value(value: &Value) -> Result<Self, serde_json::Error> {
        match value {
            Value::String(action) => Ok(Self {
                action: Some(action.clone()),
                ..Self::default()
            }),
            other => Self::deserialize(other),
        }
    }

    /// Trimmed action string, `None` when blank
    pub fn action_name(&self) -> Option<&str> {
        self.action.as_deref().map(str::trim).filter(|a| !a.is_empty())
    }

    pub fn is_disabled(&self) -> bool {
        self.enabled == Some(false)
    }

    pub fn params(&self) -> ActionParams {
        ActionParams {
            source_id: self.source_id,
            template_id: self.template_id.clone(),
            message: self.message.clone(),
            agent_id: self.agent_id.clone(),
        }
    }
}

fn deserialize_lenient_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Deserialize::deserialize(deserializer)?;

    Ok(match value {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn deserialize_lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<Value> = Deserialize::deserialize(deserializer)?;

    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_accept_numbers_and_strings() {
        let config = LegacyActionConfig::from_value(&json!({
            "action": "whatsapp",
            "source_id": "12",
            "template_id": 99,
            "delay_seconds": 30
        }))
        .unwrap();

        assert_eq!(config.action_name(), Some("whatsapp"));
        assert_eq!(config.source_id, Some(12));
        assert_eq!(config.template_id.as_deref(), Some("99"));
        assert_eq!(config.delay_seconds, Some(30));
        assert!(!config.is_disabled());
    }

    #[test]
    fn test_garbage_ids_are_ignored() {
        let config = LegacyActionConfig::from_value(&json!({
            "action": "webhook_crm",
            "source_id": "abc",
            "agent_id": ""
        }))
        .unwrap();

        assert_eq!(config.source_id, None);
        assert_eq!(config.agent_id, None);
    }

    #[test]
    fn test_bare_string_and_blank_action() {
        let config = LegacyActionConfig::from_value(&json!("call_ai")).unwrap();
        assert_eq!(config.action_name(), Some("call_ai"));

        let config = LegacyActionConfig::from_value(&json!({"action": "  ", "enabled": false})).unwrap();
        assert_eq!(config.action_name(), None);
        assert!(config.is_disabled());
    }

    #[test]
    fn test_non_object_is_an_error() {
        assert!(LegacyActionConfig::from_value(&json!([1, 2])).is_err());
    }
}
