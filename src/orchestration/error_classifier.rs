//! # Automation Error Classification
//!
//! Maps failures raised while executing a lead's resolved action onto the
//! categories operators see in the retry queue, and onto the terminal
//! automation state the lead lands in.
//!
//! ```text
//! ┌─────────────────┐     ┌─────────────────┐     ┌─────────────────┐
//! │ ActionError     │────▶│ ErrorClassifier │────▶│ Classification  │
//! │ + ErrorContext  │     │                 │     │ (skip or fail)  │
//! └─────────────────┘     └─────────────────┘     └─────────────────┘
//! ```
//!
//! | Category | Typical cause | Lead ends in |
//! |----------|---------------|--------------|
//! | Configuration | missing/inactive source, no template | `skipped` |
//! | Transient | provider or network failure, storage hiccup | `failed` |
//! | InvariantViolation | inputs that should never reach execution | `failed` |

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::resolver::ActionType;
use crate::state_machine::errors::ActionError;
use crate::state_machine::events::AutomationEvent;
use crate::state_machine::AutomationState;

/// Context information for error classification
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub lead_id: i64,
    pub campaign_id: Option<i64>,
    pub action_type: ActionType,
    /// Current attempt number (1-based)
    pub attempt_number: i32,
}

/// Primary error categories, stored in `leads.automation_error_category`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Requires an operator to fix campaign or source configuration
    Configuration,

    /// May succeed when retried
    Transient,

    /// Inconsistent input; logged for investigation
    InvariantViolation,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Transient => write!(f, "transient"),
            Self::InvariantViolation => write!(f, "invariant_violation"),
        }
    }
}

impl std::str::FromStr for ErrorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "configuration" => Ok(Self::Configuration),
            "transient" => Ok(Self::Transient),
            "invariant_violation" => Ok(Self::InvariantViolation),
            _ => Err(format!("Invalid error category: {s}")),
        }
    }
}

/// Result of error classification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub error_category: ErrorCategory,

    /// Terminal automation state the lead should move to
    pub target_state: AutomationState,

    /// Specific error code for tracking
    pub error_code: String,

    /// Human-readable message recorded in `automation_error`
    pub error_message: String,

    pub remediation_suggestions: Vec<String>,
}

impl ErrorClassification {
    /// State machine event that records this classification on the lead
    pub fn to_event(&self) -> AutomationEvent {
        match self.target_state {
            AutomationState::Skipped => {
                AutomationEvent::skip_with(self.error_message.clone(), Some(self.error_category))
            }
            _ => AutomationEvent::fail_with(self.error_message.clone(), self.error_category),
        }
    }
}

/// Trait for error classification strategies
pub trait ErrorClassifier: Send + Sync + fmt::Debug {
    fn classify_error(&self, error: &ActionError, context: &ErrorContext) -> ErrorClassification;

    /// Get the classifier name for identification
    fn classifier_name(&self) -> &'static str;
}

/// Default classification used by the orchestrator
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardErrorClassifier;

impl StandardErrorClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ErrorClassifier for StandardErrorClassifier {
    fn classify_error(&self, error: &ActionError, context: &ErrorContext) -> ErrorClassification {
        match error {
            ActionError::Configuration(reason) => ErrorClassification {
                error_category: ErrorCategory::Configuration,
                target_state: AutomationState::Skipped,
                error_code: format!("{}_CONFIGURATION", context.action_type.code()),
                error_message: reason.clone(),
                remediation_suggestions: vec![
                    "Check the campaign option and its source configuration".to_string(),
                    "Retry the lead once the configuration is fixed".to_string(),
                ],
            },
            ActionError::ExternalService { service, reason } => ErrorClassification {
                error_category: ErrorCategory::Transient,
                target_state: AutomationState::Failed,
                error_code: format!("{}_PROVIDER_FAILURE", context.action_type.code()),
                error_message: format!("{service} failed: {reason}"),
                remediation_suggestions: vec![
                    format!("Check {service} availability"),
                    "Retry the lead from the errors queue".to_string(),
                ],
            },
            ActionError::Store(store_error) => ErrorClassification {
                error_category: ErrorCategory::Transient,
                target_state: AutomationState::Failed,
                error_code: "STORAGE_FAILURE".to_string(),
                error_message: format!("Storage error: {store_error}"),
                remediation_suggestions: vec!["Check database connectivity".to_string()],
            },
            ActionError::InvariantViolation(reason) => ErrorClassification {
                error_category: ErrorCategory::InvariantViolation,
                target_state: AutomationState::Failed,
                error_code: "INVARIANT_VIOLATION".to_string(),
                error_message: reason.clone(),
                remediation_suggestions: vec![format!(
                    "Inspect lead {} and its campaign data",
                    context.lead_id
                )],
            },
        }
    }

    fn classifier_name(&self) -> &'static str {
        "StandardErrorClassifier"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StoreError;

    fn context(action_type: ActionType) -> ErrorContext {
        ErrorContext {
            lead_id: 42,
            campaign_id: Some(7),
            action_type,
            attempt_number: 1,
        }
    }

    #[test]
    fn test_configuration_errors_skip() {
        let classifier = StandardErrorClassifier::new();
        let classification = classifier.classify_error(
            &ActionError::configuration("WhatsApp source 3 is inactive"),
            &context(ActionType::Whatsapp),
        );

        assert_eq!(classification.error_category, ErrorCategory::Configuration);
        assert_eq!(classification.target_state, AutomationState::Skipped);
        assert_eq!(classification.error_code, "WHATSAPP_CONFIGURATION");
        assert!(matches!(classification.to_event(), AutomationEvent::Skip(_)));
    }

    #[test]
    fn test_provider_errors_fail_as_transient() {
        let classifier = StandardErrorClassifier::new();
        let classification = classifier.classify_error(
            &ActionError::external("whatsapp", "503 from provider"),
            &context(ActionType::Whatsapp),
        );

        assert_eq!(classification.error_category, ErrorCategory::Transient);
        assert_eq!(classification.target_state, AutomationState::Failed);
        assert_eq!(classification.error_message, "whatsapp failed: 503 from provider");
        match classification.to_event() {
            AutomationEvent::Fail(reason) => {
                assert_eq!(reason.category, Some(ErrorCategory::Transient))
            }
            other => panic!("Expected Fail, got {other:?}"),
        }
    }

    #[test]
    fn test_store_and_invariant_errors_fail() {
        let classifier = StandardErrorClassifier::new();
        let store = classifier.classify_error(
            &ActionError::Store(StoreError::Transaction("connection reset".into())),
            &context(ActionType::WebhookCrm),
        );
        assert_eq!(store.target_state, AutomationState::Failed);
        assert_eq!(store.error_category, ErrorCategory::Transient);

        let invariant = classifier.classify_error(
            &ActionError::InvariantViolation("dynamic campaign without option".into()),
            &context(ActionType::CallAi),
        );
        assert_eq!(invariant.error_category, ErrorCategory::InvariantViolation);
    }

    #[test]
    fn test_category_string_conversion() {
        assert_eq!(ErrorCategory::InvariantViolation.to_string(), "invariant_violation");
        assert_eq!(
            "configuration".parse::<ErrorCategory>().unwrap(),
            ErrorCategory::Configuration
        );
    }
}
