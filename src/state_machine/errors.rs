use thiserror::Error;

use crate::integrations::IntegrationError;
use crate::store::StoreError;

/// Error types for automation state machine operations
#[derive(Error, Debug)]
pub enum StateMachineError {
    #[error("Guard condition failed: {reason}")]
    GuardFailed { reason: String },

    #[error("Invalid state transition from {from:?} on {event}")]
    InvalidTransition { from: Option<String>, event: String },

    #[error("Persistence operation failed: {0}")]
    Persistence(#[from] StoreError),
}

/// Guard condition failures
#[derive(Error, Debug)]
pub enum GuardError {
    #[error("Business rule violation: {rule}")]
    BusinessRuleViolation { rule: String },

    #[error("Invalid state for guard check: {state}")]
    InvalidState { state: String },
}

/// Failures raised while executing a resolved action
#[derive(Error, Debug)]
pub enum ActionError {
    /// Needs an operator fix (missing or inactive source, bad template)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Provider or network failure; a later retry may succeed
    #[error("External service error: {service} - {reason}")]
    ExternalService { service: String, reason: String },

    /// Inputs that should never reach execution
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl ActionError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    pub fn external(service: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalService {
            service: service.into(),
            reason: reason.into(),
        }
    }
}

impl From<IntegrationError> for ActionError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::InvalidConfiguration(message) => Self::Configuration(message),
            IntegrationError::Provider { provider, message } => Self::ExternalService {
                service: provider,
                reason: message,
            },
            other => Self::ExternalService {
                service: "integration".to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl From<GuardError> for StateMachineError {
    fn from(err: GuardError) -> Self {
        Self::GuardFailed {
            reason: err.to_string(),
        }
    }
}

/// Result type aliases for state machine operations
pub type StateMachineResult<T> = Result<T, StateMachineError>;
pub type GuardResult<T> = Result<T, GuardError>;
pub type ActionResult<T> = Result<T, ActionError>;

/// Helper function to create business rule violations
pub fn business_rule_violation(rule: impl Into<String>) -> GuardError {
    GuardError::BusinessRuleViolation { rule: rule.into() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_error_converts_to_guard_failed() {
        let err: StateMachineError = business_rule_violation("lead has no campaign").into();
        match err {
            StateMachineError::GuardFailed { reason } => {
                assert!(reason.contains("lead has no campaign"));
            }
            other => panic!("Expected GuardFailed, got {other:?}"),
        }
    }

    #[test]
    fn test_integration_errors_map_to_action_errors() {
        let err: ActionError = IntegrationError::InvalidConfiguration("bad token".into()).into();
        assert!(matches!(err, ActionError::Configuration(_)));

        let err: ActionError = IntegrationError::Network("timed out".into()).into();
        assert!(matches!(err, ActionError::ExternalService { .. }));
    }
}
