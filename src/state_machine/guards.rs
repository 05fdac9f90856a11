use super::errors::{business_rule_violation, GuardError, GuardResult};
use crate::models::Lead;

/// Trait for implementing state transition guards
pub trait StateGuard<T> {
    /// Check if a transition is allowed
    fn check(&self, entity: &T) -> GuardResult<()>;

    /// Get a description of this guard for logging
    fn description(&self) -> &'static str;
}

/// Automation cannot start for a lead that is not attached to a campaign
pub struct LeadHasCampaignGuard;

impl StateGuard<Lead> for LeadHasCampaignGuard {
    fn check(&self, lead: &Lead) -> GuardResult<()> {
        if lead.campaign_id.is_none() {
            return Err(business_rule_violation(format!(
                "Lead {} has no campaign associated",
                lead.id
            )));
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Lead must belong to a campaign"
    }
}

/// Only failed or skipped leads may be reset for another attempt
pub struct AutomationRetriableGuard;

impl StateGuard<Lead> for AutomationRetriableGuard {
    fn check(&self, lead: &Lead) -> GuardResult<()> {
        if !lead.automation_status.is_retriable() {
            return Err(GuardError::InvalidState {
                state: lead.automation_status.to_string(),
            });
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Automation must be failed or skipped to retry"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::AutomationState;
    use chrono::Utc;

    #[test]
    fn test_lead_has_campaign_guard() {
        let guard = LeadHasCampaignGuard;
        let lead = Lead::new(1, "+100", None, Utc::now());
        assert!(guard.check(&lead).is_err());

        let lead = Lead::new(2, "+100", Some(9), Utc::now());
        assert!(guard.check(&lead).is_ok());
    }

    #[test]
    fn test_retriable_guard() {
        let guard = AutomationRetriableGuard;
        let mut lead = Lead::new(1, "+100", Some(1), Utc::now());
        assert!(guard.check(&lead).is_err());

        lead.automation_status = AutomationState::Skipped;
        assert!(guard.check(&lead).is_ok());
        assert_eq!(guard.description(), "Automation must be failed or skipped to retry");
    }
}
