use chrono::{DateTime, Utc};
use tracing::debug;

use super::{
    errors::{StateMachineError, StateMachineResult},
    events::AutomationEvent,
    guards::{AutomationRetriableGuard, LeadHasCampaignGuard, StateGuard},
    states::AutomationState,
};
use crate::models::Lead;

/// Lead automation lifecycle:
///
/// ```text
/// pending ──start──► processing ──complete──► completed
///    ▲                   │ ├──skip──► skipped ─┐
///    │                   │ └──fail──► failed ──┤
///    └───────────────────┴────reset────────────┘ (from failed/skipped)
/// ```
///
/// The machine only mutates the in-memory lead; callers persist it inside
/// the transaction that holds the lead's row lock.
#[derive(Debug, Default, Clone, Copy)]
pub struct AutomationStateMachine;

impl AutomationStateMachine {
    pub fn new() -> Self {
        Self
    }

    /// Determine the target state based on current state and event
    pub fn determine_target_state(
        &self,
        current_state: AutomationState,
        event: &AutomationEvent,
    ) -> StateMachineResult<AutomationState> {
        let target = match (current_state, event) {
            (AutomationState::Pending, AutomationEvent::Start) => AutomationState::Processing,

            (AutomationState::Processing, AutomationEvent::Complete) => AutomationState::Completed,
            (AutomationState::Processing, AutomationEvent::Skip(_)) => AutomationState::Skipped,

            (AutomationState::Processing, AutomationEvent::Fail(_)) => AutomationState::Failed,
            (AutomationState::Pending, AutomationEvent::Fail(_)) => AutomationState::Failed,

            (AutomationState::Failed, AutomationEvent::Reset) => AutomationState::Pending,
            (AutomationState::Skipped, AutomationEvent::Reset) => AutomationState::Pending,

            (from_state, _) => {
                return Err(StateMachineError::InvalidTransition {
                    from: Some(from_state.to_string()),
                    event: event.event_type().to_string(),
                })
            }
        };

        Ok(target)
    }

    fn check_guards(
        &self,
        lead: &Lead,
        target_state: AutomationState,
        event: &AutomationEvent,
    ) -> StateMachineResult<()> {
        match (target_state, event) {
            (AutomationState::Processing, AutomationEvent::Start) => {
                LeadHasCampaignGuard.check(lead)?;
            }
            (AutomationState::Pending, AutomationEvent::Reset) => {
                AutomationRetriableGuard.check(lead)?;
            }
            _ => {}
        }
        Ok(())
    }

    /// Apply `event` to the lead, updating status and bookkeeping fields
    pub fn transition(
        &self,
        lead: &mut Lead,
        event: &AutomationEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<AutomationState> {
        let current_state = lead.automation_status;
        let target_state = self.determine_target_state(current_state, event)?;
        self.check_guards(lead, target_state, event)?;

        match event {
            AutomationEvent::Start => {
                lead.automation_attempts += 1;
                lead.last_automation_run_at = Some(now);
                lead.automation_error = None;
                lead.automation_error_category = None;
            }
            AutomationEvent::Complete | AutomationEvent::Reset => {
                lead.automation_error = None;
                lead.automation_error_category = None;
            }
            AutomationEvent::Skip(reason) | AutomationEvent::Fail(reason) => {
                lead.automation_error = Some(reason.message.clone());
                lead.automation_error_category = reason.category;
            }
        }
        lead.automation_status = target_state;
        lead.updated_at = now;

        debug!(
            lead_id = lead.id,
            from = %current_state,
            to = %target_state,
            event = event.event_type(),
            attempts = lead.automation_attempts,
            "Automation state transition"
        );

        Ok(target_state)
    }
}
