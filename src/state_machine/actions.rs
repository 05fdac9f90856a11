use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::trace;

use super::errors::StateMachineResult;
use super::events::AutomationEvent;
use super::states::AutomationState;
use crate::constants::events;
use crate::events::publisher::EventPublisher;
use crate::models::Lead;

/// Trait for implementing post-transition actions
#[async_trait]
pub trait StateAction<T: Send + Sync> {
    /// Execute the action
    async fn execute(
        &self,
        entity: &T,
        from_state: AutomationState,
        to_state: AutomationState,
        event: &AutomationEvent,
    ) -> StateMachineResult<()>;

    /// Get a description of this action for logging
    fn description(&self) -> &'static str;
}

/// Action to publish lifecycle events once a transition has been committed
#[derive(Debug, Clone)]
pub struct PublishTransitionEventAction {
    event_publisher: EventPublisher,
}

impl PublishTransitionEventAction {
    pub fn new(event_publisher: EventPublisher) -> Self {
        Self { event_publisher }
    }
}

#[async_trait]
impl StateAction<Lead> for PublishTransitionEventAction {
    async fn execute(
        &self,
        lead: &Lead,
        from_state: AutomationState,
        to_state: AutomationState,
        event: &AutomationEvent,
    ) -> StateMachineResult<()> {
        if let Some(event_name) = determine_lead_event_name(from_state, to_state) {
            let context = build_lead_event_context(lead, from_state, to_state, event);
            let delivered = self.event_publisher.publish(event_name, context).await;
            trace!(lead_id = lead.id, event_name, delivered, "Transition event published");
        }
        Ok(())
    }

    fn description(&self) -> &'static str {
        "Publish lifecycle event for lead automation transition"
    }
}

fn determine_lead_event_name(
    from_state: AutomationState,
    to_state: AutomationState,
) -> Option<&'static str> {
    match (from_state, to_state) {
        (AutomationState::Pending, AutomationState::Processing) => {
            Some(events::LEAD_AUTOMATION_STARTED)
        }
        (_, AutomationState::Completed) => Some(events::LEAD_AUTOMATION_COMPLETED),
        (_, AutomationState::Failed) => Some(events::LEAD_AUTOMATION_FAILED),
        (_, AutomationState::Skipped) => Some(events::LEAD_AUTOMATION_SKIPPED),
        (from, AutomationState::Pending) if from.is_retriable() => {
            Some(events::LEAD_AUTOMATION_RESET)
        }
        _ => None,
    }
}

fn build_lead_event_context(
    lead: &Lead,
    from_state: AutomationState,
    to_state: AutomationState,
    event: &AutomationEvent,
) -> Value {
    json!({
        "lead_id": lead.id,
        "campaign_id": lead.campaign_id,
        "from_state": from_state,
        "to_state": to_state,
        "event": event.event_type(),
        "attempts": lead.automation_attempts,
        "error": lead.automation_error,
        "error_category": lead.automation_error_category,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_event_name_mapping() {
        assert_eq!(
            determine_lead_event_name(AutomationState::Pending, AutomationState::Processing),
            Some(events::LEAD_AUTOMATION_STARTED)
        );
        assert_eq!(
            determine_lead_event_name(AutomationState::Processing, AutomationState::Skipped),
            Some(events::LEAD_AUTOMATION_SKIPPED)
        );
        assert_eq!(
            determine_lead_event_name(AutomationState::Failed, AutomationState::Pending),
            Some(events::LEAD_AUTOMATION_RESET)
        );
        assert_eq!(
            determine_lead_event_name(AutomationState::Processing, AutomationState::Processing),
            None
        );
    }

    #[tokio::test]
    async fn test_publish_action_emits_event() {
        let publisher = EventPublisher::new(4);
        let mut receiver = publisher.subscribe();
        let action = PublishTransitionEventAction::new(publisher);
        let lead = Lead::new(5, "+1", Some(2), Utc::now());

        action
            .execute(
                &lead,
                AutomationState::Processing,
                AutomationState::Completed,
                &AutomationEvent::Complete,
            )
            .await
            .unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.name, events::LEAD_AUTOMATION_COMPLETED);
        assert_eq!(event.context["lead_id"], 5);
        assert_eq!(event.context["to_state"], "completed");
    }
}
