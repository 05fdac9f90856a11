//! # Action Executor
//!
//! Runs a resolved action for one lead through the wired collaborators.
//! Execution happens outside any store transaction; the orchestrator
//! records the outcome afterwards.

use std::sync::Arc;
use tracing::{debug, info};

use crate::constants::messages;
use crate::integrations::{Integrations, OutboundBody};
use crate::models::{Campaign, Lead, Source, SourceKind};
use crate::resolver::{ActionKind, ResolvedAction};
use crate::services::export_rules::should_export;
use crate::state_machine::errors::{ActionError, ActionResult};
use crate::store::LeadStore;

/// What happened when the action ran
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// WhatsApp message accepted by the provider
    MessageSent {
        source_id: i64,
        provider_message_id: String,
    },
    /// Lead pushed to the client system
    Exported,
    /// Waiting for an external event (call ended)
    AwaitingExternal { call_id: Option<String> },
    /// Action deliberately not executed
    Skipped { reason: String },
    /// `skip` action: the lead becomes sales ready
    PromoteToSalesReady,
}

#[derive(Debug, Clone)]
pub struct ActionExecutor {
    store: Arc<dyn LeadStore>,
    integrations: Integrations,
}

impl ActionExecutor {
    pub fn new(store: Arc<dyn LeadStore>, integrations: Integrations) -> Self {
        Self {
            store,
            integrations,
        }
    }

    pub async fn execute(
        &self,
        lead: &Lead,
        campaign: &Campaign,
        action: &ResolvedAction,
    ) -> ActionResult<ExecutionOutcome> {
        debug!(
            lead_id = lead.id,
            campaign_id = campaign.id,
            action_type = %action.action_type(),
            origin = ?action.origin,
            "Executing resolved action"
        );

        if lead.campaign_id != Some(campaign.id) {
            return Err(ActionError::InvariantViolation(format!(
                "Lead {} belongs to campaign {:?}, not {}",
                lead.id, lead.campaign_id, campaign.id
            )));
        }

        match &action.kind {
            ActionKind::Whatsapp {
                source_id,
                template_id,
                message,
            } => {
                let source_id = source_id.or(campaign.whatsapp_source_id).ok_or_else(|| {
                    ActionError::configuration(format!(
                        "No WhatsApp source configured for campaign {}",
                        campaign.id
                    ))
                })?;
                let source = self.usable_source(source_id, SourceKind::Whatsapp).await?;

                if message.is_none() && template_id.is_none() {
                    return Err(ActionError::configuration(
                        "WhatsApp action has neither a message nor a template",
                    ));
                }
                let sender = self.integrations.whatsapp.as_ref().ok_or_else(|| {
                    ActionError::configuration("No WhatsApp sender configured")
                })?;

                let body = OutboundBody {
                    message: message.clone(),
                    template_id: template_id.clone(),
                    delay_seconds: action.delay_seconds,
                };
                let receipt = sender.send_message(&source, lead, &body).await?;
                Ok(ExecutionOutcome::MessageSent {
                    source_id: source.id,
                    provider_message_id: receipt.provider_message_id,
                })
            }

            ActionKind::CallAi { agent_id } => match self.integrations.calls.as_ref() {
                Some(dispatcher) => {
                    let handle = dispatcher.dispatch_call(lead, agent_id.as_deref()).await?;
                    Ok(ExecutionOutcome::AwaitingExternal {
                        call_id: Some(handle.call_id),
                    })
                }
                None => {
                    info!(
                        lead_id = lead.id,
                        agent_id = ?agent_id,
                        "No call provider wired, lead stays processing until a call event arrives"
                    );
                    Ok(ExecutionOutcome::AwaitingExternal { call_id: None })
                }
            },

            ActionKind::WebhookCrm { source_id } => {
                if !should_export(
                    campaign.export_rule,
                    lead.intention.as_deref(),
                    lead.intention_status,
                ) {
                    return Ok(ExecutionOutcome::Skipped {
                        reason: format!(
                            "Lead not eligible for export under rule {}",
                            campaign.export_rule
                        ),
                    });
                }

                let dispatcher = self.integrations.webhook.as_ref().ok_or_else(|| {
                    ActionError::configuration("No webhook dispatcher configured")
                })?;
                let source = match source_id.or(campaign.export_source_id) {
                    Some(id) => Some(self.active_source(id).await?),
                    None => None,
                };

                if dispatcher.dispatch_lead_to_client(lead, source.as_ref()).await? {
                    Ok(ExecutionOutcome::Exported)
                } else {
                    Err(ActionError::external(
                        "webhook",
                        "client endpoint rejected the lead",
                    ))
                }
            }

            ActionKind::ManualReview => Ok(ExecutionOutcome::Skipped {
                reason: messages::AWAITING_MANUAL_REVIEW.to_string(),
            }),

            ActionKind::Skip => Ok(ExecutionOutcome::PromoteToSalesReady),
        }
    }

    async fn active_source(&self, source_id: i64) -> ActionResult<Source> {
        let source = self
            .store
            .find_source(source_id)
            .await?
            .ok_or_else(|| ActionError::configuration(format!("Source {source_id} not found")))?;
        if !source.is_active {
            return Err(ActionError::configuration(format!(
                "Source {source_id} is inactive"
            )));
        }
        Ok(source)
    }

    async fn usable_source(&self, source_id: i64, kind: SourceKind) -> ActionResult<Source> {
        let source = self.active_source(source_id).await?;
        if !source.is_usable_for(kind) {
            return Err(ActionError::configuration(format!(
                "Source {source_id} is a {} source, expected {kind}",
                source.kind
            )));
        }
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CampaignStrategy;
    use crate::resolver::ResolutionOrigin;
    use crate::store::InMemoryLeadStore;
    use chrono::{TimeZone, Utc};

    fn executor() -> ActionExecutor {
        ActionExecutor::new(Arc::new(InMemoryLeadStore::new()), Integrations::new())
    }

    #[tokio::test]
    async fn test_lead_from_another_campaign_is_an_invariant_violation() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let campaign = Campaign::new(1, "Spring launch", CampaignStrategy::Direct, now);
        let lead = Lead::new(10, "+5511999000010", Some(2), now);
        let action = ResolvedAction::new(ActionKind::ManualReview, ResolutionOrigin::OptionRow);

        let err = executor().execute(&lead, &campaign, &action).await.unwrap_err();

        assert!(matches!(err, ActionError::InvariantViolation(_)));
    }

    #[tokio::test]
    async fn test_manual_review_is_skipped_with_reason() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
        let campaign = Campaign::new(1, "Spring launch", CampaignStrategy::Direct, now);
        let lead = Lead::new(10, "+5511999000010", Some(1), now);
        let action = ResolvedAction::new(ActionKind::ManualReview, ResolutionOrigin::OptionRow);

        let outcome = executor().execute(&lead, &campaign, &action).await.unwrap();

        assert_eq!(
            outcome,
            ExecutionOutcome::Skipped {
                reason: messages::AWAITING_MANUAL_REVIEW.to_string(),
            }
        );
    }
}
