//! Pushes finalized leads to the client system when the campaign's export
//! rule allows it, then marks them `sent_to_client`.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::export_rules::should_export;
use crate::clock::Clock;
use crate::constants::events;
use crate::events::EventPublisher;
use crate::integrations::WebhookDispatcher;
use crate::logging::{log_error, log_lead_operation};
use crate::models::IntentionStatus;
use crate::store::{LeadStore, StoreResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExportOutcome {
    Exported,
    NotEligible,
    NoCampaign,
    LeadNotFound,
    /// No webhook dispatcher wired in
    NoDispatcher,
    /// Export source missing or inactive
    SourceUnavailable { source_id: i64 },
    /// Client endpoint declined the lead
    DispatchRejected,
    DispatchFailed { reason: String },
    StorageFailure { reason: String },
}

impl ExportOutcome {
    pub fn is_exported(&self) -> bool {
        matches!(self, Self::Exported)
    }
}

#[derive(Debug, Clone)]
pub struct LeadExporter {
    store: Arc<dyn LeadStore>,
    clock: Arc<dyn Clock>,
    event_publisher: EventPublisher,
    dispatcher: Option<Arc<dyn WebhookDispatcher>>,
}

impl LeadExporter {
    pub fn new(
        store: Arc<dyn LeadStore>,
        clock: Arc<dyn Clock>,
        event_publisher: EventPublisher,
        dispatcher: Option<Arc<dyn WebhookDispatcher>>,
    ) -> Self {
        Self {
            store,
            clock,
            event_publisher,
            dispatcher,
        }
    }

    /// Evaluate the export rule for a lead and dispatch it if eligible
    pub async fn export_if_eligible(&self, lead_id: i64) -> ExportOutcome {
        let outcome = match self.try_export(lead_id).await {
            Ok(outcome) => outcome,
            Err(error) => {
                log_error(
                    "LeadExporter",
                    "export_if_eligible",
                    &error.to_string(),
                    Some(&format!("lead_id={lead_id}")),
                );
                ExportOutcome::StorageFailure {
                    reason: error.to_string(),
                }
            }
        };

        let event_name = match &outcome {
            ExportOutcome::Exported => Some(events::LEAD_EXPORTED),
            ExportOutcome::DispatchRejected
            | ExportOutcome::DispatchFailed { .. }
            | ExportOutcome::StorageFailure { .. } => Some(events::LEAD_EXPORT_FAILED),
            _ => None,
        };
        if let Some(event_name) = event_name {
            self.event_publisher
                .publish(event_name, json!({ "lead_id": lead_id, "outcome": outcome }))
                .await;
        }
        outcome
    }

    async fn try_export(&self, lead_id: i64) -> StoreResult<ExportOutcome> {
        let Some(lead) = self.store.find_lead(lead_id).await? else {
            return Ok(ExportOutcome::LeadNotFound);
        };
        let Some(campaign_id) = lead.campaign_id else {
            return Ok(ExportOutcome::NoCampaign);
        };
        let Some(campaign) = self.store.find_campaign(campaign_id).await? else {
            return Ok(ExportOutcome::NoCampaign);
        };

        if !should_export(campaign.export_rule, lead.intention.as_deref(), lead.intention_status) {
            debug!(
                lead_id,
                campaign_id,
                export_rule = %campaign.export_rule,
                intention = ?lead.intention,
                "Lead not eligible for export"
            );
            return Ok(ExportOutcome::NotEligible);
        }

        let Some(dispatcher) = self.dispatcher.as_ref() else {
            warn!(lead_id, campaign_id, "No webhook dispatcher configured, export skipped");
            return Ok(ExportOutcome::NoDispatcher);
        };

        let source = match campaign.export_source_id {
            Some(source_id) => match self.store.find_source(source_id).await? {
                Some(source) if source.is_active => Some(source),
                _ => {
                    warn!(lead_id, campaign_id, source_id, "Export source missing or inactive, export skipped");
                    return Ok(ExportOutcome::SourceUnavailable { source_id });
                }
            },
            None => None,
        };

        match dispatcher.dispatch_lead_to_client(&lead, source.as_ref()).await {
            Ok(true) => {}
            Ok(false) => return Ok(ExportOutcome::DispatchRejected),
            Err(error) => {
                return Ok(ExportOutcome::DispatchFailed {
                    reason: error.to_string(),
                })
            }
        }

        let mut tx = self.store.begin().await?;
        if let Some(mut locked) = tx.lock_lead(lead_id).await? {
            if locked.intention_status == IntentionStatus::Finalized {
                locked.intention_status = IntentionStatus::SentToClient;
                locked.updated_at = self.clock.now();
                tx.update_lead(&locked).await?;
            }
        }
        tx.commit().await?;

        log_lead_operation("export", lead_id, Some(campaign_id), "sent_to_client", None);
        Ok(ExportOutcome::Exported)
    }
}
