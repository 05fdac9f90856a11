//! # Automation Orchestrator
//!
//! Drives a lead through its automation lifecycle:
//!
//! ```text
//! trigger ──► resolve action ──► tx: pending → processing
//!                                       │
//!                               execute action (no tx)
//!                                       │
//!                tx: processing → completed | skipped | failed
//!                                       │
//!                   sales ready? ──► assignment ──► export evaluation
//! ```
//!
//! A `webhook_crm` action sends the lead to the client while it runs, so a
//! sales-ready lead is assigned before that action is dispatched.
//!
//! Public operations never return errors: every storage or provider failure
//! is logged, recorded on the lead where possible, and reported through
//! [`AutomationReport`].

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::action_executor::{ActionExecutor, ExecutionOutcome};
use super::error_classifier::{ErrorCategory, ErrorClassifier, ErrorContext, StandardErrorClassifier};
use crate::clock::Clock;
use crate::config::LeadflowConfig;
use crate::constants::{events, intentions, origins};
use crate::events::EventPublisher;
use crate::integrations::Integrations;
use crate::logging::{log_error, log_lead_operation};
use crate::models::{IntentionStatus, Lead, NewOutboundMessage};
use crate::resolver::{ActionKind, ActionType, OptionActionResolver};
use crate::services::{AssignmentOutcome, ExportOutcome, LeadAssignmentService, LeadExporter};
use crate::state_machine::{
    AutomationEvent, AutomationState, AutomationStateMachine, LeadTransitionPersistence,
    PublishTransitionEventAction, StateAction, StateMachineError,
};
use crate::store::{LeadStore, StoreError};

/// Internal failures while moving a lead between states
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    StateMachine(#[from] StateMachineError),
}

/// How a single automation operation ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum AutomationDisposition {
    Completed,
    Skipped { reason: String },
    Failed { reason: String, category: ErrorCategory },
    /// Handed off; the lead stays processing until an external event
    AwaitingExternal,
    /// No action configured for the lead's option
    NoAction,
    AutoProcessDisabled,
    /// Duplicate trigger for a lead that is already running
    AlreadyInProgress,
    /// The lead's state does not allow the requested operation
    InvalidState { state: AutomationState },
    NoCampaign,
    CampaignNotFound,
    LeadNotFound,
    StorageFailure { reason: String },
}

impl AutomationDisposition {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Self::Failed { .. }
                | Self::InvalidState { .. }
                | Self::LeadNotFound
                | Self::StorageFailure { .. }
        )
    }
}

/// Outcome of an automation operation for one lead
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutomationReport {
    pub lead_id: i64,
    pub disposition: AutomationDisposition,
    pub action_type: Option<ActionType>,
    /// Automation status after the operation, when known
    pub final_state: Option<AutomationState>,
    pub assignment: Option<AssignmentOutcome>,
    pub export: Option<ExportOutcome>,
}

impl AutomationReport {
    fn new(lead_id: i64, disposition: AutomationDisposition) -> Self {
        Self {
            lead_id,
            disposition,
            action_type: None,
            final_state: None,
            assignment: None,
            export: None,
        }
    }

    fn with_state(mut self, state: AutomationState) -> Self {
        self.final_state = Some(state);
        self
    }
}

/// Counts for a batch retry; one lead failing never aborts the batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryBatchSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Lead ids beyond the configured batch limit, not processed
    pub deferred: Vec<i64>,
    pub reports: Vec<AutomationReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "disposition", rename_all = "snake_case")]
pub enum IntentionDisposition {
    Finalized,
    /// Already exported; the intention is left untouched
    AlreadySentToClient,
    LeadNotFound,
    StorageFailure { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentionReport {
    pub lead_id: i64,
    pub disposition: IntentionDisposition,
    pub assignment: Option<AssignmentOutcome>,
    pub export: Option<ExportOutcome>,
}

/// Result of locking a lead and applying one transition
enum LockedTransition {
    LeadNotFound,
    Rejected(AutomationState),
    Applied(Lead),
}

/// Changes written together with a transition
#[derive(Default)]
struct TransitionEffects {
    promote_to_sales_ready: bool,
    mark_sent_to_client: bool,
    outbound_message: Option<NewOutboundMessage>,
}

#[derive(Debug, Clone)]
pub struct AutomationOrchestrator {
    automation_enabled: bool,
    auto_assign: bool,
    retry_batch_max_size: usize,
    store: Arc<dyn LeadStore>,
    clock: Arc<dyn Clock>,
    event_publisher: EventPublisher,
    resolver: OptionActionResolver,
    executor: ActionExecutor,
    classifier: Arc<dyn ErrorClassifier>,
    assignment: LeadAssignmentService,
    exporter: LeadExporter,
    machine: AutomationStateMachine,
    persistence: LeadTransitionPersistence,
    transition_events: PublishTransitionEventAction,
}

impl AutomationOrchestrator {
    pub fn new(
        config: &LeadflowConfig,
        store: Arc<dyn LeadStore>,
        clock: Arc<dyn Clock>,
        event_publisher: EventPublisher,
        integrations: Integrations,
    ) -> Self {
        let assignment =
            LeadAssignmentService::new(Arc::clone(&store), Arc::clone(&clock), event_publisher.clone());
        let exporter = LeadExporter::new(
            Arc::clone(&store),
            Arc::clone(&clock),
            event_publisher.clone(),
            integrations.webhook.clone(),
        );

        Self {
            automation_enabled: config.automation.enabled,
            auto_assign: config.assignment.auto_assign_on_sales_ready,
            retry_batch_max_size: config.automation.retry_batch_max_size,
            executor: ActionExecutor::new(Arc::clone(&store), integrations),
            store,
            clock,
            resolver: OptionActionResolver::new(),
            classifier: Arc::new(StandardErrorClassifier::new()),
            assignment,
            exporter,
            machine: AutomationStateMachine::new(),
            persistence: LeadTransitionPersistence::new(),
            transition_events: PublishTransitionEventAction::new(event_publisher.clone()),
            event_publisher,
        }
    }

    #[must_use]
    pub fn with_resolver(mut self, resolver: OptionActionResolver) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn ErrorClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn assignment_service(&self) -> &LeadAssignmentService {
        &self.assignment
    }

    pub fn exporter(&self) -> &LeadExporter {
        &self.exporter
    }

    /// Run automation for a lead that entered the system or selected an option
    pub async fn process_automation_trigger(&self, lead_id: i64) -> AutomationReport {
        match self.try_process(lead_id).await {
            Ok(report) => report,
            Err(error) => self.storage_failure("process_automation_trigger", lead_id, error).await,
        }
    }

    async fn try_process(&self, lead_id: i64) -> Result<AutomationReport, AutomationError> {
        let Some(lead) = self.store.find_lead(lead_id).await? else {
            return Ok(AutomationReport::new(lead_id, AutomationDisposition::LeadNotFound));
        };
        let current = lead.automation_status;
        let Some(campaign_id) = lead.campaign_id else {
            warn!(lead_id, "Automation trigger for lead without campaign");
            return Ok(AutomationReport::new(lead_id, AutomationDisposition::NoCampaign).with_state(current));
        };
        let Some(campaign) = self.store.find_campaign(campaign_id).await? else {
            return Ok(
                AutomationReport::new(lead_id, AutomationDisposition::CampaignNotFound).with_state(current),
            );
        };

        if !self.automation_enabled || !campaign.auto_process_enabled {
            debug!(lead_id, campaign_id, "Automation disabled for campaign");
            return Ok(
                AutomationReport::new(lead_id, AutomationDisposition::AutoProcessDisabled)
                    .with_state(current),
            );
        }
        match current {
            AutomationState::Pending => {}
            AutomationState::Processing => {
                debug!(lead_id, "Automation already in progress, ignoring duplicate trigger");
                return Ok(
                    AutomationReport::new(lead_id, AutomationDisposition::AlreadyInProgress)
                        .with_state(current),
                );
            }
            state => {
                return Ok(AutomationReport::new(
                    lead_id,
                    AutomationDisposition::InvalidState { state },
                )
                .with_state(state))
            }
        }

        let Some(action) = self.resolver.resolve(&campaign, lead.option_selected.as_deref()) else {
            log_lead_operation("automation", lead_id, Some(campaign_id), "no_action", None);
            return Ok(AutomationReport::new(lead_id, AutomationDisposition::NoAction).with_state(current));
        };
        let action_type = action.action_type();

        let pre_assignment = match action.kind {
            ActionKind::WebhookCrm { .. } => self.assign_if_sales_ready(&lead).await,
            _ => None,
        };

        let lead = match self
            .transition_lead(lead_id, AutomationEvent::Start, TransitionEffects::default())
            .await?
        {
            LockedTransition::Applied(lead) => lead,
            LockedTransition::LeadNotFound => {
                return Ok(AutomationReport::new(lead_id, AutomationDisposition::LeadNotFound))
            }
            LockedTransition::Rejected(AutomationState::Processing) => {
                return Ok(
                    AutomationReport::new(lead_id, AutomationDisposition::AlreadyInProgress)
                        .with_state(AutomationState::Processing),
                )
            }
            LockedTransition::Rejected(state) => {
                return Ok(AutomationReport::new(
                    lead_id,
                    AutomationDisposition::InvalidState { state },
                )
                .with_state(state))
            }
        };
        log_lead_operation(
            "automation",
            lead_id,
            Some(campaign_id),
            "processing",
            Some(&format!("action={action_type} attempt={}", lead.automation_attempts)),
        );

        let execution = self.executor.execute(&lead, &campaign, &action).await;
        let now = self.clock.now();

        let (event, effects, disposition) = match execution {
            Ok(ExecutionOutcome::MessageSent {
                source_id,
                provider_message_id,
            }) => (
                AutomationEvent::Complete,
                TransitionEffects {
                    outbound_message: Some(NewOutboundMessage {
                        lead_id,
                        source_id,
                        provider_message_id,
                        created_at: now,
                    }),
                    ..TransitionEffects::default()
                },
                AutomationDisposition::Completed,
            ),
            Ok(ExecutionOutcome::Exported) => (
                AutomationEvent::Complete,
                TransitionEffects {
                    mark_sent_to_client: true,
                    ..TransitionEffects::default()
                },
                AutomationDisposition::Completed,
            ),
            Ok(ExecutionOutcome::PromoteToSalesReady) => (
                AutomationEvent::Complete,
                TransitionEffects {
                    promote_to_sales_ready: true,
                    ..TransitionEffects::default()
                },
                AutomationDisposition::Completed,
            ),
            Ok(ExecutionOutcome::Skipped { reason }) => (
                AutomationEvent::skip_with(reason.clone(), None),
                TransitionEffects::default(),
                AutomationDisposition::Skipped { reason },
            ),
            Ok(ExecutionOutcome::AwaitingExternal { call_id }) => {
                info!(lead_id, call_id = ?call_id, "Automation awaiting external completion");
                self.event_publisher
                    .publish(
                        events::LEAD_AUTOMATION_AWAITING_EXTERNAL,
                        json!({ "lead_id": lead_id, "action_type": action_type, "call_id": call_id }),
                    )
                    .await;
                let mut report = AutomationReport::new(lead_id, AutomationDisposition::AwaitingExternal)
                    .with_state(AutomationState::Processing);
                report.action_type = Some(action_type);
                return Ok(report);
            }
            Err(error) => {
                let classification = self.classifier.classify_error(
                    &error,
                    &ErrorContext {
                        lead_id,
                        campaign_id: Some(campaign_id),
                        action_type,
                        attempt_number: lead.automation_attempts,
                    },
                );
                log_error(
                    "AutomationOrchestrator",
                    "execute_action",
                    &error.to_string(),
                    Some(&format!(
                        "lead_id={lead_id} code={} category={}",
                        classification.error_code, classification.error_category
                    )),
                );
                let disposition = match classification.target_state {
                    AutomationState::Skipped => AutomationDisposition::Skipped {
                        reason: classification.error_message.clone(),
                    },
                    _ => AutomationDisposition::Failed {
                        reason: classification.error_message.clone(),
                        category: classification.error_category,
                    },
                };
                (classification.to_event(), TransitionEffects::default(), disposition)
            }
        };

        let lead = match self.transition_lead(lead_id, event, effects).await? {
            LockedTransition::Applied(lead) => lead,
            LockedTransition::LeadNotFound => {
                return Ok(AutomationReport::new(lead_id, AutomationDisposition::LeadNotFound))
            }
            LockedTransition::Rejected(state) => {
                warn!(lead_id, %state, "Lead left processing while its action ran");
                return Ok(AutomationReport::new(
                    lead_id,
                    AutomationDisposition::InvalidState { state },
                )
                .with_state(state));
            }
        };

        let mut report = AutomationReport::new(lead_id, disposition).with_state(lead.automation_status);
        report.action_type = Some(action_type);
        report.assignment = pre_assignment;
        self.follow_up(&lead, &mut report.assignment, &mut report.export).await;
        Ok(report)
    }

    /// Reset a failed or skipped lead and run it again from scratch
    pub async fn retry_automation(&self, lead_id: i64) -> AutomationReport {
        let reset = match self
            .transition_lead(lead_id, AutomationEvent::Reset, TransitionEffects::default())
            .await
        {
            Ok(reset) => reset,
            Err(error) => return self.storage_failure("retry_automation", lead_id, error).await,
        };

        match reset {
            LockedTransition::Applied(_) => {
                log_lead_operation("retry_automation", lead_id, None, "reset", None);
                self.process_automation_trigger(lead_id).await
            }
            LockedTransition::LeadNotFound => {
                AutomationReport::new(lead_id, AutomationDisposition::LeadNotFound)
            }
            LockedTransition::Rejected(state) => {
                AutomationReport::new(lead_id, AutomationDisposition::InvalidState { state })
                    .with_state(state)
            }
        }
    }

    /// Retry each lead independently, up to the configured batch size
    pub async fn retry_automation_batch(&self, lead_ids: &[i64]) -> RetryBatchSummary {
        let limit = self.retry_batch_max_size.min(lead_ids.len());
        let (batch, deferred) = lead_ids.split_at(limit);
        if !deferred.is_empty() {
            warn!(
                requested = lead_ids.len(),
                limit = self.retry_batch_max_size,
                "Retry batch exceeds limit, deferring the remainder"
            );
        }

        let mut reports = Vec::with_capacity(batch.len());
        for lead_id in batch {
            reports.push(self.retry_automation(*lead_id).await);
        }

        let failed = reports.iter().filter(|r| r.disposition.is_failure()).count();
        let summary = RetryBatchSummary {
            total: reports.len(),
            succeeded: reports.len() - failed,
            failed,
            deferred: deferred.to_vec(),
            reports,
        };
        info!(
            total = summary.total,
            succeeded = summary.succeeded,
            failed = summary.failed,
            deferred = summary.deferred.len(),
            "Retry batch finished"
        );
        summary
    }

    /// Record the end of an externally completed action (e.g. call ended)
    pub async fn complete_external_action(
        &self,
        lead_id: i64,
        success: bool,
        error: Option<String>,
    ) -> AutomationReport {
        let (event, disposition) = if success {
            (AutomationEvent::Complete, AutomationDisposition::Completed)
        } else {
            let reason = error.unwrap_or_else(|| "External action failed".to_string());
            (
                AutomationEvent::fail_with(reason.clone(), ErrorCategory::Transient),
                AutomationDisposition::Failed {
                    reason,
                    category: ErrorCategory::Transient,
                },
            )
        };

        let transition = match self
            .transition_lead(lead_id, event, TransitionEffects::default())
            .await
        {
            Ok(transition) => transition,
            Err(error) => {
                return self
                    .storage_failure("complete_external_action", lead_id, error)
                    .await
            }
        };

        match transition {
            LockedTransition::Applied(lead) => {
                let mut report = AutomationReport::new(lead_id, disposition).with_state(lead.automation_status);
                self.follow_up(&lead, &mut report.assignment, &mut report.export).await;
                report
            }
            LockedTransition::LeadNotFound => {
                AutomationReport::new(lead_id, AutomationDisposition::LeadNotFound)
            }
            LockedTransition::Rejected(state) => {
                AutomationReport::new(lead_id, AutomationDisposition::InvalidState { state })
                    .with_state(state)
            }
        }
    }

    /// Inbound intention classification; assigns and exports as appropriate
    pub async fn finalize_intention(&self, lead_id: i64, intention: &str, origin: &str) -> IntentionReport {
        let mut report = IntentionReport {
            lead_id,
            disposition: IntentionDisposition::Finalized,
            assignment: None,
            export: None,
        };

        let lead = match self.write_intention(lead_id, intention, origin).await {
            Ok(Ok(lead)) => lead,
            Ok(Err(disposition)) => {
                report.disposition = disposition;
                return report;
            }
            Err(error) => {
                log_error(
                    "AutomationOrchestrator",
                    "finalize_intention",
                    &error.to_string(),
                    Some(&format!("lead_id={lead_id}")),
                );
                report.disposition = IntentionDisposition::StorageFailure {
                    reason: error.to_string(),
                };
                return report;
            }
        };

        self.event_publisher
            .publish(
                events::LEAD_INTENTION_FINALIZED,
                json!({ "lead_id": lead_id, "intention": lead.intention, "origin": origin }),
            )
            .await;
        self.follow_up(&lead, &mut report.assignment, &mut report.export).await;
        report
    }

    async fn write_intention(
        &self,
        lead_id: i64,
        intention: &str,
        origin: &str,
    ) -> Result<Result<Lead, IntentionDisposition>, StoreError> {
        let mut tx = self.store.begin().await?;
        let Some(mut lead) = tx.lock_lead(lead_id).await? else {
            tx.rollback().await?;
            return Ok(Err(IntentionDisposition::LeadNotFound));
        };
        if lead.intention_status == IntentionStatus::SentToClient {
            tx.rollback().await?;
            return Ok(Err(IntentionDisposition::AlreadySentToClient));
        }

        lead.intention = Some(intention.trim().to_string());
        lead.intention_status = IntentionStatus::Finalized;
        lead.intention_origin = Some(origin.to_string());
        lead.updated_at = self.clock.now();
        tx.update_lead(&lead).await?;
        tx.commit().await?;

        log_lead_operation(
            "finalize_intention",
            lead_id,
            lead.campaign_id,
            "finalized",
            Some(&format!("intention={intention} origin={origin}")),
        );
        Ok(Ok(lead))
    }

    async fn assign_if_sales_ready(&self, lead: &Lead) -> Option<AssignmentOutcome> {
        if lead.is_sales_ready() && lead.assigned_to.is_none() && self.auto_assign {
            Some(self.assignment.assign_on_sales_ready(lead.id).await)
        } else {
            None
        }
    }

    /// Assignment then export, for a lead whose intention is finalized
    async fn follow_up(
        &self,
        lead: &Lead,
        assignment: &mut Option<AssignmentOutcome>,
        export: &mut Option<ExportOutcome>,
    ) {
        if assignment.is_none() {
            *assignment = self.assign_if_sales_ready(lead).await;
        }
        if lead.intention_status == IntentionStatus::Finalized {
            *export = Some(self.exporter.export_if_eligible(lead.id).await);
        }
    }

    /// Lock the lead, apply `event` plus its side effects, commit, publish
    async fn transition_lead(
        &self,
        lead_id: i64,
        event: AutomationEvent,
        effects: TransitionEffects,
    ) -> Result<LockedTransition, AutomationError> {
        let mut tx = self.store.begin().await?;
        let Some(mut lead) = tx.lock_lead(lead_id).await? else {
            tx.rollback().await?;
            return Ok(LockedTransition::LeadNotFound);
        };

        let from = lead.automation_status;
        if self.machine.determine_target_state(from, &event).is_err() {
            tx.rollback().await?;
            return Ok(LockedTransition::Rejected(from));
        }

        let now = self.clock.now();
        if effects.promote_to_sales_ready {
            lead.intention = Some(intentions::INTERESTED.to_string());
            lead.intention_status = IntentionStatus::Finalized;
            lead.intention_origin = Some(origins::AUTOMATION.to_string());
        }
        if effects.mark_sent_to_client && lead.intention_status == IntentionStatus::Finalized {
            lead.intention_status = IntentionStatus::SentToClient;
        }
        if let Some(message) = &effects.outbound_message {
            if !tx.record_outbound_message(message).await? {
                warn!(
                    lead_id,
                    provider_message_id = %message.provider_message_id,
                    "Duplicate provider message id suppressed"
                );
            }
        }

        let to = self.persistence.apply(tx.as_mut(), &mut lead, &event, now).await?;
        tx.commit().await?;

        if let Err(error) = self.transition_events.execute(&lead, from, to, &event).await {
            debug!(
                lead_id,
                action = self.transition_events.description(),
                error = %error,
                "Transition event not published"
            );
        }
        if effects.promote_to_sales_ready {
            self.event_publisher
                .publish(
                    events::LEAD_PROMOTED_TO_SALES_READY,
                    json!({ "lead_id": lead_id, "campaign_id": lead.campaign_id }),
                )
                .await;
        }
        Ok(LockedTransition::Applied(lead))
    }

    /// Report a storage failure, moving a stuck processing lead to failed if possible
    async fn storage_failure(
        &self,
        operation: &str,
        lead_id: i64,
        error: AutomationError,
    ) -> AutomationReport {
        let reason = error.to_string();
        log_error(
            "AutomationOrchestrator",
            operation,
            &reason,
            Some(&format!("lead_id={lead_id}")),
        );

        let event = AutomationEvent::fail_with(format!("Storage error: {reason}"), ErrorCategory::Transient);
        let final_state = match self
            .transition_lead(lead_id, event, TransitionEffects::default())
            .await
        {
            Ok(LockedTransition::Applied(lead)) => Some(lead.automation_status),
            Ok(LockedTransition::Rejected(state)) => Some(state),
            Ok(LockedTransition::LeadNotFound) => None,
            Err(second) => {
                log_error(
                    "AutomationOrchestrator",
                    "record_storage_failure",
                    &second.to_string(),
                    Some(&format!("lead_id={lead_id}")),
                );
                None
            }
        };

        AutomationReport {
            final_state,
            ..AutomationReport::new(lead_id, AutomationDisposition::StorageFailure { reason })
        }
    }
}
