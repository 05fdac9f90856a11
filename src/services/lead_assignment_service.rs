//! # Lead Assignment Engine
//!
//! Gives sales-ready leads (finalized + interested) an owner. Automatic
//! assignment claims the next rep from the campaign cursor; operators can
//! also assign, unassign and reassign by hand, which never moves the cursor.
//!
//! Every path leaves a sales-ready lead with `assigned_to` or
//! `assignment_error` set, and every change to `assigned_to` is recorded in
//! the assignment log inside the same transaction.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use super::round_robin::RoundRobinCursor;
use crate::clock::Clock;
use crate::constants::{events, messages};
use crate::events::EventPublisher;
use crate::logging::{log_assignment_operation, log_error};
use crate::models::{AssignmentTrigger, Lead, NewLeadAssignmentLog};
use crate::store::{LeadStore, StoreResult, StoreTransaction};

/// Result of an assignment operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignmentOutcome {
    Assigned {
        user_id: i64,
        trigger: AssignmentTrigger,
        cursor_index: Option<i32>,
    },
    /// Idempotent no-op
    AlreadyAssigned { user_id: i64 },
    Unassigned { previous: i64 },
    /// Sales-ready lead left without owner; the reason is stored on the lead
    NotAssigned { reason: String },
    NotSalesReady,
    /// Operator request conflicts with the lead's current assignment
    Rejected { reason: String },
    LeadNotFound,
    /// Storage failure; nothing was committed
    Failed { reason: String },
}

impl AssignmentOutcome {
    /// True when the lead has an owner (or was deliberately released)
    pub fn succeeded(&self) -> bool {
        matches!(
            self,
            Self::Assigned { .. } | Self::AlreadyAssigned { .. } | Self::Unassigned { .. }
        )
    }
}

#[derive(Debug, Clone)]
pub struct LeadAssignmentService {
    store: Arc<dyn LeadStore>,
    clock: Arc<dyn Clock>,
    event_publisher: EventPublisher,
    round_robin: RoundRobinCursor,
}

impl LeadAssignmentService {
    pub fn new(store: Arc<dyn LeadStore>, clock: Arc<dyn Clock>, event_publisher: EventPublisher) -> Self {
        Self {
            store,
            clock,
            event_publisher,
            round_robin: RoundRobinCursor::new(),
        }
    }

    /// Claim the next round-robin assignee for a lead that just became sales ready
    pub async fn assign_on_sales_ready(&self, lead_id: i64) -> AssignmentOutcome {
        let outcome = match self.try_assign_on_sales_ready(lead_id).await {
            Ok(outcome) => outcome,
            Err(error) => {
                log_error(
                    "LeadAssignmentService",
                    "assign_on_sales_ready",
                    &error.to_string(),
                    Some(&format!("lead_id={lead_id}")),
                );
                let reason = format!("Assignment failed: {error}");
                self.record_assignment_failure(lead_id, &reason).await;
                AssignmentOutcome::Failed { reason }
            }
        };

        self.publish_outcome(lead_id, &outcome).await;
        outcome
    }

    async fn try_assign_on_sales_ready(&self, lead_id: i64) -> StoreResult<AssignmentOutcome> {
        let mut tx = self.store.begin().await?;
        let Some(mut lead) = tx.lock_lead(lead_id).await? else {
            tx.rollback().await?;
            return Ok(AssignmentOutcome::LeadNotFound);
        };

        if !lead.is_sales_ready() {
            tx.rollback().await?;
            return Ok(AssignmentOutcome::NotSalesReady);
        }
        if let Some(user_id) = lead.assigned_to {
            tx.rollback().await?;
            debug!(lead_id, user_id, "Lead already assigned, nothing to do");
            return Ok(AssignmentOutcome::AlreadyAssigned { user_id });
        }

        let now = self.clock.now();
        let Some(campaign_id) = lead.campaign_id else {
            return self
                .record_not_assigned(tx, &mut lead, messages::NO_CAMPAIGN)
                .await;
        };

        let Some(selection) = self
            .round_robin
            .next_assignee(tx.as_mut(), campaign_id, now)
            .await?
        else {
            return self
                .record_not_assigned(tx, &mut lead, messages::NO_ACTIVE_ASSIGNEES)
                .await;
        };

        let user_id = selection.assignee.user_id;
        let cursor_index = selection.cursor.current_index;
        lead.assigned_to = Some(user_id);
        lead.assigned_at = Some(now);
        lead.assignment_error = None;
        lead.updated_at = now;
        tx.update_lead(&lead).await?;

        let cursor = self.round_robin.advance(tx.as_mut(), &selection, now).await?;

        tx.append_assignment_log(&NewLeadAssignmentLog {
            lead_id,
            campaign_id: Some(campaign_id),
            assigned_to: Some(user_id),
            previous_assignee: None,
            trigger: AssignmentTrigger::AutoRoundRobin,
            actor_id: None,
            cursor_index: Some(cursor_index),
            created_at: now,
        })
        .await?;
        tx.commit().await?;

        log_assignment_operation(
            "auto_assign",
            lead_id,
            Some(campaign_id),
            Some(user_id),
            "assigned",
            Some(&format!(
                "cursor {cursor_index} -> {} of {}",
                cursor.current_index, selection.pool_size
            )),
        );

        Ok(AssignmentOutcome::Assigned {
            user_id,
            trigger: AssignmentTrigger::AutoRoundRobin,
            cursor_index: Some(cursor_index),
        })
    }

    async fn record_not_assigned(
        &self,
        mut tx: Box<dyn StoreTransaction>,
        lead: &mut Lead,
        reason: &str,
    ) -> StoreResult<AssignmentOutcome> {
        lead.assignment_error = Some(reason.to_string());
        lead.updated_at = self.clock.now();
        tx.update_lead(lead).await?;
        tx.commit().await?;

        warn!(lead_id = lead.id, campaign_id = ?lead.campaign_id, reason, "Sales-ready lead left unassigned");
        Ok(AssignmentOutcome::NotAssigned {
            reason: reason.to_string(),
        })
    }

    /// Best effort: keep a sales-ready lead from ending with neither owner nor error
    async fn record_assignment_failure(&self, lead_id: i64, reason: &str) {
        let result: StoreResult<()> = async {
            let mut tx = self.store.begin().await?;
            match tx.lock_lead(lead_id).await? {
                Some(mut lead) if lead.is_sales_ready() && lead.assigned_to.is_none() => {
                    lead.assignment_error = Some(reason.to_string());
                    lead.updated_at = self.clock.now();
                    tx.update_lead(&lead).await?;
                    tx.commit().await
                }
                _ => tx.rollback().await,
            }
        }
        .await;

        if let Err(error) = result {
            log_error(
                "LeadAssignmentService",
                "record_assignment_failure",
                &error.to_string(),
                Some(&format!("lead_id={lead_id}")),
            );
        }
    }

    /// Operator assignment; bypasses the cursor
    pub async fn assign_manually(&self, lead_id: i64, user_id: i64, actor_id: i64) -> AssignmentOutcome {
        let outcome = match self.try_assign_manually(lead_id, user_id, actor_id).await {
            Ok(outcome) => outcome,
            Err(error) => self.storage_failure("assign_manually", lead_id, error),
        };
        self.publish_outcome(lead_id, &outcome).await;
        outcome
    }

    async fn try_assign_manually(
        &self,
        lead_id: i64,
        user_id: i64,
        actor_id: i64,
    ) -> StoreResult<AssignmentOutcome> {
        let mut tx = self.store.begin().await?;
        let Some(mut lead) = tx.lock_lead(lead_id).await? else {
            tx.rollback().await?;
            return Ok(AssignmentOutcome::LeadNotFound);
        };

        match lead.assigned_to {
            Some(current) if current == user_id => {
                tx.rollback().await?;
                return Ok(AssignmentOutcome::AlreadyAssigned { user_id });
            }
            Some(current) => {
                tx.rollback().await?;
                return Ok(AssignmentOutcome::Rejected {
                    reason: format!(
                        "Lead {lead_id} is already assigned to user {current}; reassign instead"
                    ),
                });
            }
            None => {}
        }

        let now = self.clock.now();
        self.write_manual_assignment(tx.as_mut(), &mut lead, user_id, actor_id, now)
            .await?;
        tx.commit().await?;

        log_assignment_operation(
            "manual_assign",
            lead_id,
            lead.campaign_id,
            Some(user_id),
            "assigned",
            Some(&format!("actor {actor_id}")),
        );
        Ok(AssignmentOutcome::Assigned {
            user_id,
            trigger: AssignmentTrigger::Manual,
            cursor_index: None,
        })
    }

    /// Operator release of a lead's owner
    pub async fn unassign(&self, lead_id: i64, actor_id: i64) -> AssignmentOutcome {
        let outcome = match self.try_unassign(lead_id, actor_id).await {
            Ok(outcome) => outcome,
            Err(error) => self.storage_failure("unassign", lead_id, error),
        };
        self.publish_outcome(lead_id, &outcome).await;
        outcome
    }

    async fn try_unassign(&self, lead_id: i64, actor_id: i64) -> StoreResult<AssignmentOutcome> {
        let mut tx = self.store.begin().await?;
        let Some(mut lead) = tx.lock_lead(lead_id).await? else {
            tx.rollback().await?;
            return Ok(AssignmentOutcome::LeadNotFound);
        };
        let Some(previous) = lead.assigned_to else {
            tx.rollback().await?;
            return Ok(AssignmentOutcome::Rejected {
                reason: format!("Lead {lead_id} is not assigned"),
            });
        };

        let now = self.clock.now();
        self.write_unassignment(tx.as_mut(), &mut lead, previous, actor_id, now)
            .await?;
        tx.commit().await?;

        log_assignment_operation(
            "unassign",
            lead_id,
            lead.campaign_id,
            Some(previous),
            "unassigned",
            Some(&format!("actor {actor_id}")),
        );
        Ok(AssignmentOutcome::Unassigned { previous })
    }

    /// Unassign then manually assign in one transaction, each step logged
    pub async fn reassign(&self, lead_id: i64, user_id: i64, actor_id: i64) -> AssignmentOutcome {
        let outcome = match self.try_reassign(lead_id, user_id, actor_id).await {
            Ok(outcome) => outcome,
            Err(error) => self.storage_failure("reassign", lead_id, error),
        };
        self.publish_outcome(lead_id, &outcome).await;
        outcome
    }

    async fn try_reassign(
        &self,
        lead_id: i64,
        user_id: i64,
        actor_id: i64,
    ) -> StoreResult<AssignmentOutcome> {
        let mut tx = self.store.begin().await?;
        let Some(mut lead) = tx.lock_lead(lead_id).await? else {
            tx.rollback().await?;
            return Ok(AssignmentOutcome::LeadNotFound);
        };
        if lead.assigned_to == Some(user_id) {
            tx.rollback().await?;
            return Ok(AssignmentOutcome::AlreadyAssigned { user_id });
        }

        let now = self.clock.now();
        if let Some(previous) = lead.assigned_to {
            self.write_unassignment(tx.as_mut(), &mut lead, previous, actor_id, now)
                .await?;
        }
        self.write_manual_assignment(tx.as_mut(), &mut lead, user_id, actor_id, now)
            .await?;
        tx.commit().await?;

        log_assignment_operation(
            "reassign",
            lead_id,
            lead.campaign_id,
            Some(user_id),
            "assigned",
            Some(&format!("actor {actor_id}")),
        );
        Ok(AssignmentOutcome::Assigned {
            user_id,
            trigger: AssignmentTrigger::Manual,
            cursor_index: None,
        })
    }

    async fn write_manual_assignment(
        &self,
        tx: &mut dyn StoreTransaction,
        lead: &mut Lead,
        user_id: i64,
        actor_id: i64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<()> {
        let previous = lead.assigned_to;
        lead.assigned_to = Some(user_id);
        lead.assigned_at = Some(now);
        lead.assignment_error = None;
        lead.updated_at = now;
        tx.update_lead(lead).await?;
        tx.append_assignment_log(&NewLeadAssignmentLog {
            lead_id: lead.id,
            campaign_id: lead.campaign_id,
            assigned_to: Some(user_id),
            previous_assignee: previous,
            trigger: AssignmentTrigger::Manual,
            actor_id: Some(actor_id),
            cursor_index: None,
            created_at: now,
        })
        .await?;
        Ok(())
    }

    async fn write_unassignment(
        &self,
        tx: &mut dyn StoreTransaction,
        lead: &mut Lead,
        previous: i64,
        actor_id: i64,
        now: chrono::DateTime<chrono::Utc>,
    ) -> StoreResult<()> {
        lead.assigned_to = None;
        lead.assigned_at = None;
        if lead.is_sales_ready() {
            lead.assignment_error = Some(messages::UNASSIGNED_BY_OPERATOR.to_string());
        }
        lead.updated_at = now;
        tx.update_lead(lead).await?;
        tx.append_assignment_log(&NewLeadAssignmentLog {
            lead_id: lead.id,
            campaign_id: lead.campaign_id,
            assigned_to: None,
            previous_assignee: Some(previous),
            trigger: AssignmentTrigger::Unassigned,
            actor_id: Some(actor_id),
            cursor_index: None,
            created_at: now,
        })
        .await?;
        Ok(())
    }

    fn storage_failure(
        &self,
        operation: &str,
        lead_id: i64,
        error: crate::store::StoreError,
    ) -> AssignmentOutcome {
        log_error(
            "LeadAssignmentService",
            operation,
            &error.to_string(),
            Some(&format!("lead_id={lead_id}")),
        );
        AssignmentOutcome::Failed {
            reason: error.to_string(),
        }
    }

    async fn publish_outcome(&self, lead_id: i64, outcome: &AssignmentOutcome) {
        let event_name = match outcome {
            AssignmentOutcome::Assigned { .. } => events::LEAD_ASSIGNED,
            AssignmentOutcome::Unassigned { .. } => events::LEAD_UNASSIGNED,
            AssignmentOutcome::NotAssigned { .. } | AssignmentOutcome::Failed { .. } => {
                events::LEAD_ASSIGNMENT_FAILED
            }
            _ => return,
        };
        self.event_publisher
            .publish(event_name, json!({ "lead_id": lead_id, "outcome": outcome }))
            .await;
    }
}
