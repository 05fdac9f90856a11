//! # Round-Robin Assignment Cursor
//!
//! Per-campaign pointer into the ordered list of active assignees.
//!
//! - The active sequence is the active assignees ordered by `sort_order`,
//!   ties broken by insertion order.
//! - `next_assignee` locks (or creates) the cursor, self-heals it when it
//!   points past the end of the sequence, and returns `sequence[index]`.
//! - `advance` is called exactly once per committed assignment and wraps
//!   to 0 at the pool size.
//!
//! All cursor reads and writes happen inside the caller's transaction, so
//! the read-modify-write is serialized by the cursor row lock.

use chrono::{DateTime, Utc};
use serde_json::json;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

use crate::clock::Clock;
use crate::constants::events;
use crate::error::{LeadflowError, Result};
use crate::events::EventPublisher;
use crate::models::{AssignmentCursor, CampaignAssignee};
use crate::store::{LeadStore, StoreResult, StoreTransaction};

/// Active assignees in rotation order
pub fn active_sequence(assignees: &[CampaignAssignee]) -> Vec<CampaignAssignee> {
    let mut sequence: Vec<CampaignAssignee> =
        assignees.iter().filter(|a| a.is_active).cloned().collect();
    sequence.sort_by_key(CampaignAssignee::rotation_key);
    sequence
}

/// Assignee picked for one assignment, with the cursor state it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundRobinSelection {
    pub assignee: CampaignAssignee,
    pub cursor: AssignmentCursor,
    pub pool_size: usize,
}

/// Cursor operations over an open store transaction
#[derive(Debug, Default, Clone, Copy)]
pub struct RoundRobinCursor;

impl RoundRobinCursor {
    pub fn new() -> Self {
        Self
    }

    /// Pick the assignee the cursor points at; `None` when nobody is active
    pub async fn next_assignee(
        &self,
        tx: &mut dyn StoreTransaction,
        campaign_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<RoundRobinSelection>> {
        let mut cursor = tx.lock_cursor(campaign_id, now).await?;
        let sequence = active_sequence(&tx.active_assignees(campaign_id).await?);
        if sequence.is_empty() {
            return Ok(None);
        }

        if cursor.heal(sequence.len()) {
            debug!(
                campaign_id,
                pool_size = sequence.len(),
                "Cursor pointed past the active pool, reset to 0"
            );
            cursor.updated_at = now;
            tx.save_cursor(&cursor).await?;
        }

        Ok(cursor.select(&sequence).cloned().map(|assignee| RoundRobinSelection {
            assignee,
            pool_size: sequence.len(),
            cursor,
        }))
    }

    /// Move past the selected assignee after it was written to the lead
    pub async fn advance(
        &self,
        tx: &mut dyn StoreTransaction,
        selection: &RoundRobinSelection,
        now: DateTime<Utc>,
    ) -> StoreResult<AssignmentCursor> {
        let mut cursor = selection.cursor.clone();
        cursor.advance(selection.pool_size);
        cursor.last_assigned_at = Some(now);
        cursor.updated_at = now;
        tx.save_cursor(&cursor).await?;
        Ok(cursor)
    }

    pub async fn reset(
        &self,
        tx: &mut dyn StoreTransaction,
        campaign_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<AssignmentCursor> {
        let mut cursor = tx.lock_cursor(campaign_id, now).await?;
        cursor.reset();
        cursor.updated_at = now;
        tx.save_cursor(&cursor).await?;
        Ok(cursor)
    }
}

/// Result of replacing a campaign's pool
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssigneePoolSync {
    pub assignees: Vec<CampaignAssignee>,
    pub cursor: AssignmentCursor,
    pub cursor_reset: bool,
}

/// Maintains campaign assignee pools
#[derive(Debug, Clone)]
pub struct AssigneePoolService {
    store: Arc<dyn LeadStore>,
    clock: Arc<dyn Clock>,
    event_publisher: EventPublisher,
}

impl AssigneePoolService {
    pub fn new(store: Arc<dyn LeadStore>, clock: Arc<dyn Clock>, event_publisher: EventPublisher) -> Self {
        Self {
            store,
            clock,
            event_publisher,
        }
    }

    /// Replace the pool with `user_ids` in order; duplicates keep their first position
    pub async fn sync_assignees(&self, campaign_id: i64, user_ids: &[i64]) -> Result<AssigneePoolSync> {
        if self.store.find_campaign(campaign_id).await?.is_none() {
            return Err(LeadflowError::NotFound(format!("campaign {campaign_id}")));
        }

        let mut seen = HashSet::new();
        let unique: Vec<i64> = user_ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        let now = self.clock.now();

        let mut tx = self.store.begin().await?;
        let mut cursor = tx.lock_cursor(campaign_id, now).await?;
        let assignees = tx.replace_assignees(campaign_id, &unique, now).await?;

        let cursor_reset = cursor.heal(unique.len());
        if cursor_reset {
            cursor.updated_at = now;
            tx.save_cursor(&cursor).await?;
        }
        tx.commit().await?;

        info!(
            campaign_id,
            assignees = unique.len(),
            cursor_reset,
            "Synced campaign assignees"
        );
        self.event_publisher
            .publish(
                events::CAMPAIGN_ASSIGNEES_SYNCED,
                json!({
                    "campaign_id": campaign_id,
                    "user_ids": unique,
                    "cursor_reset": cursor_reset,
                }),
            )
            .await;

        Ok(AssigneePoolSync {
            assignees,
            cursor,
            cursor_reset,
        })
    }

    /// Toggle one user's participation, healing the cursor if the pool shrank below it
    pub async fn set_assignee_active(
        &self,
        campaign_id: i64,
        user_id: i64,
        is_active: bool,
    ) -> Result<CampaignAssignee> {
        let now = self.clock.now();
        let mut tx = self.store.begin().await?;
        let mut cursor = tx.lock_cursor(campaign_id, now).await?;

        let Some(assignee) = tx.set_assignee_active(campaign_id, user_id, is_active).await? else {
            tx.rollback().await?;
            return Err(LeadflowError::NotFound(format!(
                "assignee {user_id} in campaign {campaign_id}"
            )));
        };

        let active = tx.active_assignees(campaign_id).await?;
        let cursor_reset = cursor.heal(active.len());
        if cursor_reset {
            cursor.updated_at = now;
            tx.save_cursor(&cursor).await?;
        }
        tx.commit().await?;

        info!(
            campaign_id,
            user_id, is_active, cursor_reset, "Updated assignee participation"
        );
        Ok(assignee)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignee(id: i64, user_id: i64, sort_order: i32, is_active: bool) -> CampaignAssignee {
        CampaignAssignee {
            id,
            campaign_id: 1,
            user_id,
            is_active,
            sort_order,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_active_sequence_orders_by_sort_then_insertion() {
        let rows = vec![
            assignee(3, 30, 1, true),
            assignee(1, 10, 2, true),
            assignee(2, 20, 1, true),
            assignee(4, 40, 0, false),
        ];

        let users: Vec<i64> = active_sequence(&rows).iter().map(|a| a.user_id).collect();
        assert_eq!(users, vec![20, 30, 10]);
    }
}
