//! # Lead Store
//!
//! Persistence boundary for the automation engine. Reads that do not need
//! isolation go through [`LeadStore`]; every state-mutating operation runs
//! inside a [`StoreTransaction`] scoped to one lead or one campaign, whose
//! row locks are the mutual-exclusion mechanism.
//!
//! Two implementations ship with the crate:
//!
//! - [`PostgresLeadStore`]: `sqlx` over a `PgPool`, `SELECT ... FOR UPDATE`
//!   on lead and cursor rows.
//! - [`InMemoryLeadStore`]: a single async mutex held for the life of each
//!   transaction, with staged writes applied on commit.

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryLeadStore;
pub use postgres::PostgresLeadStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

use crate::models::{
    AssignmentCursor, Campaign, CampaignAssignee, Lead, LeadAssignmentLog, NewLeadAssignmentLog,
    NewOutboundMessage, Source,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid {column} value in {table}: {value}")]
    InvalidColumn {
        table: &'static str,
        column: &'static str,
        value: String,
    },

    #[error("Transaction failed: {0}")]
    Transaction(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Non-transactional reads and the transaction factory
#[async_trait]
pub trait LeadStore: Send + Sync + fmt::Debug {
    /// Open a transaction. Dropping it without commit discards its writes.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    async fn find_lead(&self, lead_id: i64) -> StoreResult<Option<Lead>>;

    /// Campaign with its option rows loaded
    async fn find_campaign(&self, campaign_id: i64) -> StoreResult<Option<Campaign>>;

    async fn find_source(&self, source_id: i64) -> StoreResult<Option<Source>>;

    /// Every assignee row of the campaign, active or not, in rotation order
    async fn list_assignees(&self, campaign_id: i64) -> StoreResult<Vec<CampaignAssignee>>;

    async fn find_cursor(&self, campaign_id: i64) -> StoreResult<Option<AssignmentCursor>>;

    /// Audit trail for a lead, oldest first
    async fn assignment_history(&self, lead_id: i64) -> StoreResult<Vec<LeadAssignmentLog>>;

    /// Failed and skipped leads, most recently run first
    async fn leads_needing_attention(
        &self,
        campaign_id: Option<i64>,
        limit: i64,
    ) -> StoreResult<Vec<Lead>>;
}

/// Unit of work holding row locks until commit or rollback
#[async_trait]
pub trait StoreTransaction: Send {
    /// Lock and load a lead row
    async fn lock_lead(&mut self, lead_id: i64) -> StoreResult<Option<Lead>>;

    async fn update_lead(&mut self, lead: &Lead) -> StoreResult<()>;

    /// Active assignees in rotation order (`sort_order`, then insertion order)
    async fn active_assignees(&mut self, campaign_id: i64) -> StoreResult<Vec<CampaignAssignee>>;

    /// Lock the campaign cursor, creating it at index 0 if absent
    async fn lock_cursor(
        &mut self,
        campaign_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<AssignmentCursor>;

    async fn save_cursor(&mut self, cursor: &AssignmentCursor) -> StoreResult<()>;

    /// Replace the pool: drop users not listed, upsert the rest as active
    /// with `sort_order` equal to their position. `user_ids` must be unique.
    async fn replace_assignees(
        &mut self,
        campaign_id: i64,
        user_ids: &[i64],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<CampaignAssignee>>;

    /// Toggle one assignee; `None` when the user is not in the pool
    async fn set_assignee_active(
        &mut self,
        campaign_id: i64,
        user_id: i64,
        is_active: bool,
    ) -> StoreResult<Option<CampaignAssignee>>;

    async fn append_assignment_log(
        &mut self,
        entry: &NewLeadAssignmentLog,
    ) -> StoreResult<LeadAssignmentLog>;

    /// Record a sent message; false if the provider id was already recorded
    async fn record_outbound_message(&mut self, message: &NewOutboundMessage) -> StoreResult<bool>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
