//! # In-Memory Lead Store
//!
//! Thread-safe in-memory implementation for tests and local development.
//!
//! - **Serialized transactions**: `begin` takes an owned `tokio::sync::Mutex`
//!   guard held until commit/rollback, standing in for row locks.
//! - **Staged writes**: a transaction mutates a copy of the state that only
//!   replaces the shared state on commit; dropping it discards the writes.
//! - **Failure injection**: commits can be forced to fail to exercise the
//!   storage-failure paths of the services.
//!
//! Reads through [`LeadStore`] take the same mutex, so a caller must not
//! read through the store while it holds an open transaction.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{LeadStore, StoreError, StoreResult, StoreTransaction};
use crate::models::{
    AssignmentCursor, Campaign, CampaignAssignee, CampaignOption, Lead, LeadAssignmentLog,
    NewLeadAssignmentLog, NewOutboundMessage, OutboundMessage, Source,
};

#[derive(Debug, Clone)]
struct StoreState {
    leads: BTreeMap<i64, Lead>,
    campaigns: BTreeMap<i64, Campaign>,
    sources: BTreeMap<i64, Source>,
    assignees: Vec<CampaignAssignee>,
    cursors: BTreeMap<i64, AssignmentCursor>,
    assignment_logs: Vec<LeadAssignmentLog>,
    outbound_messages: Vec<OutboundMessage>,
    next_id: i64,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            leads: BTreeMap::new(),
            campaigns: BTreeMap::new(),
            sources: BTreeMap::new(),
            assignees: Vec::new(),
            cursors: BTreeMap::new(),
            assignment_logs: Vec::new(),
            outbound_messages: Vec::new(),
            next_id: 1,
        }
    }
}

impl StoreState {
    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn campaign_assignees(&self, campaign_id: i64) -> Vec<CampaignAssignee> {
        let mut rows: Vec<CampaignAssignee> = self
            .assignees
            .iter()
            .filter(|a| a.campaign_id == campaign_id)
            .cloned()
            .collect();
        rows.sort_by_key(CampaignAssignee::rotation_key);
        rows
    }
}

/// In-memory lead store for testing
#[derive(Debug, Clone, Default)]
pub struct InMemoryLeadStore {
    state: Arc<Mutex<StoreState>>,
    fail_commits: Arc<AtomicBool>,
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail (until switched off)
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub async fn insert_campaign(&self, campaign: Campaign) {
        let mut state = self.state.lock().await;
        state.next_id = state.next_id.max(campaign.id + 1);
        state.campaigns.insert(campaign.id, campaign);
    }

    /// Attach an option row to an already inserted campaign
    pub async fn insert_option(&self, option: CampaignOption) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let campaign = state
            .campaigns
            .get_mut(&option.campaign_id)
            .ok_or_else(|| StoreError::not_found("campaign", option.campaign_id))?;
        campaign.options.retain(|o| o.option_key != option.option_key);
        campaign.options.push(option);
        Ok(())
    }

    pub async fn insert_lead(&self, lead: Lead) {
        let mut state = self.state.lock().await;
        state.next_id = state.next_id.max(lead.id + 1);
        state.leads.insert(lead.id, lead);
    }

    pub async fn insert_source(&self, source: Source) {
        let mut state = self.state.lock().await;
        state.next_id = state.next_id.max(source.id + 1);
        state.sources.insert(source.id, source);
    }

    /// Add one assignee row without touching the rest of the pool
    pub async fn insert_assignee(
        &self,
        campaign_id: i64,
        user_id: i64,
        sort_order: i32,
        is_active: bool,
    ) -> CampaignAssignee {
        let mut state = self.state.lock().await;
        let row = CampaignAssignee {
            id: state.allocate_id(),
            campaign_id,
            user_id,
            is_active,
            sort_order,
            created_at: Utc::now(),
        };
        state.assignees.push(row.clone());
        row
    }

    pub async fn insert_cursor(&self, cursor: AssignmentCursor) {
        self.state.lock().await.cursors.insert(cursor.campaign_id, cursor);
    }

    pub async fn outbound_messages(&self) -> Vec<OutboundMessage> {
        self.state.lock().await.outbound_messages.clone()
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            staged,
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
        }))
    }

    async fn find_lead(&self, lead_id: i64) -> StoreResult<Option<Lead>> {
        Ok(self.state.lock().await.leads.get(&lead_id).cloned())
    }

    async fn find_campaign(&self, campaign_id: i64) -> StoreResult<Option<Campaign>> {
        Ok(self.state.lock().await.campaigns.get(&campaign_id).cloned())
    }

    async fn find_source(&self, source_id: i64) -> StoreResult<Option<Source>> {
        Ok(self.state.lock().await.sources.get(&source_id).cloned())
    }

    async fn list_assignees(&self, campaign_id: i64) -> StoreResult<Vec<CampaignAssignee>> {
        Ok(self.state.lock().await.campaign_assignees(campaign_id))
    }

    async fn find_cursor(&self, campaign_id: i64) -> StoreResult<Option<AssignmentCursor>> {
        Ok(self.state.lock().await.cursors.get(&campaign_id).cloned())
    }

    async fn assignment_history(&self, lead_id: i64) -> StoreResult<Vec<LeadAssignmentLog>> {
        Ok(self
            .state
            .lock()
            .await
            .assignment_logs
            .iter()
            .filter(|log| log.lead_id == lead_id)
            .cloned()
            .collect())
    }

    async fn leads_needing_attention(
        &self,
        campaign_id: Option<i64>,
        limit: i64,
    ) -> StoreResult<Vec<Lead>> {
        let state = self.state.lock().await;
        let mut leads: Vec<Lead> = state
            .leads
            .values()
            .filter(|lead| lead.automation_status.needs_attention())
            .filter(|lead| campaign_id.map_or(true, |id| lead.campaign_id == Some(id)))
            .cloned()
            .collect();
        leads.sort_by(|a, b| {
            b.last_automation_run_at
                .cmp(&a.last_automation_run_at)
                .then(b.id.cmp(&a.id))
        });
        leads.truncate(usize::try_from(limit.max(0)).unwrap_or(usize::MAX));
        Ok(leads)
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    staged: StoreState,
    fail_commit: bool,
}

#[async_trait]
impl StoreTransaction for InMemoryTransaction {
    async fn lock_lead(&mut self, lead_id: i64) -> StoreResult<Option<Lead>> {
        Ok(self.staged.leads.get(&lead_id).cloned())
    }

    async fn update_lead(&mut self, lead: &Lead) -> StoreResult<()> {
        match self.staged.leads.get_mut(&lead.id) {
            Some(existing) => {
                *existing = lead.clone();
                Ok(())
            }
            None => Err(StoreError::not_found("lead", lead.id)),
        }
    }

    async fn active_assignees(&mut self, campaign_id: i64) -> StoreResult<Vec<CampaignAssignee>> {
        Ok(self
            .staged
            .campaign_assignees(campaign_id)
            .into_iter()
            .filter(|a| a.is_active)
            .collect())
    }

    async fn lock_cursor(
        &mut self,
        campaign_id: i64,
        now: DateTime<Utc>,
    ) -> StoreResult<AssignmentCursor> {
        Ok(self
            .staged
            .cursors
            .entry(campaign_id)
            .or_insert_with(|| AssignmentCursor::new(campaign_id, now))
            .clone())
    }

    async fn save_cursor(&mut self, cursor: &AssignmentCursor) -> StoreResult<()> {
        self.staged.cursors.insert(cursor.campaign_id, cursor.clone());
        Ok(())
    }

    async fn replace_assignees(
        &mut self,
        campaign_id: i64,
        user_ids: &[i64],
        now: DateTime<Utc>,
    ) -> StoreResult<Vec<CampaignAssignee>> {
        self.staged
            .assignees
            .retain(|a| a.campaign_id != campaign_id || user_ids.contains(&a.user_id));

        for (position, user_id) in user_ids.iter().enumerate() {
            let sort_order = i32::try_from(position).unwrap_or(i32::MAX);
            let existing = self
                .staged
                .assignees
                .iter_mut()
                .find(|a| a.campaign_id == campaign_id && a.user_id == *user_id);
            match existing {
                Some(row) => {
                    row.is_active = true;
                    row.sort_order = sort_order;
                }
                None => {
                    let id = self.staged.allocate_id();
                    self.staged.assignees.push(CampaignAssignee {
                        id,
                        campaign_id,
                        user_id: *user_id,
                        is_active: true,
                        sort_order,
                        created_at: now,
                    });
                }
            }
        }

        Ok(self.staged.campaign_assignees(campaign_id))
    }

    async fn set_assignee_active(
        &mut self,
        campaign_id: i64,
        user_id: i64,
        is_active: bool,
    ) -> StoreResult<Option<CampaignAssignee>> {
        Ok(self
            .staged
            .assignees
            .iter_mut()
            .find(|a| a.campaign_id == campaign_id && a.user_id == user_id)
            .map(|row| {
                row.is_active = is_active;
                row.clone()
            }))
    }

    async fn append_assignment_log(
        &mut self,
        entry: &NewLeadAssignmentLog,
    ) -> StoreResult<LeadAssignmentLog> {
        let id = self.staged.allocate_id();
        let log = entry.clone().into_log(id);
        self.staged.assignment_logs.push(log.clone());
        Ok(log)
    }

    async fn record_outbound_message(&mut self, message: &NewOutboundMessage) -> StoreResult<bool> {
        let duplicate = self
            .staged
            .outbound_messages
            .iter()
            .any(|m| m.provider_message_id == message.provider_message_id);
        if duplicate {
            return Ok(false);
        }

        let id = self.staged.allocate_id();
        self.staged.outbound_messages.push(OutboundMessage {
            id,
            lead_id: message.lead_id,
            source_id: message.source_id,
            provider_message_id: message.provider_message_id.clone(),
            created_at: message.created_at,
        });
        Ok(true)
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        if self.fail_commit {
            return Err(StoreError::Transaction(
                "in-memory commit failure injected".to_string(),
            ));
        }
        let InMemoryTransaction {
            mut guard, staged, ..
        } = *self;
        *guard = staged;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CampaignStrategy;

    async fn seeded() -> InMemoryLeadStore {
        let store = InMemoryLeadStore::new();
        store
            .insert_campaign(Campaign::new(1, "C", CampaignStrategy::Direct, Utc::now()))
            .await;
        store.insert_lead(Lead::new(10, "+1", Some(1), Utc::now())).await;
        store
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_discarded() {
        let store = seeded().await;
        {
            let mut tx = store.begin().await.unwrap();
            let mut lead = tx.lock_lead(10).await.unwrap().unwrap();
            lead.assigned_to = Some(5);
            tx.update_lead(&lead).await.unwrap();
        }
        assert_eq!(store.find_lead(10).await.unwrap().unwrap().assigned_to, None);

        let mut tx = store.begin().await.unwrap();
        let mut lead = tx.lock_lead(10).await.unwrap().unwrap();
        lead.assigned_to = Some(5);
        tx.update_lead(&lead).await.unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.find_lead(10).await.unwrap().unwrap().assigned_to, Some(5));
    }

    #[tokio::test]
    async fn test_injected_commit_failure_keeps_state() {
        let store = seeded().await;
        store.set_fail_commits(true);

        let mut tx = store.begin().await.unwrap();
        tx.lock_cursor(1, Utc::now()).await.unwrap();
        assert!(tx.commit().await.is_err());
        assert!(store.find_cursor(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_replace_assignees_reuses_rows() {
        let store = seeded().await;
        let mut tx = store.begin().await.unwrap();
        let first = tx.replace_assignees(1, &[7, 8, 9], Utc::now()).await.unwrap();
        let second = tx.replace_assignees(1, &[9, 7], Utc::now()).await.unwrap();
        tx.commit().await.unwrap();

        let users: Vec<i64> = second.iter().map(|a| a.user_id).collect();
        assert_eq!(users, vec![9, 7]);
        let row_for_7 = |rows: &[CampaignAssignee]| {
            rows.iter().find(|a| a.user_id == 7).map(|a| a.id)
        };
        assert_eq!(row_for_7(&first), row_for_7(&second));
    }

    #[tokio::test]
    async fn test_duplicate_provider_message_is_suppressed() {
        let store = seeded().await;
        let message = NewOutboundMessage {
            lead_id: 10,
            source_id: 3,
            provider_message_id: "wamid.1".into(),
            created_at: Utc::now(),
        };
        let mut tx = store.begin().await.unwrap();
        assert!(tx.record_outbound_message(&message).await.unwrap());
        assert!(!tx.record_outbound_message(&message).await.unwrap());
        tx.commit().await.unwrap();
        assert_eq!(store.outbound_messages().await.len(), 1);
    }
}
