//! Seeded in-memory environments for service and orchestrator tests

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use leadflow_core::config::LeadflowConfig;
use leadflow_core::integrations::Integrations;
use leadflow_core::models::{
    AssignmentCursor, Campaign, CampaignOption, CampaignStrategy, IntentionStatus, Lead, Source,
    SourceKind,
};
use leadflow_core::orchestration::AutomationOrchestrator;
use leadflow_core::services::{AssigneePoolService, LeadAssignmentService, LeadExporter};
use leadflow_core::{EventPublisher, InMemoryLeadStore, LeadStore, ManualClock};

use super::fakes::{RecordingCallDispatcher, RecordingWebhookDispatcher, RecordingWhatsAppSender};

pub const WHATSAPP_SOURCE_ID: i64 = 900;
pub const EXPORT_SOURCE_ID: i64 = 901;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()
}

/// Store, clock, publisher and recording providers wired together
pub struct TestHarness {
    pub store: Arc<InMemoryLeadStore>,
    pub clock: Arc<ManualClock>,
    pub publisher: EventPublisher,
    pub whatsapp: Arc<RecordingWhatsAppSender>,
    pub webhook: Arc<RecordingWebhookDispatcher>,
    pub calls: Arc<RecordingCallDispatcher>,
    pub config: LeadflowConfig,
}

impl TestHarness {
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(base_time()));
        Self {
            store: Arc::new(InMemoryLeadStore::new()),
            publisher: EventPublisher::with_clock(256, clock.clone()),
            clock,
            whatsapp: Arc::new(RecordingWhatsAppSender::default()),
            webhook: Arc::new(RecordingWebhookDispatcher::default()),
            calls: Arc::new(RecordingCallDispatcher::default()),
            config: LeadflowConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LeadflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store_handle(&self) -> Arc<dyn LeadStore> {
        self.store.clone()
    }

    /// WhatsApp and webhook wired, no call provider
    pub fn integrations(&self) -> Integrations {
        Integrations::new()
            .with_whatsapp(self.whatsapp.clone())
            .with_webhook(self.webhook.clone())
    }

    pub fn orchestrator(&self) -> AutomationOrchestrator {
        self.orchestrator_with(self.integrations())
    }

    pub fn orchestrator_with(&self, integrations: Integrations) -> AutomationOrchestrator {
        AutomationOrchestrator::new(
            &self.config,
            self.store_handle(),
            self.clock.clone(),
            self.publisher.clone(),
            integrations,
        )
    }

    pub fn assignment(&self) -> LeadAssignmentService {
        LeadAssignmentService::new(self.store_handle(), self.clock.clone(), self.publisher.clone())
    }

    pub fn pool(&self) -> AssigneePoolService {
        AssigneePoolService::new(self.store_handle(), self.clock.clone(), self.publisher.clone())
    }

    pub fn exporter(&self) -> LeadExporter {
        LeadExporter::new(
            self.store_handle(),
            self.clock.clone(),
            self.publisher.clone(),
            Some(self.webhook.clone()),
        )
    }

    /// Campaign with active WhatsApp and export sources
    pub async fn seed_campaign(&self, id: i64, strategy: CampaignStrategy) -> Campaign {
        self.seed_source(WHATSAPP_SOURCE_ID, SourceKind::Whatsapp, true)
            .await;
        self.seed_source(EXPORT_SOURCE_ID, SourceKind::Webhook, true)
            .await;

        let mut campaign = Campaign::new(id, format!("Campaign {id}"), strategy, base_time());
        campaign.whatsapp_source_id = Some(WHATSAPP_SOURCE_ID);
        campaign.export_source_id = Some(EXPORT_SOURCE_ID);
        self.store.insert_campaign(campaign.clone()).await;
        campaign
    }

    pub async fn save_campaign(&self, campaign: Campaign) {
        self.store.insert_campaign(campaign).await;
    }

    pub async fn seed_source(&self, id: i64, kind: SourceKind, is_active: bool) -> Source {
        let source = Source {
            id,
            kind,
            name: format!("source-{id}"),
            is_active,
            settings: serde_json::json!({}),
        };
        self.store.insert_source(source.clone()).await;
        source
    }

    pub async fn seed_option(&self, campaign_id: i64, option_key: &str, action: &str) -> CampaignOption {
        let option = CampaignOption::new(
            campaign_id * 100 + option_key.len() as i64,
            campaign_id,
            option_key,
            action,
            base_time(),
        );
        self.save_option(option.clone()).await;
        option
    }

    pub async fn save_option(&self, option: CampaignOption) {
        self.store.insert_option(option).await.unwrap();
    }

    pub async fn seed_lead(&self, id: i64, campaign_id: i64, option: Option<&str>) -> Lead {
        let mut lead = Lead::new(id, format!("+5511999{id:04}"), Some(campaign_id), base_time());
        lead.option_selected = option.map(str::to_string);
        self.store.insert_lead(lead.clone()).await;
        lead
    }

    /// Finalized interested lead with no owner
    pub async fn seed_sales_ready_lead(&self, id: i64, campaign_id: i64) -> Lead {
        let mut lead = Lead::new(id, format!("+5511888{id:04}"), Some(campaign_id), base_time());
        lead.intention = Some("interested".to_string());
        lead.intention_status = IntentionStatus::Finalized;
        self.store.insert_lead(lead.clone()).await;
        lead
    }

    pub async fn save_lead(&self, lead: Lead) {
        self.store.insert_lead(lead).await;
    }

    /// Active assignees with `sort_order` following slice order
    pub async fn seed_assignees(&self, campaign_id: i64, user_ids: &[i64]) {
        for (position, user_id) in user_ids.iter().enumerate() {
            self.store
                .insert_assignee(campaign_id, *user_id, position as i32, true)
                .await;
        }
    }

    pub async fn set_cursor(&self, campaign_id: i64, index: i32) {
        let mut cursor = AssignmentCursor::new(campaign_id, base_time());
        cursor.current_index = index;
        self.store.insert_cursor(cursor).await;
    }

    pub async fn lead(&self, id: i64) -> Lead {
        self.store.find_lead(id).await.unwrap().unwrap()
    }

    pub async fn cursor_index(&self, campaign_id: i64) -> Option<i32> {
        self.store
            .find_cursor(campaign_id)
            .await
            .unwrap()
            .map(|cursor| cursor.current_index)
    }
}
