use std::sync::Arc;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigManager, LeadflowConfig};
use crate::database::{connect, run_migrations};
use crate::error::Result;
use crate::events::EventPublisher;
use crate::integrations::Integrations;
use crate::logging::init_structured_logging_with;
use crate::orchestration::AutomationOrchestrator;
use crate::services::{AssigneePoolService, LeadAssignmentService, LeadExporter};
use crate::store::{LeadStore, PostgresLeadStore};

/// Shared system dependencies and configuration
///
/// Holds the store, clock and event publisher every service is built from.
#[derive(Debug, Clone)]
pub struct SystemContext {
    pub config: Arc<LeadflowConfig>,
    pub store: Arc<dyn LeadStore>,
    pub clock: Arc<dyn Clock>,
    pub event_publisher: EventPublisher,
}

impl SystemContext {
    /// Load configuration for the detected environment and connect to PostgreSQL
    pub async fn new() -> Result<Self> {
        let config_manager = ConfigManager::load()?;
        Self::from_config(config_manager.config().clone()).await
    }

    pub async fn from_config(config: LeadflowConfig) -> Result<Self> {
        config.validate()?;
        init_structured_logging_with(&config.logging);
        let pool = connect(&config.database).await?;
        if config.database.run_migrations {
            run_migrations(&pool).await?;
        }
        info!("SystemContext initialized with PostgreSQL store");
        Ok(Self::with_store(config, Arc::new(PostgresLeadStore::new(pool))))
    }

    /// Build a context around an existing store, using the system clock
    pub fn with_store(config: LeadflowConfig, store: Arc<dyn LeadStore>) -> Self {
        Self::with_store_and_clock(config, store, Arc::new(SystemClock))
    }

    pub fn with_store_and_clock(
        config: LeadflowConfig,
        store: Arc<dyn LeadStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let event_publisher =
            EventPublisher::with_clock(config.events.channel_capacity, Arc::clone(&clock));
        Self {
            config: Arc::new(config),
            store,
            clock,
            event_publisher,
        }
    }

    pub fn orchestrator(&self, integrations: Integrations) -> AutomationOrchestrator {
        AutomationOrchestrator::new(
            &self.config,
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.event_publisher.clone(),
            integrations,
        )
    }

    pub fn assignment_service(&self) -> LeadAssignmentService {
        LeadAssignmentService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.event_publisher.clone(),
        )
    }

    pub fn assignee_pool_service(&self) -> AssigneePoolService {
        AssigneePoolService::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.event_publisher.clone(),
        )
    }

    pub fn exporter(&self, integrations: &Integrations) -> LeadExporter {
        LeadExporter::new(
            Arc::clone(&self.store),
            Arc::clone(&self.clock),
            self.event_publisher.clone(),
            integrations.webhook.clone(),
        )
    }
}
