#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Leadflow Core
//!
//! Lead automation and round-robin assignment engine.
//!
//! ## Overview
//!
//! A lead arrives on a campaign, optionally carrying the option the contact
//! picked. The engine decides which automated action to run for it (send a
//! WhatsApp message, start an AI call, push it to the client CRM, route it to
//! manual review, or skip straight to sales), records the outcome on the lead
//! through a small state machine, and, once the lead is sales ready, assigns it
//! to a salesperson from the campaign's rotation.
//!
//! ## Module Organization
//!
//! - [`resolver`] - Option to action resolution across typed rows and legacy JSON
//! - [`state_machine`] - Lead automation states, events and guards
//! - [`orchestration`] - Automation flow, action execution and error classification
//! - [`services`] - Round-robin assignment, assignee pools and export rules
//! - [`store`] - Transactional persistence (PostgreSQL and in-memory)
//! - [`integrations`] - Outbound collaborator contracts
//! - [`events`] - Lifecycle event publishing
//! - [`config`] - Environment-aware TOML configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use leadflow_core::integrations::Integrations;
//! use leadflow_core::SystemContext;
//!
//! # async fn example() -> leadflow_core::Result<()> {
//! let context = SystemContext::new().await?;
//! let orchestrator = context.orchestrator(Integrations::new());
//!
//! let report = orchestrator.process_automation_trigger(42).await;
//! println!("lead 42 ended as {:?}", report.disposition);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # All tests, PostgreSQL tests are #[ignore]d
//! ```

pub mod clock;
pub mod config;
pub mod constants;
pub mod database;
pub mod error;
pub mod events;
pub mod integrations;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod resolver;
pub mod services;
pub mod state_machine;
pub mod store;
pub mod system_context;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigManager, LeadflowConfig};
pub use error::{LeadflowError, Result};
pub use events::EventPublisher;
pub use models::{
    AssignmentCursor, Campaign, CampaignAssignee, CampaignOption, CampaignStrategy, ExportRule,
    IntentionStatus, Lead, LeadAssignmentLog, Source, SourceKind,
};
pub use orchestration::{
    AutomationDisposition, AutomationOrchestrator, AutomationReport, ErrorCategory,
    RetryBatchSummary,
};
pub use resolver::{ActionKind, ActionType, OptionActionResolver, ResolvedAction};
pub use services::{
    AssigneePoolService, AssignmentOutcome, ExportOutcome, LeadAssignmentService, LeadExporter,
};
pub use state_machine::{AutomationEvent, AutomationState};
pub use store::{InMemoryLeadStore, LeadStore, PostgresLeadStore, StoreError};
pub use system_context::SystemContext;
