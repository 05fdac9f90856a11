//! # Orchestration
//!
//! Lead automation flow: resolve the action for a lead, run it, record the
//! outcome through the automation state machine, then hand sales-ready leads
//! to assignment and export.
//!
//! ## Core Components
//!
//! - **AutomationOrchestrator**: entry points for triggers, retries, external
//!   completions and intention finalization
//! - **ActionExecutor**: runs a resolved action against the wired integrations
//! - **ErrorClassifier**: maps action failures onto skipped or failed states

pub mod action_executor;
pub mod automation_orchestrator;
pub mod error_classifier;

pub use action_executor::{ActionExecutor, ExecutionOutcome};
pub use automation_orchestrator::{
    AutomationDisposition, AutomationError, AutomationOrchestrator, AutomationReport,
    IntentionDisposition, IntentionReport, RetryBatchSummary,
};
pub use error_classifier::{
    ErrorCategory, ErrorClassification, ErrorClassifier, ErrorContext, StandardErrorClassifier,
};
