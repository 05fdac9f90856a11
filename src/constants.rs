//! # System Constants
//!
//! Event names, option keys and operator-facing messages shared by the
//! resolver, the assignment engine and the automation orchestrator.

// Re-export state types for convenience
pub use crate::state_machine::AutomationState as AutomationStatus;

/// Lifecycle events published through the [`EventPublisher`](crate::events::EventPublisher)
pub mod events {
    // Automation lifecycle events
    pub const LEAD_AUTOMATION_STARTED: &str = "lead.automation_started";
    pub const LEAD_AUTOMATION_COMPLETED: &str = "lead.automation_completed";
    pub const LEAD_AUTOMATION_FAILED: &str = "lead.automation_failed";
    pub const LEAD_AUTOMATION_SKIPPED: &str = "lead.automation_skipped";
    pub const LEAD_AUTOMATION_AWAITING_EXTERNAL: &str = "lead.automation_awaiting_external";
    pub const LEAD_AUTOMATION_RESET: &str = "lead.automation_reset";

    // Intention and export events
    pub const LEAD_INTENTION_FINALIZED: &str = "lead.intention_finalized";
    pub const LEAD_PROMOTED_TO_SALES_READY: &str = "lead.promoted_to_sales_ready";
    pub const LEAD_EXPORTED: &str = "lead.exported";
    pub const LEAD_EXPORT_FAILED: &str = "lead.export_failed";

    // Assignment events
    pub const LEAD_ASSIGNED: &str = "lead.assigned";
    pub const LEAD_UNASSIGNED: &str = "lead.unassigned";
    pub const LEAD_ASSIGNMENT_FAILED: &str = "lead.assignment_failed";
    pub const CAMPAIGN_ASSIGNEES_SYNCED: &str = "campaign.assignees_synced";
}

/// Option keys with a fixed meaning
pub mod option_keys {
    /// Single trigger option used by direct campaigns
    pub const DIRECT_TRIGGER: &str = "0";
}

/// Canonical intention values
pub mod intentions {
    pub const INTERESTED: &str = "interested";
    pub const NOT_INTERESTED: &str = "not_interested";
}

/// Origins recorded in `intention_origin`
pub mod origins {
    /// Intention set by the automation `skip` action
    pub const AUTOMATION: &str = "automation";
}

/// Legacy action value meaning "take no action"
pub const LEGACY_DO_NOTHING: &str = "do_nothing";

/// Messages recorded on leads for operators
pub mod messages {
    pub const NO_ACTIVE_ASSIGNEES: &str = "No active assignees configured for campaign";
    pub const NO_CAMPAIGN: &str = "Lead has no campaign associated";
    pub const AWAITING_MANUAL_REVIEW: &str = "Routed to manual review";
    pub const UNASSIGNED_BY_OPERATOR: &str = "Unassigned by operator, awaiting reassignment";
}
