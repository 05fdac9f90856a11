pub mod export_rules;
pub mod lead_assignment_service;
pub mod lead_exporter;
pub mod round_robin;

pub use export_rules::{should_export, should_export_raw};
pub use lead_assignment_service::{AssignmentOutcome, LeadAssignmentService};
pub use lead_exporter::{ExportOutcome, LeadExporter};
pub use round_robin::{
    active_sequence, AssigneePoolService, AssigneePoolSync, RoundRobinCursor, RoundRobinSelection,
};
