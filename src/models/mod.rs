pub mod assignment_cursor;
pub mod campaign;
pub mod campaign_assignee;
pub mod campaign_option;
pub mod lead;
pub mod lead_assignment_log;
pub mod outbound_message;
pub mod source;

// Re-export core models for easy access
pub use assignment_cursor::AssignmentCursor;
pub use campaign::{Campaign, CampaignStrategy, ExportRule};
pub use campaign_assignee::CampaignAssignee;
pub use campaign_option::CampaignOption;
pub use lead::{IntentionKind, IntentionStatus, Lead};
pub use lead_assignment_log::{AssignmentTrigger, LeadAssignmentLog, NewLeadAssignmentLog};
pub use outbound_message::{NewOutboundMessage, OutboundMessage};
pub use source::{Source, SourceKind};
