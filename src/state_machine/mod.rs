// State machine module for lead automation
//
// A lead moves pending -> processing -> completed/failed/skipped; failed and
// skipped leads return to pending only through an explicit operator reset.

pub mod actions;
pub mod automation_state_machine;
pub mod errors;
pub mod events;
pub mod guards;
pub mod persistence;
pub mod states;

// Re-export main types for convenient access
pub use automation_state_machine::AutomationStateMachine;
pub use errors::{ActionError, GuardError, StateMachineError};
pub use events::{AutomationEvent, TransitionReason};
pub use states::AutomationState;

// Common traits and utilities
pub use actions::{PublishTransitionEventAction, StateAction};
pub use guards::StateGuard;
pub use persistence::{LeadTransitionPersistence, TransitionPersistence};
