use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::automation_state_machine::AutomationStateMachine;
use super::errors::StateMachineResult;
use super::events::AutomationEvent;
use super::states::AutomationState;
use crate::models::Lead;
use crate::store::StoreTransaction;

/// Trait for persisting state transitions inside an open store transaction
#[async_trait]
pub trait TransitionPersistence<T: Send + Sync> {
    /// Write the entity's post-transition state
    async fn persist_transition(
        &self,
        entity: &T,
        tx: &mut dyn StoreTransaction,
    ) -> StateMachineResult<()>;
}

/// Lead automation state lives on the lead row itself
#[derive(Debug, Default, Clone, Copy)]
pub struct LeadTransitionPersistence {
    machine: AutomationStateMachine,
}

impl LeadTransitionPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transition the (already locked) lead and write it back in `tx`
    pub async fn apply(
        &self,
        tx: &mut dyn StoreTransaction,
        lead: &mut Lead,
        event: &AutomationEvent,
        now: DateTime<Utc>,
    ) -> StateMachineResult<AutomationState> {
        let target = self.machine.transition(lead, event, now)?;
        self.persist_transition(lead, tx).await?;
        Ok(target)
    }
}

#[async_trait]
impl TransitionPersistence<Lead> for LeadTransitionPersistence {
    async fn persist_transition(
        &self,
        lead: &Lead,
        tx: &mut dyn StoreTransaction,
    ) -> StateMachineResult<()> {
        tx.update_lead(lead).await?;
        Ok(())
    }
}
