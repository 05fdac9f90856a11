//! Outbound collaborators the engine hands work to.
//!
//! Wire formats live behind these traits; the engine only relies on the
//! contract shape. Implementations must be safe to share across tasks.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::models::{Lead, Source};

#[derive(Debug, Error)]
pub enum IntegrationError {
    /// The provider refused the request because of how it is configured
    #[error("Invalid provider configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{provider} error: {message}")]
    Provider { provider: String, message: String },

    #[error("Network error: {0}")]
    Network(String),
}

/// Message content for a WhatsApp send
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundBody {
    pub message: Option<String>,
    pub template_id: Option<String>,
    pub delay_seconds: u32,
}

/// Provider acknowledgement of a sent message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendReceipt {
    pub provider_message_id: String,
}

/// Handle for an AI call that will report back asynchronously
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallHandle {
    pub call_id: String,
}

#[async_trait]
pub trait WhatsAppSender: Send + Sync + fmt::Debug {
    async fn send_message(
        &self,
        source: &Source,
        lead: &Lead,
        body: &OutboundBody,
    ) -> Result<SendReceipt, IntegrationError>;
}

#[async_trait]
pub trait WebhookDispatcher: Send + Sync + fmt::Debug {
    /// Push the lead to the client system; `Ok(false)` means the client
    /// endpoint declined it
    async fn dispatch_lead_to_client(
        &self,
        lead: &Lead,
        source: Option<&Source>,
    ) -> Result<bool, IntegrationError>;
}

#[async_trait]
pub trait CallDispatcher: Send + Sync + fmt::Debug {
    async fn dispatch_call(
        &self,
        lead: &Lead,
        agent_id: Option<&str>,
    ) -> Result<CallHandle, IntegrationError>;
}

/// Collaborators wired into the engine; any of them may be absent
#[derive(Debug, Clone, Default)]
pub struct Integrations {
    pub whatsapp: Option<Arc<dyn WhatsAppSender>>,
    pub webhook: Option<Arc<dyn WebhookDispatcher>>,
    pub calls: Option<Arc<dyn CallDispatcher>>,
}

impl Integrations {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_whatsapp(mut self, sender: Arc<dyn WhatsAppSender>) -> Self {
        self.whatsapp = Some(sender);
        self
    }

    #[must_use]
    pub fn with_webhook(mut self, dispatcher: Arc<dyn WebhookDispatcher>) -> Self {
        self.webhook = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn with_calls(mut self, dispatcher: Arc<dyn CallDispatcher>) -> Self {
        self.calls = Some(dispatcher);
        self
    }
}
