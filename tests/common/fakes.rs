//! Recording collaborators for orchestrator tests

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use leadflow_core::integrations::{
    CallDispatcher, CallHandle, IntegrationError, OutboundBody, SendReceipt, WebhookDispatcher,
    WhatsAppSender,
};
use leadflow_core::models::{Lead, Source};

/// How a fake provider should answer the next calls
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ProviderMode {
    #[default]
    Accept,
    /// Endpoint answered but declined (webhook only)
    Decline,
    RejectConfiguration(String),
    Fail(String),
}

impl ProviderMode {
    fn error(&self, provider: &str) -> Option<IntegrationError> {
        match self {
            Self::RejectConfiguration(message) => {
                Some(IntegrationError::InvalidConfiguration(message.clone()))
            }
            Self::Fail(message) => Some(IntegrationError::Provider {
                provider: provider.to_string(),
                message: message.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub source_id: i64,
    pub lead_id: i64,
    pub body: OutboundBody,
}

#[derive(Debug, Default)]
pub struct RecordingWhatsAppSender {
    mode: Mutex<ProviderMode>,
    fixed_message_id: Mutex<Option<String>>,
    sent: Mutex<Vec<SentMessage>>,
    counter: AtomicU64,
}

impl RecordingWhatsAppSender {
    pub fn set_mode(&self, mode: ProviderMode) {
        *self.mode.lock() = mode;
    }

    /// Answer every send with the same provider id
    pub fn always_return_id(&self, provider_message_id: &str) {
        *self.fixed_message_id.lock() = Some(provider_message_id.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl WhatsAppSender for RecordingWhatsAppSender {
    async fn send_message(
        &self,
        source: &Source,
        lead: &Lead,
        body: &OutboundBody,
    ) -> Result<SendReceipt, IntegrationError> {
        if let Some(error) = self.mode.lock().error("whatsapp") {
            return Err(error);
        }

        self.sent.lock().push(SentMessage {
            source_id: source.id,
            lead_id: lead.id,
            body: body.clone(),
        });
        let provider_message_id = self.fixed_message_id.lock().clone().unwrap_or_else(|| {
            format!("wamid.{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
        });
        Ok(SendReceipt {
            provider_message_id,
        })
    }
}

#[derive(Debug, Default)]
pub struct RecordingWebhookDispatcher {
    mode: Mutex<ProviderMode>,
    dispatched: Mutex<Vec<(i64, Option<i64>)>>,
}

impl RecordingWebhookDispatcher {
    pub fn set_mode(&self, mode: ProviderMode) {
        *self.mode.lock() = mode;
    }

    /// `(lead_id, source_id)` for every dispatch that reached the client
    pub fn dispatched(&self) -> Vec<(i64, Option<i64>)> {
        self.dispatched.lock().clone()
    }
}

#[async_trait]
impl WebhookDispatcher for RecordingWebhookDispatcher {
    async fn dispatch_lead_to_client(
        &self,
        lead: &Lead,
        source: Option<&Source>,
    ) -> Result<bool, IntegrationError> {
        let mode = self.mode.lock().clone();
        if let Some(error) = mode.error("webhook") {
            return Err(error);
        }
        if mode == ProviderMode::Decline {
            return Ok(false);
        }

        self.dispatched.lock().push((lead.id, source.map(|s| s.id)));
        Ok(true)
    }
}

#[derive(Debug, Default)]
pub struct RecordingCallDispatcher {
    calls: Mutex<Vec<(i64, Option<String>)>>,
}

impl RecordingCallDispatcher {
    pub fn calls(&self) -> Vec<(i64, Option<String>)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl CallDispatcher for RecordingCallDispatcher {
    async fn dispatch_call(
        &self,
        lead: &Lead,
        agent_id: Option<&str>,
    ) -> Result<CallHandle, IntegrationError> {
        let mut calls = self.calls.lock();
        calls.push((lead.id, agent_id.map(str::to_string)));
        Ok(CallHandle {
            call_id: format!("call-{}", calls.len()),
        })
    }
}
