use std::sync::Arc;

use tracing::{debug, error, info, warn};

use leadline_core::{
    AnswerBackend, BackendQuery, ChannelKind, ConversationKey, CustomerInfo, EventError,
    ExtractedLead, HistoryStore, LeadForwardOutcome, LeadSink, Role, Turn, WindowBuilder,
};

use crate::events::{route, InboundEvent, RoutingDecision};

const GREETING: &str = "Hello! I'm your AI assistant. How can I help you today?";
const HELP_TEXT: &str = "I'm here to help! Just ask me any question.";

/// Per-handler knobs lifted out of the full application config.
#[derive(Clone, Debug)]
pub struct HandlerSettings {
    pub company_name: String,
    pub sentinel_token: String,
    pub business_account_identity: String,
    pub window_size_primary: usize,
    pub window_size_business: usize,
}

/// Runs the answer cycle for one inbound event: route, assemble the
/// bounded history window, query the backend, strip the lead sentinel,
/// persist both turns, forward a complete lead, and hand back the reply
/// text for delivery.
pub struct MessageHandler {
    store: Arc<dyn HistoryStore>,
    backend: Arc<dyn AnswerBackend>,
    lead_sink: Arc<dyn LeadSink>,
    windows: WindowBuilder,
    settings: HandlerSettings,
}

impl MessageHandler {
    pub fn new(
        store: Arc<dyn HistoryStore>,
        backend: Arc<dyn AnswerBackend>,
        lead_sink: Arc<dyn LeadSink>,
        settings: HandlerSettings,
    ) -> Self {
        let windows = WindowBuilder::new(settings.window_size_primary, settings.window_size_business);
        Self { store, backend, lead_sink, windows, settings }
    }

    /// Handles one event end to end. `Ok(Some(text))` is a reply to deliver
    /// on the originating channel; `Ok(None)` means the event was absorbed
    /// silently. Errors carry their own fixed user-facing message where one
    /// is warranted.
    pub async fn handle_event(&self, event: &InboundEvent) -> Result<Option<String>, EventError> {
        if event.channel == ChannelKind::Primary {
            if let Some(reply) = command_reply(event.primary_text.as_deref()) {
                return Ok(Some(reply.to_string()));
            }
        }

        match route(event, &self.settings.business_account_identity) {
            RoutingDecision::Reject => Err(EventError::NoUsableText),
            RoutingDecision::LogOnly { key, text } => {
                self.log_admin_turn(event, &key, &text).await;
                Ok(None)
            }
            RoutingDecision::Answer { key, text, channel } => {
                self.answer(event, &key, &text, channel).await.map(Some)
            }
        }
    }

    /// The business account's own echoed reply: kept in history so the
    /// backend sees what the admin told the client, never re-answered.
    async fn log_admin_turn(&self, event: &InboundEvent, key: &ConversationKey, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        let turn = Turn::new(Role::Admin, text);
        if let Err(store_error) =
            self.store.append_turns(key, &event.event_id, std::slice::from_ref(&turn)).await
        {
            error!(
                conversation = %key,
                event_id = %event.event_id,
                error = %store_error,
                "failed to record admin turn"
            );
            return;
        }

        info!(conversation = %key, event_id = %event.event_id, "recorded admin turn");
    }

    async fn answer(
        &self,
        event: &InboundEvent,
        key: &ConversationKey,
        text: &str,
        channel: ChannelKind,
    ) -> Result<String, EventError> {
        let history = self.store.recent_turns(key, self.windows.size_for(channel)).await?;
        let window = self.windows.project(&history, channel);

        let reply = self
            .backend
            .answer(BackendQuery {
                query: text,
                conversation_history: window.turns(),
                company_name: &self.settings.company_name,
            })
            .await?;

        let (clean_text, sentinel_present) =
            leadline_core::strip_sentinel(&reply.response, &self.settings.sentinel_token);
        debug!(
            conversation = %key,
            sentinel = sentinel_present,
            window_len = window.len(),
            "backend reply received"
        );

        let customer_info = reply.customer_info();
        let assistant_content = match customer_info.and_then(CustomerInfo::audit_block) {
            Some(block) => format!("{clean_text}\n\n{block}"),
            None => clean_text.clone(),
        };

        let turns =
            [Turn::new(Role::User, text), Turn::new(Role::Assistant, assistant_content)];
        if let Err(store_error) = self.store.append_turns(key, &event.event_id, &turns).await {
            // Reply delivery still happens; the lost turns are a logged
            // data-loss window, not a user-visible failure.
            error!(
                conversation = %key,
                event_id = %event.event_id,
                error = %store_error,
                "history append failed; delivering reply anyway"
            );
        }

        if let Some(lead) = customer_info.and_then(ExtractedLead::from_customer_info) {
            self.forward_lead(key, &lead, channel).await;
        }

        Ok(clean_text)
    }

    async fn forward_lead(&self, key: &ConversationKey, lead: &ExtractedLead, channel: ChannelKind) {
        match self.lead_sink.forward(key, lead, channel).await {
            Ok(LeadForwardOutcome::Created { record_id }) => {
                info!(conversation = %key, record_id = %record_id, "lead forwarded");
            }
            Ok(LeadForwardOutcome::Duplicate) => {
                debug!(conversation = %key, "duplicate lead suppressed");
            }
            Err(sink_error) => {
                // The user still gets the clean answer.
                warn!(conversation = %key, error = %sink_error, "lead forwarding failed");
            }
        }
    }
}

fn command_reply(text: Option<&str>) -> Option<&'static str> {
    match text.map(str::trim) {
        Some("/start") => Some(GREETING),
        Some("/help") => Some(HELP_TEXT),
        _ => None,
    }
}
