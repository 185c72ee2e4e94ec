use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::debug;

use leadline_core::ChannelKind;

use crate::events::InboundEvent;

const POLL_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport send failed: {0}")]
    Send(String),
}

/// Inbound/outbound boundary to the chat platform.
///
/// `next_event` blocks until an event arrives or the stream closes (`None`).
/// `acknowledge` commits the poll offset once the event has been handed to
/// the handler; `send_text` replies on the event's originating channel.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError>;
    async fn acknowledge(&self, event: &InboundEvent) -> Result<(), TransportError>;
    async fn send_text(&self, event: &InboundEvent, text: &str) -> Result<(), TransportError>;
}

/// Long-polling transport against the Telegram Bot API (`getUpdates` /
/// `sendMessage`), covering both direct messages and `business_message`
/// updates from the linked business account.
pub struct PollingTransport {
    client: reqwest::Client,
    api_base: String,
    business_account_identity: String,
    state: Mutex<PollState>,
}

#[derive(Default)]
struct PollState {
    offset: i64,
    queue: VecDeque<InboundEvent>,
}

#[derive(Deserialize)]
struct ApiReply<T> {
    ok: bool,
    result: Option<T>,
}

#[derive(Deserialize)]
pub(crate) struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<TelegramMessage>,
    #[serde(default)]
    pub business_message: Option<TelegramMessage>,
}

#[derive(Deserialize)]
pub(crate) struct TelegramMessage {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub from: Option<TelegramUser>,
    pub chat: TelegramChat,
    #[serde(default)]
    pub business_connection_id: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub is_bot: bool,
}

#[derive(Deserialize)]
pub(crate) struct TelegramChat {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Serialize)]
struct SendMessagePayload<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    business_connection_id: Option<&'a str>,
}

impl PollingTransport {
    pub fn new(
        bot_token: &SecretString,
        business_account_identity: &str,
    ) -> Result<Self, TransportError> {
        // Client timeout must outlast the long-poll window.
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(POLL_TIMEOUT_SECS + 10))
            .build()
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        Ok(Self {
            client,
            api_base: format!("https://api.telegram.org/bot{}", bot_token.expose_secret()),
            business_account_identity: business_account_identity.to_string(),
            state: Mutex::new(PollState::default()),
        })
    }

    async fn fetch_updates(&self, offset: i64) -> Result<Vec<Update>, TransportError> {
        let response = self
            .client
            .get(format!("{}/getUpdates", self.api_base))
            .query(&[
                ("timeout", POLL_TIMEOUT_SECS.to_string()),
                ("offset", offset.to_string()),
                ("allowed_updates", r#"["message","business_message"]"#.to_string()),
            ])
            .send()
            .await
            .map_err(|error| TransportError::Receive(error.to_string()))?
            .error_for_status()
            .map_err(|error| TransportError::Receive(error.to_string()))?;

        let reply: ApiReply<Vec<Update>> = response
            .json()
            .await
            .map_err(|error| TransportError::Receive(error.to_string()))?;

        if !reply.ok {
            return Err(TransportError::Receive("telegram api returned ok=false".to_string()));
        }
        Ok(reply.result.unwrap_or_default())
    }
}

#[async_trait]
impl UpdateTransport for PollingTransport {
    async fn connect(&self) -> Result<(), TransportError> {
        let response = self
            .client
            .get(format!("{}/getMe", self.api_base))
            .send()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?
            .error_for_status()
            .map_err(|error| TransportError::Connect(error.to_string()))?;

        let reply: ApiReply<serde_json::Value> = response
            .json()
            .await
            .map_err(|error| TransportError::Connect(error.to_string()))?;
        if !reply.ok {
            return Err(TransportError::Connect("bot token rejected".to_string()));
        }
        Ok(())
    }

    async fn next_event(&self) -> Result<Option<InboundEvent>, TransportError> {
        loop {
            let poll_offset = {
                let mut state = self.state.lock().await;
                if let Some(event) = state.queue.pop_front() {
                    return Ok(Some(event));
                }
                state.offset
            };

            let updates = self.fetch_updates(poll_offset).await?;
            let mut state = self.state.lock().await;
            for update in updates {
                // The fetch offset advances past every update we have seen
                // so unmappable updates (media-only service payloads with no
                // message) cannot wedge the poll loop.
                state.offset = state.offset.max(update.update_id + 1);
                if let Some(event) = event_from_update(update, &self.business_account_identity) {
                    state.queue.push_back(event);
                } else {
                    debug!("skipping update without message payload");
                }
            }
        }
    }

    async fn acknowledge(&self, event: &InboundEvent) -> Result<(), TransportError> {
        // The confirmed offset only matters across reconnects; in-session
        // fetches already advanced past this update.
        let mut state = self.state.lock().await;
        state.offset = state.offset.max(event.update_id + 1);
        Ok(())
    }

    async fn send_text(&self, event: &InboundEvent, text: &str) -> Result<(), TransportError> {
        let payload = SendMessagePayload {
            chat_id: event.chat_id,
            text,
            business_connection_id: event.business_connection_id.as_deref(),
        };

        self.client
            .post(format!("{}/sendMessage", self.api_base))
            .json(&payload)
            .send()
            .await
            .map_err(|error| TransportError::Send(error.to_string()))?
            .error_for_status()
            .map_err(|error| TransportError::Send(error.to_string()))?;

        Ok(())
    }
}

fn identity_of(user: Option<&TelegramUser>) -> String {
    match user {
        Some(user) => user.username.clone().unwrap_or_else(|| user.id.to_string()),
        None => "unknown".to_string(),
    }
}

/// Maps one raw update to an [`InboundEvent`]. Updates carrying neither a
/// direct nor a business message are dropped here.
pub(crate) fn event_from_update(update: Update, business_identity: &str) -> Option<InboundEvent> {
    let event_id = format!("tg-{}", update.update_id);

    if let Some(message) = update.business_message {
        let sender_identity = identity_of(message.from.as_ref());
        let chat_identity =
            message.chat.username.clone().unwrap_or_else(|| message.chat.id.to_string());
        return Some(InboundEvent {
            event_id,
            channel: ChannelKind::Business,
            primary_text: None,
            business_text: message.text,
            is_own_business_account: sender_identity == business_identity,
            sender_identity,
            chat_identity,
            chat_id: message.chat.id,
            business_connection_id: message.business_connection_id,
            update_id: update.update_id,
        });
    }

    if let Some(message) = update.message {
        // Messages from other bots are never answered.
        if message.from.as_ref().is_some_and(|user| user.is_bot) {
            return None;
        }
        let sender_identity = identity_of(message.from.as_ref());
        let chat_identity =
            message.chat.username.clone().unwrap_or_else(|| message.chat.id.to_string());
        return Some(InboundEvent {
            event_id,
            channel: ChannelKind::Primary,
            primary_text: message.text,
            business_text: None,
            sender_identity,
            chat_identity,
            is_own_business_account: false,
            chat_id: message.chat.id,
            business_connection_id: None,
            update_id: update.update_id,
        });
    }

    None
}
