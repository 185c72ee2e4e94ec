//! Boundary contracts consumed by the message handler.
//!
//! Production implementations live in `leadline-db` (history store, lead
//! ledger), `leadline-backend` (answer backend), and `leadline-crm` (lead
//! sink); tests exercise the handler against in-memory doubles.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::conversation::{ChannelKind, ConversationKey, Turn};
use crate::domain::lead::{CustomerInfo, ExtractedLead};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("history store unavailable: {0}")]
    Unavailable(String),
}

/// Keyed, append-only access to persisted conversation history.
///
/// Appends must be atomic per call and idempotent for a repeated
/// `(key, event_id)` pair, so at-least-once delivery from the transport
/// cannot duplicate turns.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Last `limit` turns in arrival order; a missing conversation yields
    /// an empty vec.
    async fn recent_turns(
        &self,
        key: &ConversationKey,
        limit: usize,
    ) -> Result<Vec<Turn>, StoreError>;

    /// Appends `turns` in order under `key`. `event_id` identifies the
    /// physical transport event; replaying it is a no-op.
    async fn append_turns(
        &self,
        key: &ConversationKey,
        event_id: &str,
        turns: &[Turn],
    ) -> Result<(), StoreError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unavailable: {0}")]
    Unavailable(String),
}

/// One question for the inference backend, with its bounded context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendQuery<'a> {
    pub query: &'a str,
    pub conversation_history: &'a [Turn],
    pub company_name: &'a str,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdditionalData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_info: Option<CustomerInfo>,
}

/// Structured backend reply. `response` is free text that may carry the
/// sentinel marker; `additional_data` is the structured side channel.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendReply {
    pub response: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<AdditionalData>,
}

impl BackendReply {
    pub fn customer_info(&self) -> Option<&CustomerInfo> {
        self.additional_data.as_ref().and_then(|data| data.customer_info.as_ref())
    }
}

/// Stateless request/response call to the inference service. No retry is
/// performed here; retry policy belongs to the caller.
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn answer(&self, query: BackendQuery<'_>) -> Result<BackendReply, BackendError>;
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LeadSinkError {
    #[error("lead forwarding failed: {0}")]
    Forward(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LeadForwardOutcome {
    Created { record_id: String },
    /// The dedup key was already claimed; no CRM record was created.
    Duplicate,
}

/// Accepts complete leads for CRM forwarding, idempotently per
/// `(conversation key, lead content hash)`.
#[async_trait]
pub trait LeadSink: Send + Sync {
    async fn forward(
        &self,
        key: &ConversationKey,
        lead: &ExtractedLead,
        channel: ChannelKind,
    ) -> Result<LeadForwardOutcome, LeadSinkError>;
}

/// Durable record of already-forwarded leads. `claim` returns `true` only
/// the first time a `(key, lead_hash)` pair is seen.
#[async_trait]
pub trait LeadLedger: Send + Sync {
    async fn claim(&self, key: &ConversationKey, lead_hash: &str) -> Result<bool, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::{AdditionalData, BackendReply};
    use crate::domain::lead::CustomerInfo;

    #[test]
    fn backend_reply_parses_full_wire_shape() {
        let reply: BackendReply = serde_json::from_str(
            r#"{
                "response": "Hi! LEAD_CAPTURED",
                "additional_data": {
                    "customer_info": {"name": "Ana", "phone": "555"}
                }
            }"#,
        )
        .expect("parse reply");

        let info = reply.customer_info().expect("customer info");
        assert_eq!(info.name.as_deref(), Some("Ana"));
        assert_eq!(info.phone.as_deref(), Some("555"));
        assert_eq!(info.service, None);
    }

    #[test]
    fn backend_reply_tolerates_missing_side_channel() {
        let reply: BackendReply =
            serde_json::from_str(r#"{"response": "plain answer"}"#).expect("parse reply");
        assert_eq!(reply.customer_info(), None);
    }

    #[test]
    fn empty_customer_info_is_still_surfaced() {
        let reply = BackendReply {
            response: "ok".to_string(),
            additional_data: Some(AdditionalData { customer_info: Some(CustomerInfo::default()) }),
        };
        assert!(reply.customer_info().expect("info").is_empty());
    }
}
