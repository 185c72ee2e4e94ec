use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tracing::debug;

use leadline_core::config::BackendConfig;
use leadline_core::{AnswerBackend, BackendError, BackendQuery, BackendReply, Turn};

/// `reqwest`-backed [`AnswerBackend`] speaking the backend's JSON contract.
pub struct HttpAnswerBackend {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct QueryPayload<'a> {
    query: &'a str,
    conversation_history: Vec<WireTurn<'a>>,
    company_name: &'a str,
}

#[derive(Serialize)]
struct WireTurn<'a> {
    role: &'a str,
    content: &'a str,
}

fn wire_history(turns: &[Turn]) -> Vec<WireTurn<'_>> {
    turns.iter().map(|turn| WireTurn { role: turn.role.as_str(), content: &turn.content }).collect()
}

impl HttpAnswerBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        Self::with_base_url(&config.base_url, config.timeout_secs)
    }

    pub fn with_base_url(base_url: &str, timeout_secs: u64) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .build()
            .map_err(|error| BackendError::Unavailable(error.to_string()))?;

        Ok(Self { client, base_url: base_url.to_string() })
    }
}

#[async_trait]
impl AnswerBackend for HttpAnswerBackend {
    async fn answer(&self, query: BackendQuery<'_>) -> Result<BackendReply, BackendError> {
        let payload = QueryPayload {
            query: query.query,
            conversation_history: wire_history(query.conversation_history),
            company_name: query.company_name,
        };

        debug!(
            history_len = payload.conversation_history.len(),
            "sending query to answer backend"
        );

        let response = self
            .client
            .post(&self.base_url)
            .json(&payload)
            .send()
            .await
            .map_err(|error| BackendError::Unavailable(error.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|error| BackendError::Unavailable(error.to_string()))?;

        response
            .json::<BackendReply>()
            .await
            .map_err(|error| BackendError::Unavailable(format!("malformed reply body: {error}")))
    }
}
