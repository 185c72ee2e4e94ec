use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::debug;

const REQUEST_TIMEOUT_SECS: u64 = 15;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum CrmClientError {
    #[error("crm request failed: {0}")]
    Request(String),
    #[error("crm reply missing created lead id")]
    MissingRecordId,
}

/// Creates one lead record in the CRM and returns its identifier.
#[async_trait]
pub trait CrmClient: Send + Sync {
    async fn create_lead(&self, record_text: &str) -> Result<String, CrmClientError>;
}

/// Client for the CRM's `POST /api/v4/leads` endpoint. The underlying
/// `reqwest::Client` is built once and reused, so every call shares the
/// same connection pool.
pub struct HttpCrmClient {
    client: reqwest::Client,
    leads_url: String,
    access_token: SecretString,
}

#[derive(Deserialize)]
struct CreatedLeadsReply {
    #[serde(rename = "_embedded")]
    embedded: EmbeddedLeads,
}

#[derive(Deserialize)]
struct EmbeddedLeads {
    leads: Vec<CreatedLead>,
}

#[derive(Deserialize)]
struct CreatedLead {
    id: u64,
}

impl HttpCrmClient {
    pub fn new(base_url: &str, access_token: SecretString) -> Result<Self, CrmClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|error| CrmClientError::Request(error.to_string()))?;

        Ok(Self {
            client,
            leads_url: format!("{}/api/v4/leads", base_url.trim_end_matches('/')),
            access_token,
        })
    }
}

#[async_trait]
impl CrmClient for HttpCrmClient {
    async fn create_lead(&self, record_text: &str) -> Result<String, CrmClientError> {
        let response = self
            .client
            .post(&self.leads_url)
            .bearer_auth(self.access_token.expose_secret())
            .json(&json!([{ "name": record_text }]))
            .send()
            .await
            .map_err(|error| CrmClientError::Request(error.to_string()))?
            .error_for_status()
            .map_err(|error| CrmClientError::Request(error.to_string()))?;

        let reply: CreatedLeadsReply = response
            .json()
            .await
            .map_err(|error| CrmClientError::Request(error.to_string()))?;

        let record_id = reply
            .embedded
            .leads
            .first()
            .map(|lead| lead.id.to_string())
            .ok_or(CrmClientError::MissingRecordId)?;

        debug!(record_id = %record_id, "created crm lead");
        Ok(record_id)
    }
}

/// Disabled-CRM stand-in; accepts every lead without side effects.
#[derive(Default)]
pub struct NoopCrmClient;

#[async_trait]
impl CrmClient for NoopCrmClient {
    async fn create_lead(&self, _record_text: &str) -> Result<String, CrmClientError> {
        Ok("noop".to_string())
    }
}

#[cfg(test)]
mod tests {
    use secrecy::SecretString;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::{CrmClient, CrmClientError, HttpCrmClient};

    fn token() -> SecretString {
        SecretString::from("test-token")
    }

    #[tokio::test]
    async fn create_lead_posts_record_and_returns_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v4/leads"))
            .and(header("authorization", "Bearer test-token"))
            .and(body_partial_json(serde_json::json!([{ "name": "lead text" }])))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": {"leads": [{"id": 4211}]}
            })))
            .mount(&server)
            .await;

        let client = HttpCrmClient::new(&server.uri(), token()).expect("build client");
        let record_id = client.create_lead("lead text").await.expect("create");
        assert_eq!(record_id, "4211");
    }

    #[tokio::test]
    async fn non_success_status_is_a_request_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let client = HttpCrmClient::new(&server.uri(), token()).expect("build client");
        let error = client.create_lead("lead text").await.expect_err("should fail");
        assert!(matches!(error, CrmClientError::Request(_)));
    }

    #[tokio::test]
    async fn empty_leads_array_is_missing_record_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "_embedded": {"leads": []}
            })))
            .mount(&server)
            .await;

        let client = HttpCrmClient::new(&server.uri(), token()).expect("build client");
        let error = client.create_lead("lead text").await.expect_err("should fail");
        assert_eq!(error, CrmClientError::MissingRecordId);
    }
}
