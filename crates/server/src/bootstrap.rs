use std::sync::Arc;

use leadline_backend::HttpAnswerBackend;
use leadline_core::config::{AppConfig, ConfigError, LoadOptions};
use leadline_core::{BackendError, HistoryStore, LeadLedger, LeadSink};
use leadline_crm::{CrmClient, CrmClientError, HttpCrmClient, LeadForwarder, NoopCrmClient};
use leadline_db::{connect, migrations, DbPool, SqlHistoryStore, SqlLeadLedger};
use leadline_telegram::{
    HandlerSettings, MessageHandler, PollingRunner, PollingTransport, ReconnectPolicy,
    TransportError, UpdateTransport,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runner: PollingRunner,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("backend client setup failed: {0}")]
    Backend(#[from] BackendError),
    #[error("crm client setup failed: {0}")]
    Crm(#[from] CrmClientError),
    #[error("transport setup failed: {0}")]
    Transport(#[from] TransportError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

/// Wires every boundary explicitly: store and ledger over the shared pool,
/// backend and CRM clients from config, handler on top, polling runner last.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let store: Arc<dyn HistoryStore> = Arc::new(SqlHistoryStore::new(db_pool.clone()));
    let ledger: Arc<dyn LeadLedger> = Arc::new(SqlLeadLedger::new(db_pool.clone()));
    let backend = Arc::new(HttpAnswerBackend::new(&config.backend)?);

    let crm_client: Arc<dyn CrmClient> =
        match (config.crm.enabled, &config.crm.base_url, &config.crm.access_token) {
            (true, Some(base_url), Some(access_token)) => {
                Arc::new(HttpCrmClient::new(base_url, access_token.clone())?)
            }
            _ => Arc::new(NoopCrmClient),
        };
    let lead_sink: Arc<dyn LeadSink> = Arc::new(LeadForwarder::new(crm_client, ledger));

    let handler = Arc::new(MessageHandler::new(
        store,
        backend,
        lead_sink,
        HandlerSettings {
            company_name: config.backend.company_name.clone(),
            sentinel_token: config.backend.sentinel_token.clone(),
            business_account_identity: config.telegram.business_account_identity.clone(),
            window_size_primary: config.history.window_size_primary,
            window_size_business: config.history.window_size_business,
        },
    ));

    let transport: Arc<dyn UpdateTransport> = Arc::new(PollingTransport::new(
        &config.telegram.bot_token,
        &config.telegram.business_account_identity,
    )?);
    let runner = PollingRunner::new(transport, handler, ReconnectPolicy::default());

    Ok(Application { config, db_pool, runner })
}

#[cfg(test)]
mod tests {
    use leadline_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn valid_overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                bot_token: Some("123456:test-token".to_string()),
                business_account_identity: Some("spineup_admin".to_string()),
                company_name: Some("SpineUP".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_without_a_bot_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("sqlite::memory:".to_string()),
                business_account_identity: Some("spineup_admin".to_string()),
                company_name: Some("SpineUP".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        assert!(result.is_err());
        let message = result.err().expect("error").to_string();
        assert!(message.contains("telegram.bot_token"));
    }

    #[tokio::test]
    async fn bootstrap_applies_migrations_and_exposes_the_data_path() {
        let app = bootstrap(valid_overrides("sqlite::memory:?cache=shared"))
            .await
            .expect("bootstrap should succeed with valid overrides");

        let (table_count,): (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM sqlite_master \
             WHERE type = 'table' AND name IN ('conversations', 'turns', 'forwarded_leads')",
        )
        .fetch_one(&app.db_pool)
        .await
        .expect("expected baseline tables after bootstrap");
        assert_eq!(table_count, 3, "bootstrap should expose the conversation tables");

        app.db_pool.close().await;
    }
}
