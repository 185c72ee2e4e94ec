use async_trait::async_trait;

use leadline_core::{ConversationKey, LeadLedger, StoreError};

use super::store_error;
use crate::DbPool;

/// Durable ledger of forwarded leads, keyed by conversation plus lead
/// content hash. The primary key makes `claim` first-writer-wins.
pub struct SqlLeadLedger {
    pool: DbPool,
}

impl SqlLeadLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadLedger for SqlLeadLedger {
    async fn claim(&self, key: &ConversationKey, lead_hash: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO forwarded_leads (conversation_key, lead_hash) VALUES (?, ?)",
        )
        .bind(key.storage_key())
        .bind(lead_hash)
        .execute(&self.pool)
        .await
        .map_err(store_error)?;

        Ok(result.rows_affected() == 1)
    }
}
