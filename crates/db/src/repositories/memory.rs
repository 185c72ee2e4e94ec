use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use tokio::sync::RwLock;

use leadline_core::{ConversationKey, HistoryStore, LeadLedger, StoreError, Turn};

/// In-memory history store for tests and local smoke runs. Mirrors the SQL
/// store's semantics: append-only, idempotent per `(event_id, role)`.
#[derive(Default)]
pub struct InMemoryHistoryStore {
    state: RwLock<HashMap<String, StoredConversation>>,
}

#[derive(Default)]
struct StoredConversation {
    turns: Vec<Turn>,
    seen_events: HashSet<(String, String)>,
}

impl InMemoryHistoryStore {
    pub async fn turn_count(&self, key: &ConversationKey) -> usize {
        let state = self.state.read().await;
        state.get(&key.storage_key()).map(|conversation| conversation.turns.len()).unwrap_or(0)
    }

    pub async fn all_turns(&self, key: &ConversationKey) -> Vec<Turn> {
        let state = self.state.read().await;
        state
            .get(&key.storage_key())
            .map(|conversation| conversation.turns.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn recent_turns(
        &self,
        key: &ConversationKey,
        limit: usize,
    ) -> Result<Vec<Turn>, StoreError> {
        let state = self.state.read().await;
        let turns = state
            .get(&key.storage_key())
            .map(|conversation| conversation.turns.as_slice())
            .unwrap_or_default();
        let skip = turns.len().saturating_sub(limit);
        Ok(turns[skip..].to_vec())
    }

    async fn append_turns(
        &self,
        key: &ConversationKey,
        event_id: &str,
        turns: &[Turn],
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().await;
        let conversation = state.entry(key.storage_key()).or_default();

        for turn in turns {
            let marker = (event_id.to_string(), turn.role.as_str().to_string());
            if conversation.seen_events.insert(marker) {
                conversation.turns.push(turn.clone());
            }
        }

        Ok(())
    }
}

/// In-memory lead ledger double.
#[derive(Default)]
pub struct InMemoryLeadLedger {
    claimed: RwLock<HashSet<(String, String)>>,
}

#[async_trait]
impl LeadLedger for InMemoryLeadLedger {
    async fn claim(&self, key: &ConversationKey, lead_hash: &str) -> Result<bool, StoreError> {
        let mut claimed = self.claimed.write().await;
        Ok(claimed.insert((key.storage_key(), lead_hash.to_string())))
    }
}
