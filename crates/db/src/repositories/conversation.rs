use async_trait::async_trait;
use sqlx::Row;

use leadline_core::{ConversationKey, HistoryStore, Role, StoreError, Turn};

use super::store_error;
use crate::DbPool;

/// SQL-backed conversation history keyed by [`ConversationKey`].
///
/// Turns are rows in an append-only log with a per-conversation sequence
/// number assigned inside the write transaction, so two in-flight events
/// for the same conversation interleave instead of overwriting each other.
pub struct SqlHistoryStore {
    pool: DbPool,
}

impl SqlHistoryStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for SqlHistoryStore {
    async fn recent_turns(
        &self,
        key: &ConversationKey,
        limit: usize,
    ) -> Result<Vec<Turn>, StoreError> {
        let rows = sqlx::query(
            "SELECT role, content FROM turns
             WHERE conversation_key = ?
             ORDER BY seq DESC
             LIMIT ?",
        )
        .bind(key.storage_key())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(store_error)?;

        let mut turns = rows
            .into_iter()
            .map(|row| {
                let role = parse_role(&row.get::<String, _>("role"))?;
                Ok(Turn { role, content: row.get::<String, _>("content") })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        // Query walks newest-first; callers expect arrival order.
        turns.reverse();
        Ok(turns)
    }

    async fn append_turns(
        &self,
        key: &ConversationKey,
        event_id: &str,
        turns: &[Turn],
    ) -> Result<(), StoreError> {
        if turns.is_empty() {
            return Ok(());
        }

        let storage_key = key.storage_key();
        let mut tx = self.pool.begin().await.map_err(store_error)?;

        sqlx::query("INSERT OR IGNORE INTO conversations (key) VALUES (?)")
            .bind(&storage_key)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;

        for turn in turns {
            // MAX(seq) is evaluated under the same write lock as the
            // insert, keeping seq monotonic across concurrent appenders.
            // OR IGNORE makes a replayed (event_id, role) pair a no-op.
            sqlx::query(
                "INSERT OR IGNORE INTO turns (conversation_key, seq, role, content, event_id)
                 SELECT ?1,
                        COALESCE((SELECT MAX(seq) FROM turns WHERE conversation_key = ?1), -1) + 1,
                        ?2, ?3, ?4",
            )
            .bind(&storage_key)
            .bind(turn.role.as_str())
            .bind(&turn.content)
            .bind(event_id)
            .execute(&mut *tx)
            .await
            .map_err(store_error)?;
        }

        tx.commit().await.map_err(store_error)
    }
}

fn parse_role(raw: &str) -> Result<Role, StoreError> {
    match raw {
        "user" => Ok(Role::User),
        "assistant" => Ok(Role::Assistant),
        "admin" => Ok(Role::Admin),
        other => Err(StoreError::Unavailable(format!("unknown turn role `{other}` in store"))),
    }
}

#[cfg(test)]
mod tests {
    use leadline_core::{ConversationKey, HistoryStore, Role, Turn};

    use super::SqlHistoryStore;
    use crate::{connect_with_settings, migrations};

    async fn store() -> SqlHistoryStore {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrate");
        SqlHistoryStore::new(pool)
    }

    #[tokio::test]
    async fn missing_conversation_reads_as_empty() {
        let store = store().await;
        let turns = store
            .recent_turns(&ConversationKey::user("nobody"), 20)
            .await
            .expect("read");
        assert!(turns.is_empty());
    }

    #[tokio::test]
    async fn appends_preserve_arrival_order() {
        let store = store().await;
        let key = ConversationKey::user("u1");

        store
            .append_turns(
                &key,
                "evt-1",
                &[Turn::new(Role::User, "hello"), Turn::new(Role::Assistant, "hi")],
            )
            .await
            .expect("append");
        store
            .append_turns(&key, "evt-2", &[Turn::new(Role::User, "more")])
            .await
            .expect("append");

        let turns = store.recent_turns(&key, 20).await.expect("read");
        let contents: Vec<&str> = turns.iter().map(|turn| turn.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "hi", "more"]);
    }

    #[tokio::test]
    async fn replayed_event_appends_nothing() {
        let store = store().await;
        let key = ConversationKey::user("u1");
        let turns =
            [Turn::new(Role::User, "hello"), Turn::new(Role::Assistant, "hi")];

        store.append_turns(&key, "evt-1", &turns).await.expect("append");
        store.append_turns(&key, "evt-1", &turns).await.expect("replayed append");

        assert_eq!(store.recent_turns(&key, 20).await.expect("read").len(), 2);
    }

    #[tokio::test]
    async fn read_limit_keeps_only_most_recent_turns() {
        let store = store().await;
        let key = ConversationKey::chat("c1");

        for index in 0..15 {
            store
                .append_turns(
                    &key,
                    &format!("evt-{index}"),
                    &[Turn::new(Role::User, format!("turn-{index}"))],
                )
                .await
                .expect("append");
        }

        let turns = store.recent_turns(&key, 10).await.expect("read");
        assert_eq!(turns.len(), 10);
        assert_eq!(turns.first().map(|turn| turn.content.as_str()), Some("turn-5"));
        assert_eq!(turns.last().map(|turn| turn.content.as_str()), Some("turn-14"));
    }

    #[tokio::test]
    async fn identity_schemes_never_share_history() {
        let store = store().await;
        let user_key = ConversationKey::user("ana");
        let chat_key = ConversationKey::chat("ana");

        store
            .append_turns(&user_key, "evt-1", &[Turn::new(Role::User, "primary")])
            .await
            .expect("append");
        store
            .append_turns(&chat_key, "evt-1", &[Turn::new(Role::Admin, "business")])
            .await
            .expect("append");

        let user_turns = store.recent_turns(&user_key, 20).await.expect("read");
        let chat_turns = store.recent_turns(&chat_key, 20).await.expect("read");
        assert_eq!(user_turns.len(), 1);
        assert_eq!(chat_turns.len(), 1);
        assert_eq!(user_turns[0].content, "primary");
        assert_eq!(chat_turns[0].content, "business");
    }
}
