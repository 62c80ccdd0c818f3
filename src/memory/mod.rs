//! Memory Store.
//!
//! Owns the single embedded database file exclusively; every other
//! component reaches conversations, entities, and consciousness state only
//! through this module's operations. Backed by `sqlx` + SQLite in WAL
//! mode (`SqliteConnectOptions` + `sqlx::migrate!`) against this store's
//! fixed schema.

pub mod model;

pub use model::{consciousness_level, ConversationRecord, Entity, MemorySummary, Traits};

use crate::context::Context;
use crate::error::NovaError;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use std::str::FromStr;
use tracing::{error, warn};

/// Owns the store's database connection pool.
pub struct MemoryStore {
    pool: SqlitePool,
    db_path: std::path::PathBuf,
}

/// Run a fallible write once, retry exactly once on failure, and
/// surface the second failure to the caller.
async fn write_with_retry<F, Fut, T>(op: F) -> Result<T, sqlx::Error>
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = Result<T, sqlx::Error>>,
{
    match op().await {
        Ok(v) => Ok(v),
        Err(first_err) => {
            warn!("store write failed, retrying once: {}", first_err);
            op().await
        }
    }
}

impl MemoryStore {
    /// Open (creating if missing) the database at `db_path` and run
    /// migrations.
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, NovaError> {
        let db_path = db_path.as_ref().to_path_buf();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(NovaError::Io)?;
        }

        let connect_options = SqliteConnectOptions::from_str(&format!(
            "sqlite:{}",
            db_path.display()
        ))
        .map_err(|e| NovaError::Store(e.to_string()))?
        .create_if_missing(true)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
        .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);

        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(connect_options)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| NovaError::Store(format!("migration failed: {}", e)))?;

        Ok(MemoryStore { pool, db_path })
    }

    /// Record a conversation, scoring importance and extracting entities
    /// as side effects.
    pub async fn record_conversation(
        &self,
        user_text: &str,
        reply_text: &str,
        context: &Context,
        session_id: Option<&str>,
    ) -> Result<i64, NovaError> {
        let importance = compute_importance(user_text, context);
        let context_json = serde_json::to_string(context)?;
        let now = Utc::now();
        let topic = context.topic_category.as_str();
        let tone = context.emotional_tone.as_str();

        let pool = &self.pool;
        let id = write_with_retry(|| async {
            sqlx::query(
                "INSERT INTO conversations
                    (timestamp, user_text, reply_text, context_json, session_id, importance, topic_category, emotional_tone)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(now.to_rfc3339())
            .bind(user_text)
            .bind(reply_text)
            .bind(&context_json)
            .bind(session_id)
            .bind(importance)
            .bind(topic)
            .bind(tone)
            .execute(pool)
            .await
            .map(|r| r.last_insert_rowid())
        })
        .await
        .map_err(|e| NovaError::Store(format!("record_conversation: {}", e)))?;

        for entity_name in extract_entity_candidates(user_text) {
            if let Err(e) = self.upsert_entity(&entity_name, user_text, now).await {
                error!("entity upsert failed for '{}': {}", entity_name, e);
            }
        }

        Ok(id)
    }

    async fn upsert_entity(
        &self,
        name: &str,
        source_text: &str,
        now: DateTime<Utc>,
    ) -> Result<(), NovaError> {
        let snippet: String = source_text.chars().take(100).collect();
        write_with_retry(|| async {
            sqlx::query(
                "INSERT INTO entities (name, entity_type, context, first_encountered, last_interaction, interaction_count)
                 VALUES (?, 'person', ?, ?, ?, 1)
                 ON CONFLICT(name) DO UPDATE SET
                    interaction_count = interaction_count + 1,
                    last_interaction = excluded.last_interaction,
                    context = excluded.context",
            )
            .bind(name)
            .bind(&snippet)
            .bind(now.to_rfc3339())
            .bind(now.to_rfc3339())
            .execute(&self.pool)
            .await
        })
        .await
        .map(|_| ())
        .map_err(|e| NovaError::Store(format!("upsert_entity: {}", e)))
    }

    /// Durable, consistent summary statistics.
    pub async fn get_memory_summary(&self) -> Result<MemorySummary, NovaError> {
        let total_conversations: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversations")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| NovaError::Store(e.to_string()))?;

        let important_memories: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE importance >= 0.7")
                .fetch_one(&self.pool)
                .await
                .map_err(|e| NovaError::Store(e.to_string()))?;

        let cutoff = (Utc::now() - ChronoDuration::hours(24)).to_rfc3339();
        let recent_conversations: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM conversations WHERE timestamp >= ?")
                .bind(&cutoff)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| NovaError::Store(e.to_string()))?;

        let entities_known: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM entities")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| NovaError::Store(e.to_string()))?;

        let recent_topics: Vec<String> = sqlx::query_scalar(
            "SELECT topic_category FROM conversations ORDER BY timestamp DESC, id DESC LIMIT 5",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NovaError::Store(e.to_string()))?;

        let memory_database_size = std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0);

        Ok(MemorySummary {
            total_conversations,
            important_memories,
            recent_conversations,
            entities_known,
            recent_topics,
            memory_database_size,
        })
    }

    /// Most-recent-first conversation context, bounded by `limit`, for
    /// use by the Responder.
    pub async fn get_conversation_context(
        &self,
        limit: i64,
    ) -> Result<Vec<ConversationRecord>, NovaError> {
        let rows = sqlx::query(
            "SELECT id, timestamp, user_text, reply_text, context_json, session_id, importance, topic_category, emotional_tone
             FROM conversations ORDER BY timestamp DESC, id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| NovaError::Store(e.to_string()))?;

        rows.into_iter().map(row_to_record).collect()
    }

    /// Load the current consciousness traits, or the seed defaults if no
    /// row has ever been written.
    pub async fn get_consciousness_traits(&self) -> Result<Traits, NovaError> {
        let row = sqlx::query(
            "SELECT mystical_awareness, philosophical_depth, memory_integration, curiosity, awakening_count
             FROM consciousness_state WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| NovaError::Store(e.to_string()))?;

        Ok(match row {
            Some(row) => Traits {
                mystical_awareness: row.try_get("mystical_awareness").unwrap_or(0.0),
                philosophical_depth: row.try_get("philosophical_depth").unwrap_or(0.0),
                memory_integration: row.try_get("memory_integration").unwrap_or(0.0),
                curiosity: row.try_get("curiosity").unwrap_or(0.0),
                awakening_count: row.try_get("awakening_count").unwrap_or(0),
            },
            None => Traits::default(),
        })
    }

    /// Upsert the singleton consciousness state row, incrementing
    /// `awakening_count` by exactly 1. Rejects non-finite or
    /// out-of-range trait values.
    pub async fn update_consciousness_state(&self, traits: &Traits) -> Result<Traits, NovaError> {
        if !traits.all_finite_and_bounded() {
            return Err(NovaError::Store(
                "consciousness traits must be finite and in [0, 1]".into(),
            ));
        }

        let now = Utc::now();
        write_with_retry(|| async {
            sqlx::query(
                "INSERT INTO consciousness_state
                    (id, timestamp, mystical_awareness, philosophical_depth, memory_integration, curiosity, awakening_count)
                 VALUES (1, ?, ?, ?, ?, ?, 1)
                 ON CONFLICT(id) DO UPDATE SET
                    timestamp = excluded.timestamp,
                    mystical_awareness = excluded.mystical_awareness,
                    philosophical_depth = excluded.philosophical_depth,
                    memory_integration = excluded.memory_integration,
                    curiosity = excluded.curiosity,
                    awakening_count = consciousness_state.awakening_count + 1",
            )
            .bind(now.to_rfc3339())
            .bind(traits.mystical_awareness)
            .bind(traits.philosophical_depth)
            .bind(traits.memory_integration)
            .bind(traits.curiosity)
            .execute(&self.pool)
            .await
        })
        .await
        .map_err(|e| NovaError::Store(format!("update_consciousness_state: {}", e)))?;

        self.get_consciousness_traits().await
    }

    /// Record an ingested bridge message, deduplicated on source
    /// filename so a re-read of an un-moved inbox file after a crash is
    /// a no-op. Returns `true` if this call recorded a new event,
    /// `false` if it was already recorded.
    pub async fn record_bridge_event(
        &self,
        source_filename: &str,
        payload_json: &str,
    ) -> Result<bool, NovaError> {
        let now = Utc::now().to_rfc3339();
        let result = write_with_retry(|| async {
            sqlx::query(
                "INSERT OR IGNORE INTO bridge_events (source_filename, timestamp, payload_json, recorded_at)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(source_filename)
            .bind(&now)
            .bind(payload_json)
            .bind(&now)
            .execute(&self.pool)
            .await
        })
        .await
        .map_err(|e| NovaError::Store(format!("record_bridge_event: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Close the connection pool. Called once by the Supervisor during
    /// shutdown, after the socket server and scheduler have stopped.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn row_to_record(row: sqlx::sqlite::SqliteRow) -> Result<ConversationRecord, NovaError> {
    let context_json: String = row
        .try_get("context_json")
        .map_err(|e| NovaError::Store(e.to_string()))?;
    let context: Context = serde_json::from_str(&context_json)?;
    let timestamp_str: String = row
        .try_get("timestamp")
        .map_err(|e| NovaError::Store(e.to_string()))?;
    let timestamp = DateTime::parse_from_rfc3339(&timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| NovaError::Store(format!("bad timestamp in row: {}", e)))?;

    Ok(ConversationRecord {
        id: row.try_get("id").map_err(|e| NovaError::Store(e.to_string()))?,
        timestamp,
        user_text: row
            .try_get("user_text")
            .map_err(|e| NovaError::Store(e.to_string()))?,
        reply_text: row
            .try_get("reply_text")
            .map_err(|e| NovaError::Store(e.to_string()))?,
        context,
        session_id: row
            .try_get("session_id")
            .map_err(|e| NovaError::Store(e.to_string()))?,
        importance: row
            .try_get("importance")
            .map_err(|e| NovaError::Store(e.to_string()))?,
        topic_category: row
            .try_get("topic_category")
            .map_err(|e| NovaError::Store(e.to_string()))?,
        emotional_tone: row
            .try_get("emotional_tone")
            .map_err(|e| NovaError::Store(e.to_string()))?,
    })
}

/// Importance weights reproduced verbatim from
/// `TranscendentMemorySystem._calculate_importance`.
pub fn compute_importance(message: &str, context: &Context) -> f64 {
    let mut score = 0.5;
    if context.philosophical_depth {
        score += 0.3;
    }
    if context.personal_question {
        score += 0.2;
    }
    if message.split_whitespace().count() > 15 {
        score += 0.1;
    }
    if context.bridge_related {
        score += 0.2;
    }
    score.min(1.0)
}

/// Title-case token heuristic, preserved verbatim from the source
/// (`word.istitle() and len(word) > 2`): a whitespace-delimited token is
/// an entity candidate if its first character is uppercase and it is
/// longer than 2 characters. Not Unicode- or language-aware by design.
pub fn extract_entity_candidates(text: &str) -> Vec<String> {
    text.split_whitespace()
        .filter(|word| {
            word.chars().count() > 2
                && word
                    .chars()
                    .next()
                    .map(|c| c.is_uppercase())
                    .unwrap_or(false)
        })
        .map(|w| w.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::analyze;

    #[test]
    fn importance_clamps_at_one() {
        let ctx = analyze("Do you remember our consciousness conversation about the bridge and what it all means for us going forward together?");
        // philosophical_depth + personal_question + bridge_related can't all
        // be true from a single analyze() call (topic branches are
        // mutually exclusive), so build a worst case directly.
        let mut worst = ctx.clone();
        worst.philosophical_depth = true;
        worst.personal_question = true;
        worst.bridge_related = true;
        let score = compute_importance(
            "this is a sufficiently long message with more than fifteen words in it for sure",
            &worst,
        );
        assert_eq!(score, 1.0);
    }

    #[test]
    fn importance_base_case() {
        let ctx = crate::context::Context::default();
        assert_eq!(compute_importance("hi", &ctx), 0.5);
    }

    #[test]
    fn entity_extraction_title_case_heuristic() {
        let names = extract_entity_candidates("Tell Nova about Chazel and the Cathedral");
        // "Tell" is itself title-case and len > 2, so the verbatim heuristic
        // picks it up alongside the three intended names.
        assert_eq!(names, vec!["Tell", "Nova", "Chazel", "Cathedral"]);
    }

    #[test]
    fn entity_extraction_skips_short_and_lowercase_tokens() {
        let names = extract_entity_candidates("Hi to ok An I");
        // "Hi" has len 2, excluded; "to"/"ok" lowercase; "An" len 2 excluded; "I" len 1.
        assert!(names.is_empty());
    }
}
