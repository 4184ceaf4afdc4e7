//! SQLite-backed conversation store for local runs

use crate::conversation::{resolve_title, Message};
use crate::db::conversation_repo::{
    decode_messages, encode_messages, persistence_error, CallLogEntry, ConversationRecord,
    ConversationStore,
};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

pub struct SqliteConversationStore {
    path: PathBuf,
    db: Arc<Mutex<Connection>>,
}

impl SqliteConversationStore {
    /// Open (or create) the store and make sure its tables exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let db = Connection::open(&path).map_err(|e| persistence_error("Failed to open database", e))?;

        let store = Self {
            path,
            db: Arc::new(Mutex::new(db)),
        };
        store.ensure_schema()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ensure_schema(&self) -> Result<()> {
        let db = self.lock()?;
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS conversations (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT,
                conversation TEXT,
                created_at TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS chat_call_info (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id INTEGER,
                prompt_tokens INTEGER NOT NULL DEFAULT 0,
                completion_tokens INTEGER NOT NULL DEFAULT 0,
                total_tokens INTEGER NOT NULL DEFAULT 0,
                model_version TEXT,
                query_type TEXT,
                execution_time INTEGER,
                status TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| persistence_error("Failed to create tables", e))
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.db
            .lock()
            .map_err(|_| persistence_error("Conversation database", "lock poisoned"))
    }

    /// Run `job` against the connection on the blocking pool.
    async fn with_db<T, F>(&self, job: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let conn = db
                .lock()
                .map_err(|_| persistence_error("Conversation database", "lock poisoned"))?;
            job(&conn)
        })
        .await
        .map_err(|e| persistence_error("Conversation task failed", e))?
    }
}

fn parse_created_at(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn record_from_parts(
    id: i64,
    title: Option<String>,
    payload: Option<String>,
    created_at: String,
) -> Result<ConversationRecord> {
    Ok(ConversationRecord {
        id,
        title: title.unwrap_or_default(),
        conversation: decode_messages(id, payload.as_deref().unwrap_or("[]"))?,
        created_at: parse_created_at(&created_at),
    })
}

type RawRecord = (i64, Option<String>, Option<String>, String);

fn raw_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawRecord> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn save(&self, title: Option<&str>, messages: &[Message]) -> Result<i64> {
        let title = resolve_title(title);
        let payload = encode_messages(messages)?;

        let id = self
            .with_db(move |db| {
                db.execute(
                    "INSERT INTO conversations (title, conversation, created_at) VALUES (?1, ?2, ?3)",
                    params![title, payload, Utc::now().to_rfc3339()],
                )
                .map_err(|e| persistence_error("Error saving conversation", e))?;
                Ok(db.last_insert_rowid())
            })
            .await?;

        info!("Saved conversation {}", id);
        Ok(id)
    }

    async fn update(&self, id: i64, title: Option<&str>, messages: &[Message]) -> Result<()> {
        let title = resolve_title(title);
        let payload = encode_messages(messages)?;

        self.with_db(move |db| {
            let changed = db
                .execute(
                    "UPDATE conversations SET title = ?1, conversation = ?2 WHERE id = ?3",
                    params![title, payload, id],
                )
                .map_err(|e| persistence_error("Error updating conversation", e))?;
            if changed == 0 {
                return Err(persistence_error("Error updating conversation", format!("conversation {} not found", id)));
            }
            Ok(())
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Option<ConversationRecord>> {
        let raw = self
            .with_db(move |db| {
                db.query_row(
                    "SELECT id, title, conversation, created_at FROM conversations WHERE id = ?1",
                    params![id],
                    raw_record,
                )
                .optional()
                .map_err(|e| persistence_error("Error getting conversation", e))
            })
            .await?;

        raw.map(|(id, title, payload, created_at)| record_from_parts(id, title, payload, created_at))
            .transpose()
    }

    async fn list(&self) -> Result<Vec<ConversationRecord>> {
        let raws = self
            .with_db(|db| {
                let mut stmt = db
                    .prepare("SELECT id, title, conversation, created_at FROM conversations ORDER BY created_at DESC, id DESC")
                    .map_err(|e| persistence_error("Error listing conversations", e))?;
                let rows = stmt
                    .query_map([], raw_record)
                    .map_err(|e| persistence_error("Error listing conversations", e))?;
                let raws = rows
                    .collect::<rusqlite::Result<Vec<RawRecord>>>()
                    .map_err(|e| persistence_error("Error listing conversations", e))?;
                Ok(raws)
            })
            .await?;

        let mut records = Vec::with_capacity(raws.len());
        for (id, title, payload, created_at) in raws {
            match record_from_parts(id, title, payload, created_at) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping conversation: {}", e),
            }
        }
        Ok(records)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.with_db(move |db| {
            db.execute("DELETE FROM conversations WHERE id = ?1", params![id])
                .map(|changed| changed > 0)
                .map_err(|e| persistence_error("Error deleting conversation", e))
        })
        .await
    }

    async fn log_call(&self, entry: &CallLogEntry) -> Result<()> {
        let entry = entry.clone();
        self.with_db(move |db| {
            db.execute(
                r#"
                INSERT INTO chat_call_info
                    (conversation_id, model_version, query_type, execution_time, status, error_message, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    entry.conversation_id,
                    entry.model_version,
                    entry.query_type,
                    entry.execution_time_ms,
                    entry.status,
                    entry.error_message,
                    Utc::now().to_rfc3339(),
                ],
            )
            .map_err(|e| persistence_error("Error logging chat call", e))?;
            Ok(())
        })
        .await
    }
}
