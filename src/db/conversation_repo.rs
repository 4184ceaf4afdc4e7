//! Conversation repository - persisted chat histories and call logs

use crate::conversation::{resolve_title, Message};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use tracing::{info, warn};

/// A saved conversation as stored in the `conversations` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationRecord {
    pub id: i64,
    pub title: String,
    pub conversation: Vec<Message>,
    pub created_at: DateTime<Utc>,
}

/// One row of the `chat_call_info` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallLogEntry {
    pub conversation_id: i64,
    pub model_version: String,
    /// `READ`, `WRITE` or `REJECTED`
    pub query_type: String,
    pub execution_time_ms: i64,
    pub status: String,
    pub error_message: Option<String>,
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Persist a new conversation and return its id.
    async fn save(&self, title: Option<&str>, messages: &[Message]) -> Result<i64>;

    /// Overwrite title and messages of an existing conversation.
    async fn update(&self, id: i64, title: Option<&str>, messages: &[Message]) -> Result<()>;

    async fn get(&self, id: i64) -> Result<Option<ConversationRecord>>;

    /// All conversations, newest first. Rows whose payload cannot be parsed
    /// are skipped.
    async fn list(&self) -> Result<Vec<ConversationRecord>>;

    /// Returns false when no conversation had that id.
    async fn delete(&self, id: i64) -> Result<bool>;

    async fn log_call(&self, entry: &CallLogEntry) -> Result<()>;
}

pub(crate) fn persistence_error(context: &str, err: impl std::fmt::Display) -> GatewayError {
    GatewayError::Persistence(format!("{}: {}", context, err))
}

pub(crate) fn encode_messages(messages: &[Message]) -> Result<String> {
    serde_json::to_string(messages).map_err(|e| persistence_error("Failed to serialize conversation", e))
}

pub(crate) fn decode_messages(id: i64, payload: &str) -> Result<Vec<Message>> {
    serde_json::from_str(payload)
        .map_err(|e| persistence_error(&format!("Failed to parse conversation {}", id), e))
}

/// PostgreSQL-backed conversation store
pub struct PgConversationStore {
    pool: PgPool,
}

impl PgConversationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn record_from_row(row: &sqlx::postgres::PgRow) -> Result<ConversationRecord> {
        let id: i64 = row.try_get("id").map_err(|e| persistence_error("Bad conversation row", e))?;
        let title: Option<String> = row
            .try_get("title")
            .map_err(|e| persistence_error("Bad conversation row", e))?;
        let payload: Option<String> = row
            .try_get("conversation")
            .map_err(|e| persistence_error("Bad conversation row", e))?;
        let created_at: Option<NaiveDateTime> = row
            .try_get("created_at")
            .map_err(|e| persistence_error("Bad conversation row", e))?;

        Ok(ConversationRecord {
            id,
            title: title.unwrap_or_default(),
            conversation: decode_messages(id, payload.as_deref().unwrap_or("[]"))?,
            created_at: created_at
                .map(|naive| Utc.from_utc_datetime(&naive))
                .unwrap_or_else(Utc::now),
        })
    }
}

const SELECT_CONVERSATION: &str =
    "SELECT id::BIGINT AS id, title, conversation::TEXT AS conversation, created_at::TIMESTAMP AS created_at FROM conversations";

#[async_trait]
impl ConversationStore for PgConversationStore {
    async fn save(&self, title: Option<&str>, messages: &[Message]) -> Result<i64> {
        let title = resolve_title(title);
        let payload = encode_messages(messages)?;

        let row = sqlx::query(
            "INSERT INTO conversations (title, conversation) VALUES ($1, $2) RETURNING id::BIGINT AS id",
        )
        .bind(&title)
        .bind(&payload)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| persistence_error("Error saving conversation", e))?;

        let id: i64 = row.try_get("id").map_err(|e| persistence_error("Error saving conversation", e))?;
        info!("Saved conversation {} ({:?})", id, title);
        Ok(id)
    }

    async fn update(&self, id: i64, title: Option<&str>, messages: &[Message]) -> Result<()> {
        let title = resolve_title(title);
        let payload = encode_messages(messages)?;

        let done = sqlx::query("UPDATE conversations SET title = $1, conversation = $2 WHERE id = $3")
            .bind(&title)
            .bind(&payload)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence_error("Error updating conversation", e))?;

        if done.rows_affected() == 0 {
            return Err(GatewayError::Persistence(format!("Conversation {} not found", id)));
        }
        info!("Updated conversation {}", id);
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<ConversationRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = $1", SELECT_CONVERSATION))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| persistence_error("Error getting conversation", e))?;

        row.as_ref().map(Self::record_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<ConversationRecord>> {
        let rows = sqlx::query(&format!("{} ORDER BY created_at DESC", SELECT_CONVERSATION))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| persistence_error("Error listing conversations", e))?;

        let mut records = Vec::with_capacity(rows.len());
        for row in &rows {
            match Self::record_from_row(row) {
                Ok(record) => records.push(record),
                Err(e) => warn!("Skipping conversation: {}", e),
            }
        }
        Ok(records)
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        let done = sqlx::query("DELETE FROM conversations WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| persistence_error("Error deleting conversation", e))?;
        Ok(done.rows_affected() > 0)
    }

    async fn log_call(&self, entry: &CallLogEntry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO chat_call_info
                (conversation_id, prompt_tokens, completion_tokens, total_tokens,
                 model_version, query_type, execution_time, status, error_message)
            VALUES ($1, 0, 0, 0, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.conversation_id)
        .bind(&entry.model_version)
        .bind(&entry.query_type)
        .bind(entry.execution_time_ms)
        .bind(&entry.status)
        .bind(&entry.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| persistence_error("Error logging chat call", e))?;
        Ok(())
    }
}
