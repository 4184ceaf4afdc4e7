//! Database module for PostgreSQL connectivity and conversation persistence
//!
//! Conversations can live in Postgres (alongside the document data) or in a
//! local SQLite file.

pub mod connection;
pub mod conversation_repo;
pub mod sqlite_repo;

pub use connection::{init_pool, ConnectionDescriptor, DbPool, PgTarget, DEFAULT_PORT};
pub use conversation_repo::{CallLogEntry, ConversationRecord, ConversationStore, PgConversationStore};
pub use sqlite_repo::SqliteConversationStore;
