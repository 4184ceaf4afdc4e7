pub mod config;
pub mod conversation;
pub mod db;
pub mod error;
pub mod execution;
pub mod gateway;
pub mod llm;
pub mod prompt;
pub mod safety_guardrails;
pub mod sanitize;
pub mod schema;
pub mod session;
pub mod workflow;

pub use config::{DatabaseConfig, GatewayConfig};
pub use conversation::{Conversation, Message, Role};
pub use db::{CallLogEntry, ConversationRecord, ConversationStore, PgConversationStore, SqliteConversationStore};
pub use error::{GatewayError, Result};
pub use execution::{ExecutionResult, PostgresEngine, QueryExecutor, SqlEngine, SqliteEngine, TabularResult};
pub use gateway::{Gateway, TurnOutcome};
pub use llm::{CompletionClient, OpenAiClient};
pub use prompt::PromptBuilder;
pub use safety_guardrails::StatementClass;
pub use sanitize::CandidateStatement;
pub use session::{Session, SessionRegistry};
pub use workflow::ConfirmationState;
