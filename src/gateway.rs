//! NL→SQL gateway - one chat turn from question to result
//!
//! question → prompt → completion → sanitize → safety gate → workflow →
//! executor. Every step is recorded in the session's conversation so a
//! saved chat reads the same as it did on screen.

use crate::conversation::{resolve_title, Message};
use crate::db::conversation_repo::{CallLogEntry, ConversationStore};
use crate::error::{GatewayError, Result};
use crate::execution::{ExecutionResult, QueryExecutor};
use crate::llm::CompletionClient;
use crate::prompt::PromptBuilder;
use crate::safety_guardrails::{classify, enforce, StatementClass};
use crate::sanitize::CandidateStatement;
use crate::session::{Session, TurnStats};
use crate::workflow::{WorkflowAction, CANCELLATION_MESSAGE, CONFIRMATION_PROMPT, SUPERSEDED_MESSAGE};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Executed {
        statement: CandidateStatement,
        class: StatementClass,
        result: ExecutionResult,
    },
    ConfirmationRequired {
        statement: CandidateStatement,
        prompt: &'static str,
    },
    Cancelled {
        statement: CandidateStatement,
    },
    NothingPending,
}

pub struct Gateway {
    prompts: PromptBuilder,
    client: Arc<dyn CompletionClient>,
    executor: QueryExecutor,
    store: Option<Arc<dyn ConversationStore>>,
}

impl Gateway {
    pub fn new(client: Arc<dyn CompletionClient>, executor: QueryExecutor) -> Self {
        Self {
            prompts: PromptBuilder::default(),
            client,
            executor,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_prompt_builder(mut self, prompts: PromptBuilder) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn prompt_builder(&self) -> &PromptBuilder {
        &self.prompts
    }

    /// The configured conversation store, or a `Config` error when the
    /// gateway was built without one.
    pub fn store(&self) -> Result<&Arc<dyn ConversationStore>> {
        self.store
            .as_ref()
            .ok_or_else(|| GatewayError::Config("No conversation store configured".to_string()))
    }

    /// Question to gated statement, with no side effects on any session.
    pub async fn generate(&self, question: &str) -> Result<CandidateStatement> {
        let prompt = self.prompts.build(question);
        debug!("Built prompt ({} chars)", prompt.len());

        let raw = self.client.complete(&prompt).await?;
        let stmt = CandidateStatement::from_completion(&raw)?;
        debug!("Candidate statement: {}", stmt);

        enforce(stmt)
    }

    /// Handle a new question. Anything still awaiting confirmation is
    /// cancelled first.
    pub async fn ask(&self, session: &mut Session, question: &str) -> Result<TurnOutcome> {
        session.record(Message::user(question));

        if let Some(stale) = session.state.cancel_pending() {
            info!("Session {}: new question supersedes pending statement", session.id);
            debug!("Superseded: {}", stale);
            session.record(Message::assistant(SUPERSEDED_MESSAGE));
        }

        let stmt = match self.generate(question).await {
            Ok(stmt) => stmt,
            Err(e) => {
                warn!("Session {}: {}", session.id, e);
                if let GatewayError::UnsafeStatement(message) = &e {
                    session.unlogged.push(TurnStats {
                        query_type: StatementClass::Rejected.query_type(),
                        execution_time_ms: 0,
                        status: "rejected",
                        error_message: Some(message.clone()),
                    });
                }
                session.record(Message::assistant(format!("Error generating SQL query: {}", e)));
                return Err(e);
            }
        };

        session.record(Message::assistant(format!("SQL Query: `{}`", stmt)));

        match session.state.on_statement(stmt) {
            WorkflowAction::Execute(stmt) => Ok(self.run(session, stmt).await),
            WorkflowAction::AwaitConfirmation(stmt) => {
                info!("Session {}: mutating statement awaiting confirmation", session.id);
                session.record(Message::assistant(CONFIRMATION_PROMPT));
                Ok(TurnOutcome::ConfirmationRequired {
                    statement: stmt,
                    prompt: CONFIRMATION_PROMPT,
                })
            }
            WorkflowAction::Rejected(stmt) => Err(GatewayError::UnsafeStatement(format!(
                "statement is not allow-listed: {}",
                stmt
            ))),
            WorkflowAction::Cancelled(_) | WorkflowAction::NothingPending => Ok(TurnOutcome::NothingPending),
        }
    }

    /// Answer a pending confirmation. Only an exact "yes" (any case, trimmed)
    /// runs the statement.
    pub async fn confirm(&self, session: &mut Session, answer: &str) -> Result<TurnOutcome> {
        if !session.state.is_awaiting() {
            return Ok(TurnOutcome::NothingPending);
        }

        session.record(Message::user(answer));
        match session.state.on_answer(answer) {
            WorkflowAction::Execute(stmt) => Ok(self.run(session, stmt).await),
            WorkflowAction::Cancelled(stmt) => {
                info!("Session {}: mutating statement cancelled", session.id);
                session.record(Message::assistant(CANCELLATION_MESSAGE));
                Ok(TurnOutcome::Cancelled { statement: stmt })
            }
            _ => Ok(TurnOutcome::NothingPending),
        }
    }

    /// Single-input surface: an answer while something is pending, a new
    /// question otherwise. Any pending input that is not "yes" cancels; to
    /// replace a pending statement with a new question, call `ask`.
    pub async fn respond(&self, session: &mut Session, input: &str) -> Result<TurnOutcome> {
        if session.state.is_awaiting() {
            self.confirm(session, input).await
        } else {
            self.ask(session, input).await
        }
    }

    async fn run(&self, session: &mut Session, stmt: CandidateStatement) -> TurnOutcome {
        let class = classify(&stmt);
        let start = Instant::now();
        let result = self.executor.execute(&stmt).await;
        let elapsed = start.elapsed().as_millis() as i64;

        session.unlogged.push(TurnStats {
            query_type: class.query_type(),
            execution_time_ms: elapsed,
            status: if result.is_error() { "error" } else { "success" },
            error_message: result.error_message().map(str::to_string),
        });
        session.record(Message::assistant(result.to_chat_message()));

        TurnOutcome::Executed {
            statement: stmt,
            class,
            result,
        }
    }

    /// Persist the session's conversation, updating the stored record when
    /// it was saved before, then flush its call log.
    pub async fn save(&self, session: &mut Session, title: Option<&str>) -> Result<i64> {
        let store = self.store()?;
        // Resolve once so later updates keep the same timestamped title.
        let title = resolve_title(title.or(session.conversation.title.as_deref()));
        session.conversation.title = Some(title.clone());

        let id = match session.saved_id {
            Some(id) => {
                store.update(id, Some(&title), session.messages()).await?;
                id
            }
            None => {
                let id = store.save(Some(&title), session.messages()).await?;
                session.saved_id = Some(id);
                id
            }
        };

        // An entry leaves the session only once it is stored.
        while let Some(stats) = session.unlogged.first() {
            store
                .log_call(&CallLogEntry {
                    conversation_id: id,
                    model_version: self.client.model().to_string(),
                    query_type: stats.query_type.to_string(),
                    execution_time_ms: stats.execution_time_ms,
                    status: stats.status.to_string(),
                    error_message: stats.error_message.clone(),
                })
                .await?;
            session.unlogged.remove(0);
        }

        info!("Session {} saved as conversation {}", session.id, id);
        Ok(id)
    }

    /// Open a stored conversation as a fresh session.
    pub async fn load(&self, id: i64) -> Result<Session> {
        let record = self
            .store()?
            .get(id)
            .await?
            .ok_or_else(|| GatewayError::Persistence(format!("Conversation {} not found", id)))?;
        Ok(Session::from_record(record))
    }
}
