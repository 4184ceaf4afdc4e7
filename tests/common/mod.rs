//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use docsql_gateway::conversation::Message;
use docsql_gateway::db::{CallLogEntry, ConversationRecord};
use docsql_gateway::error::{GatewayError, Result};
use docsql_gateway::execution::{SqlEngine, TabularResult};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Completion client that replays canned replies in order and remembers
/// every prompt it was given.
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(|r| Ok(r.to_string())).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        let mut replies = VecDeque::new();
        replies.push_back(Err(GatewayError::Generation(message.to_string())));
        Self {
            replies: Mutex::new(replies),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl docsql_gateway::llm::CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(GatewayError::Generation("script exhausted".to_string())))
    }

    fn model(&self) -> &str {
        "scripted-model"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCall {
    Fetch(String),
    Apply(String),
}

/// Engine that records what it was asked to run.
#[derive(Default)]
pub struct RecordingEngine {
    calls: Mutex<Vec<EngineCall>>,
    fail_with: Option<String>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(message: &str) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            fail_with: Some(message.to_string()),
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SqlEngine for RecordingEngine {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn fetch(&self, sql: &str) -> Result<TabularResult> {
        self.calls.lock().unwrap().push(EngineCall::Fetch(sql.to_string()));
        if let Some(message) = &self.fail_with {
            return Err(GatewayError::Execution(message.clone()));
        }
        Ok(TabularResult::new(
            vec!["entity_name".to_string(), "value".to_string()],
            vec![vec![json!("Company XYZ"), json!("1040")]],
        ))
    }

    async fn apply(&self, sql: &str) -> Result<u64> {
        self.calls.lock().unwrap().push(EngineCall::Apply(sql.to_string()));
        if let Some(message) = &self.fail_with {
            return Err(GatewayError::Execution(message.clone()));
        }
        Ok(1)
    }
}

/// Conversation store whose first `fail_times` call-log inserts fail.
pub struct FlakyLogStore {
    inner: docsql_gateway::db::SqliteConversationStore,
    fail_times: Mutex<usize>,
}

impl FlakyLogStore {
    pub fn new(inner: docsql_gateway::db::SqliteConversationStore, fail_times: usize) -> Self {
        Self {
            inner,
            fail_times: Mutex::new(fail_times),
        }
    }
}

#[async_trait]
impl docsql_gateway::db::ConversationStore for FlakyLogStore {
    async fn save(&self, title: Option<&str>, messages: &[Message]) -> Result<i64> {
        self.inner.save(title, messages).await
    }

    async fn update(&self, id: i64, title: Option<&str>, messages: &[Message]) -> Result<()> {
        self.inner.update(id, title, messages).await
    }

    async fn get(&self, id: i64) -> Result<Option<ConversationRecord>> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<ConversationRecord>> {
        self.inner.list().await
    }

    async fn delete(&self, id: i64) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn log_call(&self, entry: &CallLogEntry) -> Result<()> {
        {
            let mut remaining = self.fail_times.lock().unwrap();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(GatewayError::Persistence("call log unavailable".to_string()));
            }
        }
        self.inner.log_call(entry).await
    }
}
