//! Chat sessions
//!
//! A `Session` carries everything one chat needs between turns: the
//! confirmation state, the running conversation and, once saved, the id of
//! its stored record. The registry hands out one lock per session so turns
//! within a session are serialized while separate sessions run concurrently.

use crate::conversation::{Conversation, Message};
use crate::db::conversation_repo::ConversationRecord;
use crate::error::{GatewayError, Result};
use crate::workflow::ConfirmationState;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Outcome of one executed or rejected statement, kept until the next save
/// writes it to the call log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnStats {
    pub query_type: &'static str,
    pub execution_time_ms: i64,
    pub status: &'static str,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub state: ConfirmationState,
    pub conversation: Conversation,
    pub saved_id: Option<i64>,
    pub unlogged: Vec<TurnStats>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ConfirmationState::Idle,
            conversation: Conversation::new(),
            saved_id: None,
            unlogged: Vec::new(),
        }
    }

    /// Resume a stored conversation. Nothing is pending after a load.
    pub fn from_record(record: ConversationRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ConfirmationState::Idle,
            conversation: Conversation {
                title: Some(record.title),
                created_at: record.created_at,
                messages: record.conversation,
            },
            saved_id: Some(record.id),
            unlogged: Vec::new(),
        }
    }

    pub fn record(&mut self, message: Message) {
        self.conversation.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.conversation.messages
    }

    /// Start over: empty history, nothing pending, not yet saved.
    pub fn reset(&mut self) {
        self.state = ConfirmationState::Idle;
        self.conversation = Conversation::new();
        self.saved_id = None;
        self.unlogged.clear();
    }
}

pub type SessionHandle = Arc<Mutex<Session>>;

#[derive(Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, SessionHandle>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&self) -> Result<(Uuid, SessionHandle)> {
        self.insert(Session::new())
    }

    pub fn insert(&self, session: Session) -> Result<(Uuid, SessionHandle)> {
        let id = session.id;
        let handle = Arc::new(Mutex::new(session));
        self.write()?.insert(id, Arc::clone(&handle));
        info!("Session {} opened", id);
        Ok((id, handle))
    }

    pub fn get(&self, id: &Uuid) -> Result<SessionHandle> {
        self.sessions
            .read()
            .map_err(|_| GatewayError::Session("session registry lock poisoned".to_string()))?
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::Session(format!("Unknown session {}", id)))
    }

    pub fn remove(&self, id: &Uuid) -> Result<SessionHandle> {
        let handle = self
            .write()?
            .remove(id)
            .ok_or_else(|| GatewayError::Session(format!("Unknown session {}", id)))?;
        info!("Session {} closed", id);
        Ok(handle)
    }

    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, HashMap<Uuid, SessionHandle>>> {
        self.sessions
            .write()
            .map_err(|_| GatewayError::Session("session registry lock poisoned".to_string()))
    }
}
