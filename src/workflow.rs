//! Confirmation Workflow
//!
//! Per-session state machine that holds back mutating statements until the
//! user explicitly answers "yes". At most one statement is pending at a time;
//! a new question implicitly cancels whatever was pending.

use crate::safety_guardrails::{classify, StatementClass};
use crate::sanitize::CandidateStatement;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CONFIRMATION_PROMPT: &str =
    "This operation will modify the database. Do you want to proceed? (yes/no)";
pub const CANCELLATION_MESSAGE: &str = "Operation cancelled by the user.";
/// Recorded when a new question arrives while a statement is still pending.
pub const SUPERSEDED_MESSAGE: &str = "Pending operation cancelled: a new question was asked before it was confirmed.";

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfirmationState {
    #[default]
    Idle,
    AwaitingConfirmation(CandidateStatement),
}

/// What the caller must do after feeding the machine an input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowAction {
    /// Run this exact statement now.
    Execute(CandidateStatement),
    /// Show the confirmation prompt; the statement is now pending.
    AwaitConfirmation(CandidateStatement),
    /// The pending statement was discarded without running.
    Cancelled(CandidateStatement),
    /// The statement is not allow-listed and must not run.
    Rejected(CandidateStatement),
    /// An answer arrived while nothing was pending.
    NothingPending,
}

pub fn is_affirmative(answer: &str) -> bool {
    answer.trim().eq_ignore_ascii_case("yes")
}

impl ConfirmationState {
    pub fn is_awaiting(&self) -> bool {
        matches!(self, ConfirmationState::AwaitingConfirmation(_))
    }

    pub fn pending(&self) -> Option<&CandidateStatement> {
        match self {
            ConfirmationState::AwaitingConfirmation(stmt) => Some(stmt),
            ConfirmationState::Idle => None,
        }
    }

    /// Drop any pending statement and return to `Idle`.
    pub fn cancel_pending(&mut self) -> Option<CandidateStatement> {
        match std::mem::take(self) {
            ConfirmationState::AwaitingConfirmation(stmt) => {
                info!("Pending statement cancelled");
                Some(stmt)
            }
            ConfirmationState::Idle => None,
        }
    }

    /// Feed a freshly generated statement. Any statement still pending is
    /// superseded and discarded first.
    pub fn on_statement(&mut self, stmt: CandidateStatement) -> WorkflowAction {
        if let Some(stale) = self.cancel_pending() {
            warn!("Superseding pending statement: {}", stale);
        }

        match classify(&stmt) {
            StatementClass::Readonly => WorkflowAction::Execute(stmt),
            StatementClass::Mutating => {
                *self = ConfirmationState::AwaitingConfirmation(stmt.clone());
                WorkflowAction::AwaitConfirmation(stmt)
            }
            StatementClass::Rejected => WorkflowAction::Rejected(stmt),
        }
    }

    /// Feed the user's answer to a pending confirmation. Always ends `Idle`.
    pub fn on_answer(&mut self, answer: &str) -> WorkflowAction {
        match self.cancel_pending() {
            Some(stmt) if is_affirmative(answer) => {
                info!("Mutating statement confirmed");
                WorkflowAction::Execute(stmt)
            }
            Some(stmt) => WorkflowAction::Cancelled(stmt),
            None => WorkflowAction::NothingPending,
        }
    }
}
