//! Presentation host interface: everything the engine shows to people goes through here.
//!
//! The host is the chat platform (or the console). It renders prompts and results, and it
//! may fail in all the usual ways (message deleted, rate limited, channel gone). The engine
//! treats every [`PresentError`] as log-and-continue: balances and sessions are never rolled
//! back because a message could not be delivered.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::outcome::OutcomeKind;
use super::session::SessionId;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PresentError {
    #[error("message is gone: {0}")]
    Gone(String),

    #[error("host unavailable: {0}")]
    Unavailable(String),
}

/// A choice the host should render as buttons (or numbered lines).
#[derive(Debug, Clone, PartialEq)]
pub struct ChoicePrompt {
    pub session: SessionId,
    pub owner: String,
    pub kind: OutcomeKind,
    pub text: String,
    pub options: Vec<String>,
    pub timeout: Duration,
}

/// Final, user-visible result of one trigger. Exactly one per terminal path.
#[derive(Debug, Clone, PartialEq)]
pub struct OutcomeReport {
    pub user: String,
    pub kind: OutcomeKind,
    pub text: String,
    /// Net change to `user`'s balance, 0 when nothing moved.
    pub delta: i64,
    pub balance: Option<i64>,
    /// Optional link (media clips).
    pub attachment: Option<String>,
}

/// Handle to an interim message so it can be retracted later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef(pub String);

#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present_choice(&self, prompt: &ChoicePrompt) -> Result<(), PresentError>;

    /// Release the affordances of a session (disable buttons). Called on resolution and expiry.
    async fn close_choice(&self, session: SessionId) -> Result<(), PresentError>;

    async fn send_result(&self, report: &OutcomeReport) -> Result<(), PresentError>;

    /// Ephemeral notice only `user` sees (rejected clicks and the like).
    async fn send_notice(&self, user: &str, text: &str) -> Result<(), PresentError>;

    async fn send_suspense(&self, user: &str, text: &str) -> Result<MessageRef, PresentError>;

    async fn retract(&self, message: &MessageRef) -> Result<(), PresentError>;
}
