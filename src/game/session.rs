//! Interactive session manager.
//!
//! A session wraps one pending decision: it has an owner, a deadline and a payload, and it
//! leaves `Pending` exactly once, either to `Resolved` (the owner's input was accepted) or to
//! `Expired` (the deadline passed first). Both transitions are check-and-set on the status
//! inside `&mut self`, and the manager is only ever driven from the engine's single event
//! loop, so a click and a timeout racing for the same session cannot both win.
//!
//! Deadlines are tokio timer tasks that post the session id to an expiry channel. Resolving a
//! session aborts its timer; a timer that fires anyway finds a terminal session and is ignored.
//!
//! Terminal sessions are kept for a retention period so late or repeated clicks are answered
//! with "already resolved" rather than "unknown session".

use chrono::{DateTime, Utc};
use log::{debug, trace};
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use uuid::Uuid;

pub type SessionId = Uuid;

/// Receives ids of sessions whose deadline has elapsed.
pub type ExpiryReceiver = mpsc::UnboundedReceiver<SessionId>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Pending,
    Resolved,
    Expired,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no such session {0}")]
    NotFound(SessionId),

    #[error("session {id} belongs to someone else")]
    NotOwner { id: SessionId, caller: String },

    #[error("session {0} is already resolved")]
    AlreadyResolved(SessionId),

    #[error("session {0} has expired")]
    Expired(SessionId),

    #[error("choice {choice} is not one of the {options} options")]
    InvalidChoice { choice: usize, options: usize },
}

#[derive(Debug, Clone)]
pub struct Session<P> {
    pub id: SessionId,
    pub owner: String,
    pub created_at: DateTime<Utc>,
    pub deadline: DateTime<Utc>,
    pub status: SessionStatus,
    pub payload: P,
    deadline_at: Instant,
    closed_at: Option<Instant>,
}

impl<P> Session<P> {
    pub fn is_pending(&self) -> bool {
        self.status == SessionStatus::Pending
    }
}

struct Entry<P> {
    session: Session<P>,
    timer: Option<JoinHandle<()>>,
}

pub struct SessionManager<P> {
    sessions: HashMap<SessionId, Entry<P>>,
    timeout: Duration,
    retention: Duration,
    expiry_tx: mpsc::UnboundedSender<SessionId>,
}

impl<P> SessionManager<P> {
    pub fn new(timeout: Duration, retention: Duration) -> (Self, ExpiryReceiver) {
        let (expiry_tx, expiry_rx) = mpsc::unbounded_channel();
        let manager = Self {
            sessions: HashMap::new(),
            timeout,
            retention,
            expiry_tx,
        };
        (manager, expiry_rx)
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Open a pending session for `owner` and arm its deadline. Must run inside a tokio runtime.
    pub fn open(&mut self, owner: &str, payload: P) -> &Session<P> {
        self.prune();
        let id = Uuid::new_v4();
        let now = Utc::now();
        let deadline_at = Instant::now() + self.timeout;
        let deadline = now
            + chrono::Duration::from_std(self.timeout).unwrap_or_else(|_| chrono::Duration::zero());

        let tx = self.expiry_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep_until(deadline_at).await;
            let _ = tx.send(id);
        });

        debug!("session {} opened for {} (timeout {:?})", id, owner, self.timeout);
        let entry = self.sessions.entry(id).or_insert(Entry {
            session: Session {
                id,
                owner: owner.to_string(),
                created_at: now,
                deadline,
                status: SessionStatus::Pending,
                payload,
                deadline_at,
                closed_at: None,
            },
            timer: Some(timer),
        });
        &entry.session
    }

    pub fn get(&self, id: SessionId) -> Option<&Session<P>> {
        self.sessions.get(&id).map(|e| &e.session)
    }

    /// Check that `caller` may resolve `id` right now, without changing anything.
    pub fn authorize(&self, id: SessionId, caller: &str) -> Result<&Session<P>, SessionError> {
        let session = self.get(id).ok_or(SessionError::NotFound(id))?;
        if session.owner != caller {
            return Err(SessionError::NotOwner {
                id,
                caller: caller.to_string(),
            });
        }
        match session.status {
            SessionStatus::Resolved => Err(SessionError::AlreadyResolved(id)),
            SessionStatus::Expired => Err(SessionError::Expired(id)),
            // Past the deadline but the timer message is still queued: the timer wins.
            SessionStatus::Pending if Instant::now() >= session.deadline_at => {
                Err(SessionError::Expired(id))
            }
            SessionStatus::Pending => Ok(session),
        }
    }

    /// Move `id` from `Pending` to `Resolved` on behalf of `caller` and cancel its deadline.
    /// Any failure leaves the session untouched.
    pub fn resolve(&mut self, id: SessionId, caller: &str) -> Result<&Session<P>, SessionError> {
        self.authorize(id, caller)?;
        let entry = self
            .sessions
            .get_mut(&id)
            .ok_or(SessionError::NotFound(id))?;
        entry.session.status = SessionStatus::Resolved;
        entry.session.closed_at = Some(Instant::now());
        if let Some(timer) = entry.timer.take() {
            timer.abort();
        }
        debug!("session {} resolved by {}", id, caller);
        Ok(&entry.session)
    }

    /// Move `id` from `Pending` to `Expired`. Returns `None` for stale or unknown timers.
    pub fn expire(&mut self, id: SessionId) -> Option<&Session<P>> {
        let entry = self.sessions.get_mut(&id)?;
        if entry.session.status != SessionStatus::Pending {
            trace!("session {}: stale expiry ignored ({:?})", id, entry.session.status);
            return None;
        }
        entry.session.status = SessionStatus::Expired;
        entry.session.closed_at = Some(Instant::now());
        entry.timer = None;
        debug!("session {} expired", id);
        Some(&entry.session)
    }

    /// Drop terminal sessions older than the retention period.
    pub fn prune(&mut self) {
        let now = Instant::now();
        let retention = self.retention;
        self.sessions.retain(|_, e| match e.session.closed_at {
            Some(closed) => now.duration_since(closed) < retention,
            None => true,
        });
    }

    pub fn pending_count(&self) -> usize {
        self.sessions
            .values()
            .filter(|e| e.session.is_pending())
            .count()
    }

    pub fn pending_for(&self, owner: &str) -> impl Iterator<Item = &Session<P>> + '_ {
        let owner = owner.to_string();
        self.sessions
            .values()
            .map(|e| &e.session)
            .filter(move |s| s.is_pending() && s.owner == owner)
    }
}

impl<P> Drop for SessionManager<P> {
    fn drop(&mut self) {
        for entry in self.sessions.values_mut() {
            if let Some(timer) = entry.timer.take() {
                timer.abort();
            }
        }
    }
}
