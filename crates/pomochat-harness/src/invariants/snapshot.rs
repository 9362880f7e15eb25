//! Observable state snapshots for invariant checking.
//!
//! Invariants operate on snapshots rather than live sessions so every check
//! sees one consistent moment.

use pomochat_core::{ChatSession, ChatSnapshot, Environment};

/// Snapshot of every observed session.
#[derive(Debug, Clone, Default)]
pub struct SystemSnapshot {
    /// Per-session state.
    pub sessions: Vec<SessionSnapshot>,
}

impl SystemSnapshot {
    /// Create an empty snapshot.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a snapshot with a single session.
    pub fn single(session: SessionSnapshot) -> Self {
        Self { sessions: vec![session] }
    }

    /// Create a snapshot from multiple sessions.
    pub fn from_sessions(sessions: Vec<SessionSnapshot>) -> Self {
        Self { sessions }
    }

    /// Add a session snapshot.
    pub fn add_session(&mut self, session: SessionSnapshot) {
        self.sessions.push(session);
    }
}

/// One session's observable state, with the state seen one step earlier.
#[derive(Debug, Clone, Default)]
pub struct SessionSnapshot {
    /// Label for violation messages.
    pub name: String,
    /// Current state.
    pub current: ChatSnapshot,
    /// State before the last step, for transition checks.
    pub previous: Option<ChatSnapshot>,
}

impl SessionSnapshot {
    /// Snapshot from a published [`ChatSnapshot`].
    pub fn new(name: impl Into<String>, current: ChatSnapshot) -> Self {
        Self { name: name.into(), current, previous: None }
    }

    /// Snapshot a live session.
    pub fn observe<E: Environment>(name: impl Into<String>, session: &ChatSession<E>) -> Self {
        Self::new(name, session.snapshot())
    }

    /// Attach the state from the previous step.
    #[must_use]
    pub fn with_previous(mut self, previous: ChatSnapshot) -> Self {
        self.previous = Some(previous);
        self
    }
}
