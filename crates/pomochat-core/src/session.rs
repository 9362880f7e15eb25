//! Chat session state machine.
//!
//! Owns the connection lifecycle for one two-party conversation. Uses the
//! action pattern: commands and transport notifications go in, actions come
//! out for the driver to execute. No I/O happens here.
//!
//! # State Machine
//!
//! ```text
//! ┌──────┐  connect   ┌────────────┐   Opened    ┌───────────┐
//! │ Idle │───────────>│ Connecting │────────────>│ Connected │
//! └──────┘            └────────────┘             └───────────┘
//!    ↑                      │                          │
//!    │   Error/Closed/      │                          │ Closed/
//!    │   disconnect         │                          │ disconnect
//!    └──────────────────────┴──────────────────────────┘
//! ```
//!
//! There is no reconnecting state. After any failure or close the caller
//! must `connect` again.
//!
//! # Generations
//!
//! Every `connect` takes a fresh [`Generation`]. Transport notifications are
//! only applied when their generation matches the live attempt, so an open
//! that completes after `disconnect` cannot bring a room back.

use std::fmt;

use tracing::{debug, info, warn};

use crate::{
    config::SessionConfig,
    env::Environment,
    error::SessionError,
    event::{Generation, SessionAction, TransportEvent},
    message::{Message, OutboundMessage, ParticipantId},
    room::{Room, RoomId},
};

/// Close code reported by a transport on a normal closure.
const NORMAL_CLOSURE: u16 = 1000;

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection and no attempt in flight.
    Idle,
    /// Transport open requested, waiting for it to open or fail.
    Connecting {
        /// Live attempt.
        generation: Generation,
    },
    /// Transport open, room active.
    Connected {
        /// Live attempt.
        generation: Generation,
    },
}

impl SessionState {
    /// Generation of the live attempt. `None` when idle.
    pub fn generation(self) -> Option<Generation> {
        match self {
            Self::Idle => None,
            Self::Connecting { generation } | Self::Connected { generation } => Some(generation),
        }
    }

    /// True while an open is in flight.
    pub fn is_connecting(self) -> bool {
        matches!(self, Self::Connecting { .. })
    }

    /// True while a room is active.
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected { .. })
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Connecting { .. } => f.write_str("connecting"),
            Self::Connected { .. } => f.write_str("connected"),
        }
    }
}

/// Read-only view of session state for rendering.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChatSnapshot {
    /// Active room. `None` unless connected.
    pub active_room: Option<Room>,
    /// Generation of the open transport. `None` unless connected.
    pub transport: Option<Generation>,
    /// Open in flight.
    pub is_connecting: bool,
    /// Room active.
    pub is_connected: bool,
    /// Local participant, kept across disconnects.
    pub current_user_id: Option<ParticipantId>,
    /// Remote participant, cleared on disconnect.
    pub target_user_id: Option<ParticipantId>,
    /// Last surfaced failure.
    pub error: Option<SessionError>,
}

/// Chat session state machine
///
/// Pure state machine: no I/O, no timers. The caller owns the transport and
/// feeds its notifications back through [`ChatSession::handle_transport`].
#[derive(Debug)]
pub struct ChatSession<E: Environment> {
    /// Clock for outbound timestamps
    env: E,
    /// Endpoint and close parameters
    config: SessionConfig,
    /// Current state
    state: SessionState,
    /// Most recently issued generation
    last_generation: Generation,
    /// Active room. `Some` only while connected.
    room: Option<Room>,
    /// Local participant
    current_user_id: Option<ParticipantId>,
    /// Remote participant
    target_user_id: Option<ParticipantId>,
    /// Last surfaced failure
    error: Option<SessionError>,
}

impl<E: Environment> ChatSession<E> {
    /// Create an idle session.
    pub fn new(env: E, config: SessionConfig) -> Self {
        Self {
            env,
            config,
            state: SessionState::Idle,
            last_generation: Generation::new(0),
            room: None,
            current_user_id: None,
            target_user_id: None,
            error: None,
        }
    }

    /// Start a connection attempt from `current` to `target`.
    ///
    /// Records both identifiers, clears any previous error and returns an
    /// `Open` action. The caller must reject `current == target` before
    /// calling; the session does not special-case self-chat.
    ///
    /// # Errors
    ///
    /// - `SessionError::Busy` if not idle. The error is also surfaced in
    ///   session state.
    pub fn connect(
        &mut self,
        current: ParticipantId,
        target: ParticipantId,
    ) -> Result<Vec<SessionAction>, SessionError> {
        if self.state != SessionState::Idle {
            let error = SessionError::Busy { state: self.state };
            warn!(state = %self.state, "connect rejected");
            self.error = Some(error.clone());
            return Err(error);
        }

        let generation = self.last_generation.next();
        self.last_generation = generation;

        let url = self.config.chat_url(&current, &target);
        info!(%generation, %current, %target, "connecting to chat");

        self.current_user_id = Some(current);
        self.target_user_id = Some(target);
        self.error = None;
        self.state = SessionState::Connecting { generation };

        Ok(vec![SessionAction::Open { generation, url }, SessionAction::Render])
    }

    /// Send `body` from the current to the target participant.
    ///
    /// The message is stamped now and handed to the transport. It is not
    /// appended locally: it shows up in the room when the endpoint echoes it
    /// back.
    ///
    /// # Errors
    ///
    /// - `SessionError::NotConnected` if no room is active
    /// - `SessionError::EmptyBody` if `body` is blank
    /// - `SessionError::Encode` if the payload cannot be serialized
    ///
    /// Errors are also surfaced in session state; nothing else changes.
    pub fn send(&mut self, body: &str) -> Result<Vec<SessionAction>, SessionError> {
        match self.prepare_send(body) {
            Ok(actions) => Ok(actions),
            Err(error) => {
                warn!(%error, "send rejected");
                self.error = Some(error.clone());
                Err(error)
            },
        }
    }

    fn prepare_send(&self, body: &str) -> Result<Vec<SessionAction>, SessionError> {
        let SessionState::Connected { generation } = self.state else {
            return Err(SessionError::NotConnected);
        };

        if body.trim().is_empty() {
            return Err(SessionError::EmptyBody);
        }

        let (Some(sender), Some(receiver)) = (&self.current_user_id, &self.target_user_id) else {
            return Err(SessionError::NotConnected);
        };

        let outbound = OutboundMessage {
            sender_id: sender.clone(),
            receiver_id: receiver.clone(),
            body: body.to_string(),
            timestamp: self.env.timestamp(),
        };
        let payload =
            outbound.encode().map_err(|e| SessionError::Encode { reason: e.to_string() })?;

        debug!(%generation, bytes = payload.len(), "sending message");
        Ok(vec![SessionAction::Send { generation, payload }])
    }

    /// Leave the conversation.
    ///
    /// Always ends idle with no room and no target; the current participant
    /// is kept. Closes the transport if one is open or opening. Calling this
    /// while idle does nothing beyond clearing the target.
    pub fn disconnect(&mut self) -> Vec<SessionAction> {
        let mut actions = Vec::new();

        match self.state {
            SessionState::Idle => {
                debug!("disconnect while idle");
            },
            SessionState::Connecting { generation } => {
                info!(%generation, "abandoning connection attempt");
                actions.push(self.close_action(generation));
                actions.push(SessionAction::ConnectFailed {
                    generation,
                    error: SessionError::Cancelled,
                });
            },
            SessionState::Connected { generation } => {
                info!(%generation, "disconnecting from chat");
                actions.push(self.close_action(generation));
            },
        }

        self.reset();
        actions.push(SessionAction::Render);
        actions
    }

    /// Process a transport notification for attempt `generation`.
    ///
    /// This is the single dispatch point for transport activity; see the
    /// module docs for the transition table.
    pub fn handle_transport(
        &mut self,
        generation: Generation,
        event: TransportEvent,
    ) -> Vec<SessionAction> {
        if self.state.generation() != Some(generation) {
            return self.handle_stale(generation, event);
        }

        match (self.state, event) {
            (SessionState::Connecting { .. }, TransportEvent::Opened) => self.on_opened(generation),

            (SessionState::Connecting { .. }, TransportEvent::Error { message }) => {
                self.on_connect_failed(generation, message)
            },

            (SessionState::Connecting { .. }, TransportEvent::Closed { code, reason }) => {
                self.on_connect_failed(generation, describe_close(code, &reason))
            },

            (SessionState::Connected { .. }, TransportEvent::Received(payload)) => {
                self.on_received(generation, &payload)
            },

            (SessionState::Connected { .. }, TransportEvent::Closed { code, reason }) => {
                self.on_closed(generation, code, &reason)
            },

            // Errors on an open transport are reported, not fatal. Only a
            // close event tears the room down.
            (SessionState::Connected { .. }, TransportEvent::Error { message }) => {
                warn!(%generation, %message, "chat transport error");
                self.error = Some(SessionError::Transport { message });
                vec![SessionAction::Render]
            },

            (SessionState::Connected { .. }, TransportEvent::SendFailed { message }) => {
                warn!(%generation, %message, "chat write failed");
                self.error = Some(SessionError::SendFailure { reason: message });
                vec![SessionAction::Render]
            },

            (state, event) => {
                debug!(%generation, %state, ?event, "ignoring transport event");
                vec![]
            },
        }
    }

    /// Record the local participant.
    pub fn set_current_user_id(&mut self, id: ParticipantId) -> Vec<SessionAction> {
        self.current_user_id = Some(id);
        vec![SessionAction::Render]
    }

    /// Record the remote participant.
    ///
    /// Allowed in any state. While connected, later sends address the new
    /// target; the active room is unchanged.
    pub fn set_target_user_id(&mut self, id: ParticipantId) -> Vec<SessionAction> {
        self.target_user_id = Some(id);
        vec![SessionAction::Render]
    }

    /// Clear the surfaced error.
    pub fn clear_error(&mut self) -> Vec<SessionAction> {
        self.error = None;
        vec![SessionAction::Render]
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True while an open is in flight.
    pub fn is_connecting(&self) -> bool {
        self.state.is_connecting()
    }

    /// True while a room is active.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Active room. `None` unless connected.
    pub fn active_room(&self) -> Option<&Room> {
        self.room.as_ref()
    }

    /// Generation of the open transport. `None` unless connected.
    pub fn transport(&self) -> Option<Generation> {
        match self.state {
            SessionState::Connected { generation } => Some(generation),
            SessionState::Idle | SessionState::Connecting { .. } => None,
        }
    }

    /// Local participant.
    pub fn current_user_id(&self) -> Option<&ParticipantId> {
        self.current_user_id.as_ref()
    }

    /// Remote participant.
    pub fn target_user_id(&self) -> Option<&ParticipantId> {
        self.target_user_id.as_ref()
    }

    /// Last surfaced failure.
    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    /// Session configuration.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Copy of the observable state.
    pub fn snapshot(&self) -> ChatSnapshot {
        ChatSnapshot {
            active_room: self.room.clone(),
            transport: self.transport(),
            is_connecting: self.is_connecting(),
            is_connected: self.is_connected(),
            current_user_id: self.current_user_id.clone(),
            target_user_id: self.target_user_id.clone(),
            error: self.error.clone(),
        }
    }

    fn on_opened(&mut self, generation: Generation) -> Vec<SessionAction> {
        let (Some(current), Some(target)) =
            (self.current_user_id.clone(), self.target_user_id.clone())
        else {
            let mut actions = vec![self.close_action(generation)];
            actions.extend(
                self.on_connect_failed(generation, "participants unknown at open".to_string()),
            );
            return actions;
        };

        let room = Room::open(current, target);
        let room_id: RoomId = room.id.clone();
        info!(%generation, room = %room_id, "chat connected");

        self.room = Some(room);
        self.state = SessionState::Connected { generation };

        vec![SessionAction::Connected { generation, room_id }, SessionAction::Render]
    }

    fn on_connect_failed(&mut self, generation: Generation, reason: String) -> Vec<SessionAction> {
        warn!(%generation, %reason, "chat connection failed");

        let error = SessionError::ConnectFailure { reason };
        self.state = SessionState::Idle;
        self.room = None;
        self.error = Some(error.clone());

        vec![
            SessionAction::Release { generation },
            SessionAction::ConnectFailed { generation, error },
            SessionAction::Render,
        ]
    }

    fn on_received(&mut self, generation: Generation, payload: &str) -> Vec<SessionAction> {
        let message = match Message::decode(payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(%generation, error = %e, "discarding malformed inbound payload");
                return vec![];
            },
        };

        match self.room.as_mut() {
            Some(room) => {
                room.add_message(message);
                vec![SessionAction::Render]
            },
            None => vec![],
        }
    }

    fn on_closed(
        &mut self,
        generation: Generation,
        code: Option<u16>,
        reason: &str,
    ) -> Vec<SessionAction> {
        if code == Some(NORMAL_CLOSURE) {
            info!(%generation, %reason, "chat connection closed");
        } else {
            warn!(%generation, ?code, %reason, "chat connection closed unexpectedly");
        }

        self.reset();
        vec![SessionAction::Release { generation }, SessionAction::Render]
    }

    fn handle_stale(&self, generation: Generation, event: TransportEvent) -> Vec<SessionAction> {
        match event {
            // The attempt was abandoned before it opened; close what it opened.
            TransportEvent::Opened => {
                debug!(%generation, "closing transport from superseded attempt");
                vec![self.close_action(generation)]
            },
            event => {
                debug!(%generation, ?event, "ignoring event from superseded attempt");
                vec![]
            },
        }
    }

    fn close_action(&self, generation: Generation) -> SessionAction {
        SessionAction::Close {
            generation,
            code: self.config.close_code,
            reason: self.config.close_reason.clone(),
        }
    }

    fn reset(&mut self) {
        self.state = SessionState::Idle;
        self.room = None;
        self.target_user_id = None;
    }
}

fn describe_close(code: Option<u16>, reason: &str) -> String {
    match (code, reason.is_empty()) {
        (Some(code), true) => format!("connection closed before opening (code {code})"),
        (Some(code), false) => format!("connection closed before opening (code {code}: {reason})"),
        (None, true) => "connection closed before opening".to_string(),
        (None, false) => format!("connection closed before opening ({reason})"),
    }
}
