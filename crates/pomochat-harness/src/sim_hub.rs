//! In-process chat endpoint.
//!
//! Models the production chat server so client behavior can be tested end
//! to end without sockets:
//!
//! - One room per sorted participant pair
//! - Every accepted message is broadcast to every connection in the room,
//!   sender included (this is the echo the client relies on)
//! - `senderID` is corrected to the connection's user
//! - Missing receiver, empty body and unparseable frames are answered with a
//!   notice from the `system` sender, to the offending connection only
//! - Opens missing either query parameter are refused
//! - Broadcast frames carry only `senderID`, `receiverID` and `body`

#![allow(clippy::disallowed_types, reason = "hub state is shared with synchronous transport calls")]

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use pomochat_app::{EventSink, LinkError};
use pomochat_core::{
    ParticipantId, RoomId,
    config::{CHAT_WITH_ID_PARAM, USER_ID_PARAM},
    message::SYSTEM_SENDER,
};
use serde::{Deserialize, Serialize};
use url::Url;

/// Close code the hub reports when it drops a connection abnormally.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Notice sent for a frame that is not a message object.
pub const INVALID_FORMAT_NOTICE: &str = "Invalid message format";

/// Notice sent for a message without a receiver.
pub const MISSING_RECEIVER_NOTICE: &str = "ReceiverID is required";

/// Notice sent for a message with an empty body.
pub const EMPTY_BODY_NOTICE: &str = "Message body cannot be empty";

/// How the hub answers new connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenPolicy {
    /// Open as soon as the client connects.
    #[default]
    Immediate,
    /// Hold opens until [`SimHub::complete_pending_opens`].
    Manual,
    /// Refuse every open.
    Refuse,
}

/// Hub-assigned connection id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
enum ConnectionState {
    Pending { close: Option<(u16, String)> },
    Open,
}

#[derive(Debug)]
struct Connection {
    user: String,
    room: RoomId,
    sink: EventSink,
    state: ConnectionState,
}

/// Frame shape the hub reads and writes. Unknown fields are dropped.
#[derive(Debug, Serialize, Deserialize)]
struct HubFrame {
    #[serde(rename = "senderID", default)]
    sender_id: String,
    #[serde(rename = "receiverID", default)]
    receiver_id: String,
    #[serde(default)]
    body: String,
}

/// A frame the hub broadcast into a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Broadcast {
    /// Room the frame was broadcast in.
    pub room: RoomId,
    /// Encoded frame.
    pub payload: String,
    /// Number of connections it reached.
    pub recipients: usize,
}

#[derive(Debug, Default)]
struct HubState {
    policy: OpenPolicy,
    next_id: u64,
    connections: BTreeMap<ConnectionId, Connection>,
    broadcasts: Vec<Broadcast>,
    refused: usize,
}

/// Shared handle to the simulated endpoint.
#[derive(Debug, Clone, Default)]
pub struct SimHub {
    state: Arc<Mutex<HubState>>,
}

impl SimHub {
    /// Hub that opens connections immediately.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub with the given open policy.
    pub fn with_policy(policy: OpenPolicy) -> Self {
        let hub = Self::default();
        hub.set_policy(policy);
        hub
    }

    /// Change how later opens are answered.
    pub fn set_policy(&self, policy: OpenPolicy) {
        self.lock().policy = policy;
    }

    /// Accept a connection to `url`.
    ///
    /// Returns `None` if the open was refused; the refusal has already been
    /// reported through `sink`.
    pub(crate) fn connect(&self, url: &Url, sink: EventSink) -> Option<ConnectionId> {
        let mut state = self.lock();

        let (Some(user), Some(peer)) =
            (query_param(url, USER_ID_PARAM), query_param(url, CHAT_WITH_ID_PARAM))
        else {
            tracing::debug!(%url, "hub refused open: missing participant");
            state.refused += 1;
            refuse(&sink, "2 user IDs are required");
            return None;
        };

        if state.policy == OpenPolicy::Refuse {
            tracing::debug!(%url, "hub refused open: policy");
            state.refused += 1;
            refuse(&sink, "connection refused");
            return None;
        }

        let room = RoomId::derive(&user, &peer);
        let id = ConnectionId(state.next_id);
        state.next_id += 1;

        let connection_state = if state.policy == OpenPolicy::Manual {
            ConnectionState::Pending { close: None }
        } else {
            sink.opened();
            ConnectionState::Open
        };

        tracing::debug!(?id, %user, %room, "hub accepted connection");
        state.connections.insert(id, Connection {
            user: user.as_str().to_string(),
            room,
            sink,
            state: connection_state,
        });
        Some(id)
    }

    /// Handle a text frame written by connection `id`.
    pub(crate) fn receive(&self, id: ConnectionId, payload: &str) -> Result<(), LinkError> {
        let mut state = self.lock();

        let (user, room) = match state.connections.get(&id) {
            None => return Err(LinkError::Closed),
            Some(Connection { state: ConnectionState::Pending { .. }, .. }) => {
                return Err(LinkError::NotOpen);
            },
            Some(connection) => (connection.user.clone(), connection.room.clone()),
        };

        let notice = |state: &HubState, text: &str| {
            if let Some(connection) = state.connections.get(&id) {
                connection.sink.received(encode(&HubFrame {
                    sender_id: SYSTEM_SENDER.to_string(),
                    receiver_id: user.clone(),
                    body: text.to_string(),
                }));
            }
        };

        let Ok(mut frame) = serde_json::from_str::<HubFrame>(payload) else {
            notice(&state, INVALID_FORMAT_NOTICE);
            return Ok(());
        };

        if frame.sender_id != user {
            tracing::debug!(from = %frame.sender_id, to = %user, "hub corrected sender");
            frame.sender_id.clone_from(&user);
        }
        if frame.receiver_id.is_empty() {
            notice(&state, MISSING_RECEIVER_NOTICE);
            return Ok(());
        }
        if frame.body.is_empty() {
            notice(&state, EMPTY_BODY_NOTICE);
            return Ok(());
        }

        let payload = encode(&frame);
        let mut recipients = 0;
        for connection in state.connections.values() {
            if connection.room == room && connection.state == ConnectionState::Open {
                connection.sink.received(payload.clone());
                recipients += 1;
            }
        }
        state.broadcasts.push(Broadcast { room, payload, recipients });
        Ok(())
    }

    /// Client-initiated close of connection `id`.
    pub(crate) fn close(&self, id: ConnectionId, code: u16, reason: &str) {
        let mut state = self.lock();

        let Some(connection) = state.connections.get_mut(&id) else { return };
        if let ConnectionState::Pending { close } = &mut connection.state {
            // Honored once the open completes
            *close = Some((code, reason.to_string()));
            return;
        }

        if let Some(connection) = state.connections.remove(&id) {
            connection.sink.closed(Some(code), reason);
        }
    }

    /// Open every held connection. Returns how many opened.
    ///
    /// A connection the client closed while it was held opens and then
    /// closes straight away.
    pub fn complete_pending_opens(&self) -> usize {
        let mut state = self.lock();
        let pending: Vec<ConnectionId> = state
            .connections
            .iter()
            .filter(|(_, c)| matches!(c.state, ConnectionState::Pending { .. }))
            .map(|(id, _)| *id)
            .collect();

        for id in &pending {
            let Some(connection) = state.connections.get_mut(id) else { continue };
            let close = match std::mem::replace(&mut connection.state, ConnectionState::Open) {
                ConnectionState::Pending { close } => close,
                ConnectionState::Open => None,
            };
            connection.sink.opened();

            if let Some((code, reason)) = close
                && let Some(connection) = state.connections.remove(id)
            {
                connection.sink.closed(Some(code), reason);
            }
        }

        pending.len()
    }

    /// Refuse every held connection. Returns how many failed.
    pub fn fail_pending_opens(&self) -> usize {
        let mut state = self.lock();
        let pending: Vec<ConnectionId> = state
            .connections
            .iter()
            .filter(|(_, c)| matches!(c.state, ConnectionState::Pending { .. }))
            .map(|(id, _)| *id)
            .collect();

        for id in &pending {
            if let Some(connection) = state.connections.remove(id) {
                refuse(&connection.sink, "connection refused");
            }
        }
        state.refused += pending.len();
        pending.len()
    }

    /// Server-side close of every connection held by `user`.
    ///
    /// Returns how many connections were closed.
    pub fn close_user(&self, user: &str, code: u16, reason: &str) -> usize {
        let mut state = self.lock();
        let ids: Vec<ConnectionId> = state
            .connections
            .iter()
            .filter(|(_, c)| c.user == user)
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            if let Some(connection) = state.connections.remove(id) {
                connection.sink.closed(Some(code), reason);
            }
        }
        ids.len()
    }

    /// Drop every connection held by `user` as if the network failed.
    pub fn drop_user(&self, user: &str) -> usize {
        self.close_user(user, ABNORMAL_CLOSURE, "")
    }

    /// Deliver a raw payload to every open connection held by `user`.
    ///
    /// Bypasses validation; used to feed clients malformed frames.
    pub fn inject(&self, user: &str, payload: &str) -> usize {
        let state = self.lock();
        let mut delivered = 0;
        for connection in state.connections.values() {
            if connection.user == user && connection.state == ConnectionState::Open {
                connection.sink.received(payload);
                delivered += 1;
            }
        }
        delivered
    }

    /// Open connections in `room`.
    pub fn connections_in(&self, room: &str) -> usize {
        self.lock()
            .connections
            .values()
            .filter(|c| c.room.as_str() == room && c.state == ConnectionState::Open)
            .count()
    }

    /// Connections held open or pending.
    pub fn connection_count(&self) -> usize {
        self.lock().connections.len()
    }

    /// Every frame broadcast so far, in order.
    pub fn broadcasts(&self) -> Vec<Broadcast> {
        self.lock().broadcasts.clone()
    }

    /// Number of refused opens.
    pub fn refused(&self) -> usize {
        self.lock().refused
    }

    fn lock(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn query_param(url: &Url, name: &str) -> Option<ParticipantId> {
    url.query_pairs()
        .find(|(key, _)| *key == name)
        .and_then(|(_, value)| ParticipantId::new(value.into_owned()).ok())
}

/// Report a failed open the way a browser socket does: error, then close.
fn refuse(sink: &EventSink, reason: &str) {
    sink.error(reason);
    sink.closed(Some(ABNORMAL_CLOSURE), "");
}

fn encode(frame: &HubFrame) -> String {
    // Plain string fields always serialize
    serde_json::to_string(frame).unwrap_or_default()
}
