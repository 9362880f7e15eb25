//! Client-local model of a two-party conversation.

use std::fmt;

use crate::message::{Message, ParticipantId};

/// Separator between the two sorted identifiers in a [`RoomId`].
pub const ROOM_ID_SEPARATOR: char = ':';

/// Deterministic room identifier.
///
/// Both peers compute the same id without a handshake: the two participant
/// identifiers are sorted and joined with [`ROOM_ID_SEPARATOR`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(String);

impl RoomId {
    /// Derive the room id for a pair of participants, in either order.
    pub fn derive(a: &ParticipantId, b: &ParticipantId) -> Self {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self(format!("{low}{ROOM_ID_SEPARATOR}{high}"))
    }

    /// Room id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Per-connection room state.
///
/// Created when a connection opens, dropped when it closes. The message list
/// only grows, in arrival order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Room {
    /// Sorted-pair room id.
    pub id: RoomId,
    /// Initiator, as supplied to `connect`.
    pub participant_a: ParticipantId,
    /// Target, as supplied to `connect`.
    pub participant_b: ParticipantId,
    /// Messages in arrival order.
    pub messages: Vec<Message>,
    /// Connectivity when the room was created. Not kept in sync; read the
    /// session's connection state instead.
    pub is_connected: bool,
}

impl Room {
    /// Create an empty, connected room for `initiator` talking to `target`.
    pub fn open(initiator: ParticipantId, target: ParticipantId) -> Self {
        Self {
            id: RoomId::derive(&initiator, &target),
            participant_a: initiator,
            participant_b: target,
            messages: Vec::new(),
            is_connected: true,
        }
    }

    /// Append a message.
    pub fn add_message(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// The other participant, from `me`'s point of view. `None` if `me` is
    /// not in this room.
    pub fn peer_of(&self, me: &ParticipantId) -> Option<&ParticipantId> {
        if *me == self.participant_a {
            Some(&self.participant_b)
        } else if *me == self.participant_b {
            Some(&self.participant_a)
        } else {
            None
        }
    }
}
