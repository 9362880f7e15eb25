//! Standard invariant checks.
//!
//! These invariants capture behavioral properties that must always hold.
//! They verify WHAT must be true, not specific test scenarios.

use pomochat_core::RoomId;

use super::{Invariant, InvariantKind, InvariantResult, SystemSnapshot, Violation};

/// A session is never connecting and connected at the same time.
pub struct ConnectingConnectedExclusive;

impl Invariant for ConnectingConnectedExclusive {
    fn kind(&self) -> InvariantKind {
        InvariantKind::ConnectingConnectedExclusive
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            if session.current.is_connecting && session.current.is_connected {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!("session {}: connecting and connected", session.name),
                });
            }
        }
        Ok(())
    }
}

/// An active room exists exactly while connected.
///
/// A room without a connection would accept messages nobody can deliver;
/// a connection without a room would drop inbound messages.
pub struct RoomRequiresConnection;

impl Invariant for RoomRequiresConnection {
    fn kind(&self) -> InvariantKind {
        InvariantKind::RoomRequiresConnection
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let has_room = session.current.active_room.is_some();
            if has_room != session.current.is_connected {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "session {}: has_room={has_room} but is_connected={}",
                        session.name, session.current.is_connected
                    ),
                });
            }
        }
        Ok(())
    }
}

/// A transport is exposed exactly while connected.
pub struct TransportMatchesConnection;

impl Invariant for TransportMatchesConnection {
    fn kind(&self) -> InvariantKind {
        InvariantKind::TransportMatchesConnection
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let has_transport = session.current.transport.is_some();
            if has_transport != session.current.is_connected {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "session {}: transport={:?} but is_connected={}",
                        session.name, session.current.transport, session.current.is_connected
                    ),
                });
            }
        }
        Ok(())
    }
}

/// The room id is the sorted pair of the room's participants.
pub struct RoomIdMatchesParticipants;

impl Invariant for RoomIdMatchesParticipants {
    fn kind(&self) -> InvariantKind {
        InvariantKind::RoomIdMatchesParticipants
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let Some(room) = &session.current.active_room else { continue };
            let expected = RoomId::derive(&room.participant_a, &room.participant_b);
            if room.id != expected {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "session {}: room id {} but participants give {expected}",
                        session.name, room.id
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Within one connection, the message log only grows at the end.
///
/// Compares each session with its previous step. Earlier messages are never
/// reordered, rewritten or removed while the same transport is open.
pub struct MessageLogAppendOnly;

impl Invariant for MessageLogAppendOnly {
    fn kind(&self) -> InvariantKind {
        InvariantKind::MessageLogAppendOnly
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        for session in &state.sessions {
            let Some(previous) = &session.previous else { continue };
            let (Some(before), Some(after)) = (&previous.active_room, &session.current.active_room)
            else {
                continue;
            };
            if previous.transport != session.current.transport {
                continue; // Different connection, fresh room
            }

            if !after.messages.starts_with(&before.messages) {
                return Err(Violation {
                    invariant: self.kind(),
                    message: format!(
                        "session {}: log of {} messages is not a prefix of the new log of {}",
                        session.name,
                        before.messages.len(),
                        after.messages.len()
                    ),
                });
            }
        }
        Ok(())
    }
}

/// Sessions in rooms with the same participants agree on the room id.
pub struct RoomIdAgreement;

impl Invariant for RoomIdAgreement {
    fn kind(&self) -> InvariantKind {
        InvariantKind::RoomIdAgreement
    }

    fn check(&self, state: &SystemSnapshot) -> InvariantResult {
        let rooms: Vec<_> = state
            .sessions
            .iter()
            .filter_map(|s| s.current.active_room.as_ref().map(|room| (s, room)))
            .collect();

        for (i, (first, a)) in rooms.iter().enumerate() {
            for (second, b) in &rooms[i + 1..] {
                let same_pair = (a.participant_a == b.participant_a
                    && a.participant_b == b.participant_b)
                    || (a.participant_a == b.participant_b && a.participant_b == b.participant_a);

                if same_pair && a.id != b.id {
                    return Err(Violation {
                        invariant: self.kind(),
                        message: format!(
                            "sessions {} and {} share participants but see rooms {} and {}",
                            first.name, second.name, a.id, b.id
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}
