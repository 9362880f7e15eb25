//! Fuzz target for inbound payload handling
//!
//! Feed arbitrary text frames to a connected session, interleaved with
//! reconnects, closes and sends.
//!
//! # Strategy
//!
//! - Raw payloads: arbitrary strings, mostly not JSON
//! - Shaped payloads: JSON objects with fuzzed field values, empty ids,
//!   extra fields and odd timestamps
//! - Lifecycle: closes with arbitrary codes, reconnects, frames tagged with
//!   an abandoned generation
//!
//! # Invariants
//!
//! - Handling a payload never panics
//! - A decodable payload appends exactly one message; anything else appends
//!   nothing and leaves the connection and error untouched
//! - Stale frames never change observable state
//! - The harness invariant registry holds after every step

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pomochat_core::{
    ChatSession, Generation, Message, ParticipantId, SessionAction, SessionConfig, TransportEvent,
    config::DEFAULT_ENDPOINT,
};
use pomochat_harness::{InvariantRegistry, SessionSnapshot, SimEnv, SystemSnapshot};

#[derive(Debug, Clone, Arbitrary)]
enum InboundOp {
    Raw(String),
    Shaped { sender: String, receiver: String, body: String, timestamp: Option<String>, extra: bool },
    Stale(String),
    Close { code: Option<u16> },
    Reconnect,
    Send(String),
}

fn id(s: &str) -> Option<ParticipantId> {
    ParticipantId::new(s).ok()
}

fn shaped(sender: &str, receiver: &str, body: &str, timestamp: Option<&str>, extra: bool) -> String {
    let mut frame = serde_json::json!({ "senderID": sender, "receiverID": receiver, "body": body });
    if let Some(timestamp) = timestamp {
        frame["timestamp"] = timestamp.into();
    }
    if extra {
        frame["roomID"] = "ignored".into();
    }
    frame.to_string()
}

/// Connect and open. Returns the live generation.
fn open(session: &mut ChatSession<SimEnv>) -> Option<Generation> {
    let actions = session.connect(id("alice")?, id("bob")?).ok()?;
    let generation = actions.iter().find_map(|action| match action {
        SessionAction::Open { generation, .. } => Some(*generation),
        _ => None,
    })?;
    session.handle_transport(generation, TransportEvent::Opened);
    Some(generation)
}

fn message_count(session: &ChatSession<SimEnv>) -> Option<usize> {
    session.active_room().map(|room| room.messages.len())
}

fuzz_target!(|ops: Vec<InboundOp>| {
    let Ok(config) = SessionConfig::new(DEFAULT_ENDPOINT) else { return };
    let mut session = ChatSession::new(SimEnv::new(), config);
    let invariants = InvariantRegistry::standard();

    let Some(mut live) = open(&mut session) else { return };
    let mut abandoned = Vec::new();

    for op in ops {
        let before = session.snapshot();

        match op {
            InboundOp::Raw(payload) => {
                let decodable = Message::decode(&payload).is_ok();
                session.handle_transport(live, TransportEvent::Received(payload));
                if before.is_connected {
                    let expected = message_count_after(&before, decodable);
                    assert_eq!(message_count(&session), expected);
                    assert_eq!(session.snapshot().error, before.error);
                    assert!(session.is_connected());
                }
            },
            InboundOp::Shaped { sender, receiver, body, timestamp, extra } => {
                let payload = shaped(&sender, &receiver, &body, timestamp.as_deref(), extra);
                let decodable = !sender.is_empty() && !receiver.is_empty();
                assert_eq!(Message::decode(&payload).is_ok(), decodable);
                session.handle_transport(live, TransportEvent::Received(payload));
                if before.is_connected {
                    assert_eq!(message_count(&session), message_count_after(&before, decodable));
                }
                if decodable && before.is_connected {
                    let room = session.active_room().expect("connected session has a room");
                    let last = room.messages.last().expect("message appended");
                    assert_eq!(last.body, body);
                    assert_eq!(last.timestamp, timestamp);
                }
            },
            InboundOp::Stale(payload) => {
                if let Some(generation) = abandoned.first().copied() {
                    session.handle_transport(generation, TransportEvent::Received(payload));
                    assert_eq!(session.snapshot(), before);
                }
            },
            InboundOp::Close { code } => {
                session.handle_transport(live, TransportEvent::Closed { code, reason: String::new() });
                assert!(!session.is_connected());
                assert!(session.active_room().is_none());
            },
            InboundOp::Reconnect => {
                session.disconnect();
                abandoned.push(live);
                match open(&mut session) {
                    Some(generation) => live = generation,
                    None => panic!("reconnect from idle failed"),
                }
            },
            InboundOp::Send(body) => {
                let _ = session.send(&body);
                assert_eq!(message_count(&session), before.active_room.as_ref().map(|r| r.messages.len()));
            },
        }

        let snapshot = SystemSnapshot::single(
            SessionSnapshot::observe("alice", &session).with_previous(before),
        );
        if let Err(violations) = invariants.check_all(&snapshot) {
            panic!("invariants violated: {violations:?}");
        }
    }
});

fn message_count_after(before: &pomochat_core::ChatSnapshot, appended: bool) -> Option<usize> {
    before.active_room.as_ref().map(|room| room.messages.len() + usize::from(appended))
}
