//! Property-based tests for the session state machine.
//!
//! Drives a [`ChatSession`] directly with arbitrary interleavings of user
//! commands and transport notifications, including notifications for
//! abandoned connection attempts. Invariants are checked after every step.

use pomochat_core::{
    ChatSession, ChatSnapshot, Generation, ParticipantId, SessionAction, SessionConfig,
    SessionError, TransportEvent, config::DEFAULT_ENDPOINT,
};
use pomochat_harness::{InvariantRegistry, SessionSnapshot, SimEnv, SystemSnapshot};
use proptest::prelude::*;

const ME: &str = "alice";
const PEERS: [&str; 3] = ["bob", "carol", "dave"];

/// Which connection attempt a notification is for.
#[derive(Debug, Clone, Copy)]
enum Target {
    /// The attempt currently live (or most recent).
    Live,
    /// The oldest attempt issued so far.
    Oldest,
}

#[derive(Debug, Clone)]
enum Step {
    Connect(usize),
    Disconnect,
    Send(String),
    ClearError,
    Retarget(usize),
    Transport(Target, TransportEvent),
}

fn payload_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => (0..PEERS.len(), "[a-z ]{1,8}").prop_map(|(peer, body)| {
            serde_json::json!({ "senderID": PEERS[peer], "receiverID": ME, "body": body })
                .to_string()
        }),
        1 => ".{0,24}",
        1 => Just(r#"{"senderID":"","receiverID":"alice","body":"x"}"#.to_string()),
    ]
}

fn event_strategy() -> impl Strategy<Value = TransportEvent> {
    prop_oneof![
        3 => Just(TransportEvent::Opened),
        3 => payload_strategy().prop_map(TransportEvent::Received),
        1 => prop::option::of(prop_oneof![Just(1000u16), Just(1001), Just(1006)])
            .prop_map(|code| TransportEvent::Closed { code, reason: String::new() }),
        1 => Just(TransportEvent::Error { message: "boom".into() }),
        1 => Just(TransportEvent::SendFailed { message: "write failed".into() }),
    ]
}

fn step_strategy() -> impl Strategy<Value = Step> {
    let target = prop_oneof![3 => Just(Target::Live), 1 => Just(Target::Oldest)];
    prop_oneof![
        2 => (0..PEERS.len()).prop_map(Step::Connect),
        1 => Just(Step::Disconnect),
        2 => "[a-z ]{0,8}".prop_map(Step::Send),
        1 => Just(Step::ClearError),
        1 => (0..PEERS.len()).prop_map(Step::Retarget),
        6 => (target, event_strategy()).prop_map(|(t, e)| Step::Transport(t, e)),
    ]
}

fn id(s: &str) -> ParticipantId {
    ParticipantId::new(s).unwrap()
}

fn new_session() -> ChatSession<SimEnv> {
    ChatSession::new(SimEnv::new(), SessionConfig::new(DEFAULT_ENDPOINT).unwrap())
}

/// Sans-IO driver recording every generation the session asked to open.
struct Driver {
    session: ChatSession<SimEnv>,
    issued: Vec<Generation>,
}

impl Driver {
    fn new() -> Self {
        Self { session: new_session(), issued: Vec::new() }
    }

    fn record(&mut self, actions: &[SessionAction]) {
        for action in actions {
            if let SessionAction::Open { generation, .. } = action {
                self.issued.push(*generation);
            }
        }
    }

    fn resolve(&self, target: Target) -> Option<Generation> {
        match target {
            Target::Live => {
                self.session.state().generation().or_else(|| self.issued.last().copied())
            },
            Target::Oldest => self.issued.first().copied(),
        }
    }

    /// Apply a step. Returns the generation a transport step targeted.
    fn apply(&mut self, step: &Step) -> Option<Generation> {
        match step {
            Step::Connect(peer) => {
                if let Ok(actions) = self.session.connect(id(ME), id(PEERS[*peer])) {
                    self.record(&actions);
                }
                None
            },
            Step::Disconnect => {
                self.session.disconnect();
                None
            },
            Step::Send(body) => {
                let _ = self.session.send(body);
                None
            },
            Step::ClearError => {
                self.session.clear_error();
                None
            },
            Step::Retarget(peer) => {
                self.session.set_target_user_id(id(PEERS[*peer]));
                None
            },
            Step::Transport(target, event) => {
                let generation = self.resolve(*target)?;
                self.session.handle_transport(generation, event.clone());
                Some(generation)
            },
        }
    }
}

fn message_count(snapshot: &ChatSnapshot) -> Option<usize> {
    snapshot.active_room.as_ref().map(|room| room.messages.len())
}

proptest! {
    /// Session invariants hold under arbitrary command and event sequences.
    #[test]
    fn prop_session_invariants_hold(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut driver = Driver::new();
        let invariants = InvariantRegistry::standard();

        for step in steps {
            let before = driver.session.snapshot();
            driver.apply(&step);

            let snapshot = SystemSnapshot::single(
                SessionSnapshot::observe(ME, &driver.session).with_previous(before),
            );
            prop_assert!(
                invariants.check_all(&snapshot).is_ok(),
                "Invariant violated after {:?}: {:?}", step, invariants.check_all(&snapshot)
            );
        }
    }

    /// Notifications for abandoned attempts never change observable state.
    #[test]
    fn prop_stale_events_are_inert(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut driver = Driver::new();

        for step in steps {
            let before = driver.session.snapshot();
            let live = driver.session.state().generation();
            let targeted = driver.apply(&step);

            if let Some(generation) = targeted
                && Some(generation) != live
            {
                prop_assert_eq!(driver.session.snapshot(), before, "stale {:?} changed state", step);
            }
        }
    }

    /// Messages enter the room only through inbound notifications.
    #[test]
    fn prop_only_inbound_appends(steps in prop::collection::vec(step_strategy(), 0..60)) {
        let mut driver = Driver::new();

        for step in steps {
            let before = driver.session.snapshot();
            driver.apply(&step);
            let after = driver.session.snapshot();

            let same_connection = before.transport.is_some() && before.transport == after.transport;
            let grew = message_count(&after) > message_count(&before);
            if same_connection && grew {
                let inbound = matches!(step, Step::Transport(_, TransportEvent::Received(_)));
                prop_assert!(inbound, "{:?} appended a message", step);
                prop_assert_eq!(message_count(&after), message_count(&before).map(|n| n + 1));
            }
        }
    }

    /// Disconnect always lands idle, forgets the target and keeps the user.
    #[test]
    fn prop_disconnect_resets(steps in prop::collection::vec(step_strategy(), 0..40)) {
        let mut driver = Driver::new();
        for step in &steps {
            driver.apply(step);
        }
        let current = driver.session.current_user_id().cloned();

        driver.session.disconnect();

        let snapshot = driver.session.snapshot();
        prop_assert!(!snapshot.is_connected);
        prop_assert!(!snapshot.is_connecting);
        prop_assert!(snapshot.active_room.is_none());
        prop_assert!(snapshot.transport.is_none());
        prop_assert!(snapshot.target_user_id.is_none());
        prop_assert_eq!(snapshot.current_user_id, current);
    }

    /// Send fails without changing state unless a room is open.
    #[test]
    fn prop_send_requires_room(
        steps in prop::collection::vec(step_strategy(), 0..40),
        body in "[a-z]{1,8}",
    ) {
        let mut driver = Driver::new();
        for step in &steps {
            driver.apply(step);
        }
        let connected = driver.session.is_connected();
        let before = driver.session.snapshot();

        let result = driver.session.send(&body);

        if connected {
            prop_assert!(result.is_ok());
            // Accepted sends leave the log to the echo
            prop_assert_eq!(message_count(&driver.session.snapshot()), message_count(&before));
        } else {
            prop_assert_eq!(result, Err(SessionError::NotConnected));
            prop_assert_eq!(driver.session.active_room(), before.active_room.as_ref());
            prop_assert_eq!(driver.session.is_connecting(), before.is_connecting);
        }
    }

    /// Both peers derive the same room id regardless of who initiates.
    #[test]
    fn prop_room_id_symmetric(a in "[A-Za-z0-9_]{1,8}", b in "[A-Za-z0-9_]{1,8}") {
        prop_assume!(a != b);
        let mut first = new_session();
        let mut second = new_session();

        let opens = |session: &mut ChatSession<SimEnv>, me: &str, peer: &str| {
            let actions = session.connect(id(me), id(peer)).unwrap();
            let Some(SessionAction::Open { generation, .. }) = actions.first() else {
                panic!("connect did not open");
            };
            session.handle_transport(*generation, TransportEvent::Opened);
        };
        opens(&mut first, &a, &b);
        opens(&mut second, &b, &a);

        let first_room = first.active_room().unwrap();
        let second_room = second.active_room().unwrap();
        prop_assert_eq!(&first_room.id, &second_room.id);

        let (low, high) = if a <= b { (&a, &b) } else { (&b, &a) };
        prop_assert_eq!(first_room.id.as_str(), format!("{low}:{high}"));
    }
}
