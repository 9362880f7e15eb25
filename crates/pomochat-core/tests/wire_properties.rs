//! Property tests for room identity and the wire codec.
//!
//! These tests verify:
//! - Both peers derive the same room id, whatever the identifiers contain
//! - Inbound decoding never panics and rejects empty identifiers
//! - Participant ids survive query encoding in the chat URL

use pomochat_core::{
    Message, OutboundMessage, ParticipantId, RoomId, SessionConfig, WireError,
    config::{CHAT_WITH_ID_PARAM, DEFAULT_ENDPOINT, USER_ID_PARAM},
};
use proptest::prelude::*;

fn id(s: &str) -> ParticipantId {
    ParticipantId::new(s).unwrap()
}

proptest! {
    /// INVARIANT: room id is order-independent and starts with the smaller id.
    #[test]
    fn prop_room_id_order_independent(a in ".{1,16}", b in ".{1,16}") {
        let ab = RoomId::derive(&id(&a), &id(&b));
        let ba = RoomId::derive(&id(&b), &id(&a));
        prop_assert_eq!(&ab, &ba);

        let (low, high) = if a <= b { (&a, &b) } else { (&b, &a) };
        prop_assert_eq!(ab.as_str(), format!("{low}:{high}"));
    }

    /// Arbitrary text never panics the decoder.
    #[test]
    fn prop_decode_total(payload in ".{0,64}") {
        let _ = Message::decode(&payload);
    }

    /// INVARIANT: a decoded message always has both participants.
    #[test]
    fn prop_decode_requires_participants(
        sender in "[a-z]{0,4}",
        receiver in "[a-z]{0,4}",
        body in ".{0,16}",
    ) {
        let payload = serde_json::json!({ "senderID": sender, "receiverID": receiver, "body": body })
            .to_string();

        match Message::decode(&payload) {
            Ok(message) => {
                prop_assert!(!sender.is_empty() && !receiver.is_empty());
                prop_assert_eq!(message.body, body);
                prop_assert_eq!(message.timestamp, None);
            },
            Err(WireError::EmptyField { field }) => {
                prop_assert!(sender.is_empty() || receiver.is_empty());
                prop_assert!(field == "senderID" || field == "receiverID");
            },
            Err(other) => prop_assert!(false, "unexpected error {other}"),
        }
    }

    /// What the session sends is what a peer decodes, timestamp included.
    #[test]
    fn prop_outbound_readable_by_peer(body in ".{1,32}", millis in 0u32..1000) {
        let timestamp = format!("2024-01-01T12:30:00.{millis:03}Z");
        let outbound = OutboundMessage {
            sender_id: id("alice"),
            receiver_id: id("bob"),
            body,
            timestamp,
        };

        let decoded = Message::decode(&outbound.encode().unwrap()).unwrap();
        prop_assert_eq!(decoded, Message::from(outbound));
    }

    /// INVARIANT: participant ids reach the endpoint unchanged.
    #[test]
    fn prop_chat_url_carries_participants(current in ".{1,16}", target in ".{1,16}") {
        let config = SessionConfig::new(DEFAULT_ENDPOINT).unwrap();
        let url = config.chat_url(&id(&current), &id(&target));

        let param = |name: &str| {
            url.query_pairs().find(|(key, _)| key == name).map(|(_, value)| value.into_owned())
        };
        prop_assert_eq!(param(USER_ID_PARAM), Some(current));
        prop_assert_eq!(param(CHAT_WITH_ID_PARAM), Some(target));
        prop_assert_eq!(url.path(), "/chat");
    }
}
