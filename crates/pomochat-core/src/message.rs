//! Chat message wire shapes.
//!
//! Inbound payloads decode into [`Message`]; outbound payloads are built as
//! [`OutboundMessage`] and always carry a timestamp. Both use the endpoint's
//! JSON field names (`senderID`, `receiverID`, `body`, `timestamp`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{SessionError, WireError};

/// Sender id the chat endpoint uses for its own notices.
pub const SYSTEM_SENDER: &str = "system";

/// Opaque participant identifier.
///
/// Validated for presence only: any non-empty string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Create an identifier, rejecting the empty string.
    pub fn new(id: impl Into<String>) -> Result<Self, SessionError> {
        let id = id.into();
        if id.is_empty() {
            return Err(SessionError::EmptyParticipant);
        }
        Ok(Self(id))
    }

    /// Identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A message in a room.
///
/// `timestamp` is kept exactly as the peer sent it; inbound messages are
/// never re-stamped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Author of the message.
    #[serde(rename = "senderID")]
    pub sender_id: ParticipantId,
    /// Addressee of the message.
    #[serde(rename = "receiverID")]
    pub receiver_id: ParticipantId,
    /// Text content, unsanitized.
    pub body: String,
    /// ISO-8601 timestamp, if the peer provided one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl Message {
    /// Decode an inbound text payload.
    ///
    /// # Errors
    ///
    /// - `WireError::Json` if the payload is not a JSON message object
    /// - `WireError::EmptyField` if `senderID` or `receiverID` is empty
    pub fn decode(payload: &str) -> Result<Self, WireError> {
        let message: Self = serde_json::from_str(payload)?;
        if message.sender_id.is_empty() {
            return Err(WireError::EmptyField { field: "senderID" });
        }
        if message.receiver_id.is_empty() {
            return Err(WireError::EmptyField { field: "receiverID" });
        }
        Ok(message)
    }

    /// True for notices authored by the chat endpoint itself.
    pub fn is_system(&self) -> bool {
        self.sender_id.as_str() == SYSTEM_SENDER
    }
}

/// A message accepted for sending.
///
/// Serializes to exactly `senderID`, `receiverID`, `body` and `timestamp`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMessage {
    /// Local participant.
    #[serde(rename = "senderID")]
    pub sender_id: ParticipantId,
    /// Remote participant.
    #[serde(rename = "receiverID")]
    pub receiver_id: ParticipantId,
    /// Text content as supplied by the caller.
    pub body: String,
    /// ISO-8601 timestamp assigned when the session accepted the message.
    pub timestamp: String,
}

impl OutboundMessage {
    /// Encode as a JSON text payload.
    pub fn encode(&self) -> Result<String, WireError> {
        Ok(serde_json::to_string(self)?)
    }
}

impl From<OutboundMessage> for Message {
    fn from(outbound: OutboundMessage) -> Self {
        Self {
            sender_id: outbound.sender_id,
            receiver_id: outbound.receiver_id,
            body: outbound.body,
            timestamp: Some(outbound.timestamp),
        }
    }
}
