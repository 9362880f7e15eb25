//! Error types for the chat session core.
//!
//! [`SessionError`] is what the session stores in its `error` slot and what
//! fallible commands return, so it is `Clone` and comparable. Payload and
//! configuration problems have their own types and never reach the UI as-is.

use thiserror::Error;

use crate::session::SessionState;

/// Errors surfaced by [`crate::ChatSession`] operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// `connect` called while an attempt is in flight or a room is open.
    #[error("chat session busy: already {state}")]
    Busy {
        /// State when the call was rejected.
        state: SessionState,
    },

    /// The transport failed to open.
    #[error("failed to connect to chat: {reason}")]
    ConnectFailure {
        /// Transport-provided description.
        reason: String,
    },

    /// The connection attempt was abandoned by `disconnect`.
    #[error("connection attempt cancelled")]
    Cancelled,

    /// `send` called without an open connection.
    #[error("websocket connection is not open")]
    NotConnected,

    /// `send` called with a body that is empty after trimming.
    #[error("message body cannot be empty")]
    EmptyBody,

    /// The transport rejected an outbound write.
    #[error("failed to send message: {reason}")]
    SendFailure {
        /// Transport-provided description.
        reason: String,
    },

    /// Outbound payload could not be encoded.
    #[error("failed to encode message: {reason}")]
    Encode {
        /// Encoder-provided description.
        reason: String,
    },

    /// The transport reported an error on an open connection.
    #[error("chat transport error: {message}")]
    Transport {
        /// Transport-provided description.
        message: String,
    },

    /// A participant identifier was empty.
    #[error("participant identifier cannot be empty")]
    EmptyParticipant,
}

impl SessionError {
    /// Returns true if this error belongs to the send path.
    ///
    /// Send failures never change the connection state.
    pub fn is_send_failure(&self) -> bool {
        matches!(
            self,
            Self::NotConnected | Self::EmptyBody | Self::SendFailure { .. } | Self::Encode { .. }
        )
    }

    /// Returns true if this error ended a connection attempt.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::ConnectFailure { .. } | Self::Cancelled)
    }
}

/// Errors decoding or encoding a chat payload.
#[derive(Error, Debug)]
pub enum WireError {
    /// Payload is not JSON or does not have the message shape.
    #[error("invalid message payload: {0}")]
    Json(#[from] serde_json::Error),

    /// A required identifier field was present but empty.
    #[error("message field {field} is empty")]
    EmptyField {
        /// JSON field name.
        field: &'static str,
    },
}

/// Errors building a [`crate::SessionConfig`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Endpoint is not a valid URL.
    #[error("invalid chat endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// Endpoint as supplied.
        endpoint: String,
        /// Parser-provided description.
        reason: String,
    },

    /// Endpoint scheme is not `ws` or `wss`.
    #[error("unsupported chat endpoint scheme {scheme:?} (expected ws or wss)")]
    UnsupportedScheme {
        /// Scheme found in the endpoint.
        scheme: String,
    },
}
