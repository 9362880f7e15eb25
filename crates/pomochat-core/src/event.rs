//! Transport events and session actions.

use std::fmt;

use url::Url;

use crate::{error::SessionError, room::RoomId};

/// Token identifying one connection attempt.
///
/// Each `connect` takes the next generation. Transport notifications carry
/// the generation they were opened under; the session drops any whose token
/// no longer matches the live attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(u64);

impl Generation {
    /// Wrap a raw token value.
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Raw token value.
    pub const fn value(self) -> u64 {
        self.0
    }

    /// The token following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Notifications from a transport, fed into the session.
///
/// The caller is responsible for:
/// - Tagging each notification with the [`Generation`] the transport was
///   opened under
/// - Delivering notifications for one transport in the order they occurred
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Transport is open and writable.
    Opened,

    /// A text payload arrived.
    Received(String),

    /// Transport closed (locally, by the peer, or by the network).
    Closed {
        /// Close code, if the transport reported one.
        code: Option<u16>,
        /// Close reason, possibly empty.
        reason: String,
    },

    /// Transport reported an error.
    Error {
        /// Transport-provided description.
        message: String,
    },

    /// A write requested through [`SessionAction::Send`] failed.
    SendFailed {
        /// Transport-provided description.
        message: String,
    },
}

/// Actions produced by the session for the caller to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionAction {
    /// Open a transport to `url` and tag its events with `generation`.
    Open {
        /// Attempt this transport belongs to.
        generation: Generation,
        /// Chat endpoint with `userID` and `chatWithID` query parameters.
        url: Url,
    },

    /// Write a text payload to the transport for `generation`.
    Send {
        /// Transport to write to.
        generation: Generation,
        /// JSON text payload.
        payload: String,
    },

    /// Close the transport for `generation`.
    ///
    /// Closing a transport that is already gone is a no-op.
    Close {
        /// Transport to close.
        generation: Generation,
        /// WebSocket close code.
        code: u16,
        /// Close reason.
        reason: String,
    },

    /// Forget the transport for `generation` without closing it; it has
    /// already closed or failed.
    Release {
        /// Transport to drop.
        generation: Generation,
    },

    /// The attempt for `generation` opened and its room exists.
    Connected {
        /// Attempt that succeeded.
        generation: Generation,
        /// Room now active.
        room_id: RoomId,
    },

    /// The attempt for `generation` ended without opening.
    ConnectFailed {
        /// Attempt that failed.
        generation: Generation,
        /// Why it failed.
        error: SessionError,
    },

    /// Session state changed; re-render.
    Render,
}
