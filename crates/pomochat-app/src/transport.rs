//! Transport abstraction for the runtime.
//!
//! The [`Transport`] trait decouples the [`crate::Runtime`] from a concrete
//! socket implementation. Production uses a WebSocket adapter, simulation an
//! in-process hub; the runtime drives both the same way.
//!
//! A transport reports what happens on a connection through an [`EventSink`].
//! The sink stamps every notification with the generation the connection was
//! opened under, so the session can tell a live connection from an abandoned
//! one.

use pomochat_core::{Generation, TransportEvent};
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;

/// Channel carrying generation-tagged transport notifications.
pub type EventTx = mpsc::UnboundedSender<(Generation, TransportEvent)>;

/// Errors from writing to a [`Link`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The connection has not opened yet.
    #[error("transport is not open")]
    NotOpen,

    /// The connection is gone.
    #[error("transport closed")]
    Closed,

    /// The write was rejected.
    #[error("transport write failed: {0}")]
    Write(String),
}

/// Reporting handle given to a transport when it opens a connection.
///
/// Sends are fire-and-forget. A `false` return means the runtime has stopped
/// and the connection should wind down.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: Generation,
    tx: EventTx,
}

impl EventSink {
    /// Create a sink tagging events with `generation`.
    pub fn new(generation: Generation, tx: EventTx) -> Self {
        Self { generation, tx }
    }

    /// Generation this sink reports for.
    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Report the connection as open.
    pub fn opened(&self) -> bool {
        self.emit(TransportEvent::Opened)
    }

    /// Report an inbound text payload.
    pub fn received(&self, payload: impl Into<String>) -> bool {
        self.emit(TransportEvent::Received(payload.into()))
    }

    /// Report the connection as closed.
    pub fn closed(&self, code: Option<u16>, reason: impl Into<String>) -> bool {
        self.emit(TransportEvent::Closed { code, reason: reason.into() })
    }

    /// Report a transport error.
    pub fn error(&self, message: impl Into<String>) -> bool {
        self.emit(TransportEvent::Error { message: message.into() })
    }

    /// Report an arbitrary event.
    pub fn emit(&self, event: TransportEvent) -> bool {
        self.tx.send((self.generation, event)).is_ok()
    }
}

/// One connection opened by a [`Transport`].
///
/// Dropping a link releases it without a close handshake.
pub trait Link: Send + 'static {
    /// Queue a text payload for the peer.
    ///
    /// # Errors
    ///
    /// - `LinkError::NotOpen` if the connection has not opened
    /// - `LinkError::Closed` if the connection is gone
    fn send(&mut self, payload: String) -> Result<(), LinkError>;

    /// Close the connection with a WebSocket close code and reason.
    ///
    /// If the connection is still opening, it is closed as soon as it opens.
    /// Closing twice is a no-op.
    fn close(&mut self, code: u16, reason: &str);
}

/// Opens connections for the runtime.
pub trait Transport: Send + 'static {
    /// Connection type produced by [`Transport::open`].
    type Link: Link;

    /// Start opening a connection to `url`.
    ///
    /// Returns immediately. The outcome (`Opened`, `Error`, `Closed`) and all
    /// later activity are reported through `sink`.
    fn open(&mut self, url: &Url, sink: EventSink) -> Self::Link;
}
