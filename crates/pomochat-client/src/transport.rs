//! WebSocket transport for the runtime.
//!
//! Each [`WsLink`] is backed by a spawned task that owns the socket. The task
//! reports everything it sees through the [`EventSink`]; the link only queues
//! writes and close requests. This keeps the runtime free of socket I/O.

use std::time::Duration;

use futures::{SinkExt, Stream, StreamExt};
use pomochat_app::{EventSink, Link, LinkError, Transport, TransportEvent};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_tungstenite::{
    connect_async,
    tungstenite::{
        self, Message as WsMessage,
        protocol::{CloseFrame, frame::coding::CloseCode},
    },
};
use url::Url;

/// How long to wait for the peer to acknowledge a close.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Close code sent when the link is dropped without an explicit close.
const NORMAL_CLOSURE: u16 = 1000;

/// WebSocket errors, reported to the session as text.
#[derive(Debug, Error)]
pub enum WsError {
    /// Connection or upgrade failed.
    #[error("websocket handshake failed: {0}")]
    Handshake(String),

    /// Read or write on an open socket failed.
    #[error("websocket stream error: {0}")]
    Stream(String),
}

enum Outgoing {
    Text(String),
    Close { code: u16, reason: String },
}

/// Opens WebSocket connections with `tokio-tungstenite`.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsTransport;

impl Transport for WsTransport {
    type Link = WsLink;

    fn open(&mut self, url: &Url, sink: EventSink) -> WsLink {
        let (outgoing, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_connection(url.clone(), sink, rx));
        WsLink { outgoing, closing: false }
    }
}

/// Handle to one WebSocket connection.
///
/// Writes queued before the socket opens are sent once it does. Dropping the
/// link closes the socket normally.
pub struct WsLink {
    outgoing: mpsc::UnboundedSender<Outgoing>,
    closing: bool,
}

impl Link for WsLink {
    fn send(&mut self, payload: String) -> Result<(), LinkError> {
        if self.closing {
            return Err(LinkError::Closed);
        }
        self.outgoing.send(Outgoing::Text(payload)).map_err(|_| LinkError::Closed)
    }

    fn close(&mut self, code: u16, reason: &str) {
        if self.closing {
            return;
        }
        self.closing = true;
        let _ = self.outgoing.send(Outgoing::Close { code, reason: reason.to_string() });
    }
}

/// Own the socket for one connection until it closes.
async fn run_connection(
    url: Url,
    sink: EventSink,
    mut outgoing: mpsc::UnboundedReceiver<Outgoing>,
) {
    let generation = sink.generation();

    let socket = match connect_async(url.as_str()).await {
        Ok((socket, _response)) => socket,
        Err(e) => {
            let error = WsError::Handshake(e.to_string());
            tracing::debug!(%generation, %error, "websocket open failed");
            sink.error(error.to_string());
            return;
        },
    };

    tracing::debug!(%generation, "websocket open");
    if !sink.opened() {
        return;
    }

    let (mut write, mut read) = socket.split();

    loop {
        tokio::select! {
            request = outgoing.recv() => {
                let (code, reason) = match request {
                    Some(Outgoing::Text(payload)) => {
                        if let Err(e) = write.send(WsMessage::Text(payload)).await {
                            report_write_failure(&sink, &e);
                        }
                        continue;
                    },
                    Some(Outgoing::Close { code, reason }) => (code, reason),
                    None => (NORMAL_CLOSURE, String::new()),
                };

                let frame = CloseFrame { code: CloseCode::from(code), reason: reason.into() };
                if let Err(e) = write.send(WsMessage::Close(Some(frame))).await {
                    tracing::debug!(%generation, error = %e, "websocket close frame not sent");
                }

                let (code, reason) = tokio::time::timeout(CLOSE_TIMEOUT, wait_for_close(&mut read))
                    .await
                    .unwrap_or((None, String::new()));
                sink.closed(code, reason);
                break;
            },

            incoming = read.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    sink.received(text);
                },
                Some(Ok(WsMessage::Close(frame))) => {
                    let (code, reason) = close_details(frame);
                    tracing::debug!(%generation, ?code, %reason, "websocket closed by peer");
                    sink.closed(code, reason);
                    break;
                },
                // Control frames are answered by tungstenite; binary is not part of the protocol
                Some(Ok(_)) => {},
                Some(Err(e)) => {
                    sink.error(WsError::Stream(e.to_string()).to_string());
                    sink.closed(None, String::new());
                    break;
                },
                None => {
                    sink.closed(None, String::new());
                    break;
                },
            },
        }
    }
}

/// Report a text frame the socket failed to write.
///
/// The connection stays up; a broken socket is reported separately when the
/// read side sees it.
fn report_write_failure(sink: &EventSink, error: &tungstenite::Error) {
    let message = WsError::Stream(error.to_string()).to_string();
    tracing::debug!(generation = %sink.generation(), %message, "websocket write failed");
    sink.emit(TransportEvent::SendFailed { message });
}

/// Read until the peer's close frame or the end of the stream.
async fn wait_for_close<S>(read: &mut S) -> (Option<u16>, String)
where
    S: Stream<Item = Result<WsMessage, tungstenite::Error>> + Unpin,
{
    while let Some(message) = read.next().await {
        match message {
            Ok(WsMessage::Close(frame)) => return close_details(frame),
            Ok(_) => {},
            Err(_) => break,
        }
    }
    (None, String::new())
}

fn close_details(frame: Option<CloseFrame<'_>>) -> (Option<u16>, String) {
    match frame {
        Some(frame) => (Some(u16::from(frame.code)), frame.reason.into_owned()),
        None => (None, String::new()),
    }
}

#[cfg(test)]
mod tests {
    use pomochat_app::Generation;
    use tokio::sync::mpsc;

    use super::*;

    #[test]
    fn write_failure_is_a_send_failure() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sink = EventSink::new(Generation::new(4), tx);

        report_write_failure(&sink, &tungstenite::Error::AlreadyClosed);

        let (generation, event) = rx.try_recv().unwrap();
        assert_eq!(generation, Generation::new(4));
        let TransportEvent::SendFailed { message } = event else {
            panic!("expected SendFailed, got {event:?}");
        };
        assert!(message.starts_with("websocket stream error"));
    }

    #[test]
    fn close_details_without_frame() {
        assert_eq!(close_details(None), (None, String::new()));
        let frame = CloseFrame { code: CloseCode::from(1001), reason: "going away".into() };
        assert_eq!(close_details(Some(frame)), (Some(1001), "going away".to_string()));
    }
}
