//! WebSocket transport against a local echo endpoint.
//!
//! The endpoint accepts one connection, echoes every text frame back and
//! answers close frames. Tests drive the transport directly and observe the
//! generation-tagged events it reports.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use pomochat_app::{EventSink, Generation, Link, Transport, TransportEvent};
use pomochat_client::transport::WsTransport;
use tokio::{net::TcpListener, sync::mpsc};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use url::Url;

/// Bind a one-shot echo endpoint and return its URL.
async fn echo_endpoint() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut socket = accept_async(stream).await.unwrap();
        // Close frames are answered by tungstenite on the next read
        while let Some(Ok(message)) = socket.next().await {
            if let Message::Text(text) = message {
                socket.send(Message::Text(text)).await.unwrap();
            }
        }
    });

    Url::parse(&format!("ws://{addr}/chat?userID=alice&chatWithID=bob")).unwrap()
}

async fn next_event(
    rx: &mut mpsc::UnboundedReceiver<(Generation, TransportEvent)>,
) -> (Generation, TransportEvent) {
    tokio::time::timeout(Duration::from_secs(10), rx.recv())
        .await
        .expect("transport event not reported")
        .expect("event channel closed")
}

#[tokio::test]
async fn opens_echoes_and_closes() {
    let url = echo_endpoint().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let generation = Generation::new(7);

    let mut link = WsTransport.open(&url, EventSink::new(generation, tx));
    assert_eq!(next_event(&mut rx).await, (generation, TransportEvent::Opened));

    link.send(r#"{"senderID":"alice","receiverID":"bob","body":"hi"}"#.into()).unwrap();
    let (tagged, event) = next_event(&mut rx).await;
    assert_eq!(tagged, generation);
    assert_eq!(
        event,
        TransportEvent::Received(r#"{"senderID":"alice","receiverID":"bob","body":"hi"}"#.into())
    );

    link.close(1000, "User disconnected");
    let (_, event) = next_event(&mut rx).await;
    assert!(matches!(event, TransportEvent::Closed { .. }));

    assert!(link.send("late".into()).is_err());
}

#[tokio::test]
async fn unreachable_endpoint_reports_error() {
    // Bind then drop to get a port nobody listens on
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (tx, mut rx) = mpsc::unbounded_channel();
    let url = Url::parse(&format!("ws://{addr}/chat")).unwrap();
    let _link = WsTransport.open(&url, EventSink::new(Generation::new(1), tx));

    let (_, event) = next_event(&mut rx).await;
    assert!(matches!(event, TransportEvent::Error { .. }));
}

#[tokio::test]
async fn close_before_open_is_sent_once_open() {
    let url = echo_endpoint().await;
    let (tx, mut rx) = mpsc::unbounded_channel();

    let mut link = WsTransport.open(&url, EventSink::new(Generation::new(2), tx));
    link.close(1000, "User disconnected");

    assert_eq!(next_event(&mut rx).await.1, TransportEvent::Opened);
    let (_, event) = next_event(&mut rx).await;
    assert!(matches!(event, TransportEvent::Closed { .. }));
}
