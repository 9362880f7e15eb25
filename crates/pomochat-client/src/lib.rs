//! Client adapters
//!
//! Production implementations of the seams the [`pomochat_app::Runtime`]
//! is generic over.
//!
//! # Components
//!
//! - [`SystemEnv`]: system wall clock for outbound timestamps
//!
//! # Transport (optional)
//!
//! With the `transport` feature enabled, this crate also provides:
//! - [`transport::WsTransport`]: WebSocket connections via `tokio-tungstenite`
//! - [`transport::WsLink`]: one open WebSocket
//!
//! The `tls` feature adds `wss://` support.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod env;

#[cfg(feature = "transport")]
pub mod transport;

pub use env::SystemEnv;
