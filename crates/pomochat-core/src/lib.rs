//! Chat session core
//!
//! Sans-IO state machine for a two-party chat session: connection lifecycle,
//! room identity derivation, inbound message ordering and error surfacing.
//!
//! # Architecture
//!
//! [`ChatSession`] never performs I/O. Commands (`connect`, `send`,
//! `disconnect`) and transport notifications ([`TransportEvent`]) go in,
//! [`SessionAction`]s come out for the caller to execute. Every connection
//! attempt is tagged with a [`Generation`] so notifications from abandoned
//! attempts are recognised and ignored.
//!
//! # Components
//!
//! - [`ChatSession`]: the state machine
//! - [`Room`], [`RoomId`]: client-local model of one conversation
//! - [`Message`], [`OutboundMessage`]: JSON wire shapes
//! - [`SessionConfig`]: chat endpoint and close parameters
//! - [`Environment`]: wall-clock source for outbound timestamps

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod config;
pub mod env;
pub mod error;
pub mod event;
pub mod message;
pub mod room;
pub mod session;

pub use config::SessionConfig;
pub use env::Environment;
pub use error::{ConfigError, SessionError, WireError};
pub use event::{Generation, SessionAction, TransportEvent};
pub use message::{Message, OutboundMessage, ParticipantId};
pub use room::{Room, RoomId};
pub use session::{ChatSession, ChatSnapshot, SessionState};
