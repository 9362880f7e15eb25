//! Application layer for pomochat
//!
//! Async runtime and UI command surface around the Sans-IO
//! [`pomochat_core::ChatSession`]. The same runtime code drives the
//! production WebSocket transport and the deterministic simulation hub.
//!
//! # Components
//!
//! - [`Runtime`]: event loop owning the session and its connections
//! - [`ChatHandle`]: cloneable command surface with snapshot subscription
//! - [`Transport`], [`Link`]: connection abstraction implemented per platform
//! - [`EventSink`]: generation-tagged reporting handle given to transports

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod command;
mod error;
mod handle;
mod runtime;
mod transport;

pub use error::ChatError;
pub use handle::ChatHandle;
pub use pomochat_core::{
    ChatSnapshot, Environment, Generation, Message, ParticipantId, Room, RoomId, SessionConfig,
    SessionError, TransportEvent,
};
pub use runtime::{Runtime, RuntimeConfig};
pub use transport::{EventSink, EventTx, Link, LinkError, Transport};
