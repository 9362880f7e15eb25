//! Deterministic simulation harness for pomochat session testing.
//!
//! In-process implementations of the `Environment` and `Transport` seams, so
//! the production runtime can be driven end to end without sockets or a
//! wall clock.
//!
//! # Simulated Endpoint
//!
//! [`SimHub`] models the chat server: one room per participant pair,
//! broadcast including the sender, sender correction and system notices.
//! [`OpenPolicy`] controls whether opens complete immediately, on demand or
//! never, which is how tests reach the in-flight connection states.
//!
//! # Invariant Testing
//!
//! The `invariants` module provides behavioral testing through invariant
//! checks. Invariants verify WHAT must be true across all execution paths, not
//! specific scenarios. Use [`InvariantRegistry::standard()`] for the session
//! invariants.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_client;
pub mod sim_env;
pub mod sim_hub;
pub mod sim_transport;

pub use invariants::{
    ConnectingConnectedExclusive, Invariant, InvariantKind, InvariantRegistry, InvariantResult,
    MessageLogAppendOnly, RoomIdAgreement, RoomIdMatchesParticipants, RoomRequiresConnection,
    SessionSnapshot, SystemSnapshot, TransportMatchesConnection, Violation,
};
pub use sim_client::spawn_client;
pub use sim_env::SimEnv;
pub use sim_hub::{Broadcast, OpenPolicy, SimHub};
pub use sim_transport::{SimLink, SimTransport};
