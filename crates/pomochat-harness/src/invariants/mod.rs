//! Invariant checking for deterministic simulation testing.
//!
//! Invariants are properties that must always hold during session
//! execution. Unlike example-based tests that check specific scenarios,
//! invariants verify behavioral properties across all possible execution
//! paths.
//!
//! # Architecture
//!
//! Observable session state is captured into a [`SystemSnapshot`], then
//! registered [`Invariant`] checks run against it. Violations carry enough
//! context to debug the failing step.
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = SystemSnapshot::single(SessionSnapshot::observe("alice", &session));
//! registry.assert_all(&snapshot, "after connect");
//! ```

mod checks;
mod snapshot;

pub use checks::{
    ConnectingConnectedExclusive, MessageLogAppendOnly, RoomIdAgreement, RoomIdMatchesParticipants,
    RoomRequiresConnection, TransportMatchesConnection,
};
pub use snapshot::{SessionSnapshot, SystemSnapshot};

/// Identifies an invariant in violation reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvariantKind {
    /// Never connecting and connected at once.
    ConnectingConnectedExclusive,
    /// A room exists exactly while connected.
    RoomRequiresConnection,
    /// A transport is exposed exactly while connected.
    TransportMatchesConnection,
    /// Room id is the sorted pair of its participants.
    RoomIdMatchesParticipants,
    /// Messages are only ever appended within one connection.
    MessageLogAppendOnly,
    /// Peers talking to each other agree on the room id.
    RoomIdAgreement,
}

impl std::fmt::Display for InvariantKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Invariant check result.
pub type InvariantResult = Result<(), Violation>;

/// Invariant violation with context.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Violated invariant.
    pub invariant: InvariantKind,
    /// Description of what went wrong.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// An invariant that can be checked against system state.
pub trait Invariant: Send + Sync {
    /// Invariant identity for error reporting.
    fn kind(&self) -> InvariantKind;

    /// Check the invariant against the current state.
    fn check(&self, state: &SystemSnapshot) -> InvariantResult;
}

/// Registry of invariants to check.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Create a registry with every session invariant.
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(ConnectingConnectedExclusive);
        registry.add(RoomRequiresConnection);
        registry.add(TransportMatchesConnection);
        registry.add(RoomIdMatchesParticipants);
        registry.add(MessageLogAppendOnly);
        registry.add(RoomIdAgreement);
        registry
    }

    /// Add an invariant to the registry.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Check all invariants against the given state.
    ///
    /// Returns `Ok(())` if all invariants hold, or all violations found.
    pub fn check_all(&self, state: &SystemSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Check all invariants, panicking with every violation.
    #[allow(clippy::panic, reason = "test assertion helper")]
    pub fn assert_all(&self, state: &SystemSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("Invariant violation {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of registered invariants.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// Check if registry is empty.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 6);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&SystemSnapshot::empty()).is_ok());
    }
}
