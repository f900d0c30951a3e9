//! Structured error types for monarch.
//!
//! All fallible public APIs return `ElectionResult<T>`. Every variant here
//! is fatal to whoever observes it: a protocol violation stops the node
//! that hit it, and the remaining variants point at a broken test or a
//! misconfigured cluster rather than a race between nodes. Timeouts and
//! unrecognized payloads are ordinary control flow and never surface here.

use thiserror::Error;

use crate::node::NodeId;
use crate::time::Timestamp;

/// The top-level error type for monarch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElectionError {
    // ── Protocol errors ───────────────────────────────────

    /// The election state machine observed a state it can never legally
    /// be in, such as a king reaching its own deadline.
    #[error("protocol violation on node {node}: {detail}")]
    ProtocolViolation { node: NodeId, detail: String },

    // ── Runtime errors ────────────────────────────────────

    /// The virtual clock was asked to move backward.
    #[error("cannot move time back from {current} to {requested}")]
    InvalidTimeTravel {
        current: Timestamp,
        requested: Timestamp,
    },

    /// A send, receive or tick addressed an identity that was never spawned.
    #[error("actor {0} was never spawned")]
    UnknownActor(NodeId),

    /// `spawn` was called twice for the same identity.
    #[error("actor {0} is already spawned")]
    ActorAlreadySpawned(NodeId),

    /// The threaded runtime could not start a node thread.
    #[error("cannot start a thread for actor {node}: {reason}")]
    ThreadSpawn { node: NodeId, reason: String },

    /// A node thread of the threaded runtime panicked.
    #[error("actor {0} panicked")]
    ActorPanicked(NodeId),

    // ── Config errors ─────────────────────────────────────

    /// The cluster configuration cannot describe a runnable election.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Convenience alias for `Result<T, ElectionError>`.
pub type ElectionResult<T> = Result<T, ElectionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_unknown_actor() {
        let e = ElectionError::UnknownActor(NodeId::new(5));
        assert_eq!(e.to_string(), "actor N5 was never spawned");
    }

    #[test]
    fn test_error_display_time_travel() {
        let e = ElectionError::InvalidTimeTravel {
            current: Timestamp::new(10),
            requested: Timestamp::new(3),
        };
        assert_eq!(e.to_string(), "cannot move time back from 10ms to 3ms");
    }

    #[test]
    fn test_error_display_protocol_violation() {
        let e = ElectionError::ProtocolViolation {
            node: NodeId::new(2),
            detail: "king reached its deadline".into(),
        };
        let s = e.to_string();
        assert!(s.contains("N2"));
        assert!(s.contains("king reached its deadline"));
    }

    #[test]
    fn test_error_is_std_error() {
        let e: Box<dyn std::error::Error> = Box::new(ElectionError::ActorPanicked(NodeId::new(1)));
        assert!(!e.to_string().is_empty());
    }
}
