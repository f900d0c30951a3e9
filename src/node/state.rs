//! Per-node election state.

use crate::time::Timestamp;

use super::id::NodeId;

/// Where a node stands in the election protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeState {
    /// This node is the elected leader.
    King,
    /// A king is known and answered the last ping.
    Idle,
    /// A ping to the king is outstanding (also the state at startup).
    WaitingForPong,
    /// `Alive` went to every stronger node; waiting for one to answer.
    WaitingForFine,
    /// A stronger node answered; waiting for its coronation.
    WaitingForKing,
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeState::King => "KING",
            NodeState::Idle => "IDLE",
            NodeState::WaitingForPong => "WAITING_FOR_PONG",
            NodeState::WaitingForFine => "WAITING_FOR_FINE",
            NodeState::WaitingForKing => "WAITING_FOR_KING",
        };
        f.write_str(name)
    }
}

/// The mutable record owned by one node's execution loop.
///
/// Invariants kept by [`Node`](super::Node):
/// - `King` implies `known_king == Some(identity)` and a `NEVER` deadline.
/// - `Idle` implies `known_king.is_some()`.
/// - `alive` only ever goes from `true` to `false`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeRecord {
    pub identity: NodeId,
    pub state: NodeState,
    /// When the node must re-evaluate its state absent a message. Also the
    /// receive deadline.
    pub next_action_time: Timestamp,
    pub known_king: Option<NodeId>,
    pub alive: bool,
}

impl NodeRecord {
    /// The record a node starts with: no king known, deadline already due.
    pub fn new(identity: NodeId) -> Self {
        NodeRecord {
            identity,
            state: NodeState::WaitingForPong,
            next_action_time: Timestamp::ZERO,
            known_king: None,
            alive: true,
        }
    }

    pub fn is_king(&self) -> bool {
        self.state == NodeState::King
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_record() {
        let rec = NodeRecord::new(NodeId::new(3));
        assert_eq!(rec.state, NodeState::WaitingForPong);
        assert_eq!(rec.next_action_time, Timestamp::ZERO);
        assert_eq!(rec.known_king, None);
        assert!(rec.alive);
        assert!(!rec.is_king());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(NodeState::WaitingForFine.to_string(), "WAITING_FOR_FINE");
        assert_eq!(NodeState::King.to_string(), "KING");
    }
}
