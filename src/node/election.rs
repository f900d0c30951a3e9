//! `Node` — the king election state machine.
//!
//! Priority is by ascending identity: `N0` crowns itself without asking
//! anyone, every other node first makes sure no stronger node is alive
//! (`ALIVE` / `FINETHANKS`) and always defers to a coronation it hears.
//!
//! Each scheduling round has two steps:
//!
//! | step | when | what |
//! |---|---|---|
//! | deadline check | `now >= next_action_time` | act on the current state |
//! | message fold | always | one `receive`, bounded by the deadline |
//!
//! Deadlines per state, with `T` the timeout unit:
//!
//! | state | on deadline | armed for |
//! |---|---|---|
//! | `Idle` | `PING` the king, wait for `PONG` | `4T` |
//! | `WaitingForPong` | king presumed dead, start an election |  |
//! | `WaitingForFine` | nobody stronger answered, crown self |  |
//! | `WaitingForKing` | the answering node died, start over |  |
//! | `King` | never fires | `NEVER` |
//!
//! After `FINETHANKS` a node waits `2T` for the coronation: the node that
//! answered runs the same election and needs a full `T` of its own before
//! it may crown itself.

use crate::config::ElectionConfig;
use crate::error::{ElectionError, ElectionResult};
use crate::time::Timestamp;

use super::id::NodeId;
use super::message::{Envelope, Message, MessageKind};
use super::state::{NodeRecord, NodeState};
use super::traits::{Actor, ActorSystem};

/// Outstanding `PING` is given this many timeout units.
const PONG_WAIT_UNITS: u64 = 4;
/// Coronation after `FINETHANKS` is given this many timeout units.
const KING_WAIT_UNITS: u64 = 2;

/// One participant in the election.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    nodes_count: u32,
    timeout: u64,
    pub(super) record: NodeRecord,
}

impl Node {
    /// Create a node of a cluster of `nodes_count` with timeout unit `timeout`.
    pub fn new(id: NodeId, nodes_count: u32, timeout: u64) -> Self {
        Node {
            id,
            nodes_count,
            timeout,
            record: NodeRecord::new(id),
        }
    }

    pub fn from_config(id: NodeId, config: &ElectionConfig) -> Self {
        Node::new(id, config.nodes_count, config.timeout_unit)
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The node's current record.
    pub fn record(&self) -> &NodeRecord {
        &self.record
    }

    // ── Deadline check ────────────────────────────────────────

    fn on_deadline(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()> {
        match self.record.state {
            NodeState::Idle => {
                let king = self.record.known_king.ok_or_else(|| {
                    self.violation("idle without a known king")
                })?;
                sys.send(king, Message::new(MessageKind::Ping, self.id))?;
                self.record.state = NodeState::WaitingForPong;
                self.record.next_action_time =
                    sys.now().plus(self.timeout.saturating_mul(PONG_WAIT_UNITS));
                Ok(())
            }
            NodeState::WaitingForPong => {
                if self.record.known_king.is_some() {
                    sys.log(Some(self.id), "old king is dead");
                }
                self.start_election(sys)
            }
            NodeState::WaitingForFine => self.become_king(sys),
            NodeState::WaitingForKing => self.start_election(sys),
            NodeState::King => Err(self.violation("king reached its own deadline")),
        }
    }

    // ── Message fold ──────────────────────────────────────────

    fn fold(&mut self, sys: &dyn ActorSystem, envelope: Option<Envelope>) -> ElectionResult<()> {
        let msg = match envelope {
            // Timeout.
            None => return Ok(()),
            Some(Envelope::Opaque(payload)) => {
                sys.log(Some(self.id), &format!("got something strange: {}", payload));
                return Ok(());
            }
            Some(Envelope::Protocol(msg)) => msg,
        };
        sys.log(Some(self.id), &format!("received {} from {}", msg.kind, msg.from));

        match msg.kind {
            MessageKind::Ping => {
                sys.send(msg.from, Message::new(MessageKind::Pong, self.id))?;
            }
            MessageKind::Pong => {
                if Some(msg.from) == self.record.known_king {
                    self.record.state = NodeState::Idle;
                    self.record.next_action_time = sys.now().plus(self.timeout);
                }
            }
            MessageKind::Alive => {
                sys.send(msg.from, Message::new(MessageKind::FineThanks, self.id))?;
                self.start_election(sys)?;
            }
            MessageKind::FineThanks => {
                if self.record.state == NodeState::WaitingForFine {
                    self.record.state = NodeState::WaitingForKing;
                    self.record.next_action_time =
                        sys.now().plus(self.timeout.saturating_mul(KING_WAIT_UNITS));
                }
            }
            MessageKind::IAmTheKing => {
                self.record.state = NodeState::Idle;
                self.record.known_king = Some(msg.from);
                self.record.next_action_time = sys.now().plus(self.timeout);
            }
            MessageKind::Kill => {
                self.record.alive = false;
            }
        }
        Ok(())
    }

    // ── Transitions ───────────────────────────────────────────

    fn start_election(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()> {
        if self.id == NodeId::new(0) {
            return self.become_king(sys);
        }
        for stronger in self.id.stronger() {
            sys.send(stronger, Message::new(MessageKind::Alive, self.id))?;
        }
        self.record.state = NodeState::WaitingForFine;
        self.record.next_action_time = sys.now().plus(self.timeout);
        self.record.known_king = None;
        Ok(())
    }

    fn become_king(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()> {
        for weaker in self.id.weaker(self.nodes_count) {
            sys.send(weaker, Message::new(MessageKind::IAmTheKing, self.id))?;
        }
        self.record.state = NodeState::King;
        self.record.next_action_time = Timestamp::NEVER;
        self.record.known_king = Some(self.id);
        Ok(())
    }

    fn violation(&self, detail: &str) -> ElectionError {
        ElectionError::ProtocolViolation {
            node: self.id,
            detail: detail.to_string(),
        }
    }
}

impl Actor for Node {
    fn init(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()> {
        sys.log(Some(self.id), "started");
        self.record = NodeRecord::new(self.id);
        Ok(())
    }

    fn tick(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()> {
        if sys.now() >= self.record.next_action_time {
            if let Err(err) = self.on_deadline(sys) {
                sys.log(Some(self.id), &err.to_string());
                return Err(err);
            }
        }
        let timeout = sys.now().millis_until(self.record.next_action_time);
        let envelope = sys.receive(self.id, timeout)?;
        self.fold(sys, envelope)
    }

    fn should_run(&self) -> bool {
        self.record.alive
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
