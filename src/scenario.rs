//! Bootstrap helpers: spawn a cluster into any runtime, and script
//! virtual-time runs with kills at chosen instants.

use std::collections::{BTreeSet, VecDeque};

use crate::config::ElectionConfig;
use crate::error::ElectionResult;
use crate::harness::VirtualActorSystem;
use crate::node::{ActorSystem, Message, MessageKind, Node, NodeId};
use crate::snapshot::ClusterSnapshot;
use crate::time::Timestamp;

/// Spawn nodes `0..nodes_count` of `config` into `sys`, in identity order.
pub fn start_nodes(sys: &dyn ActorSystem, config: &ElectionConfig) -> ElectionResult<()> {
    config.validate()?;
    for id in NodeId::all(config.nodes_count) {
        sys.spawn(id, Box::new(Node::from_config(id, config)))?;
    }
    Ok(())
}

// ── ScenarioBuilder ───────────────────────────────────────────────────

/// Fluent builder for a virtual-time election run.
///
/// # Example
/// ```rust
/// use monarch::scenario::ScenarioBuilder;
/// use monarch::{ElectionConfig, NodeId};
///
/// let mut scenario = ScenarioBuilder::new(ElectionConfig::new(3, 500))
///     .kill_at(0, 2500)
///     .build()
///     .unwrap();
/// scenario.run_rounds(200, 50).unwrap();
/// assert_eq!(scenario.snapshot().agreed_king(), Some(NodeId::new(1)));
/// ```
pub struct ScenarioBuilder {
    config: ElectionConfig,
    kills: Vec<(Timestamp, NodeId)>,
}

impl ScenarioBuilder {
    pub fn new(config: ElectionConfig) -> Self {
        ScenarioBuilder {
            config,
            kills: Vec::new(),
        }
    }

    /// Deliver `KILL` to `node` once virtual time reaches `at` millis.
    pub fn kill_at(mut self, node: u32, at: u64) -> Self {
        self.kills.push((Timestamp::new(at), NodeId::new(node)));
        self
    }

    /// Spawn the cluster into a fresh harness.
    pub fn build(self) -> ElectionResult<Scenario> {
        let system = VirtualActorSystem::new();
        start_nodes(&system, &self.config)?;

        let mut kills = self.kills;
        // Stable: kills at the same instant keep their declaration order.
        kills.sort_by_key(|(at, _)| *at);

        Ok(Scenario {
            config: self.config,
            system,
            pending_kills: kills.into(),
            doomed: BTreeSet::new(),
        })
    }
}

// ── Scenario ──────────────────────────────────────────────────────────

/// A built virtual-time run.
pub struct Scenario {
    config: ElectionConfig,
    system: VirtualActorSystem,
    pending_kills: VecDeque<(Timestamp, NodeId)>,
    /// Nodes a `KILL` has been sent to.
    doomed: BTreeSet<NodeId>,
}

impl Scenario {
    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    /// The harness, for direct ticking and inspection.
    pub fn system(&self) -> &VirtualActorSystem {
        &self.system
    }

    /// One round: advance by `step_millis`, deliver due kills, tick all.
    pub fn step(&mut self, step_millis: u64) -> ElectionResult<()> {
        self.system.sleep(step_millis);
        let now = self.system.now();
        while let Some((at, id)) = self.pending_kills.front().copied() {
            if at > now {
                break;
            }
            self.pending_kills.pop_front();
            self.system.log(None, &format!("sending kill to {}", id));
            self.system.send(id, Message::new(MessageKind::Kill, id))?;
            self.doomed.insert(id);
        }
        self.system.tick_all()
    }

    /// Run `rounds` rounds of `step_millis` each.
    pub fn run_rounds(&mut self, rounds: u64, step_millis: u64) -> ElectionResult<()> {
        for _ in 0..rounds {
            self.step(step_millis)?;
        }
        Ok(())
    }

    /// Run rounds until every live node agrees on one king, at most
    /// `max_rounds`. Returns the king, or `None` if the bound was hit.
    ///
    /// Agreement only counts once every scheduled kill has been delivered
    /// and read by its target.
    pub fn run_until_converged(
        &mut self,
        max_rounds: u64,
        step_millis: u64,
    ) -> ElectionResult<Option<NodeId>> {
        for _ in 0..max_rounds {
            self.step(step_millis)?;
            if self.kills_settled() {
                if let Some(king) = self.snapshot().agreed_king() {
                    return Ok(Some(king));
                }
            }
        }
        Ok(None)
    }

    pub fn snapshot(&self) -> ClusterSnapshot {
        self.system.snapshot()
    }

    fn kills_settled(&self) -> bool {
        self.pending_kills.is_empty() && self.doomed.iter().all(|id| !self.system.is_live(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ElectionError;
    use crate::node::NodeState;

    #[test]
    fn test_start_nodes_spawns_cluster() {
        let sys = VirtualActorSystem::new();
        start_nodes(&sys, &ElectionConfig::new(4, 100)).unwrap();
        assert_eq!(sys.actor_ids().len(), 4);
        let snap = sys.snapshot();
        assert!(snap
            .nodes
            .iter()
            .all(|record| record.state == NodeState::WaitingForPong));
    }

    #[test]
    fn test_start_nodes_rejects_bad_config() {
        let sys = VirtualActorSystem::new();
        let err = start_nodes(&sys, &ElectionConfig::new(0, 100)).unwrap_err();
        assert!(matches!(err, ElectionError::InvalidConfig(_)));
        assert!(sys.actor_ids().is_empty());
    }

    #[test]
    fn test_kill_is_delivered_when_due() {
        let mut scenario = ScenarioBuilder::new(ElectionConfig::new(2, 500))
            .kill_at(1, 100)
            .build()
            .unwrap();

        scenario.step(50).unwrap();
        assert!(scenario.system().is_live(NodeId::new(1)));

        // Due at 100: queued this round, then read as soon as the
        // backlog in front of it is consumed.
        scenario.run_rounds(10, 50).unwrap();
        assert!(!scenario.system().is_live(NodeId::new(1)));
        assert!(scenario.system().is_live(NodeId::new(0)));
    }

    #[test]
    fn test_run_until_converged_single_node() {
        let mut scenario = ScenarioBuilder::new(ElectionConfig::new(1, 500))
            .build()
            .unwrap();
        let king = scenario.run_until_converged(5, 50).unwrap();
        assert_eq!(king, Some(NodeId::new(0)));
        assert_eq!(scenario.system().now(), Timestamp::new(50));
    }

    #[test]
    fn test_run_until_converged_waits_for_pending_kills() {
        let mut scenario = ScenarioBuilder::new(ElectionConfig::new(3, 500))
            .kill_at(0, 3000)
            .build()
            .unwrap();
        let king = scenario.run_until_converged(400, 50).unwrap();
        assert_eq!(king, Some(NodeId::new(1)));
        assert!(scenario.system().now() > Timestamp::new(3000));
    }
}
