//! Point-in-time view of every election node.
//!
//! Runtimes build a `ClusterSnapshot` from the actors they own; callers
//! query it for convergence (one king, known by everyone alive) and export
//! it as JSON for the CLI.

use crate::node::{Actor, Node, NodeId, NodeRecord};
use crate::time::Timestamp;

/// Copies of every election node's record, in identity order.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterSnapshot {
    /// Runtime time the snapshot was taken at.
    pub time: Timestamp,
    pub nodes: Vec<NodeRecord>,
}

impl ClusterSnapshot {
    /// Collect the records of all [`Node`] actors; other actor types are
    /// skipped.
    pub fn collect<'a>(
        time: Timestamp,
        actors: impl IntoIterator<Item = &'a Box<dyn Actor>>,
    ) -> Self {
        let mut nodes: Vec<NodeRecord> = actors
            .into_iter()
            .filter_map(|actor| actor.as_any().downcast_ref::<Node>())
            .map(|node| node.record().clone())
            .collect();
        nodes.sort_by_key(|record| record.identity);
        ClusterSnapshot { time, nodes }
    }

    /// The record of node `id`, if it is an election node.
    pub fn record(&self, id: NodeId) -> Option<&NodeRecord> {
        self.nodes.iter().find(|record| record.identity == id)
    }

    /// Records of nodes that have not been killed.
    pub fn live(&self) -> impl Iterator<Item = &NodeRecord> {
        self.nodes.iter().filter(|record| record.alive)
    }

    /// Live nodes currently holding the crown.
    pub fn kings(&self) -> Vec<NodeId> {
        self.live()
            .filter(|record| record.is_king())
            .map(|record| record.identity)
            .collect()
    }

    /// `Some(king)` when exactly one live node is king and every live node
    /// knows it.
    pub fn agreed_king(&self) -> Option<NodeId> {
        let kings = self.kings();
        let king = match kings.as_slice() {
            [king] => *king,
            _ => return None,
        };
        self.live()
            .all(|record| record.known_king == Some(king))
            .then_some(king)
    }

    /// Export as a JSON string.
    #[cfg(feature = "serialize")]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".into())
    }

    /// Export as a JSON string.
    #[cfg(not(feature = "serialize"))]
    pub fn to_json(&self) -> String {
        let mut s = String::from("{\n");
        s.push_str(&format!("  \"time\": {},\n", self.time.millis()));
        s.push_str("  \"nodes\": [\n");
        for (i, record) in self.nodes.iter().enumerate() {
            let king = match record.known_king {
                Some(id) => id.raw().to_string(),
                None => "null".to_string(),
            };
            s.push_str(&format!(
                "    {{\"identity\": {}, \"state\": \"{}\", \"next_action_time\": {}, \"known_king\": {}, \"alive\": {}}}",
                record.identity.raw(),
                record.state,
                record.next_action_time.millis(),
                king,
                record.alive,
            ));
            if i < self.nodes.len() - 1 {
                s.push(',');
            }
            s.push('\n');
        }
        s.push_str("  ]\n}");
        s
    }
}

impl std::fmt::Display for ClusterSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "cluster at {}", self.time)?;
        for record in &self.nodes {
            let king = record
                .known_king
                .map(|id| id.to_string())
                .unwrap_or_else(|| "-".into());
            writeln!(
                f,
                "  {} {:<16} king={} next={}{}",
                record.identity,
                record.state,
                king,
                record.next_action_time,
                if record.alive { "" } else { " (dead)" },
            )?;
        }
        Ok(())
    }
}
