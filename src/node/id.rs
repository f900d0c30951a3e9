//! Node ID: the fixed identity and priority of an election participant.

/// A unique identifier for a node, in `0..nodes_count`.
///
/// Identities double as election priority: the lower the identity, the
/// stronger the claim to the crown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeId(u32);

impl NodeId {
    #[inline]
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    /// Return the underlying integer.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Every identity `0..nodes_count`, in ascending order.
    pub fn all(nodes_count: u32) -> impl Iterator<Item = NodeId> {
        (0..nodes_count).map(NodeId)
    }

    /// Identities with a stronger claim than `self`: `0..self`.
    pub fn stronger(self) -> impl Iterator<Item = NodeId> {
        (0..self.0).map(NodeId)
    }

    /// Identities with a weaker claim than `self`: `self + 1..nodes_count`.
    pub fn weaker(self, nodes_count: u32) -> impl Iterator<Item = NodeId> {
        (self.0.saturating_add(1)..nodes_count).map(NodeId)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "N{}", self.0)
    }
}
