//! SendRecord: one protocol send observed by the virtual-time harness.

use crate::time::Timestamp;

use super::id::NodeId;
use super::message::Message;

/// A record of a single `send`.
///
/// The harness appends one per protocol send, in send order. The trace is
/// for assertions and post-mortem reading only; actors never see it.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct SendRecord {
    /// Virtual time of the send.
    pub time: Timestamp,
    /// Destination mailbox.
    pub to: NodeId,
    /// The message; `message.from` is the sender.
    pub message: Message,
}

impl std::fmt::Display for SendRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {} -> {} {}",
            self.time, self.message.from, self.to, self.message.kind,
        )
    }
}
