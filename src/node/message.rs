//! Protocol vocabulary: message kinds, messages and mailbox envelopes.

use super::id::NodeId;

// ── MessageKind ───────────────────────────────────────────────────────

/// The closed set of election messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    /// Liveness probe sent by an idle node to its king.
    Ping,
    /// The king's answer to `Ping`.
    Pong,
    /// Election probe sent to every stronger node.
    Alive,
    /// Answer to `Alive`: a stronger node is alive and takes over.
    FineThanks,
    /// Coronation announcement sent to every weaker node.
    IAmTheKing,
    /// Stop the receiving node permanently.
    Kill,
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MessageKind::Ping => "PING",
            MessageKind::Pong => "PONG",
            MessageKind::Alive => "ALIVE",
            MessageKind::FineThanks => "FINETHANKS",
            MessageKind::IAmTheKing => "IAMTHEKING",
            MessageKind::Kill => "KILL",
        };
        f.write_str(name)
    }
}

// ── Message ───────────────────────────────────────────────────────────

/// A protocol message: its kind and the identity of the sender.
///
/// Equality is structural, so tests can compare queued messages directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub kind: MessageKind,
    pub from: NodeId,
}

impl Message {
    #[inline]
    pub fn new(kind: MessageKind, from: NodeId) -> Self {
        Message { kind, from }
    }
}

impl std::fmt::Display for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} from {}", self.kind, self.from)
    }
}

// ── Envelope ──────────────────────────────────────────────────────────

/// What a mailbox actually holds.
///
/// Protocol sends always produce `Protocol`. `Opaque` stands for any
/// payload a node cannot interpret; nodes log it and carry on.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum Envelope {
    Protocol(Message),
    Opaque(String),
}

impl Envelope {
    /// The protocol message inside, if any.
    pub fn message(&self) -> Option<Message> {
        match self {
            Envelope::Protocol(msg) => Some(*msg),
            Envelope::Opaque(_) => None,
        }
    }
}

impl From<Message> for Envelope {
    fn from(msg: Message) -> Self {
        Envelope::Protocol(msg)
    }
}

impl std::fmt::Display for Envelope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Envelope::Protocol(msg) => write!(f, "{}", msg),
            Envelope::Opaque(s) => {
                if s.chars().count() > 32 {
                    let head: String = s.chars().take(32).collect();
                    write!(f, "Opaque(\"{}…\")", head)
                } else {
                    write!(f, "Opaque({:?})", s)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Message::new(MessageKind::Ping, NodeId::new(1));
        assert_eq!(a, Message::new(MessageKind::Ping, NodeId::new(1)));
        assert_ne!(a, Message::new(MessageKind::Pong, NodeId::new(1)));
        assert_ne!(a, Message::new(MessageKind::Ping, NodeId::new(2)));
    }

    #[test]
    fn test_envelope_message() {
        let msg = Message::new(MessageKind::Kill, NodeId::new(0));
        assert_eq!(Envelope::from(msg).message(), Some(msg));
        assert_eq!(Envelope::Opaque("junk".into()).message(), None);
    }

    #[test]
    fn test_display() {
        let msg = Message::new(MessageKind::IAmTheKing, NodeId::new(3));
        assert_eq!(msg.to_string(), "IAMTHEKING from N3");
        assert_eq!(Envelope::Opaque("x".into()).to_string(), "Opaque(\"x\")");
    }
}
