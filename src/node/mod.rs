//! Election nodes and the actor contract they run on.
//!
//! Nodes never share memory. Every interaction goes through an
//! [`ActorSystem`]: messages in, messages out, a clock and a log.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeId`] newtype |
//! | [`message`] | [`MessageKind`], [`Message`], [`Envelope`] |
//! | [`state`] | [`NodeState`], [`NodeRecord`] |
//! | [`traits`] | [`Actor`], [`ActorSystem`], [`run_actor`] |
//! | [`election`] | [`Node`], the election state machine |
//! | [`trace`] | [`SendRecord`] |

pub mod election;
pub mod id;
pub mod message;
pub mod state;
pub mod trace;
pub mod traits;

// Flat re-exports so external callers can use `monarch::node::NodeId` etc.
pub use election::Node;
pub use id::NodeId;
pub use message::{Envelope, Message, MessageKind};
pub use state::{NodeRecord, NodeState};
pub use trace::SendRecord;
pub use traits::{run_actor, Actor, ActorSystem};
