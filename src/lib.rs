//! # monarch — timeout-driven king election
//!
//! A fixed cluster of numbered nodes elects the lowest living identity as
//! king, with no coordinator: nodes ping their king, presume it dead on
//! silence, and race to replace it through `ALIVE` / `FINETHANKS` /
//! `IAMTHEKING` exchanges.
//!
//! The protocol is written once against the [`ActorSystem`] contract and
//! runs unchanged on two runtimes:
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │                  Node                      │ ← election state machine
//! │         (deadline check + message fold)    │
//! └───────────────────┬────────────────────────┘
//!                     │ &dyn ActorSystem
//!        ┌────────────┴─────────────┐
//! ┌──────┴──────────────┐  ┌────────┴────────────┐
//! │ VirtualActorSystem  │  │ ThreadedActorSystem │
//! │  manual clock       │  │  thread per node    │
//! │  tick(id) by hand   │  │  crossbeam mailbox  │
//! └─────────────────────┘  └─────────────────────┘
//! ```
//!
//! The virtual-time harness reproduces every interleaving near a timeout
//! boundary exactly; the threaded runtime is the real thing.

pub mod config;
pub mod error;
pub mod harness;
pub mod node;
pub mod runtime;
pub mod scenario;
pub mod snapshot;
pub mod time;

// Re-exports for convenience.
pub use config::ElectionConfig;
pub use error::{ElectionError, ElectionResult};
pub use harness::VirtualActorSystem;
pub use node::{
    run_actor, Actor, ActorSystem, Envelope, Message, MessageKind, Node, NodeId, NodeRecord,
    NodeState, SendRecord,
};
pub use runtime::{ShutdownReport, ThreadedActorSystem};
pub use scenario::{start_nodes, Scenario, ScenarioBuilder};
pub use snapshot::ClusterSnapshot;
pub use time::Timestamp;
