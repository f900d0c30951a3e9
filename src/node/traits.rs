//! The actor contract: what a protocol participant implements and what
//! every runtime provides to it.

use crate::error::ElectionResult;
use crate::time::Timestamp;

use super::id::NodeId;
use super::message::{Envelope, Message};

// ── Actor ─────────────────────────────────────────────────────────────

/// Logic of one independently scheduled participant.
///
/// An actor owns its state. Runtimes call `init` once, then `tick`
/// repeatedly for as long as `should_run` holds: the threaded runtime
/// loops on its own thread, the virtual-time harness calls `tick`
/// exactly once per [`VirtualActorSystem::tick`](crate::harness::VirtualActorSystem::tick).
///
/// # Contract
///
/// Implementations **must**:
/// - Route every side effect (send, clock, log) through `sys`.
/// - Perform at most one `receive` per `tick`.
/// - Never flip `should_run` back to `true` once it returned `false`.
///
/// # Example
///
/// ```rust
/// use monarch::harness::VirtualActorSystem;
/// use monarch::node::{Actor, ActorSystem, Message, MessageKind, NodeId};
/// use monarch::ElectionResult;
///
/// struct Counter { id: NodeId, seen: u32, stopped: bool }
///
/// impl Actor for Counter {
///     fn init(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()> {
///         sys.log(Some(self.id), "counting");
///         Ok(())
///     }
///     fn tick(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()> {
///         if let Some(env) = sys.receive(self.id, 0)? {
///             match env.message() {
///                 Some(msg) if msg.kind == MessageKind::Kill => self.stopped = true,
///                 _ => self.seen += 1,
///             }
///         }
///         Ok(())
///     }
///     fn should_run(&self) -> bool { !self.stopped }
///     fn as_any(&self) -> &dyn std::any::Any { self }
///     fn as_any_mut(&mut self) -> &mut dyn std::any::Any { self }
/// }
///
/// let sys = VirtualActorSystem::new();
/// let id = NodeId::new(0);
/// sys.spawn(id, Box::new(Counter { id, seen: 0, stopped: false })).unwrap();
/// sys.send(id, Message::new(MessageKind::Ping, id)).unwrap();
/// sys.tick(id).unwrap();
/// assert_eq!(sys.node::<Counter>(id).unwrap().seen, 1);
/// ```
pub trait Actor: Send {
    /// Prepare the actor's state. Called once, before the first `tick`.
    fn init(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()>;

    /// One scheduling round. An `Err` is fatal to this actor.
    fn tick(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()>;

    /// `false` once the actor has stopped for good.
    fn should_run(&self) -> bool;

    /// Downcast support, used by `node::<T>()` inspection.
    fn as_any(&self) -> &dyn std::any::Any;
    /// Mutable downcast support.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

// ── ActorSystem ───────────────────────────────────────────────────────

/// Capabilities every runtime offers to the actors it hosts.
///
/// Actors only ever see a `&dyn ActorSystem`, which is what lets the same
/// protocol code run on real threads or on a manually advanced clock.
pub trait ActorSystem {
    /// Register an actor under `id`. Fails if `id` is already taken.
    fn spawn(&self, id: NodeId, actor: Box<dyn Actor>) -> ElectionResult<()>;

    /// Take the next envelope addressed to `id`, waiting at most
    /// `timeout_millis`.
    ///
    /// `Ok(None)` means the timeout elapsed. A timeout of 0 returns at once
    /// with whatever is queued; `u64::MAX` waits for a message.
    fn receive(&self, id: NodeId, timeout_millis: u64) -> ElectionResult<Option<Envelope>>;

    /// Enqueue `msg` in the mailbox of `to`. Never blocks.
    fn send(&self, to: NodeId, msg: Message) -> ElectionResult<()>;

    /// Current time. Never decreases.
    fn now(&self) -> Timestamp;

    /// Let at least `millis` pass.
    fn sleep(&self, millis: u64);

    /// Diagnostic output. Invisible to protocol logic.
    fn log(&self, id: Option<NodeId>, text: &str);
}

// ── Runner ────────────────────────────────────────────────────────────

/// Drive an actor until it stops: `init`, then `tick` while it should run.
pub fn run_actor(sys: &dyn ActorSystem, actor: &mut dyn Actor) -> ElectionResult<()> {
    actor.init(sys)?;
    while actor.should_run() {
        actor.tick(sys)?;
    }
    Ok(())
}

/// How log lines name their origin.
pub(crate) fn origin(id: Option<NodeId>) -> String {
    match id {
        Some(id) => id.to_string(),
        None => "SYSTEM".to_string(),
    }
}
