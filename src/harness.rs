//! Virtual-time reference runtime.
//!
//! Every node gets an unbounded FIFO mailbox that tests can read from the
//! outside, and a single clock shared by all nodes moves only when the
//! driver says so. Nothing runs on its own: `tick(id)` runs exactly one
//! round of one actor, synchronously. `receive` never waits, an empty
//! mailbox simply reads as a timeout. The loop is single-threaded and
//! manually driven, so every interleaving near a timeout boundary can be
//! reproduced exactly.

use std::cell::{Cell, Ref, RefCell, RefMut};
use std::collections::{BTreeMap, VecDeque};

use tracing::debug;

use crate::error::{ElectionError, ElectionResult};
use crate::node::traits::origin;
use crate::node::{Actor, ActorSystem, Envelope, Message, NodeId, SendRecord};
use crate::snapshot::ClusterSnapshot;
use crate::time::Timestamp;

/// Deterministic actor system driven by hand.
///
/// Owns every actor and mailbox. External code addresses nodes by
/// [`NodeId`] only; inspection goes through [`node`](Self::node),
/// [`queue_of`](Self::queue_of) and [`snapshot`](Self::snapshot).
pub struct VirtualActorSystem {
    clock: Cell<Timestamp>,
    mailboxes: RefCell<BTreeMap<NodeId, VecDeque<Envelope>>>,
    actors: RefCell<BTreeMap<NodeId, Box<dyn Actor>>>,
    /// Append-only trace of every protocol send.
    sent: RefCell<Vec<SendRecord>>,
}

impl VirtualActorSystem {
    /// Create an empty system at time zero.
    pub fn new() -> Self {
        VirtualActorSystem {
            clock: Cell::new(Timestamp::ZERO),
            mailboxes: RefCell::new(BTreeMap::new()),
            actors: RefCell::new(BTreeMap::new()),
            sent: RefCell::new(Vec::new()),
        }
    }

    // ── Driving ───────────────────────────────────────────────

    /// Run one round of actor `id`. Stopped actors are left untouched.
    pub fn tick(&self, id: NodeId) -> ElectionResult<()> {
        // The actor leaves the table while it runs so that it can call
        // back into `self` freely.
        let mut actor = self
            .actors
            .borrow_mut()
            .remove(&id)
            .ok_or(ElectionError::UnknownActor(id))?;
        let result = if actor.should_run() {
            actor.tick(self)
        } else {
            Ok(())
        };
        self.actors.borrow_mut().insert(id, actor);
        result
    }

    /// Tick every live actor once, in ascending identity order.
    ///
    /// The order is a harness convenience; real runtimes promise none.
    /// The first error ends the round: higher identities are not ticked.
    pub fn tick_all(&self) -> ElectionResult<()> {
        for id in self.live_ids() {
            self.tick(id)?;
        }
        Ok(())
    }

    /// `rounds` times: advance the clock by `step_millis`, then `tick_all`.
    pub fn run_rounds(&self, rounds: u64, step_millis: u64) -> ElectionResult<()> {
        for _ in 0..rounds {
            self.sleep(step_millis);
            self.tick_all()?;
        }
        Ok(())
    }

    /// Jump the clock to `at`. Moving backward is a test bug and fails.
    pub fn set_time(&self, at: Timestamp) -> ElectionResult<()> {
        let current = self.clock.get();
        if at < current {
            return Err(ElectionError::InvalidTimeTravel {
                current,
                requested: at,
            });
        }
        self.clock.set(at);
        Ok(())
    }

    /// Put any envelope into a mailbox, bypassing the send trace.
    pub fn inject(&self, to: NodeId, envelope: Envelope) -> ElectionResult<()> {
        self.mailboxes
            .borrow_mut()
            .get_mut(&to)
            .ok_or(ElectionError::UnknownActor(to))?
            .push_back(envelope);
        Ok(())
    }

    // ── Inspection ────────────────────────────────────────────

    /// Copy of the pending mailbox of `id`, head first.
    pub fn queue_of(&self, id: NodeId) -> ElectionResult<Vec<Envelope>> {
        self.mailboxes
            .borrow()
            .get(&id)
            .map(|queue| queue.iter().cloned().collect())
            .ok_or(ElectionError::UnknownActor(id))
    }

    /// Number of envelopes waiting for `id`.
    pub fn queue_len(&self, id: NodeId) -> ElectionResult<usize> {
        self.mailboxes
            .borrow()
            .get(&id)
            .map(VecDeque::len)
            .ok_or(ElectionError::UnknownActor(id))
    }

    /// Downcast an actor for inspection.
    ///
    /// Returns `None` if the actor is not registered, has a different
    /// type, or is in the middle of its own tick.
    pub fn node<T: Actor + 'static>(&self, id: NodeId) -> Option<Ref<'_, T>> {
        Ref::filter_map(self.actors.borrow(), |actors| {
            actors.get(&id)?.as_any().downcast_ref::<T>()
        })
        .ok()
    }

    /// Mutable downcast, for tests that need to force a state.
    pub fn node_mut<T: Actor + 'static>(&self, id: NodeId) -> Option<RefMut<'_, T>> {
        RefMut::filter_map(self.actors.borrow_mut(), |actors| {
            actors.get_mut(&id)?.as_any_mut().downcast_mut::<T>()
        })
        .ok()
    }

    /// Whether `id` is registered and has not stopped.
    pub fn is_live(&self, id: NodeId) -> bool {
        self.actors
            .borrow()
            .get(&id)
            .map(|actor| actor.should_run())
            .unwrap_or(false)
    }

    /// All registered identities in ascending order.
    pub fn actor_ids(&self) -> Vec<NodeId> {
        self.actors.borrow().keys().copied().collect()
    }

    /// Registered identities whose actors still run, ascending.
    pub fn live_ids(&self) -> Vec<NodeId> {
        self.actors
            .borrow()
            .iter()
            .filter(|(_, actor)| actor.should_run())
            .map(|(id, _)| *id)
            .collect()
    }

    /// Every protocol send so far, in send order.
    pub fn sent(&self) -> Vec<SendRecord> {
        self.sent.borrow().clone()
    }

    /// Records of all election nodes at the current time.
    pub fn snapshot(&self) -> ClusterSnapshot {
        let actors = self.actors.borrow();
        ClusterSnapshot::collect(self.now(), actors.values())
    }
}

impl Default for VirtualActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem for VirtualActorSystem {
    /// Registers the mailbox and runs `init` right away.
    fn spawn(&self, id: NodeId, mut actor: Box<dyn Actor>) -> ElectionResult<()> {
        {
            let mut mailboxes = self.mailboxes.borrow_mut();
            if mailboxes.contains_key(&id) {
                return Err(ElectionError::ActorAlreadySpawned(id));
            }
            mailboxes.insert(id, VecDeque::new());
        }
        if let Err(err) = actor.init(self) {
            self.mailboxes.borrow_mut().remove(&id);
            return Err(err);
        }
        self.actors.borrow_mut().insert(id, actor);
        Ok(())
    }

    fn receive(&self, id: NodeId, _timeout_millis: u64) -> ElectionResult<Option<Envelope>> {
        self.mailboxes
            .borrow_mut()
            .get_mut(&id)
            .map(VecDeque::pop_front)
            .ok_or(ElectionError::UnknownActor(id))
    }

    fn send(&self, to: NodeId, msg: Message) -> ElectionResult<()> {
        {
            let mut mailboxes = self.mailboxes.borrow_mut();
            let queue = mailboxes
                .get_mut(&to)
                .ok_or(ElectionError::UnknownActor(to))?;
            queue.push_back(Envelope::Protocol(msg));
        }
        self.sent.borrow_mut().push(SendRecord {
            time: self.now(),
            to,
            message: msg,
        });
        self.log(Some(msg.from), &format!("send {} to {}", msg.kind, to));
        Ok(())
    }

    fn now(&self) -> Timestamp {
        self.clock.get()
    }

    fn sleep(&self, millis: u64) {
        self.clock.set(self.clock.get().plus(millis));
    }

    fn log(&self, id: Option<NodeId>, text: &str) {
        debug!(at = self.now().millis(), node = %origin(id), "{}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::MessageKind;

    /// Minimal actor that records what it receives.
    struct Sink {
        id: NodeId,
        received: Vec<Envelope>,
        stopped: bool,
    }

    impl Sink {
        fn boxed(id: u32) -> Box<dyn Actor> {
            Box::new(Sink {
                id: NodeId::new(id),
                received: Vec::new(),
                stopped: false,
            })
        }
    }

    impl Actor for Sink {
        fn init(&mut self, _sys: &dyn ActorSystem) -> ElectionResult<()> {
            Ok(())
        }

        fn tick(&mut self, sys: &dyn ActorSystem) -> ElectionResult<()> {
            if let Some(env) = sys.receive(self.id, 0)? {
                if env.message().map(|m| m.kind) == Some(MessageKind::Kill) {
                    self.stopped = true;
                }
                self.received.push(env);
            }
            Ok(())
        }

        fn should_run(&self) -> bool {
            !self.stopped
        }

        fn as_any(&self) -> &dyn std::any::Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
            self
        }
    }

    fn msg(kind: MessageKind, from: u32) -> Message {
        Message::new(kind, NodeId::new(from))
    }

    #[test]
    fn test_sleep_advances_shared_clock() {
        let sys = VirtualActorSystem::new();
        assert_eq!(sys.now(), Timestamp::ZERO);
        sys.sleep(50);
        sys.sleep(25);
        assert_eq!(sys.now(), Timestamp::new(75));
    }

    #[test]
    fn test_set_time_forward_and_same() {
        let sys = VirtualActorSystem::new();
        sys.set_time(Timestamp::new(100)).unwrap();
        sys.set_time(Timestamp::new(100)).unwrap();
        assert_eq!(sys.now(), Timestamp::new(100));
    }

    #[test]
    fn test_set_time_backward_fails() {
        let sys = VirtualActorSystem::new();
        sys.set_time(Timestamp::new(100)).unwrap();
        let err = sys.set_time(Timestamp::new(99)).unwrap_err();
        assert_eq!(
            err,
            ElectionError::InvalidTimeTravel {
                current: Timestamp::new(100),
                requested: Timestamp::new(99),
            }
        );
        // The clock is untouched by the failed jump.
        assert_eq!(sys.now(), Timestamp::new(100));
    }

    #[test]
    fn test_spawn_twice_fails() {
        let sys = VirtualActorSystem::new();
        sys.spawn(NodeId::new(0), Sink::boxed(0)).unwrap();
        let err = sys.spawn(NodeId::new(0), Sink::boxed(0)).unwrap_err();
        assert_eq!(err, ElectionError::ActorAlreadySpawned(NodeId::new(0)));
    }

    #[test]
    fn test_unknown_actor() {
        let sys = VirtualActorSystem::new();
        let n9 = NodeId::new(9);
        assert_eq!(
            sys.send(n9, msg(MessageKind::Ping, 0)).unwrap_err(),
            ElectionError::UnknownActor(n9)
        );
        assert_eq!(sys.receive(n9, 0).unwrap_err(), ElectionError::UnknownActor(n9));
        assert_eq!(sys.tick(n9).unwrap_err(), ElectionError::UnknownActor(n9));
        assert!(sys.queue_of(n9).is_err());
    }

    #[test]
    fn test_receive_pops_in_fifo_order() {
        let sys = VirtualActorSystem::new();
        let n0 = NodeId::new(0);
        sys.spawn(n0, Sink::boxed(0)).unwrap();

        sys.send(n0, msg(MessageKind::Ping, 1)).unwrap();
        sys.send(n0, msg(MessageKind::Alive, 1)).unwrap();
        sys.send(n0, msg(MessageKind::IAmTheKing, 1)).unwrap();

        assert_eq!(sys.receive(n0, 0).unwrap(), Some(Envelope::from(msg(MessageKind::Ping, 1))));
        assert_eq!(sys.receive(n0, 0).unwrap(), Some(Envelope::from(msg(MessageKind::Alive, 1))));
        assert_eq!(
            sys.receive(n0, 1000).unwrap(),
            Some(Envelope::from(msg(MessageKind::IAmTheKing, 1)))
        );
        // Empty mailbox reads as a timeout, whatever the timeout value.
        assert_eq!(sys.receive(n0, u64::MAX).unwrap(), None);
    }

    #[test]
    fn test_tick_runs_one_round() {
        let sys = VirtualActorSystem::new();
        let n0 = NodeId::new(0);
        sys.spawn(n0, Sink::boxed(0)).unwrap();
        sys.send(n0, msg(MessageKind::Ping, 1)).unwrap();
        sys.send(n0, msg(MessageKind::Ping, 2)).unwrap();

        sys.tick(n0).unwrap();
        assert_eq!(sys.node::<Sink>(n0).unwrap().received.len(), 1);
        assert_eq!(sys.queue_len(n0).unwrap(), 1);
    }

    #[test]
    fn test_stopped_actor_is_skipped() {
        let sys = VirtualActorSystem::new();
        let n0 = NodeId::new(0);
        let n1 = NodeId::new(1);
        sys.spawn(n0, Sink::boxed(0)).unwrap();
        sys.spawn(n1, Sink::boxed(1)).unwrap();

        sys.send(n0, msg(MessageKind::Kill, 0)).unwrap();
        sys.tick_all().unwrap();
        assert!(!sys.is_live(n0));
        assert!(sys.is_live(n1));
        assert_eq!(sys.live_ids(), vec![n1]);

        // Messages to a stopped actor stay queued and are never read.
        sys.send(n0, msg(MessageKind::Ping, 1)).unwrap();
        sys.tick(n0).unwrap();
        sys.tick_all().unwrap();
        assert_eq!(sys.queue_len(n0).unwrap(), 1);
        assert_eq!(sys.node::<Sink>(n0).unwrap().received.len(), 1);
    }

    #[test]
    fn test_inject_bypasses_trace() {
        let sys = VirtualActorSystem::new();
        let n0 = NodeId::new(0);
        sys.spawn(n0, Sink::boxed(0)).unwrap();
        sys.inject(n0, Envelope::Opaque("noise".into())).unwrap();
        sys.send(n0, msg(MessageKind::Pong, 3)).unwrap();

        assert_eq!(sys.queue_len(n0).unwrap(), 2);
        let sent = sys.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, n0);
        assert_eq!(sent[0].message, msg(MessageKind::Pong, 3));
    }

    #[test]
    fn test_run_rounds_advances_time() {
        let sys = VirtualActorSystem::new();
        sys.spawn(NodeId::new(0), Sink::boxed(0)).unwrap();
        sys.run_rounds(10, 50).unwrap();
        assert_eq!(sys.now(), Timestamp::new(500));
    }

    #[test]
    fn test_node_downcast_wrong_type() {
        let sys = VirtualActorSystem::new();
        sys.spawn(NodeId::new(0), Sink::boxed(0)).unwrap();
        assert!(sys.node::<crate::node::Node>(NodeId::new(0)).is_none());
        assert!(sys.node::<Sink>(NodeId::new(1)).is_none());
    }
}
