//! `ThreadedActorSystem` — one OS thread per actor.
//!
//! Each actor runs [`run_actor`] on its own thread and blocks in
//! `receive` on a crossbeam channel until a message arrives or its
//! deadline passes. Actors never share their state. The mailbox table is
//! the only shared structure, and it is written only by `spawn`.
//!
//! Actors spawned before [`start`](ThreadedActorSystem::start) are parked
//! until then, so every mailbox of a fixed cluster exists before the first
//! node sends anything. Actors spawned after `start` launch immediately.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{error, info};

use crate::error::{ElectionError, ElectionResult};
use crate::node::traits::origin;
use crate::node::{run_actor, Actor, ActorSystem, Envelope, Message, MessageKind, NodeId};
use crate::snapshot::ClusterSnapshot;
use crate::time::Timestamp;

/// What a node thread hands back when its loop ends.
type Outcome = (Box<dyn Actor>, Option<ElectionError>);

struct Mailbox {
    tx: Sender<Envelope>,
    rx: Receiver<Envelope>,
}

struct Shared {
    started_at: Instant,
    running: AtomicBool,
    mailboxes: RwLock<BTreeMap<NodeId, Mailbox>>,
    parked: Mutex<Vec<(NodeId, Box<dyn Actor>)>>,
    threads: Mutex<Vec<(NodeId, JoinHandle<Outcome>)>>,
}

/// Real-time actor system backed by OS threads.
///
/// Cloning is cheap and yields a handle to the same system.
#[derive(Clone)]
pub struct ThreadedActorSystem {
    shared: Arc<Shared>,
}

impl ThreadedActorSystem {
    /// Create an empty, not yet started system. Its clock starts now.
    pub fn new() -> Self {
        ThreadedActorSystem {
            shared: Arc::new(Shared {
                started_at: Instant::now(),
                running: AtomicBool::new(false),
                mailboxes: RwLock::new(BTreeMap::new()),
                parked: Mutex::new(Vec::new()),
                threads: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Launch every parked actor. Later spawns launch immediately.
    pub fn start(&self) -> ElectionResult<()> {
        self.shared.running.store(true, Ordering::SeqCst);
        let parked: Vec<_> = self
            .shared
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for (id, actor) in parked {
            self.launch(id, actor)?;
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Deliver `KILL` to `id`. The node stops once it reads it.
    pub fn kill(&self, id: NodeId) -> ElectionResult<()> {
        self.send(id, Message::new(MessageKind::Kill, id))
    }

    /// Kill every node, wait for all threads and collect the final actors.
    pub fn shutdown(&self) -> ShutdownReport {
        let ids: Vec<NodeId> = self.mailboxes().keys().copied().collect();
        for id in ids {
            // Every listed id has a mailbox, so this cannot fail.
            let _ = self.kill(id);
        }

        let mut actors = BTreeMap::new();
        let mut failures = Vec::new();

        let parked: Vec<_> = self
            .shared
            .parked
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        actors.extend(parked);

        let threads: Vec<_> = self
            .shared
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for (id, handle) in threads {
            match handle.join() {
                Ok((actor, failure)) => {
                    actors.insert(id, actor);
                    if let Some(err) = failure {
                        failures.push((id, err));
                    }
                }
                Err(_) => failures.push((id, ElectionError::ActorPanicked(id))),
            }
        }
        self.shared.running.store(false, Ordering::SeqCst);

        ShutdownReport {
            time: self.now(),
            actors,
            failures,
        }
    }

    fn launch(&self, id: NodeId, mut actor: Box<dyn Actor>) -> ElectionResult<()> {
        let sys = self.clone();
        let handle = thread::Builder::new()
            .name(format!("monarch-{}", id))
            .spawn(move || {
                let outcome = run_actor(&sys, actor.as_mut());
                if let Err(err) = &outcome {
                    error!(node = %id, error = %err, "actor stopped with an error");
                }
                (actor, outcome.err())
            })
            .map_err(|err| ElectionError::ThreadSpawn {
                node: id,
                reason: err.to_string(),
            })?;
        self.shared
            .threads
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, handle));
        Ok(())
    }

    fn mailboxes(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<NodeId, Mailbox>> {
        self.shared
            .mailboxes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ThreadedActorSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ActorSystem for ThreadedActorSystem {
    fn spawn(&self, id: NodeId, actor: Box<dyn Actor>) -> ElectionResult<()> {
        {
            let mut mailboxes = self
                .shared
                .mailboxes
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if mailboxes.contains_key(&id) {
                return Err(ElectionError::ActorAlreadySpawned(id));
            }
            let (tx, rx) = unbounded();
            mailboxes.insert(id, Mailbox { tx, rx });
        }
        if self.is_running() {
            self.launch(id, actor)
        } else {
            self.shared
                .parked
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((id, actor));
            Ok(())
        }
    }

    fn receive(&self, id: NodeId, timeout_millis: u64) -> ElectionResult<Option<Envelope>> {
        let rx = self
            .mailboxes()
            .get(&id)
            .map(|mailbox| mailbox.rx.clone())
            .ok_or(ElectionError::UnknownActor(id))?;
        // The table keeps a sender alive, so the channel never disconnects.
        let envelope = match timeout_millis {
            0 => rx.try_recv().ok(),
            u64::MAX => rx.recv().ok(),
            millis => rx.recv_timeout(Duration::from_millis(millis)).ok(),
        };
        Ok(envelope)
    }

    fn send(&self, to: NodeId, msg: Message) -> ElectionResult<()> {
        let tx = self
            .mailboxes()
            .get(&to)
            .map(|mailbox| mailbox.tx.clone())
            .ok_or(ElectionError::UnknownActor(to))?;
        // Unbounded: never blocks. A stopped node just never reads it.
        let _ = tx.send(Envelope::Protocol(msg));
        Ok(())
    }

    fn now(&self) -> Timestamp {
        let elapsed = self.shared.started_at.elapsed().as_millis();
        Timestamp::new(u64::try_from(elapsed).unwrap_or(u64::MAX))
    }

    fn sleep(&self, millis: u64) {
        thread::sleep(Duration::from_millis(millis));
    }

    fn log(&self, id: Option<NodeId>, text: &str) {
        info!(at = self.now().millis(), node = %origin(id), "{}", text);
    }
}

// ── ShutdownReport ────────────────────────────────────────────────────

/// Final actors and failures of a threaded run.
pub struct ShutdownReport {
    /// Runtime time at which the last thread was joined.
    pub time: Timestamp,
    pub actors: BTreeMap<NodeId, Box<dyn Actor>>,
    /// Nodes whose loop ended with an error or a panic.
    pub failures: Vec<(NodeId, ElectionError)>,
}

impl ShutdownReport {
    /// Downcast a finished actor for inspection.
    pub fn node<T: Actor + 'static>(&self, id: NodeId) -> Option<&T> {
        self.actors.get(&id)?.as_any().downcast_ref::<T>()
    }

    /// Final records of all election nodes.
    ///
    /// A node whose loop ended in a failure is reported dead, whatever its
    /// record last said.
    pub fn snapshot(&self) -> ClusterSnapshot {
        let mut snapshot = ClusterSnapshot::collect(self.time, self.actors.values());
        for record in &mut snapshot.nodes {
            if self.failures.iter().any(|(id, _)| *id == record.identity) {
                record.alive = false;
            }
        }
        snapshot
    }
}
