use std::collections::HashMap;
use std::fmt;
use std::sync::Mutex;

use tokio::sync::mpsc;

/// Stable identity of a peer connection.
///
/// Ids are allocated from a monotonically increasing counter and never
/// reused, so an id held past its connection's lifetime (e.g. by a pending
/// job record) can never address a different peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(u64);

impl ConnId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Write-side handle to a registered peer.
///
/// Holds the sender half of the connection's outbox; the paired writer task
/// drains it into the socket in order. Dropping the last clone (by removing
/// the peer from the registry) closes the outbox and ends the writer.
#[derive(Debug, Clone)]
pub struct PeerHandle {
    id: ConnId,
    outbox: mpsc::UnboundedSender<String>,
}

impl PeerHandle {
    pub fn new(id: ConnId, outbox: mpsc::UnboundedSender<String>) -> Self {
        Self { id, outbox }
    }

    pub fn id(&self) -> ConnId {
        self.id
    }

    /// Queue a frame for the peer's writer task. Returns false if the writer
    /// has already gone away; the caller treats that as a silent skip.
    pub fn enqueue(&self, line: String) -> bool {
        self.outbox.send(line).is_ok()
    }
}

/// Set of currently attached peer connections.
///
/// Mutated by the accept path (add) and by reader tasks on close (remove),
/// iterated by the dispatcher. The mutex keeps iteration and mutation
/// mutually exclusive; visitors run inside the critical section and see a
/// stable snapshot, so they must be quick and must not call back into the
/// registry.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    peers: Mutex<HashMap<ConnId, PeerHandle>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, peer: PeerHandle) {
        self.peers
            .lock()
            .expect("registry lock poisoned")
            .insert(peer.id(), peer);
    }

    pub fn remove(&self, id: ConnId) {
        self.peers.lock().expect("registry lock poisoned").remove(&id);
    }

    pub fn contains(&self, id: ConnId) -> bool {
        self.peers
            .lock()
            .expect("registry lock poisoned")
            .contains_key(&id)
    }

    /// Invoke `visit` once per currently registered peer, in no particular
    /// order. A peer removed before the call starts is never yielded.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&PeerHandle),
    {
        let peers = self.peers.lock().expect("registry lock poisoned");
        for peer in peers.values() {
            visit(peer);
        }
    }

    pub fn len(&self) -> usize {
        self.peers.lock().expect("registry lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
