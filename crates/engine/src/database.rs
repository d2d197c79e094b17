//! The process-wide database container
//!
//! A `Database` owns the per-key update chains, the monotonic
//! transaction-id allocator, and the roster of sessions it has issued. The
//! allocator and the roster live under one global transaction lock so a
//! snapshot build observes both coherently; the chain mapping is a
//! concurrent map whose shard locks play the role of a top-level data lock
//! (chains are created lazily and never removed).
//!
//! Lock order: the global transaction lock comes first and is taken only by
//! `begin_txn`, which then takes per-session locks one at a time. Every
//! other operation takes exactly one session lock followed by at most one
//! chain lock, so no cycle can form.

use std::sync::{Arc, Weak};

use dashmap::DashMap;
use lamina_core::{Error, Result, TxnId};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::chain::UpdateChain;
use crate::session::Session;

/// An in-memory multi-version transactional key-value store.
pub struct Database {
    global: Mutex<GlobalTxn>,
    chains: DashMap<String, Arc<UpdateChain>>,
}

/// Global transaction state: the id allocators and the session roster.
///
/// The roster holds weak handles; clients own their sessions and a dropped
/// session is pruned on the next snapshot build.
struct GlobalTxn {
    /// Next transaction id. Starts at 1; 0 is reserved for "no
    /// transaction". Advances by exactly one per successful begin.
    next_txn_id: TxnId,
    next_session_id: u64,
    sessions: Vec<Weak<Session>>,
}

impl Database {
    /// Create an empty database.
    pub fn new() -> Arc<Self> {
        Arc::new(Database {
            global: Mutex::new(GlobalTxn {
                next_txn_id: 1,
                next_session_id: 0,
                sessions: Vec::new(),
            }),
            chains: DashMap::new(),
        })
    }

    /// Open a new session with a unique id.
    pub fn new_session(self: &Arc<Self>) -> Arc<Session> {
        let mut global = self.global.lock();
        let id = global.next_session_id;
        global.next_session_id += 1;
        let session = Session::new(id, Arc::clone(self));
        global.sessions.push(Arc::downgrade(&session));
        tracing::trace!(session = id, "session opened");
        session
    }

    /// Resolve `key` to its update chain, creating an empty chain on first
    /// touch. The chain lives as long as the database.
    pub(crate) fn update_chain(&self, key: &str) -> Arc<UpdateChain> {
        if let Some(chain) = self.chains.get(key) {
            return chain.value().clone();
        }
        self.chains
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(UpdateChain::new(key)))
            .clone()
    }

    /// Diagnostic head-first dump of `key`'s chain:
    /// `Key: K -> TxnId: T Value: V Verb -> ...`, or `Key: K DNE` for a key
    /// with no chain. Dumping never creates a chain.
    pub fn dump_key(&self, key: &str) -> String {
        match self.chains.get(key) {
            Some(chain) => chain.dump(),
            None => format!("Key: {key} DNE"),
        }
    }

    /// Begin a transaction on `session`: the snapshot builder.
    ///
    /// Under the global transaction lock, allocate this transaction's id
    /// (which doubles as its upper snapshot bound) and walk every other
    /// live session, recording the id of each in-flight transaction in the
    /// concurrent set and lowering the lower snapshot bound to just below
    /// the oldest of them. Ids at or below the lower bound are guaranteed
    /// committed-and-visible; ids at or above the upper bound are
    /// invisible; ids in between are invisible exactly when they are in the
    /// concurrent set, whether or not they commit later.
    pub(crate) fn begin_txn(&self, session: &Session) -> Result<()> {
        let mut global = self.global.lock();

        let mut state = session.state().lock();
        if state.in_txn {
            return Err(Error::AlreadyInTxn);
        }
        state.in_txn = true;

        let id = global.next_txn_id;
        global.next_txn_id += 1;

        // The lower bound starts just past our own id and only moves down,
        // so with no in-flight peers every previously allocated id is
        // visible.
        let mut snap_min = global.next_txn_id;
        let mut concurrent = FxHashSet::default();
        let own_id = session.id();
        global.sessions.retain(|entry| {
            let Some(other) = entry.upgrade() else {
                return false;
            };
            if other.id() == own_id {
                return true;
            }
            let other_state = other.state().lock();
            if other_state.in_txn {
                let other_id = other_state.txn.id();
                concurrent.insert(other_id);
                snap_min = snap_min.min(other_id);
            }
            true
        });

        state.txn.begin(id, snap_min - 1, id, concurrent);
        tracing::trace!(
            session = own_id,
            txn = id,
            snap_min = snap_min - 1,
            snap_max = id,
            "transaction started"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    static_assertions::assert_impl_all!(Database: Send, Sync);

    #[test]
    fn session_ids_are_unique_and_dense() {
        let db = Database::new();
        let ids: Vec<u64> = (0..4).map(|_| db.new_session().id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn update_chain_is_created_once_per_key() {
        let db = Database::new();
        let a = db.update_chain("k");
        let b = db.update_chain("k");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.key(), "k");
    }

    #[test]
    fn dump_key_without_a_chain_reports_dne() {
        let db = Database::new();
        assert_eq!(db.dump_key("ghost"), "Key: ghost DNE");
    }

    #[test]
    fn txn_ids_advance_by_one_per_begin() {
        let db = Database::new();
        let session = db.new_session();
        for expected in 1..=3u64 {
            session.begin_txn().unwrap();
            assert_eq!(session.state().lock().txn.id(), expected);
            session.rollback().unwrap();
        }
        // A refused begin allocates nothing.
        session.begin_txn().unwrap();
        assert_eq!(session.begin_txn(), Err(Error::AlreadyInTxn));
        session.rollback().unwrap();
        session.begin_txn().unwrap();
        assert_eq!(session.state().lock().txn.id(), 5);
        session.rollback().unwrap();
    }

    #[test]
    fn solo_snapshot_sees_all_prior_ids() {
        let db = Database::new();
        let session = db.new_session();
        session.begin_txn().unwrap();
        {
            let state = session.state().lock();
            assert_eq!(state.txn.snap_max(), state.txn.id());
            // No in-flight peers: the lower bound is our own id, so every
            // smaller id is visible.
            assert_eq!(state.txn.snap_min(), state.txn.id());
            assert!(state.txn.concurrent().is_empty());
        }
        session.rollback().unwrap();
    }

    #[test]
    fn snapshot_captures_in_flight_peers() {
        let db = Database::new();
        let alice = db.new_session();
        let bob = db.new_session();

        alice.begin_txn().unwrap(); // txn 1
        bob.begin_txn().unwrap(); // txn 2
        {
            let state = bob.state().lock();
            assert_eq!(state.txn.id(), 2);
            assert_eq!(state.txn.snap_max(), 2);
            assert_eq!(state.txn.snap_min(), 0);
            assert!(state.txn.concurrent().contains(&1));
            assert!(!state.txn.concurrent().contains(&2));
        }
        bob.rollback().unwrap();
        alice.rollback().unwrap();
    }

    #[test]
    fn committed_peers_leave_the_concurrent_set() {
        let db = Database::new();
        let alice = db.new_session();
        let bob = db.new_session();

        alice.begin_txn().unwrap(); // txn 1
        alice.commit().unwrap();
        bob.begin_txn().unwrap(); // txn 2
        {
            let state = bob.state().lock();
            assert!(state.txn.concurrent().is_empty());
            assert_eq!(state.txn.snap_min(), 2);
        }
        bob.rollback().unwrap();
    }

    #[test]
    fn dropped_sessions_are_pruned_from_the_roster() {
        let db = Database::new();
        let alice = db.new_session();
        let bob = db.new_session();
        bob.begin_txn().unwrap();
        bob.rollback().unwrap();
        drop(bob);

        // The next snapshot build skips (and prunes) the dead handle.
        alice.begin_txn().unwrap();
        assert!(alice.state().lock().txn.concurrent().is_empty());
        alice.rollback().unwrap();
        assert_eq!(db.global.lock().sessions.len(), 1);
    }

    #[test]
    fn parallel_begins_allocate_unique_ids() {
        let db = Database::new();
        let threads = 8;
        let begins_per_thread = 50;

        let handles: Vec<_> = (0..threads)
            .map(|_| {
                let session = db.new_session();
                thread::spawn(move || {
                    let mut ids = Vec::with_capacity(begins_per_thread);
                    for _ in 0..begins_per_thread {
                        session.begin_txn().unwrap();
                        ids.push(session.state().lock().txn.id());
                        session.rollback().unwrap();
                    }
                    ids
                })
            })
            .collect();

        let mut all: Vec<TxnId> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        let expected: Vec<TxnId> = (1..=(threads * begins_per_thread) as u64).collect();
        assert_eq!(all, expected);
    }
}
