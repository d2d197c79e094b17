//! Client session handles
//!
//! A session owns at most one active transaction and exposes the
//! begin/commit/rollback/write/read/timestamp surface. Sessions are
//! single-writer at the client boundary (one thread drives a given session
//! at a time); the internal lock keeps them data-race free regardless, and
//! lets concurrent snapshot builds inspect other sessions safely.
//!
//! The session state machine has two states: `Idle` and `Active`. `begin`
//! is legal only in `Idle`; `write`, `read`, `timestamp`, `commit`, and
//! `rollback` only in `Active`. There is no terminal state; a session lives
//! as long as its handle.

use std::sync::Arc;

use lamina_core::{Error, Result, TS_UNSET};
use parking_lot::Mutex;

use crate::database::Database;
use crate::transaction::TransactionState;

/// A client handle onto the database.
pub struct Session {
    id: u64,
    database: Arc<Database>,
    state: Mutex<SessionState>,
}

/// Everything behind the session lock: the state-machine flag and the
/// current transaction. When `in_txn` is false the transaction state is the
/// zero state.
pub(crate) struct SessionState {
    pub(crate) in_txn: bool,
    pub(crate) txn: TransactionState,
}

impl Session {
    pub(crate) fn new(id: u64, database: Arc<Database>) -> Arc<Self> {
        Arc::new(Session {
            id,
            database,
            state: Mutex::new(SessionState {
                in_txn: false,
                txn: TransactionState::default(),
            }),
        })
    }

    /// This session's id, unique within its database.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub(crate) fn state(&self) -> &Mutex<SessionState> {
        &self.state
    }

    /// Begin a snapshot-isolation transaction.
    ///
    /// Captures this transaction's snapshot atomically against the
    /// database's transaction-id allocator and the set of in-flight
    /// transactions.
    pub fn begin_txn(&self) -> Result<()> {
        self.database.begin_txn(self)
    }

    /// Begin a transaction that reads as of logical time `ts`.
    ///
    /// Versions published after `ts` are invisible, except the
    /// transaction's own writes. `ts` must be non-zero.
    pub fn begin_txn_with_read_ts(&self, ts: u64) -> Result<()> {
        if ts == TS_UNSET {
            return Err(Error::InvalidTimestamp);
        }
        self.database.begin_txn(self)?;
        self.state.lock().txn.set_read_ts(ts);
        Ok(())
    }

    /// Set the write timestamp attached to this transaction's subsequent
    /// writes. The first stamp becomes a floor; later stamps must not
    /// regress behind it.
    pub fn timestamp(&self, ts: u64) -> Result<()> {
        let mut state = self.state.lock();
        if !state.in_txn {
            return Err(Error::NotInTxn);
        }
        state.txn.set_timestamp(ts)
    }

    /// Write `value` under `key`.
    ///
    /// Refused with `WriteConflict` when the key's newest surviving version
    /// belongs to a concurrent or future transaction; the conflict leaves
    /// both the chain and this transaction untouched, so the caller may keep
    /// going, commit partial work, or roll back.
    pub fn write(&self, key: &str, value: i64) -> Result<()> {
        let mut state = self.state.lock();
        if !state.in_txn {
            return Err(Error::NotInTxn);
        }
        let chain = self.database.update_chain(key);
        match chain.append_update(&state.txn, value) {
            Ok(record) => {
                state.txn.record_write(record);
                Ok(())
            }
            Err(err) => {
                tracing::debug!(session = self.id, txn = state.txn.id(), key, "write conflict");
                Err(err)
            }
        }
    }

    /// Read the value of `key` as of this transaction's snapshot.
    pub fn read(&self, key: &str) -> Result<i64> {
        let state = self.state.lock();
        if !state.in_txn {
            return Err(Error::NotInTxn);
        }
        let chain = self.database.update_chain(key);
        chain.visible_value(&state.txn).ok_or_else(|| Error::NotFound {
            key: key.to_string(),
        })
    }

    /// Commit the current transaction.
    ///
    /// With a write timestamp set, records still carrying an unset `ts` are
    /// back-filled before the transaction state is cleared; the writes were
    /// already visible to qualifying snapshots the moment they were linked.
    pub fn commit(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.in_txn {
            return Err(Error::NotInTxn);
        }
        let txn_id = state.txn.id();
        let writes = state.txn.mods().len();
        state.txn.finish_commit();
        state.in_txn = false;
        tracing::trace!(session = self.id, txn = txn_id, writes, "transaction committed");
        Ok(())
    }

    /// Roll the current transaction back, erasing its writes in place.
    pub fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock();
        if !state.in_txn {
            return Err(Error::NotInTxn);
        }
        let txn_id = state.txn.id();
        let writes = state.txn.mods().len();
        state.txn.finish_rollback();
        state.in_txn = false;
        tracing::debug!(session = self.id, txn = txn_id, writes, "transaction rolled back");
        Ok(())
    }
}
