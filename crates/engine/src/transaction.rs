//! Per-transaction state and the visibility predicate
//!
//! `TransactionState` is the per-session record of the current transaction:
//! its id, the snapshot bounds captured at begin, the set of transactions
//! that were in flight at that instant, handles to every record the
//! transaction has written, and the three timestamp registers (first write
//! stamp, current write stamp, read ceiling).
//!
//! The state is zeroed when a session is created and after every commit or
//! rollback; the snapshot builder populates it at begin. Between those two
//! points the snapshot fields never change, so visibility decisions are
//! stable for the transaction's whole lifetime.

use std::sync::Arc;

use lamina_core::{Error, Result, Timestamp, TxnId, TS_UNSET, TXN_NONE};
use rustc_hash::FxHashSet;

use crate::record::VersionRecord;

/// The state of one session's current transaction.
#[derive(Debug, Default)]
pub struct TransactionState {
    id: TxnId,
    snap_min: TxnId,
    snap_max: TxnId,
    concurrent: FxHashSet<TxnId>,
    /// Records this transaction wrote, in write order.
    mods: Vec<Arc<VersionRecord>>,
    first_mod_ts: Timestamp,
    mod_ts: Timestamp,
    read_ts: Timestamp,
}

impl TransactionState {
    /// This transaction's id, or 0 outside a transaction.
    pub fn id(&self) -> TxnId {
        self.id
    }

    /// Every committed transaction with an id at or below this bound is
    /// visible.
    pub fn snap_min(&self) -> TxnId {
        self.snap_min
    }

    /// Every transaction with an id at or above this bound (this
    /// transaction's own id) is invisible.
    pub fn snap_max(&self) -> TxnId {
        self.snap_max
    }

    /// The ids of transactions that were in flight when this one began.
    pub fn concurrent(&self) -> &FxHashSet<TxnId> {
        &self.concurrent
    }

    /// The current write timestamp (0 = unset).
    pub fn mod_ts(&self) -> Timestamp {
        self.mod_ts
    }

    /// The first write timestamp this transaction ever set (0 = none yet).
    pub fn first_mod_ts(&self) -> Timestamp {
        self.first_mod_ts
    }

    /// The read ceiling (0 = none).
    pub fn read_ts(&self) -> Timestamp {
        self.read_ts
    }

    /// Records written so far, in write order.
    pub(crate) fn mods(&self) -> &[Arc<VersionRecord>] {
        &self.mods
    }

    /// Install the snapshot captured by the snapshot builder.
    pub(crate) fn begin(
        &mut self,
        id: TxnId,
        snap_min: TxnId,
        snap_max: TxnId,
        concurrent: FxHashSet<TxnId>,
    ) {
        debug_assert_ne!(id, TXN_NONE);
        self.id = id;
        self.snap_min = snap_min;
        self.snap_max = snap_max;
        self.concurrent = concurrent;
    }

    /// Pin the read ceiling for a time-travel transaction.
    pub(crate) fn set_read_ts(&mut self, ts: Timestamp) {
        self.read_ts = ts;
    }

    /// Set the write timestamp for subsequent writes.
    ///
    /// The first stamp a transaction sets becomes its floor; later stamps
    /// may move forward freely but never behind the floor.
    pub(crate) fn set_timestamp(&mut self, ts: Timestamp) -> Result<()> {
        if self.first_mod_ts == TS_UNSET {
            self.first_mod_ts = ts;
        }
        if ts < self.first_mod_ts {
            return Err(Error::TimestampRegression {
                first: self.first_mod_ts,
                requested: ts,
            });
        }
        self.mod_ts = ts;
        Ok(())
    }

    /// Remember a record this transaction wrote.
    pub(crate) fn record_write(&mut self, record: Arc<VersionRecord>) {
        self.mods.push(record);
    }

    /// Decide whether a candidate record `(txn_id, ts)` is visible to this
    /// transaction. Rules, in order:
    ///
    /// 1. Own writes are always visible, whatever their timestamps.
    /// 2. With a read ceiling set, records published at a later logical time
    ///    are invisible.
    /// 3. Ids at or below `snap_min` are visible.
    /// 4. Ids at or above `snap_max` are invisible. This also covers the
    ///    rolled-back sentinel, which is larger than every real id.
    /// 5. Ids inside the window are invisible exactly when they were in
    ///    flight at begin.
    pub fn is_visible(&self, txn_id: TxnId, ts: Timestamp) -> bool {
        if txn_id == self.id {
            return true;
        }
        if self.read_ts > TS_UNSET && ts > self.read_ts {
            return false;
        }
        if txn_id <= self.snap_min {
            return true;
        }
        if txn_id >= self.snap_max {
            return false;
        }
        !self.concurrent.contains(&txn_id)
    }

    /// Commit finalisation: back-fill timestamps, then reset.
    ///
    /// With a write timestamp set, walk the records in write order and stamp
    /// each one still carrying `ts == 0`, stopping at the first record with
    /// a stamp: records past that point were written after an explicit
    /// timestamp call and already carry their intended (earlier) stamp.
    pub(crate) fn finish_commit(&mut self) {
        if self.mod_ts > TS_UNSET {
            for record in &self.mods {
                if record.ts() != TS_UNSET {
                    break;
                }
                record.backfill_ts(self.mod_ts);
            }
        }
        self.reset();
    }

    /// Rollback finalisation: stamp every written record with the
    /// rolled-back sentinel, then reset. The records stay linked in their
    /// chains; traversals treat them as absent.
    pub(crate) fn finish_rollback(&mut self) {
        for record in &self.mods {
            record.mark_rolled_back();
        }
        self.reset();
    }

    fn reset(&mut self) {
        *self = TransactionState::default();
    }
}
