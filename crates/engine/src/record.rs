//! Version records: the nodes of per-key chains
//!
//! A record is created by a writing transaction and linked at the head of
//! its key's chain. After linking, exactly two fields may still change, and
//! only monotonically:
//! - rollback overwrites `txn_id` with the rolled-back sentinel (real id →
//!   permanently invisible)
//! - commit back-fills a zero `ts` with the transaction's mod timestamp
//!   (0 → positive, which can only restrict visibility under read
//!   timestamps)
//!
//! Both words are atomics so concurrent chain walkers can tolerate either
//! transition happening underneath them. `value`, `verb`, and `next` are
//! fixed at link time; `prev` is assigned once, under the chain lock, when a
//! newer record is prepended. Records are never unlinked.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use lamina_core::{Timestamp, TxnId, Verb, ROLLED_BACK};
use parking_lot::Mutex;

/// One version of a key: an immutable-after-commit node of an update chain.
#[derive(Debug)]
pub struct VersionRecord {
    /// Writing transaction's id; the rolled-back sentinel after rollback.
    txn_id: AtomicU64,
    /// Logical publication timestamp; 0 until (possibly) back-filled.
    ts: AtomicU64,
    value: i64,
    verb: Verb,
    /// Next-older record in the chain.
    next: Option<Arc<VersionRecord>>,
    /// Next-newer record in the chain; empty while this record is the head.
    prev: Mutex<Weak<VersionRecord>>,
}

impl VersionRecord {
    /// Build a record and link it ahead of `next` (the old chain head).
    ///
    /// Must run under the owning chain's lock: the old head's back link is
    /// assigned here.
    pub(crate) fn link(
        txn_id: TxnId,
        ts: Timestamp,
        value: i64,
        verb: Verb,
        next: Option<Arc<VersionRecord>>,
    ) -> Arc<Self> {
        let record = Arc::new(VersionRecord {
            txn_id: AtomicU64::new(txn_id),
            ts: AtomicU64::new(ts),
            value,
            verb,
            next,
            prev: Mutex::new(Weak::new()),
        });
        if let Some(older) = record.next.as_ref() {
            *older.prev.lock() = Arc::downgrade(&record);
        }
        record
    }

    /// The writing transaction's id, or the rolled-back sentinel.
    pub fn txn_id(&self) -> TxnId {
        self.txn_id.load(Ordering::SeqCst)
    }

    /// The record's publication timestamp (0 = unset).
    pub fn ts(&self) -> Timestamp {
        self.ts.load(Ordering::SeqCst)
    }

    /// The stored value.
    pub fn value(&self) -> i64 {
        self.value
    }

    /// What this version did to the key.
    pub fn verb(&self) -> Verb {
        self.verb
    }

    /// The next-older record in the chain.
    pub fn next(&self) -> Option<&Arc<VersionRecord>> {
        self.next.as_ref()
    }

    /// The next-newer record, if one has been prepended since.
    pub fn prev(&self) -> Option<Arc<VersionRecord>> {
        self.prev.lock().upgrade()
    }

    /// Whether this record's transaction rolled back.
    pub fn is_rolled_back(&self) -> bool {
        self.txn_id() == ROLLED_BACK
    }

    /// Stamp the rolled-back sentinel. The record stays linked but no
    /// transaction will ever see it again.
    pub(crate) fn mark_rolled_back(&self) {
        self.txn_id.store(ROLLED_BACK, Ordering::SeqCst);
    }

    /// Fill in the publication timestamp at commit.
    pub(crate) fn backfill_ts(&self, ts: Timestamp) {
        self.ts.store(ts, Ordering::SeqCst);
    }
}

impl fmt::Display for VersionRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TxnId: {} Value: {} {}",
            self.txn_id(),
            self.value,
            self.verb
        )
    }
}
