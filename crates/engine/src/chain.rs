//! Per-key update chains
//!
//! Each key maps to one chain: a newest-at-head doubly linked list of
//! version records guarded by a single mutex. Writes and reads both start
//! from the most recent version, so visibility typically resolves within
//! the first few nodes.
//!
//! The chain owns its records. Transactions keep refcounted handles to the
//! records they wrote (for rollback and commit back-fill) but never unlink
//! anything; a chain only ever grows at the head.

use std::sync::Arc;

use lamina_core::{Error, Result, Verb};
use parking_lot::Mutex;

use crate::record::VersionRecord;
use crate::transaction::TransactionState;

/// A per-key version chain, newest first.
pub struct UpdateChain {
    key: String,
    head: Mutex<Option<Arc<VersionRecord>>>,
}

impl UpdateChain {
    pub(crate) fn new(key: impl Into<String>) -> Self {
        UpdateChain {
            key: key.into(),
            head: Mutex::new(None),
        }
    }

    /// The key this chain holds versions for.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Prepend a new version written by `txn`, or refuse with a conflict.
    ///
    /// The conflict rule inspects only the chain prefix: walk from the head
    /// past rolled-back records, and let the first surviving record decide.
    /// If that record is invisible to `txn` it belongs to a concurrent or
    /// future transaction and the write is refused; if it is visible (or no
    /// record survives) the write proceeds. Older records need no
    /// inspection: by construction they carry smaller ids and are at least
    /// as visible.
    ///
    /// The verb is `Insert` when the chain is empty or the current head is a
    /// tombstone, `Update` otherwise.
    pub(crate) fn append_update(
        &self,
        txn: &TransactionState,
        value: i64,
    ) -> Result<Arc<VersionRecord>> {
        let mut head = self.head.lock();

        let mut cursor = head.as_ref();
        while let Some(record) = cursor {
            if record.is_rolled_back() {
                cursor = record.next();
                continue;
            }
            if !txn.is_visible(record.txn_id(), record.ts()) {
                return Err(Error::WriteConflict {
                    key: self.key.clone(),
                });
            }
            break;
        }

        let verb = match head.as_ref() {
            None => Verb::Insert,
            Some(h) if h.verb() == Verb::Delete => Verb::Insert,
            Some(_) => Verb::Update,
        };

        let record = VersionRecord::link(txn.id(), txn.mod_ts(), value, verb, head.take());
        *head = Some(Arc::clone(&record));
        Ok(record)
    }

    /// Walk from the head and return the first value visible to `txn`.
    ///
    /// Rolled-back records need no special casing here: the sentinel id
    /// falls outside every snapshot window, so the predicate rejects them
    /// naturally.
    pub(crate) fn visible_value(&self, txn: &TransactionState) -> Option<i64> {
        let head = self.head.lock();
        let mut cursor = head.as_ref();
        while let Some(record) = cursor {
            if txn.is_visible(record.txn_id(), record.ts()) {
                return Some(record.value());
            }
            cursor = record.next();
        }
        None
    }

    /// Head-first diagnostic dump:
    /// `Key: K -> TxnId: T Value: V Verb -> ...`
    pub fn dump(&self) -> String {
        let head = self.head.lock();
        let mut out = format!("Key: {}", self.key);
        let mut cursor = head.as_ref();
        while let Some(record) = cursor {
            out.push_str(&format!(" -> {}", record));
            cursor = record.next();
        }
        out
    }

    /// Install a head directly, bypassing the write path.
    #[cfg(test)]
    pub(crate) fn install_head(&self, record: Arc<VersionRecord>) {
        *self.head.lock() = Some(record);
    }

    /// Number of records in the chain, rolled-back ones included.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        let head = self.head.lock();
        let mut n = 0;
        let mut cursor = head.as_ref();
        while let Some(record) = cursor {
            n += 1;
            cursor = record.next();
        }
        n
    }
}
