//! Identifier types and reserved values
//!
//! Transaction ids are dense `u64`s handed out under the database's global
//! transaction lock, starting at 1. Logical timestamps are caller-supplied
//! `u64`s on a time axis of the caller's choosing. Both reserve 0 for
//! "unset", and transaction ids additionally reserve `u64::MAX` as the
//! rolled-back sentinel.

use std::fmt;

/// Monotonically allocated transaction identifier.
pub type TxnId = u64;

/// Logical timestamp attached to versions and reads. 0 means "unset".
pub type Timestamp = u64;

/// Reserved id carried by a zeroed transaction state ("no transaction").
pub const TXN_NONE: TxnId = 0;

/// Sentinel stamped onto a version's transaction id when its transaction
/// rolls back. Distinct from every real id and outside every snapshot
/// window, so stamped versions become permanently invisible without being
/// unlinked from their chain.
pub const ROLLED_BACK: TxnId = u64::MAX;

/// Timestamp value meaning "unset". User-supplied timestamps are `>= 1`.
pub const TS_UNSET: Timestamp = 0;

/// What a version did to its key.
///
/// The engine reserves `Delete` for tombstones but exposes no user-level
/// delete operation; a write on a chain whose head is a tombstone starts a
/// fresh `Insert`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    /// First live version of the key: the chain was empty or its head was a
    /// tombstone.
    Insert,
    /// Replacement of an existing live version.
    Update,
    /// Tombstone.
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::Insert => write!(f, "Insert"),
            Verb::Update => write!(f, "Update"),
            Verb::Delete => write!(f, "Delete"),
        }
    }
}
