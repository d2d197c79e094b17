//! Error types for laminadb
//!
//! One unified error enum for the whole engine, derived with `thiserror`.
//! Only two variants are data-dependent (`WriteConflict`, `NotFound`); the
//! rest report misuse of the session state machine or of the timestamp API.
//! Every error is returned synchronously to the caller and nothing is
//! retried internally.

use thiserror::Error;

/// Result type alias for laminadb operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the transactional engine.
///
/// A `WriteConflict` leaves the transaction active and otherwise untouched:
/// the caller may keep writing other keys, commit the partial work, or roll
/// back. The state-machine errors likewise change nothing about the session.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// `begin_txn` was called on a session that already has an active
    /// transaction.
    #[error("session already in a transaction")]
    AlreadyInTxn,

    /// A transactional operation was called on a session with no active
    /// transaction.
    #[error("not in a transaction")]
    NotInTxn,

    /// The newest surviving version of the key is invisible to this
    /// transaction, so overwriting it would clobber a concurrent or future
    /// writer.
    #[error("write conflict on key {key:?}")]
    WriteConflict {
        /// Key whose chain refused the write.
        key: String,
    },

    /// No version of the key is visible to this transaction.
    #[error("key not found: {key:?}")]
    NotFound {
        /// The key that was read.
        key: String,
    },

    /// A user-supplied timestamp was zero; zero is reserved for "unset".
    #[error("timestamps must be non-zero")]
    InvalidTimestamp,

    /// A mod timestamp earlier than the transaction's first write timestamp
    /// was requested; per-transaction timestamps must not regress.
    #[error("timestamp {requested} precedes the transaction's first write timestamp {first}")]
    TimestampRegression {
        /// The transaction's first write timestamp.
        first: u64,
        /// The offending requested timestamp.
        requested: u64,
    },
}
