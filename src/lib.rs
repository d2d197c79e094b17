//! # laminadb
//!
//! An in-memory multi-version transactional key-value store with snapshot
//! isolation and user-controlled commit timestamps.
//!
//! Sessions open transactions against a shared [`Database`]. Each
//! transaction reads from the consistent snapshot captured when it began,
//! writes build per-key version chains (newest first), and a write that
//! would clobber a concurrent or future transaction's version is refused
//! immediately with [`Error::WriteConflict`], never blocked or retried
//! internally. A transaction may additionally stamp its writes with logical
//! timestamps and publish at several points on a time axis of the caller's
//! choosing; readers pin a read timestamp to time-travel.
//!
//! # Quick start
//!
//! ```
//! use laminadb::Database;
//!
//! fn main() -> laminadb::Result<()> {
//!     let db = Database::new();
//!
//!     let alice = db.new_session();
//!     alice.begin_txn()?;
//!     alice.write("cadence", 7)?;
//!     assert_eq!(alice.read("cadence")?, 7);
//!     alice.commit()?;
//!
//!     // A transaction beginning after the commit sees the value.
//!     let bob = db.new_session();
//!     bob.begin_txn()?;
//!     assert_eq!(bob.read("cadence")?, 7);
//!     bob.rollback()?;
//!     Ok(())
//! }
//! ```
//!
//! # Timestamped publication
//!
//! ```
//! use laminadb::Database;
//!
//! fn main() -> laminadb::Result<()> {
//!     let db = Database::new();
//!
//!     let writer = db.new_session();
//!     writer.begin_txn()?;
//!     writer.timestamp(10)?;
//!     writer.write("meter", 1)?;
//!     writer.timestamp(20)?;
//!     writer.write("meter", 2)?;
//!     writer.commit()?;
//!
//!     // Read as of logical time 10: the second write is in the future.
//!     let reader = db.new_session();
//!     reader.begin_txn_with_read_ts(10)?;
//!     assert_eq!(reader.read("meter")?, 1);
//!     reader.rollback()?;
//!     Ok(())
//! }
//! ```
//!
//! The member crates (`lamina-core`, `lamina-engine`) are internal; only
//! the surface re-exported here is stable.

pub use lamina_core::{Error, Result, Timestamp, TxnId, Verb};
pub use lamina_engine::{Database, Session};
