//! Core types for laminadb
//!
//! This crate defines the foundational pieces shared by the rest of the
//! workspace:
//! - Identifier aliases and reserved sentinel values for transaction ids and
//!   logical timestamps
//! - `Verb`: what a version did to its key
//! - The unified error taxonomy and `Result` alias

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::{Timestamp, TxnId, Verb, ROLLED_BACK, TS_UNSET, TXN_NONE};
