//! Scripted scenario harness
//!
//! Drives the database through a script of named-session actions, the way
//! the end-to-end suites are written: sessions are created on first use by
//! name, every step must succeed unless wrapped in `ExpectError`, and the
//! first failing step aborts the run with its index.

use std::collections::HashMap;
use std::sync::{Arc, Once};

use laminadb::{Database, Error, Session};

/// One step of a scenario script.
#[derive(Debug)]
pub enum Action {
    /// Begin a snapshot transaction on the named session.
    Begin(&'static str),
    /// Begin a transaction that reads as of the given logical time.
    BeginWithReadTs(&'static str, u64),
    /// Set the named session's write timestamp.
    Timestamp(&'static str, u64),
    /// Write `key = value` on the named session.
    Insert(&'static str, &'static str, i64),
    /// Read `key` on the named session and require the given value.
    ReadExpect(&'static str, &'static str, i64),
    /// Commit the named session's transaction.
    Commit(&'static str),
    /// Roll the named session's transaction back.
    Rollback(&'static str),
    /// Require the wrapped action to fail with exactly this error.
    ExpectError(Box<Action>, Error),
    /// Read `key` as of logical time `ts` through a throwaway session and
    /// require the given value.
    ReadAt(u64, &'static str, i64),
    /// Read `key` as of logical time `ts` and require a miss.
    ReadAtMissing(u64, &'static str),
}

/// Why a script step failed.
#[derive(Debug)]
pub enum StepFailure {
    /// The engine refused an operation the script expected to succeed.
    Engine(Error),
    /// A value or expectation check failed.
    Check(String),
}

impl From<Error> for StepFailure {
    fn from(err: Error) -> Self {
        StepFailure::Engine(err)
    }
}

/// Script state: one database plus the named sessions created so far.
pub struct Script {
    db: Arc<Database>,
    sessions: HashMap<&'static str, Arc<Session>>,
}

impl Script {
    pub fn new() -> Self {
        init_tracing();
        Script {
            db: Database::new(),
            sessions: HashMap::new(),
        }
    }

    /// The underlying database, for assertions outside the script.
    #[allow(dead_code)]
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    fn session(&mut self, name: &'static str) -> Arc<Session> {
        let db = &self.db;
        Arc::clone(
            self.sessions
                .entry(name)
                .or_insert_with(|| db.new_session()),
        )
    }

    fn apply(&mut self, action: &Action) -> Result<(), StepFailure> {
        match action {
            Action::Begin(name) => Ok(self.session(name).begin_txn()?),
            Action::BeginWithReadTs(name, ts) => {
                Ok(self.session(name).begin_txn_with_read_ts(*ts)?)
            }
            Action::Timestamp(name, ts) => Ok(self.session(name).timestamp(*ts)?),
            Action::Insert(name, key, value) => Ok(self.session(name).write(key, *value)?),
            Action::ReadExpect(name, key, expected) => {
                let got = self.session(name).read(key)?;
                if got != *expected {
                    return Err(StepFailure::Check(format!(
                        "read {key:?}: expected {expected}, got {got}"
                    )));
                }
                Ok(())
            }
            Action::Commit(name) => Ok(self.session(name).commit()?),
            Action::Rollback(name) => Ok(self.session(name).rollback()?),
            Action::ExpectError(inner, expected) => match self.apply(inner) {
                Ok(()) => Err(StepFailure::Check(format!(
                    "{inner:?} should have failed with {expected:?}"
                ))),
                Err(StepFailure::Engine(err)) if err == *expected => Ok(()),
                Err(failure) => Err(StepFailure::Check(format!(
                    "{inner:?} failed with {failure:?}, expected {expected:?}"
                ))),
            },
            Action::ReadAt(ts, key, expected) => {
                let got = self.read_at(*ts, key)?;
                if got != *expected {
                    return Err(StepFailure::Check(format!(
                        "read {key:?} at ts {ts}: expected {expected}, got {got}"
                    )));
                }
                Ok(())
            }
            Action::ReadAtMissing(ts, key) => match self.read_at(*ts, key) {
                Err(Error::NotFound { .. }) => Ok(()),
                Ok(got) => Err(StepFailure::Check(format!(
                    "read {key:?} at ts {ts}: expected a miss, got {got}"
                ))),
                Err(err) => Err(StepFailure::Engine(err)),
            },
        }
    }

    fn read_at(&self, ts: u64, key: &str) -> Result<i64, Error> {
        let reader = self.db.new_session();
        reader.begin_txn_with_read_ts(ts)?;
        let result = reader.read(key);
        reader.rollback()?;
        result
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

/// Run a script, failing the test at the first step that misbehaves.
pub fn run(actions: &[Action]) {
    let mut script = Script::new();
    for (idx, action) in actions.iter().enumerate() {
        if let Err(failure) = script.apply(action) {
            panic!("step {}: {action:?}: {failure:?}", idx + 1);
        }
    }
}

/// Install a fmt subscriber once so `RUST_LOG` controls test logging.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}
