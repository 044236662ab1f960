//! SQLite persistence for versioned entities
//!
//! Every mutation runs inside an exclusive section: an `IMMEDIATE` transaction
//! that takes SQLite's reserved lock before the first read, so two writers
//! touching the same timeline are totally ordered. Readers use plain
//! statements and see the last committed snapshot (WAL mode).

mod queries;
mod rows;
mod schema;
mod serialize;

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use rusqlite::{Connection, OpenFlags, Transaction, TransactionBehavior};
use tracing::debug;

use crate::core::error::{Result, TemporalError};

pub use queries::*;
pub use rows::{HierarchyNode, TemporalRow};
pub use schema::SCHEMA_VERSION;

/// Caller-supplied deadline and cancellation flag
///
/// Checked when an exclusive section starts and again just before commit. A
/// tripped check rolls the transaction back.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    deadline: Option<Instant>,
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            flag: Arc::default(),
        }
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        Self::with_deadline(Instant::now() + timeout)
    }

    /// Request cancellation; clones share the flag
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    pub fn check(&self) -> Result<()> {
        if self.flag.load(Ordering::SeqCst) {
            return Err(TemporalError::Cancelled("cancelled by caller".to_string()));
        }
        if self.deadline.is_some_and(|d| Instant::now() >= d) {
            return Err(TemporalError::Cancelled("deadline exceeded".to_string()));
        }
        Ok(())
    }
}

/// Handle on the version database
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) a database file and bring its schema up to date
    pub fn open(path: &Path, lock_timeout: Duration) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(path, flags)?;
        conn.busy_timeout(lock_timeout)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Self::init(conn)
    }

    /// Private in-memory database, mostly for tests
    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        schema::migrate(&conn)?;
        Ok(Self { conn })
    }

    /// Connection for single-statement reads
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` inside an exclusive section and commit its writes
    ///
    /// Any error from `f`, or a cancellation observed before commit, drops the
    /// transaction, which rolls it back.
    ///
    /// The section holds the database write lock (`BEGIN IMMEDIATE`), not a
    /// per-key lock: writers on different business keys also wait for each
    /// other. Readers are never blocked.
    pub fn exclusive<T>(
        &mut self,
        cancel: &Cancellation,
        f: impl FnOnce(&Transaction<'_>) -> Result<T>,
    ) -> Result<T> {
        cancel.check()?;
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        if let Err(e) = cancel.check() {
            debug!("rolling back cancelled exclusive section");
            return Err(e);
        }
        tx.commit()?;
        Ok(value)
    }
}
