//! Local document store for apps, screens, controllers, and friends.
//!
//! Everything lives in one `SQLite` file. Every read and write runs inside a
//! [`UnitOfWork`]: writes commit only if the whole closure succeeds, so a
//! failure at any step (including an authorization check after the writes)
//! rolls back every other step.
//!
//! ```text
//! <root>/store.sqlite
//!   apps, user_groups, screens, controllers, query_templates, resources
//!   controller_patches   # append-only, keyed by (controller_id, seq)
//! ```
//!
//! Logical deletes only: all lookups skip rows whose status is `deleted`.

mod apps;
mod controllers;
mod groups;
mod query_templates;
mod resources;
mod screens;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use std::{fs, io};

use jiff::{Timestamp, Unit};
use rusqlite::{Connection, Row, ToSql, Transaction, TransactionBehavior};
use uuid::Uuid;

use crate::model::{Page, Paging, Status};

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("corrupt data: {0}")]
    Corrupt(String),

    #[error("{kind} not found: {id}")]
    Missing { kind: &'static str, id: Uuid },

    #[error("controller {controller} has {actual} patches, expected {expected}")]
    StaleChain {
        controller: Uuid,
        expected: usize,
        actual: usize,
    },
}

pub type Result<T> = core::result::Result<T, StorageError>;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS user_groups (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    creator TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS apps (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    title TEXT NOT NULL,
    slug TEXT NOT NULL,
    description TEXT NOT NULL,
    group_ids TEXT NOT NULL,
    screens TEXT NOT NULL,
    controllers TEXT NOT NULL,
    status TEXT NOT NULL,
    creator TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS screens (
    id TEXT PRIMARY KEY,
    app TEXT NOT NULL,
    name TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    slug TEXT NOT NULL,
    content TEXT NOT NULL,
    controller TEXT NOT NULL,
    status TEXT NOT NULL,
    creator TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS controllers (
    id TEXT PRIMARY KEY,
    app TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    language TEXT NOT NULL,
    status TEXT NOT NULL,
    creator TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS controller_patches (
    controller_id TEXT NOT NULL,
    seq INTEGER NOT NULL,
    author TEXT NOT NULL,
    content BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    PRIMARY KEY (controller_id, seq)
);
CREATE TABLE IF NOT EXISTS query_templates (
    id TEXT PRIMARY KEY,
    app TEXT NOT NULL,
    resource TEXT NOT NULL,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    content TEXT NOT NULL,
    lifecycle TEXT NOT NULL,
    status TEXT NOT NULL,
    creator TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS resources (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    description TEXT NOT NULL,
    kind TEXT NOT NULL,
    connection TEXT NOT NULL,
    status TEXT NOT NULL,
    creator TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);
";

/// How long a connection waits for another writer before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// `SQLite`-backed document store.
pub struct Storage {
    path: PathBuf,
    controller_locks: Mutex<HashMap<Uuid, Arc<Mutex<()>>>>,
}

impl Storage {
    /// Opens (or creates) the store at `path` and ensures the schema exists.
    ///
    /// The parent directory is created if it doesn't exist.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let storage = Self {
            path,
            controller_locks: Mutex::new(HashMap::new()),
        };
        storage.connect()?.execute_batch(SCHEMA)?;
        tracing::debug!(path = %storage.path().display(), "opened store");
        Ok(storage)
    }

    /// Returns the default store location: `~/.appforge/store.sqlite`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".appforge").join("store.sqlite"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Runs `work` in a read-only unit of work. Nothing is committed.
    pub fn read<T, E>(&self, work: impl FnOnce(&UnitOfWork<'_>) -> core::result::Result<T, E>) -> core::result::Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut conn = self.connect()?;
        let uow = UnitOfWork::begin(&mut conn, TransactionBehavior::Deferred)?;
        let result = work(&uow);
        uow.rollback()?;
        result
    }

    /// Runs `work` in a writing unit of work.
    ///
    /// Commits if `work` returns `Ok`, rolls back otherwise. The write lock is
    /// taken up front, so units of work never interleave.
    pub fn write<T, E>(&self, work: impl FnOnce(&UnitOfWork<'_>) -> core::result::Result<T, E>) -> core::result::Result<T, E>
    where
        E: From<StorageError>,
    {
        let mut conn = self.connect()?;
        let uow = UnitOfWork::begin(&mut conn, TransactionBehavior::Immediate)?;
        match work(&uow) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = uow.rollback() {
                    tracing::error!(error = %rollback, "rollback failed");
                }
                Err(err)
            }
        }
    }

    /// Runs `work` holding the write lock for one controller's patch chain.
    ///
    /// Wrap reconstruct + diff + append in it so revisions of the same
    /// controller are computed one at a time within this process. The lock
    /// is dropped from the table once no other caller holds or awaits it.
    pub fn with_controller_lock<T>(&self, id: Uuid, work: impl FnOnce() -> T) -> T {
        let lock = Arc::clone(self.controller_locks().entry(id).or_default());
        let result = {
            let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
            work()
        };

        let mut locks = self.controller_locks();
        // Only the table and `lock` itself; handles are cloned under the table lock.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(&id);
        }
        result
    }

    fn controller_locks(&self) -> MutexGuard<'_, HashMap<Uuid, Arc<Mutex<()>>>> {
        self.controller_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn connect(&self) -> Result<Connection> {
        let conn = Connection::open(&self.path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }
}

/// One all-or-nothing batch of reads and writes.
///
/// Dropping a unit of work without committing rolls it back.
pub struct UnitOfWork<'c> {
    tx: Transaction<'c>,
}

impl<'c> UnitOfWork<'c> {
    fn begin(conn: &'c mut Connection, behavior: TransactionBehavior) -> Result<Self> {
        let tx = conn.transaction_with_behavior(behavior)?;
        Ok(Self { tx })
    }

    fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }

    fn rollback(self) -> Result<()> {
        self.tx.rollback()?;
        Ok(())
    }

    /// Runs a query and maps every row.
    fn query_all<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: impl Fn(&Row<'_>) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut stmt = self.tx.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut out = Vec::new();
        while let Some(row) = rows.next()? {
            out.push(map(row)?);
        }
        Ok(out)
    }

    /// Runs a query expected to match at most one row.
    fn query_one<T>(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
        map: impl Fn(&Row<'_>) -> Result<T>,
    ) -> Result<Option<T>> {
        Ok(self.query_all(sql, params, map)?.into_iter().next())
    }

    fn count(&self, sql: &str, params: impl rusqlite::Params) -> Result<u64> {
        let n: i64 = self.tx.query_row(sql, params, |row| row.get(0))?;
        u64::try_from(n).map_err(|e| StorageError::Corrupt(format!("negative count: {e}")))
    }

    /// Lists one page of live rows from `table`, newest-modified first.
    ///
    /// `filter` is appended to the `WHERE` clause and must start with
    /// `AND` when non-empty; `args` bind its placeholders.
    fn page<T>(
        &self,
        table: &str,
        columns: &str,
        filter: &str,
        args: &[&dyn ToSql],
        paging: Paging,
        map: impl Fn(&Row<'_>) -> Result<T>,
    ) -> Result<Page<T>> {
        let total = self.count(
            &format!("SELECT COUNT(*) FROM {table} WHERE status != 'deleted' {filter}"),
            args,
        )?;
        let (limit, offset) = page_params(paging);
        let mut bound: Vec<&dyn ToSql> = args.to_vec();
        bound.push(&limit);
        bound.push(&offset);
        let records = self.query_all(
            &format!("SELECT {columns} FROM {table} WHERE status != 'deleted' {filter} {PAGE_CLAUSE}"),
            bound.as_slice(),
            map,
        )?;
        Ok(Page::new(records, total, paging))
    }

    /// Logically deletes one live row. Its data stays in place.
    fn mark_deleted(&self, table: &str, kind: &'static str, id: Uuid, at: Timestamp) -> Result<()> {
        let rows = self.tx.execute(
            &format!(
                "UPDATE {table} SET status = 'deleted', updated_at = ?1
                 WHERE id = ?2 AND status != 'deleted'"
            ),
            rusqlite::params![to_micros(at), id.to_string()],
        )?;
        if rows == 0 {
            return Err(StorageError::Missing { kind, id });
        }
        Ok(())
    }
}

/// Fails with [`StorageError::Missing`] when an update touched no row.
fn expect_row(rows: usize, kind: &'static str, id: Uuid) -> Result<()> {
    if rows == 0 {
        return Err(StorageError::Missing { kind, id });
    }
    Ok(())
}

/// The current time at the precision the store keeps (microseconds), so
/// documents compare equal before and after a round trip.
pub fn now() -> Timestamp {
    let now = Timestamp::now();
    now.round(Unit::Microsecond).unwrap_or(now)
}

/// SQL fragment ordering listings newest-modified first, then paging.
const PAGE_CLAUSE: &str = "ORDER BY updated_at DESC, rowid DESC LIMIT ? OFFSET ?";

fn page_params(paging: Paging) -> (i64, i64) {
    (
        i64::from(paging.limit()),
        i64::try_from(paging.offset()).unwrap_or(i64::MAX),
    )
}

fn to_micros(ts: Timestamp) -> i64 {
    ts.as_microsecond()
}

fn parse_id(row: &Row<'_>, column: &str) -> Result<Uuid> {
    let raw: String = row.get(column)?;
    raw.parse::<Uuid>()
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

fn parse_ids(row: &Row<'_>, column: &str) -> Result<Vec<Uuid>> {
    let raw: String = row.get(column)?;
    Ok(serde_json::from_str(&raw)?)
}

fn parse_timestamp(row: &Row<'_>, column: &str) -> Result<Timestamp> {
    let micros: i64 = row.get(column)?;
    Timestamp::from_microsecond(micros)
        .map_err(|e| StorageError::Corrupt(format!("invalid {column}: {e}")))
}

fn parse_status(row: &Row<'_>) -> Result<Status> {
    let raw: String = row.get("status")?;
    Status::parse(&raw).ok_or_else(|| StorageError::Corrupt(format!("unknown status: {raw}")))
}
