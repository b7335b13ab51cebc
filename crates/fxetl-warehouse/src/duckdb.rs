//! `DuckDB` connection pool management.
//!
//! All pooled connections are clones of one root connection, so they share a
//! single database instance and see each other's committed writes. Opening the
//! file twice in one process would create two independent instances.

use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::Connection;

/// Access mode for database connections.
///
/// DuckDB fixes the access mode per database instance, so the mode only
/// selects the idle bucket. Read paths issue SELECT statements exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Inspection queries.
    ReadOnly,
    /// Migrations and the replace writer.
    ReadWrite,
}

#[derive(Default)]
struct PoolState {
    root: Option<Connection>,
    idle_read_only: Vec<Connection>,
    idle_read_write: Vec<Connection>,
}

impl PoolState {
    fn bucket(&mut self, mode: AccessMode) -> &mut Vec<Connection> {
        match mode {
            AccessMode::ReadOnly => &mut self.idle_read_only,
            AccessMode::ReadWrite => &mut self.idle_read_write,
        }
    }

    fn clone_root(&mut self, path: &Path) -> Result<Connection, ::duckdb::Error> {
        let root = match self.root.take() {
            Some(root) => root,
            None => {
                let root = Connection::open(path)?;
                root.execute_batch("PRAGMA disable_progress_bar;")?;
                root
            }
        };
        let connection = root.try_clone();
        self.root = Some(root);
        connection
    }
}

struct PoolInner {
    db_path: PathBuf,
    max_pool_size: usize,
    state: Mutex<PoolState>,
}

/// A small connection pool over one `DuckDB` database file.
#[derive(Clone)]
pub struct DuckDbConnectionManager {
    inner: Arc<PoolInner>,
}

impl DuckDbConnectionManager {
    /// Create a pool for `path`. The file is opened on the first `acquire`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_pool_size: usize) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                db_path: path.into(),
                max_pool_size: max_pool_size.max(1),
                state: Mutex::new(PoolState::default()),
            }),
        }
    }

    /// Take an idle connection for `mode`, or clone a new one from the root.
    ///
    /// # Errors
    /// Returns an error if the database file cannot be opened, for example
    /// when another process holds the write lock.
    ///
    /// # Panics
    /// Panics if the pool mutex is poisoned.
    pub fn acquire(&self, mode: AccessMode) -> Result<PooledConnection, ::duckdb::Error> {
        let mut state = self
            .inner
            .state
            .lock()
            .expect("duckdb connection pool mutex poisoned");
        let connection = match state.bucket(mode).pop() {
            Some(connection) => connection,
            None => state.clone_root(self.inner.db_path.as_path())?,
        };
        drop(state);

        Ok(PooledConnection {
            mode,
            pool: Arc::clone(&self.inner),
            connection: Some(connection),
        })
    }

    /// Number of idle connections currently held for `mode`.
    ///
    /// # Panics
    /// Panics if the pool mutex is poisoned.
    #[must_use]
    pub fn idle_count(&self, mode: AccessMode) -> usize {
        self.inner
            .state
            .lock()
            .expect("duckdb connection pool mutex poisoned")
            .bucket(mode)
            .len()
    }

    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.inner.db_path.as_path()
    }
}

/// A pooled connection that returns to the pool when dropped.
pub struct PooledConnection {
    mode: AccessMode,
    pool: Arc<PoolInner>,
    connection: Option<Connection>,
}

impl PooledConnection {
    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        self.connection
            .as_ref()
            .expect("pooled connection unexpectedly missing")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.connection
            .as_mut()
            .expect("pooled connection unexpectedly missing")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        let mut state = self
            .pool
            .state
            .lock()
            .expect("duckdb connection pool mutex poisoned");
        let max_pool_size = self.pool.max_pool_size;
        let bucket = state.bucket(self.mode);
        if bucket.len() < max_pool_size {
            bucket.push(connection);
        }
    }
}
