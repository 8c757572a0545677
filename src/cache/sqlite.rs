//! SQLite Cache Backend
//!
//! Durable backend storing serialized values in a single-file transactional
//! table. Every operation is serialized through one exclusive lock scoped to
//! the backend instance; the connection is opened lazily on first use and
//! kept for the backend's lifetime. The blocking SQLite calls themselves run
//! on the runtime's blocking thread pool so a slow disk never stalls an
//! executor worker.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use tokio::sync::Mutex;
use tracing::debug;

use crate::cache::Cache;
use crate::clock::{Clock, SystemClock};
use crate::error::{CacheError, Result};
use crate::serializer::{BincodeSerializer, Serializer};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cache (
    key        BLOB NOT NULL PRIMARY KEY,
    value      BLOB NOT NULL,
    expires_at REAL
);

CREATE INDEX IF NOT EXISTS cache_expires_at_idx ON cache(expires_at);
";

const SQL_GET: &str = "SELECT value, expires_at FROM cache WHERE key = ?1";
const SQL_PUT: &str =
    "INSERT OR REPLACE INTO cache (key, value, expires_at) VALUES (?1, ?2, ?3)";
const SQL_REMOVE: &str = "DELETE FROM cache WHERE key = ?1";
const SQL_SWEEP: &str = "DELETE FROM cache WHERE expires_at < ?1";
const SQL_SNAPSHOT: &str = "SELECT key, value, expires_at FROM cache";

// == Sqlite Path ==
/// Location of the backing database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlitePath {
    /// Ephemeral database living only as long as the connection; for tests
    /// and throwaway use.
    Memory,
    /// Durable single-file database at the given path.
    File(PathBuf),
}

// == Sqlite Cache ==
/// Durable cache backend on a SQLite table.
///
/// Values pass through the pluggable [`Serializer`] on the way in and out.
/// Concurrent operations on one instance are strictly serialized by an
/// internal lock, acquired and released per operation and never held across
/// caller code. On first connection the schema is created if absent and one
/// expiry sweep clears rows left behind by a prior process.
pub struct SqliteCache<V, S = BincodeSerializer> {
    path: SqlitePath,
    serializer: S,
    clock: Arc<dyn Clock>,
    conn: Mutex<Option<Connection>>,
    _values: PhantomData<fn() -> V>,
}

impl<V> SqliteCache<V, BincodeSerializer> {
    /// Creates a durable cache on the file at `path` with the binary
    /// serializer and the system clock. The connection opens lazily on
    /// first use.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self::with_parts(SqlitePath::File(path.into()), BincodeSerializer, Arc::new(SystemClock))
    }

    /// Creates an ephemeral in-memory cache; contents vanish on `close`.
    pub fn in_memory() -> Self {
        Self::with_parts(SqlitePath::Memory, BincodeSerializer, Arc::new(SystemClock))
    }
}

impl<V, S> SqliteCache<V, S> {
    fn with_parts(path: SqlitePath, serializer: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            path,
            serializer,
            clock,
            conn: Mutex::new(None),
            _values: PhantomData,
        }
    }

    /// Replaces the serializer; must happen before first use, since stored
    /// blobs are only readable by the codec that wrote them.
    pub fn with_serializer<S2>(self, serializer: S2) -> SqliteCache<V, S2> {
        SqliteCache::with_parts(self.path, serializer, self.clock)
    }

    /// Replaces the clock expiry is evaluated against.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Eagerly establishes the connection (and with it schema creation and
    /// the initial expiry sweep) instead of waiting for the first
    /// operation.
    pub async fn connect(&self) -> Result<()> {
        self.with_connection(|_conn| Ok(())).await
    }

    /// Closes the connection. Later operations reconnect lazily; for the
    /// in-memory path that means starting over empty. Dropping the cache
    /// closes the connection as well.
    pub async fn close(&self) -> Result<()> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.take() {
            tokio::task::spawn_blocking(move || {
                conn.close().map_err(|(_, e)| CacheError::Storage(e))
            })
            .await
            .map_err(|e| CacheError::StorageTask(e.to_string()))??;
            debug!("closed sqlite cache connection");
        }
        Ok(())
    }

    /// Runs `op` against the connection on the blocking thread pool,
    /// opening the connection first if this is the first use. The
    /// connection slot's lock is held across the whole operation, so
    /// operations on one instance never interleave.
    async fn with_connection<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let mut slot = self.conn.lock().await;
        let cached = slot.take();
        let path = self.path.clone();
        let now = self.clock.now();

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let conn = match cached {
                Some(conn) => conn,
                None => match open_connection(&path, now) {
                    Ok(conn) => conn,
                    Err(e) => return (None, Err(e)),
                },
            };
            let result = op(&conn);
            (Some(conn), result)
        })
        .await
        .map_err(|e| CacheError::StorageTask(e.to_string()))?;

        *slot = conn;
        result
    }

    fn is_live(expires_at: Option<f64>, now: f64) -> bool {
        expires_at.map_or(true, |t| t >= now)
    }
}

fn open_connection(path: &SqlitePath, now: f64) -> Result<Connection> {
    let conn = match path {
        SqlitePath::Memory => Connection::open_in_memory()?,
        SqlitePath::File(path) => {
            let conn = Connection::open(path)?;
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;",
            )?;
            conn
        }
    };
    conn.execute_batch(SCHEMA)?;

    // Clear rows a previous process let expire.
    let swept = conn.execute(SQL_SWEEP, params![now])?;
    debug!(?path, swept, "connected sqlite cache");
    Ok(conn)
}

impl<V, S> std::fmt::Debug for SqliteCache<V, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteCache")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl<V, S> Cache<V> for SqliteCache<V, S>
where
    V: Send + Sync + 'static,
    S: Serializer<V>,
{
    async fn get(&self, key: &[u8]) -> Result<V> {
        let now = self.clock.now();
        let owned_key = key.to_vec();

        let row = self
            .with_connection(move |conn| {
                Ok(conn
                    .query_row(SQL_GET, params![owned_key], |row| {
                        Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Option<f64>>(1)?))
                    })
                    .optional()?)
            })
            .await?;

        match row {
            Some((blob, expires_at)) if Self::is_live(expires_at, now) => {
                self.serializer.decode(&blob)
            }
            _ => Err(CacheError::key_not_found(key)),
        }
    }

    async fn put(&self, key: &[u8], value: V, ttl: Option<Duration>) -> Result<()> {
        let now = self.clock.now();
        let owned_key = key.to_vec();
        let blob = self.serializer.encode(&value)?;
        let expires_at = ttl.map(|d| now + d.as_secs_f64());

        self.with_connection(move |conn| {
            conn.execute(SQL_PUT, params![owned_key, blob, expires_at])?;
            Ok(())
        })
        .await
    }

    async fn remove(&self, key: &[u8]) -> Result<()> {
        let owned_key = key.to_vec();
        self.with_connection(move |conn| {
            conn.execute(SQL_REMOVE, params![owned_key])?;
            Ok(())
        })
        .await
    }

    async fn remove_expired(&self) -> Result<usize> {
        let now = self.clock.now();
        let removed = self
            .with_connection(move |conn| Ok(conn.execute(SQL_SWEEP, params![now])?))
            .await?;
        if removed > 0 {
            debug!(removed, "swept expired sqlite entries");
        }
        Ok(removed)
    }

    async fn snapshot(&self) -> Result<HashMap<Vec<u8>, V>> {
        let now = self.clock.now();

        let rows = self
            .with_connection(move |conn| {
                let mut stmt = conn.prepare(SQL_SNAPSHOT)?;
                let rows = stmt.query_map([], |row| {
                    Ok((
                        row.get::<_, Vec<u8>>(0)?,
                        row.get::<_, Vec<u8>>(1)?,
                        row.get::<_, Option<f64>>(2)?,
                    ))
                })?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row?);
                }
                Ok(out)
            })
            .await?;

        let mut live = HashMap::new();
        for (key, blob, expires_at) in rows {
            if Self::is_live(expires_at, now) {
                live.insert(key, self.serializer.decode(&blob)?);
            }
        }
        Ok(live)
    }
}
