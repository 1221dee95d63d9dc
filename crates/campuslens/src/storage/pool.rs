//! The pool of read-only `SQLite` connections used for serving.
//!
//! Built on `r2d2` with an `r2d2_sqlite` manager. Connections are opened
//! lazily and every one runs with `PRAGMA query_only` so the serving path
//! cannot write.

use std::path::Path;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::OpenFlags;
use tracing::debug;

use crate::error::{Error, Result};

/// How long a pooled connection waits on a lock held by an import.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A bounded pool of connections to one database file.
pub type Pool = r2d2::Pool<SqliteConnectionManager>;

/// A connection checked out of a [`Pool`]; returned to it on drop.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Build a serving pool for the database at `path`.
///
/// No connection is opened until the first checkout.
///
/// # Errors
///
/// Returns [`Error::ConfigValidation`] if `size` is zero or does not fit the
/// pool's limit.
pub fn build(path: impl AsRef<Path>, size: usize, acquire_timeout: Duration) -> Result<Pool> {
    let path = path.as_ref();
    let max_size = u32::try_from(size)
        .ok()
        .filter(|&n| n > 0)
        .ok_or_else(|| Error::ConfigValidation {
            message: format!("pool_size must be between 1 and {}, got {size}", u32::MAX),
        })?;

    debug!("Building connection pool of {max_size} for {}", path.display());

    // Read-write so the pool can open a file no import has created yet
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_NO_MUTEX;
    let manager = SqliteConnectionManager::file(path)
        .with_flags(flags)
        .with_init(|conn| {
            conn.busy_timeout(BUSY_TIMEOUT)?;
            conn.execute_batch("PRAGMA query_only = ON;")
        });

    Ok(r2d2::Pool::builder()
        .max_size(max_size)
        .min_idle(Some(0))
        .connection_timeout(acquire_timeout)
        .build_unchecked(manager))
}

/// Check out a connection, blocking up to the pool's acquire timeout.
///
/// Call from a blocking context such as `spawn_blocking`.
///
/// # Errors
///
/// Returns [`Error::PoolTimeout`] if no connection frees up in time or a new
/// one cannot be opened.
pub fn acquire(pool: &Pool) -> Result<PooledConnection> {
    pool.get().map_err(|source| Error::PoolTimeout {
        waited_ms: u64::try_from(pool.connection_timeout().as_millis()).unwrap_or(u64::MAX),
        source,
    })
}
