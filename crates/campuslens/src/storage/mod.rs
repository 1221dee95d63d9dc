//! Storage layer for campuslens.
//!
//! This module provides the `SQLite` store behind the dashboard: a pool of
//! read-only connections for serving, and a separate writable connection for
//! bulk imports.

pub mod import;
pub mod migrations;
pub mod pool;
pub mod queries;
pub mod schema;

use std::path::{Path, PathBuf};
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::model::{ActivityEvent, LocationVisits, PersonFirstSeen, Profile, Record};

pub use import::{ImportRecord, ImportSummary};
pub use pool::{Pool, PooledConnection};
pub use queries::TimelineQuery;
pub use schema::Dataset;

/// Handle to the campus database.
///
/// Cheap to clone; clones share one connection pool. Every query method
/// checks out a pooled connection and runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct Store {
    /// Path to the database file.
    path: PathBuf,
    /// Read-only serving connections.
    pool: Pool,
}

impl Store {
    /// Open or create the database at the given path.
    ///
    /// Creates the parent directories and database file if they don't exist,
    /// switches the file to WAL mode and brings the bookkeeping schema up to
    /// date. Serving connections are opened lazily.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened, schema initialization
    /// fails or `pool_size` is zero.
    pub fn open(path: impl AsRef<Path>, pool_size: usize, acquire_timeout: Duration) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = open_writable(&path)?;

        // Pooled readers must not block on an import
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        migrations::initialize_schema(&conn)?;

        info!("Database opened successfully at {}", path.display());
        Ok(Self {
            pool: pool::build(&path, pool_size, acquire_timeout)?,
            path,
        })
    }

    /// Open the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::open(
            config.database_path(),
            config.storage.pool_size,
            config.acquire_timeout(),
        )
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The serving connection pool.
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Run `f` on a pooled connection off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool::acquire(&pool)?;
            f(&conn)
        })
            .await
            .map_err(|e| Error::internal(format!("query task failed: {e}")))?
    }

    /// Every profile row.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn profiles(&self) -> Result<Vec<Profile>> {
        self.with_conn(queries::list_profiles).await
    }

    /// Every activity row, keyed by column name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn activity_rows(&self) -> Result<Vec<Record>> {
        self.with_conn(queries::list_activity).await
    }

    /// Number of distinct persons in the profile table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_unique_persons(&self) -> Result<i64> {
        self.with_conn(queries::count_unique_persons).await
    }

    /// Number of distinct, non-empty device hashes in the Wi-Fi table.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn count_unique_device_hashes(&self) -> Result<i64> {
        self.with_conn(queries::count_unique_device_hashes).await
    }

    /// Profiles matching a trimmed, non-empty search term.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn search_profiles(&self, term: String) -> Result<Vec<Profile>> {
        debug!("Searching profiles for {:?}", term);
        self.with_conn(move |conn| queries::search_profiles(conn, &term))
            .await
    }

    /// The busiest rooms.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn top_locations(&self) -> Result<Vec<LocationVisits>> {
        self.with_conn(queries::top_locations).await
    }

    /// The first persons seen in `(entity_id, timestamp)` order.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn top_persons(&self) -> Result<Vec<PersonFirstSeen>> {
        self.with_conn(queries::top_persons).await
    }

    /// A person's activity, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn activity_timeline(&self, query: TimelineQuery) -> Result<Vec<ActivityEvent>> {
        self.with_conn(move |conn| queries::activity_timeline(conn, &query))
            .await
    }

    /// The most recent imports, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn recent_imports(&self, limit: usize) -> Result<Vec<ImportRecord>> {
        self.with_conn(move |conn| import::recent_imports(conn, limit))
            .await
    }

    /// Replace the table for `dataset` with the contents of a CSV file.
    ///
    /// Runs on its own writable connection, outside the serving pool.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the import fails; the
    /// previous table is kept in that case.
    pub async fn import(&self, dataset: Dataset, csv_path: PathBuf) -> Result<ImportSummary> {
        let path = self.path.clone();
        let source = csv_path.clone();
        let result = tokio::task::spawn_blocking(move || {
            let mut conn = open_writable(&path)?;
            import::import_csv(&mut conn, dataset, &csv_path)
        })
        .await
        .map_err(|e| Error::internal(format!("import task failed: {e}")))
        .and_then(|result| result);

        if let Err(e) = &result {
            error!(
                error = %e,
                table = dataset.table_name(),
                "Import of {} failed",
                source.display()
            );
        }
        result
    }
}

/// Open a writable connection, creating the file and its directories.
fn open_writable(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
    }

    debug!("Opening database at {}", path.display());
    let conn = Connection::open(path).map_err(|source| Error::DatabaseOpen {
        path: path.to_path_buf(),
        source,
    })?;
    conn.busy_timeout(Duration::from_secs(5))?;
    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(dir.path().join("campus.db"), 4, Duration::from_secs(1))
            .expect("failed to create test store");
        (dir, store)
    }

    fn write_csv(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_open_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("deeper").join("campus.db");

        let store = Store::open(&path, 2, Duration::from_secs(1)).unwrap();
        assert!(path.exists());
        assert_eq!(store.path(), path);
        assert_eq!(store.pool().max_size(), 2);
    }

    #[test]
    fn test_open_uses_wal() {
        let (_dir, store) = create_test_store();
        let conn = Connection::open(store.path()).unwrap();
        let mode: String = conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }

    #[tokio::test]
    async fn test_queries_fail_before_import() {
        let (_dir, store) = create_test_store();
        assert!(store.profiles().await.is_err());
        assert!(store.count_unique_persons().await.is_err());
    }

    #[tokio::test]
    async fn test_import_then_count_unique_persons() {
        let (dir, store) = create_test_store();
        let csv = write_csv(&dir, "profile.csv", "person_id,name\np1,A\np2,B\n");

        let summary = store.import(Dataset::Profile, csv).await.unwrap();
        assert_eq!(summary.rows, 2);
        assert_eq!(store.count_unique_persons().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_serving_sees_reimport() {
        let (dir, store) = create_test_store();
        let first = write_csv(&dir, "a.csv", "device_hash\na\n");
        let second = write_csv(&dir, "b.csv", "device_hash\na\nb\nc\n");

        store.import(Dataset::Wifi, first).await.unwrap();
        assert_eq!(store.count_unique_device_hashes().await.unwrap(), 1);

        store.import(Dataset::Wifi, second).await.unwrap();
        assert_eq!(store.count_unique_device_hashes().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_queries_share_pool() {
        let (dir, store) = create_test_store();
        let csv = write_csv(&dir, "profile.csv", "person_id\np1\np2\np3\n");
        store.import(Dataset::Profile, csv).await.unwrap();

        let tasks: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.count_unique_persons().await })
            })
            .collect();

        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap(), 3);
        }
        assert!(store.pool().state().connections <= 4);
    }

    #[tokio::test]
    async fn test_timeline_and_recent_imports() {
        let (dir, store) = create_test_store();
        let csv = write_csv(
            &dir,
            "data.csv",
            "entity_id,person_id,room_id,timestamp,hour,day,weekday,next_room\n\
             E1,p1,R1,2024-01-05 09:00,9,5,Fri,R2\n\
             E1,p1,R2,2024-01-05 10:00,10,5,Fri,\n",
        );
        store.import(Dataset::Activity, csv).await.unwrap();

        let query = TimelineQuery::new(Some("p1"), None, None).unwrap();
        let events = store.activity_timeline(query).await.unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].room_id.as_deref(), Some("R2"));
        assert_eq!(events[0].hour.as_deref(), Some("10"));
        assert_eq!(events[0].next_room.as_deref(), Some(""));

        let imports = store.recent_imports(5).await.unwrap();
        assert_eq!(imports.len(), 1);
        assert_eq!(imports[0].table_name, "data");
    }

    #[tokio::test]
    async fn test_failed_import_reports_error() {
        crate::logging::init_test_logging();
        let (dir, store) = create_test_store();
        let good = write_csv(&dir, "wifi.csv", "device_hash\na\nb\n");
        store.import(Dataset::Wifi, good).await.unwrap();

        let missing = dir.path().join("missing.csv");
        let err = store.import(Dataset::Wifi, missing).await.unwrap_err();
        assert!(matches!(err, Error::Io(_)));

        // Logged and aborted; the earlier import still serves
        assert_eq!(store.count_unique_device_hashes().await.unwrap(), 2);
    }
}
