use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;

use super::schema::{SAMPLE_DATA, SCHEMA};
use super::unit_of_work::UnitOfWork;
use crate::config;
use crate::error::StoreResult;

/// SQLite in-memory database identifier
const MEMORY_DB_PATH: &str = ":memory:";

const DEFAULT_POOL_SIZE: u32 = 4;

/// Applied to every connection the pool opens
const CONNECTION_PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA busy_timeout = 5000;";

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConnection = PooledConnection<SqliteConnectionManager>;

/// Handle to the store. Cheap to clone; all clones share one pool.
#[derive(Clone)]
pub struct Database {
    pub pool: DbPool,
}

impl Database {
    /// Open (or create) the database at `path` with the default pool size
    pub fn new<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        Self::with_pool_size(path, DEFAULT_POOL_SIZE)
    }

    /// Open the database described by the loaded settings
    pub fn open(settings: &config::Database) -> StoreResult<Self> {
        Self::with_pool_size(&settings.path, settings.pool_size)
    }

    /// Create an in-memory database pool (useful for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Self::new(MEMORY_DB_PATH)
    }

    fn with_pool_size<P: AsRef<Path>>(path: P, pool_size: u32) -> StoreResult<Self> {
        let (manager, in_memory) = Self::create_connection_manager(path.as_ref());
        // Each in-memory connection is its own database, so share exactly one
        let max_size = if in_memory { 1 } else { pool_size.max(1) };
        let mut builder = Pool::builder().max_size(max_size);
        if in_memory {
            // Replacing the only connection would drop every table
            builder = builder.max_lifetime(None).idle_timeout(None);
        }
        let pool = builder.build(manager)?;
        tracing::debug!(
            path = %path.as_ref().display(),
            max_size,
            "Opened database pool"
        );
        Ok(Self { pool })
    }

    /// Create appropriate connection manager based on path
    ///
    /// # Arguments
    /// * `path` - Database file path or ":memory:" for in-memory database
    ///
    /// # Returns
    /// * The manager, and whether it is backed by memory
    fn create_connection_manager(path: &Path) -> (SqliteConnectionManager, bool) {
        let path_str = path.to_string_lossy();
        let in_memory = path_str.trim().eq_ignore_ascii_case(MEMORY_DB_PATH);

        let manager = if in_memory {
            SqliteConnectionManager::memory()
        } else {
            SqliteConnectionManager::file(path)
        };
        (
            manager.with_init(|conn| conn.execute_batch(CONNECTION_PRAGMAS)),
            in_memory,
        )
    }

    /// Create any missing tables and indexes. Safe to run on every start.
    pub fn initialize(&self) -> StoreResult<()> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA)?;
        tracing::info!("Database schema ready");
        Ok(())
    }

    /// Load the sample people and things. Rows that already exist are kept.
    pub fn seed_sample_data(&self) -> StoreResult<()> {
        self.run(|uow| uow.execute_batch(SAMPLE_DATA))?;
        tracing::info!("Sample data seeded");
        Ok(())
    }

    /// Get a connection from the pool, outside of any unit of work
    pub fn connection(&self) -> StoreResult<DbConnection> {
        Ok(self.pool.get()?)
    }

    /// Start a unit of work on a fresh pooled connection
    pub fn begin(&self) -> StoreResult<UnitOfWork> {
        UnitOfWork::begin(self.connection()?)
    }

    /// Run `work` in its own unit of work: committed when it returns `Ok`,
    /// rolled back when it returns `Err`.
    pub fn run<T, F>(&self, work: F) -> StoreResult<T>
    where
        F: FnOnce(&UnitOfWork) -> StoreResult<T>,
    {
        let uow = self.begin()?;
        match work(&uow) {
            Ok(value) => {
                uow.commit()?;
                Ok(value)
            }
            Err(e) => {
                if let Err(rollback_err) = uow.rollback() {
                    tracing::error!("Rollback after failed unit of work also failed: {}", rollback_err);
                }
                Err(e)
            }
        }
    }
}
