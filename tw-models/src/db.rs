//! SQLite store of the local backend.
//!
//! One r2d2 pool per database file. Every pooled connection gets the same
//! PRAGMAs; the schema and migrations are applied once in `Database::init`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;
use tracing::{error, info, warn};

use tw_core::config::DatabaseConfig;
use tw_core::error::{TwError, TwResult};

use crate::migrations;
use crate::models::db_err;
use crate::schema;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<SqliteConnectionManager>;

/// Tables counted by `Database::stats`, in display order.
const COUNTED_TABLES: [&str; 8] = [
    "spaces",
    "profiles",
    "contacts",
    "notifications",
    "twincodes",
    "account_migrations",
    "subscriptions",
    "room_configs",
];

/// Handle to the local store. Cheap to clone.
#[derive(Clone)]
pub struct Database {
    pool: Arc<DbPool>,
    path: PathBuf,
}

impl Database {
    /// Open (or create) the database at `db_path`, then bring the schema
    /// up to date.
    pub fn init(db_path: &Path, config: &DatabaseConfig) -> TwResult<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        info!("opening database at {}", db_path.display());

        let pool = Pool::builder()
            .max_size(config.pool_size)
            .connection_customizer(Box::new(ConnectionCustomizer {
                wal_mode: config.wal_mode,
            }))
            .build(SqliteConnectionManager::file(db_path))
            .map_err(|e| TwError::Pool(e.to_string()))?;

        let db = Self {
            pool: Arc::new(pool),
            path: db_path.to_path_buf(),
        };

        if config.integrity_check_on_startup {
            db.run_integrity_check()?;
        }
        db.prepare_schema()?;

        info!("database ready");
        Ok(db)
    }

    fn prepare_schema(&self) -> TwResult<()> {
        let conn = self.conn()?;
        schema::create_tables(&conn)?;
        migrations::run_migrations(&conn)
    }

    /// File backing this database.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get a connection from the pool.
    pub fn conn(&self) -> TwResult<r2d2::PooledConnection<SqliteConnectionManager>> {
        self.pool.get().map_err(|e| TwError::Pool(e.to_string()))
    }

    pub fn run_integrity_check(&self) -> TwResult<()> {
        let conn = self.conn()?;
        let result: String = conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))
            .map_err(db_err)?;

        if result != "ok" {
            error!("database integrity check failed: {result}");
            return Err(TwError::IntegrityCheck(result));
        }
        Ok(())
    }

    /// Run `f` in a transaction, committed only when `f` succeeds.
    pub fn transaction<T, F>(&self, f: F) -> TwResult<T>
    where
        F: FnOnce(&Connection) -> TwResult<T>,
    {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(db_err)?;
        let result = f(&tx)?;
        tx.commit().map_err(db_err)?;
        Ok(result)
    }

    /// Row counts per table.
    pub fn stats(&self) -> TwResult<DatabaseStats> {
        let conn = self.conn()?;
        let mut counts = [0i64; 8];
        for (count, table) in counts.iter_mut().zip(COUNTED_TABLES) {
            *count = conn
                .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
                .map_err(db_err)?;
        }
        let [spaces, profiles, contacts, notifications, twincodes, migrations, subscriptions, room_configs] =
            counts;

        Ok(DatabaseStats {
            spaces,
            profiles,
            contacts,
            notifications,
            twincodes,
            migrations,
            subscriptions,
            room_configs,
        })
    }

    /// Drop every table and start over from a fresh schema.
    pub fn reset(&self) -> TwResult<()> {
        warn!("resetting database at {}", self.path.display());
        {
            let conn = self.conn()?;
            schema::drop_tables(&conn)?;
        }
        self.prepare_schema()?;
        info!("database reset complete");
        Ok(())
    }
}

/// Database row count statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DatabaseStats {
    pub spaces: i64,
    pub profiles: i64,
    pub contacts: i64,
    pub notifications: i64,
    pub twincodes: i64,
    pub migrations: i64,
    pub subscriptions: i64,
    pub room_configs: i64,
}

impl std::fmt::Display for DatabaseStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "spaces={}, profiles={}, contacts={}, notifications={}, twincodes={}, migrations={}, subscriptions={}, room_configs={}",
            self.spaces, self.profiles, self.contacts, self.notifications,
            self.twincodes, self.migrations, self.subscriptions, self.room_configs
        )
    }
}

/// r2d2 connection customizer that applies PRAGMA settings.
#[derive(Debug)]
struct ConnectionCustomizer {
    wal_mode: bool,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for ConnectionCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> Result<(), rusqlite::Error> {
        if self.wal_mode {
            conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        }

        conn.execute_batch(
            "PRAGMA synchronous=NORMAL;
             PRAGMA temp_store=MEMORY;
             PRAGMA busy_timeout=5000;
             PRAGMA foreign_keys=ON;",
        )?;

        Ok(())
    }
}
