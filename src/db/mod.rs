pub mod models;
pub mod queries;

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Database file not found: {0}")]
    NotFound(PathBuf),
    #[error("Migration failed: {0}")]
    Migration(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

/// Handle to the song store. The connection is released by [`Database::close`]
/// or, failing that, when the handle is dropped.
pub struct Database {
    pub conn: Connection,
}

impl Database {
    /// Open an existing store read-only. Never creates a file.
    pub fn open_existing(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DbError::NotFound(path.to_path_buf()));
        }
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self { conn })
    }

    /// Open (or create) a writable store and bring its schema up to date.
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok();
        }
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Release the connection, reporting any error SQLite raises on close.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| DbError::Sqlite(e))
    }

    fn init(&self) -> Result<()> {
        // Rollback journal, not WAL: the store is later opened read-only,
        // which WAL mode only supports when its -shm file can be created.
        self.conn.pragma_update(None, "journal_mode", "DELETE")?;
        self.conn.pragma_update(None, "synchronous", "NORMAL")?;
        self.migrate()?;
        Ok(())
    }

    fn migrate(&self) -> Result<()> {
        let version: i32 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))
            .unwrap_or(0);

        if version > SCHEMA_VERSION {
            return Err(DbError::Migration(format!(
                "store has schema version {version}, this build knows up to {SCHEMA_VERSION}"
            )));
        }
        if version < 1 {
            self.migrate_v1()?;
        }

        self.conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(())
    }

    /// V1: the songs table. Column affinities are advisory; the loader
    /// coerces whatever SQLite hands back.
    fn migrate_v1(&self) -> Result<()> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS songs (
                id                      INTEGER PRIMARY KEY AUTOINCREMENT,

                -- Display
                title                   TEXT,
                artist                  TEXT,

                -- Numeric features
                duration                REAL,
                popularity              REAL,
                release_year            REAL,
                bpm                     REAL,
                energy                  REAL,
                valence                 REAL,
                acousticness            REAL,
                danceability            REAL,
                instrumentalness        REAL,
                live_performance_factor REAL,
                recording_quality       REAL,
                popularity_change       REAL,

                -- Categorical
                genre                   TEXT,
                tempo_range             TEXT,
                usage_context           TEXT,
                language                TEXT,
                mood                    TEXT,

                -- Exact-match flags
                explicitness,
                cover_or_original       TEXT,

                -- Delimited lists
                genre_tags              TEXT,
                streaming_platforms     TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_songs_genre ON songs(genre);
            CREATE INDEX IF NOT EXISTS idx_songs_artist ON songs(artist);
            ",
        )?;
        Ok(())
    }
}

const SCHEMA_VERSION: i32 = 1;
