//! In-memory song catalog and its loader.
//!
//! Loading never aborts the program: a missing or unreadable store yields no
//! catalog plus a [`CatalogError`] describing why.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::db::models::{SongRecord, SongTable};
use crate::db::{Database, DbError};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("song store not found at {0}")]
    NotFound(PathBuf),
    #[error("could not open song store {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: DbError,
    },
    #[error("could not read songs: {0}")]
    Read(#[source] DbError),
}

/// All songs available for ranking, in storage order.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    songs: Vec<SongRecord>,
    coercion_failures: usize,
}

impl Catalog {
    /// Coerce a raw table into songs. Bad numeric cells become absent; rows are never dropped.
    pub fn from_table(table: &SongTable) -> Self {
        let mut songs = Vec::with_capacity(table.rows.len());
        let mut coercion_failures = 0;

        for (i, cells) in table.rows.iter().enumerate() {
            let (song, failures) = SongRecord::from_row(i, &table.columns, cells);
            coercion_failures += failures;
            songs.push(song);
        }

        if coercion_failures > 0 {
            log::warn!(
                "{} numeric value(s) could not be read and were ignored",
                coercion_failures
            );
        }

        Self {
            songs,
            coercion_failures,
        }
    }

    /// Read the whole songs table from an open store.
    pub fn read(db: &Database) -> Result<Self, CatalogError> {
        let table = db.load_songs().map_err(CatalogError::Read)?;
        let catalog = Self::from_table(&table);
        log::info!("Loaded {} songs", catalog.len());
        Ok(catalog)
    }

    pub fn songs(&self) -> &[SongRecord] {
        &self.songs
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Numeric cells that failed coercion while loading.
    pub fn coercion_failures(&self) -> usize {
        self.coercion_failures
    }
}

/// Open the store at `path` read-only.
pub fn open_store(path: &Path) -> Result<Database, CatalogError> {
    Database::open_existing(path).map_err(|e| match e {
        DbError::NotFound(p) => CatalogError::NotFound(p),
        other => CatalogError::Open {
            path: path.to_path_buf(),
            source: other,
        },
    })
}

/// Load the catalog at `path` in one go, closing the store afterwards.
///
/// Returns `(Some(catalog), None)` on success and `(None, Some(error))` when
/// the store is missing or unreadable.
pub fn load(path: &Path) -> (Option<Catalog>, Option<CatalogError>) {
    let db = match open_store(path) {
        Ok(db) => db,
        Err(e) => {
            log::warn!("{}", e);
            return (None, Some(e));
        }
    };

    let result = Catalog::read(&db);
    if let Err(e) = db.close() {
        log::warn!("Failed to close song store: {}", e);
    }

    match result {
        Ok(catalog) => (Some(catalog), None),
        Err(e) => {
            log::warn!("{}", e);
            (None, Some(e))
        }
    }
}
