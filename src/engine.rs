//! The recommender as a long-lived object: one store connection, one catalog.

use std::path::{Path, PathBuf};

use crate::catalog::{open_store, Catalog, CatalogError};
use crate::db::Database;
use crate::scoring::{score_and_rank, Preferences, ScoredSong, ScoringConfig};

/// Owns the store connection for its whole lifetime and the catalog loaded
/// from it at construction.
///
/// If the store is missing or unreadable the engine is *degraded*: it keeps
/// the diagnostic, has no catalog, and every recommendation is empty.
pub struct PlaylistEngine {
    path: PathBuf,
    db: Option<Database>,
    catalog: Option<Catalog>,
    diagnostic: Option<CatalogError>,
}

impl PlaylistEngine {
    /// Open the store at `path` and load the catalog. Never fails.
    pub fn open(path: &Path) -> Self {
        let db = match open_store(path) {
            Ok(db) => db,
            Err(e) => {
                log::warn!("{}; continuing without a catalog", e);
                return Self {
                    path: path.to_path_buf(),
                    db: None,
                    catalog: None,
                    diagnostic: Some(e),
                };
            }
        };
        log::info!("Opened song store {}", path.display());

        let (catalog, diagnostic) = match Catalog::read(&db) {
            Ok(catalog) => (Some(catalog), None),
            Err(e) => {
                log::warn!("{}; continuing without a catalog", e);
                (None, Some(e))
            }
        };

        Self {
            path: path.to_path_buf(),
            db: Some(db),
            catalog,
            diagnostic,
        }
    }

    pub fn catalog(&self) -> Option<&Catalog> {
        self.catalog.as_ref()
    }

    /// Why the catalog could not be loaded, if it could not.
    pub fn diagnostic(&self) -> Option<&CatalogError> {
        self.diagnostic.as_ref()
    }

    pub fn is_degraded(&self) -> bool {
        self.catalog.is_none()
    }

    /// Rank the whole catalog for `preferences`. Empty when degraded.
    pub fn recommend(&self, preferences: &Preferences, config: &ScoringConfig) -> Vec<ScoredSong<'_>> {
        match &self.catalog {
            Some(catalog) => score_and_rank(catalog.songs(), preferences, config),
            None => {
                log::debug!("No catalog loaded, nothing to rank");
                Vec::new()
            }
        }
    }

    /// Release the store connection. Safe to call more than once; a no-op if
    /// the store never opened. Close errors are logged, not returned.
    pub fn close(&mut self) {
        if let Some(db) = self.db.take() {
            match db.close() {
                Ok(()) => log::info!("Closed song store {}", self.path.display()),
                Err(e) => log::warn!("Failed to close song store {}: {}", self.path.display(), e),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.db.is_none()
    }
}

impl Drop for PlaylistEngine {
    fn drop(&mut self) {
        self.close();
    }
}
