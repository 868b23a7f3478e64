//! DevStudio - project/feature/document workbench storage core

pub mod db;
pub mod error;
pub mod files;
pub mod logging;
pub mod secrets;
pub mod validation;
pub mod watcher;

use crate::db::DatabaseManager;
use crate::error::AppError;
use crate::secrets::SecretStore;
use parking_lot::Mutex;

/// Application state shared with the host shell
pub struct AppState {
    pub db: Mutex<Option<DatabaseManager>>,
    pub secrets: SecretStore,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            db: Mutex::new(None),
            secrets: SecretStore::new(),
        }
    }
}

/// Initialize the application storage layer
///
/// Creates the per-user data directory, opens (or creates) the database,
/// and brings its schema up to date. Any database failure here is fatal:
/// the shell must not serve requests against an unmigrated database.
pub fn bootstrap() -> Result<AppState, AppError> {
    let app_dir = db::app_data_dir();
    std::fs::create_dir_all(&app_dir)?;

    let mut manager = DatabaseManager::new(db::default_db_path());
    manager.initialize()?;

    Ok(AppState {
        db: Mutex::new(Some(manager)),
        secrets: SecretStore::new(),
    })
}

/// Shut down the storage layer, releasing the database connection.
/// Safe to call more than once.
pub fn shutdown(state: &AppState) {
    if let Some(manager) = state.db.lock().as_mut() {
        manager.close();
    }
}
