//! Repository for the singleton app_settings row

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct SettingsRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SettingsRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// The settings row, if the app has been configured
    pub fn get(&self) -> Result<Option<AppSettings>, DbError> {
        let settings = self
            .conn
            .query_row(
                "SELECT blueprints_path, theme, default_providers, review_provider
                 FROM app_settings WHERE id = 1",
                [],
                row_to_settings,
            )
            .optional()?;
        Ok(settings)
    }

    /// Write the settings row; there is only ever one
    pub fn save(&self, settings: &AppSettings) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO app_settings
             (id, blueprints_path, theme, default_providers, review_provider)
             VALUES (1, ?1, ?2, ?3, ?4)",
            params![
                settings.blueprints_path,
                settings.theme,
                settings.default_providers,
                settings.review_provider
            ],
        )?;
        Ok(())
    }
}

fn row_to_settings(row: &Row<'_>) -> rusqlite::Result<AppSettings> {
    Ok(AppSettings {
        blueprints_path: row.get(0)?,
        theme: row.get(1)?,
        default_providers: row.get(2)?,
        review_provider: row.get(3)?,
    })
}

/// App settings singleton
///
/// `default_providers` is a JSON map of document type to provider list,
/// owned by the frontend; the repository stores it opaquely.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct AppSettings {
    pub blueprints_path: String,
    pub theme: String,
    pub default_providers: String,
    pub review_provider: String,
}

impl AppSettings {
    /// Parsed view of the default provider map
    pub fn default_providers_map(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.default_providers)
    }
}
