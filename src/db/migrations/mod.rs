//! Schema migrations for DevStudio
//!
//! Migration units are registered at compile time and tracked in a
//! persistent `migrations` ledger table. Pending units are applied in
//! ascending version order, each inside its own transaction, so a failure
//! leaves earlier units applied and the failed unit fully rolled back.
//! Rollback walks the ledger in reverse, reverting one unit per step.

mod v001_initial_schema;
mod v002_document_indexes;
mod v003_provider_base_url;

use crate::db::DbError;
use rusqlite::{params, Connection};

/// A single versioned schema change
///
/// `up` and `down` run inside a transaction opened by the runner; they must
/// not manage transactions themselves.
pub struct Migration {
    /// Unique positive version; the sole ordering key
    pub version: i64,
    /// Human-readable name, recorded in the ledger
    pub name: &'static str,
    pub up: fn(&Connection) -> rusqlite::Result<()>,
    pub down: fn(&Connection) -> rusqlite::Result<()>,
}

/// All known migration units. Registration order is irrelevant; discovery
/// sorts by version number.
static REGISTRY: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        up: v001_initial_schema::up,
        down: v001_initial_schema::down,
    },
    Migration {
        version: 2,
        name: "document_indexes",
        up: v002_document_indexes::up,
        down: v002_document_indexes::down,
    },
    Migration {
        version: 3,
        name: "provider_base_url",
        up: v003_provider_base_url::up,
        down: v003_provider_base_url::down,
    },
];

/// All valid migration units, sorted ascending by version
///
/// A unit with a non-positive version or empty name is logged and skipped.
/// Two units claiming the same version is a hard error: any tie-break would
/// silently drop one of them.
pub fn all() -> Result<Vec<&'static Migration>, DbError> {
    discover(REGISTRY)
}

fn discover(registry: &'static [Migration]) -> Result<Vec<&'static Migration>, DbError> {
    let mut units: Vec<&Migration> = Vec::with_capacity(registry.len());

    for unit in registry {
        if unit.version <= 0 || unit.name.is_empty() {
            tracing::warn!(
                version = unit.version,
                "skipping invalid migration unit (version must be positive, name non-empty)"
            );
            continue;
        }
        units.push(unit);
    }

    units.sort_by_key(|u| u.version);

    for pair in units.windows(2) {
        if pair[0].version == pair[1].version {
            return Err(DbError::DuplicateVersion(pair[0].version));
        }
    }

    Ok(units)
}

/// A row of the migration ledger
#[derive(Debug, Clone, serde::Serialize)]
pub struct MigrationRecord {
    pub version: i64,
    pub name: String,
    pub executed_at: String,
}

/// Result of a rollback batch
///
/// `skipped` holds ledger rows whose migration unit is no longer registered;
/// those rows stay in the ledger and should be surfaced to an operator.
#[derive(Debug, Default)]
pub struct RollbackOutcome {
    pub reverted: Vec<i64>,
    pub skipped: Vec<MigrationRecord>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

/// Applies and reverts migration units against a borrowed connection
pub struct MigrationRunner<'conn> {
    conn: &'conn Connection,
}

impl<'conn> MigrationRunner<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Create the ledger table if it doesn't exist. Idempotent; called at
    /// the start of every public ledger operation.
    fn ensure_ledger_table(&self) -> Result<(), DbError> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                executed_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            )",
            [],
        )?;
        Ok(())
    }

    /// Current schema version: the maximum version in the ledger, or 0 for
    /// an unmigrated database.
    pub fn current_version(&self) -> Result<i64, DbError> {
        self.ensure_ledger_table()?;

        let version: Option<i64> =
            self.conn
                .query_row("SELECT MAX(version) FROM migrations", [], |row| row.get(0))?;
        Ok(version.unwrap_or(0))
    }

    /// History of applied migrations, ascending by version
    pub fn history(&self) -> Result<Vec<MigrationRecord>, DbError> {
        self.ensure_ledger_table()?;

        let mut stmt = self.conn.prepare(
            "SELECT version, name, executed_at FROM migrations ORDER BY version ASC",
        )?;
        let records = stmt
            .query_map([], |row| {
                Ok(MigrationRecord {
                    version: row.get(0)?,
                    name: row.get(1)?,
                    executed_at: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(records)
    }

    /// Apply all pending migrations in ascending version order
    ///
    /// Returns the number of units applied; 0 means the database was already
    /// up to date and nothing was touched. A failure on unit k halts the
    /// loop with units after k unapplied and k itself fully rolled back.
    pub fn run_pending(&self) -> Result<usize, DbError> {
        self.run_pending_with(&all()?)
    }

    fn run_pending_with(&self, units: &[&Migration]) -> Result<usize, DbError> {
        self.ensure_ledger_table()?;

        let current = self.current_version()?;
        // A filter of an already-sorted sequence preserves order
        let pending: Vec<&Migration> = units
            .iter()
            .copied()
            .filter(|u| u.version > current)
            .collect();

        if pending.is_empty() {
            tracing::debug!("database is up to date, no pending migrations");
            return Ok(0);
        }

        tracing::info!(count = pending.len(), "running pending migrations");

        for unit in &pending {
            self.run_migration(unit, Direction::Up)?;
        }

        tracing::info!("all migrations applied");
        Ok(pending.len())
    }

    /// Roll back the last `steps` applied migrations, most recent first
    ///
    /// A ledger entry whose unit is no longer registered is logged and
    /// skipped without aborting the rest of the batch; its row stays in the
    /// ledger and is reported in the outcome.
    pub fn rollback(&self, steps: usize) -> Result<RollbackOutcome, DbError> {
        self.rollback_with(&all()?, steps)
    }

    fn rollback_with(&self, units: &[&Migration], steps: usize) -> Result<RollbackOutcome, DbError> {
        self.ensure_ledger_table()?;

        let history = self.history()?;
        let mut outcome = RollbackOutcome::default();

        if history.is_empty() {
            tracing::warn!("no migrations to roll back");
            return Ok(outcome);
        }

        tracing::info!(steps = steps.min(history.len()), "rolling back migrations");

        for record in history.iter().rev().take(steps) {
            match units.iter().find(|u| u.version == record.version) {
                Some(unit) => {
                    self.run_migration(unit, Direction::Down)?;
                    outcome.reverted.push(record.version);
                }
                None => {
                    tracing::error!(
                        version = record.version,
                        name = %record.name,
                        "cannot roll back: migration unit not registered; ledger row left in place"
                    );
                    outcome.skipped.push(record.clone());
                }
            }
        }

        Ok(outcome)
    }

    /// Run a single unit inside its own all-or-nothing transaction
    ///
    /// The schema change and its ledger row commit together or not at all;
    /// a partially recorded migration is impossible.
    fn run_migration(&self, unit: &Migration, direction: Direction) -> Result<(), DbError> {
        match direction {
            Direction::Up => {
                tracing::info!(version = unit.version, name = unit.name, "applying migration")
            }
            Direction::Down => {
                tracing::info!(version = unit.version, name = unit.name, "reverting migration")
            }
        }

        let tx = self.conn.unchecked_transaction()?;

        let result = match direction {
            Direction::Up => (unit.up)(&tx).and_then(|()| {
                tx.execute(
                    "INSERT INTO migrations (version, name) VALUES (?1, ?2)",
                    params![unit.version, unit.name],
                )
                .map(|_| ())
            }),
            Direction::Down => (unit.down)(&tx).and_then(|()| {
                tx.execute(
                    "DELETE FROM migrations WHERE version = ?1",
                    params![unit.version],
                )
                .map(|_| ())
            }),
        };

        match result.and_then(|()| tx.commit()) {
            Ok(()) => Ok(()),
            // Dropping the failed transaction rolls everything back
            Err(source) => {
                tracing::error!(
                    version = unit.version,
                    name = unit.name,
                    "migration failed, transaction rolled back: {}",
                    source
                );
                Err(DbError::MigrationFailed {
                    version: unit.version,
                    name: unit.name,
                    source,
                })
            }
        }
    }
}
