//! Repository for CRUD operations on the projects table

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension, Row};

pub struct ProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> ProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// All projects ordered alphabetically by name (case-insensitive)
    pub fn find_all(&self) -> Result<Vec<Project>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, path, has_blueprints, created_at, last_opened_at
             FROM projects ORDER BY name COLLATE NOCASE",
        )?;
        let projects = stmt
            .query_map([], row_to_project)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(projects)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Project>, DbError> {
        let project = self
            .conn
            .query_row(
                "SELECT id, name, path, has_blueprints, created_at, last_opened_at
                 FROM projects WHERE id = ?1",
                [id],
                row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    pub fn find_by_path(&self, path: &str) -> Result<Option<Project>, DbError> {
        let project = self
            .conn
            .query_row(
                "SELECT id, name, path, has_blueprints, created_at, last_opened_at
                 FROM projects WHERE path = ?1",
                [path],
                row_to_project,
            )
            .optional()?;
        Ok(project)
    }

    /// Create a new project. A second project at the same path is a conflict.
    pub fn create(&self, data: &NewProject) -> Result<Project, DbError> {
        if self.find_by_path(&data.path)?.is_some() {
            return Err(DbError::Conflict(format!(
                "Project with path \"{}\" already exists",
                data.path
            )));
        }

        self.conn.execute(
            "INSERT INTO projects (name, path, has_blueprints, last_opened_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                data.name,
                data.path,
                data.has_blueprints as i64,
                data.last_opened_at
            ],
        )?;

        let id = self.conn.last_insert_rowid();
        self.find_by_id(id)?
            .ok_or_else(|| DbError::Conflict("Failed to read back created project".into()))
    }

    /// Apply a partial update; fields left as `None` are untouched
    pub fn update(&self, id: i64, update: &ProjectUpdate) -> Result<(), DbError> {
        let mut fields: Vec<&str> = Vec::new();
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(name) = &update.name {
            fields.push("name = ?");
            values.push(name.clone().into());
        }
        if let Some(path) = &update.path {
            fields.push("path = ?");
            values.push(path.clone().into());
        }
        if let Some(has_blueprints) = update.has_blueprints {
            fields.push("has_blueprints = ?");
            values.push((has_blueprints as i64).into());
        }

        if fields.is_empty() {
            return Ok(());
        }

        values.push(id.into());
        let sql = format!("UPDATE projects SET {} WHERE id = ?", fields.join(", "));
        self.conn
            .execute(&sql, rusqlite::params_from_iter(values))?;
        Ok(())
    }

    /// Record that a project was just opened
    pub fn touch_last_opened(&self, id: i64) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE projects SET last_opened_at = CURRENT_TIMESTAMP WHERE id = ?1",
            [id],
        )?;
        Ok(())
    }

    /// Delete a project; cascades to features and documents
    pub fn delete(&self, id: i64) -> Result<bool, DbError> {
        let affected = self
            .conn
            .execute("DELETE FROM projects WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }
}

fn row_to_project(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        path: row.get(2)?,
        has_blueprints: row.get::<_, i64>(3)? != 0,
        created_at: row.get(4)?,
        last_opened_at: row.get(5)?,
    })
}

/// Project row
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub path: String,
    pub has_blueprints: bool,
    pub created_at: String,
    pub last_opened_at: Option<String>,
}

/// Fields for creating a project
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewProject {
    pub name: String,
    pub path: String,
    pub has_blueprints: bool,
    pub last_opened_at: Option<String>,
}

/// Partial update of a project
#[derive(Debug, Clone, Default, serde::Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub path: Option<String>,
    pub has_blueprints: Option<bool>,
}
