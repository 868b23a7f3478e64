//! Repository for CRUD operations on the features table

use crate::db::DbError;
use crate::validation::{validate_feature_slug, validate_non_empty};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Feature lifecycle states, mirrored by the schema CHECK constraint
pub const FEATURE_STATUSES: &[&str] = &["planning", "in-progress", "review", "done"];

pub struct FeatureRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> FeatureRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Features of a project, ordered by their slug
    pub fn find_by_project(&self, project_id: i64) -> Result<Vec<Feature>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, feature_id, name, status, project_id,
                    spec_path, tech_path, steps_path, status_path
             FROM features WHERE project_id = ?1 ORDER BY feature_id",
        )?;
        let features = stmt
            .query_map([project_id], row_to_feature)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(features)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Feature>, DbError> {
        let feature = self
            .conn
            .query_row(
                "SELECT id, feature_id, name, status, project_id,
                        spec_path, tech_path, steps_path, status_path
                 FROM features WHERE id = ?1",
                [id],
                row_to_feature,
            )
            .optional()?;
        Ok(feature)
    }

    /// Create a feature in the 'planning' state
    pub fn create(
        &self,
        project_id: i64,
        feature_slug: &str,
        name: &str,
    ) -> Result<Feature, DbError> {
        validate_feature_slug(feature_slug)
            .map_err(|e| DbError::Conflict(e.to_string()))?;
        validate_non_empty(name).map_err(|e| DbError::Conflict(e.to_string()))?;

        self.conn.execute(
            "INSERT INTO features (feature_id, name, status, project_id)
             VALUES (?1, ?2, 'planning', ?3)",
            params![feature_slug, name, project_id],
        )?;

        let id = self.conn.last_insert_rowid();
        self.find_by_id(id)?
            .ok_or_else(|| DbError::Conflict("Failed to read back created feature".into()))
    }

    /// Move a feature to a new lifecycle state
    pub fn update_status(&self, id: i64, status: &str) -> Result<(), DbError> {
        if !FEATURE_STATUSES.contains(&status) {
            return Err(DbError::Conflict(format!(
                "Invalid feature status \"{}\"",
                status
            )));
        }
        self.conn.execute(
            "UPDATE features SET status = ?1 WHERE id = ?2",
            params![status, id],
        )?;
        Ok(())
    }

    /// Record where a feature's planning documents live on disk
    pub fn update_document_paths(
        &self,
        id: i64,
        spec_path: Option<&str>,
        tech_path: Option<&str>,
        steps_path: Option<&str>,
        status_path: Option<&str>,
    ) -> Result<(), DbError> {
        self.conn.execute(
            "UPDATE features
             SET spec_path = ?1, tech_path = ?2, steps_path = ?3, status_path = ?4
             WHERE id = ?5",
            params![spec_path, tech_path, steps_path, status_path, id],
        )?;
        Ok(())
    }

    pub fn delete(&self, id: i64) -> Result<bool, DbError> {
        let affected = self
            .conn
            .execute("DELETE FROM features WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }
}

fn row_to_feature(row: &Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        feature_id: row.get(1)?,
        name: row.get(2)?,
        status: row.get(3)?,
        project_id: row.get(4)?,
        spec_path: row.get(5)?,
        tech_path: row.get(6)?,
        steps_path: row.get(7)?,
        status_path: row.get(8)?,
    })
}

/// Feature row
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Feature {
    pub id: i64,
    pub feature_id: String,
    pub name: String,
    pub status: String,
    pub project_id: i64,
    pub spec_path: Option<String>,
    pub tech_path: Option<String>,
    pub steps_path: Option<String>,
    pub status_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::migrated_connection;
    use crate::db::repos::{NewProject, ProjectRepository};

    fn project_id(conn: &Connection) -> i64 {
        ProjectRepository::new(conn)
            .create(&NewProject {
                name: "Test".into(),
                path: "/tmp/test".into(),
                has_blueprints: false,
                last_opened_at: None,
            })
            .unwrap()
            .id
    }

    #[test]
    fn test_create_starts_in_planning() {
        let conn = migrated_connection();
        let pid = project_id(&conn);
        let repo = FeatureRepository::new(&conn);

        let feature = repo.create(pid, "auth-login", "Login flow").unwrap();
        assert_eq!(feature.status, "planning");
        assert_eq!(feature.feature_id, "auth-login");
    }

    #[test]
    fn test_create_rejects_bad_slug() {
        let conn = migrated_connection();
        let pid = project_id(&conn);
        let repo = FeatureRepository::new(&conn);

        assert!(repo.create(pid, "Bad Slug!", "Name").is_err());
        assert!(repo.create(pid, "ok-slug", "   ").is_err());
    }

    #[test]
    fn test_status_transitions() {
        let conn = migrated_connection();
        let pid = project_id(&conn);
        let repo = FeatureRepository::new(&conn);
        let feature = repo.create(pid, "auth-login", "Login flow").unwrap();

        repo.update_status(feature.id, "in-progress").unwrap();
        assert_eq!(
            repo.find_by_id(feature.id).unwrap().unwrap().status,
            "in-progress"
        );

        assert!(matches!(
            repo.update_status(feature.id, "shipped"),
            Err(DbError::Conflict(_))
        ));
    }

    #[test]
    fn test_deleting_project_cascades() {
        let conn = migrated_connection();
        let pid = project_id(&conn);
        let repo = FeatureRepository::new(&conn);
        repo.create(pid, "auth-login", "Login flow").unwrap();

        ProjectRepository::new(&conn).delete(pid).unwrap();
        assert!(repo.find_by_project(pid).unwrap().is_empty());
    }
}
