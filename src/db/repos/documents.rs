//! Repository for versioned planning documents

use crate::db::DbError;
use crate::validation::{validate_text_size, MAX_DOCUMENT_BYTES};
use rusqlite::{params, Connection, OptionalExtension, Row};
use sha2::{Digest, Sha256};

pub struct DocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> DocumentRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Documents of a feature, newest first
    pub fn find_by_feature(&self, feature_id: i64) -> Result<Vec<Document>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, type, content, feature_id, version, created_at, updated_at
             FROM documents WHERE feature_id = ?1 ORDER BY updated_at DESC",
        )?;
        let documents = stmt
            .query_map([feature_id], row_to_document)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(documents)
    }

    /// The current document of a given type for a feature, if any
    pub fn find_current(
        &self,
        feature_id: i64,
        doc_type: &str,
    ) -> Result<Option<Document>, DbError> {
        let document = self
            .conn
            .query_row(
                "SELECT id, type, content, feature_id, version, created_at, updated_at
                 FROM documents WHERE feature_id = ?1 AND type = ?2",
                params![feature_id, doc_type],
                row_to_document,
            )
            .optional()?;
        Ok(document)
    }

    pub fn find_by_id(&self, id: i64) -> Result<Option<Document>, DbError> {
        let document = self
            .conn
            .query_row(
                "SELECT id, type, content, feature_id, version, created_at, updated_at
                 FROM documents WHERE id = ?1",
                [id],
                row_to_document,
            )
            .optional()?;
        Ok(document)
    }

    /// Save a document, bumping its version if one already exists for the
    /// same feature and type
    pub fn save(
        &self,
        feature_id: i64,
        doc_type: &str,
        content: &str,
    ) -> Result<Document, DbError> {
        validate_text_size(content, MAX_DOCUMENT_BYTES)
            .map_err(|e| DbError::Conflict(e.to_string()))?;

        match self.find_current(feature_id, doc_type)? {
            Some(existing) => {
                self.conn.execute(
                    "UPDATE documents
                     SET content = ?1, version = version + 1, updated_at = CURRENT_TIMESTAMP
                     WHERE id = ?2",
                    params![content, existing.id],
                )?;
                self.find_by_id(existing.id)?
                    .ok_or_else(|| DbError::Conflict("Failed to read back document".into()))
            }
            None => {
                self.conn.execute(
                    "INSERT INTO documents (type, content, feature_id) VALUES (?1, ?2, ?3)",
                    params![doc_type, content, feature_id],
                )?;
                let id = self.conn.last_insert_rowid();
                self.find_by_id(id)?
                    .ok_or_else(|| DbError::Conflict("Failed to read back document".into()))
            }
        }
    }

    pub fn delete(&self, id: i64) -> Result<bool, DbError> {
        let affected = self
            .conn
            .execute("DELETE FROM documents WHERE id = ?1", [id])?;
        Ok(affected > 0)
    }
}

/// SHA-256 hex digest of document content, used by the sync layer to detect
/// external edits without comparing full bodies
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

fn row_to_document(row: &Row<'_>) -> rusqlite::Result<Document> {
    Ok(Document {
        id: row.get(0)?,
        doc_type: row.get(1)?,
        content: row.get(2)?,
        feature_id: row.get(3)?,
        version: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

/// Document row
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Document {
    pub id: i64,
    #[serde(rename = "type")]
    pub doc_type: String,
    pub content: String,
    pub feature_id: i64,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repos::test_support::migrated_connection;
    use crate::db::repos::{FeatureRepository, NewProject, ProjectRepository};

    fn feature_id(conn: &Connection) -> i64 {
        let pid = ProjectRepository::new(conn)
            .create(&NewProject {
                name: "Test".into(),
                path: "/tmp/test".into(),
                has_blueprints: false,
                last_opened_at: None,
            })
            .unwrap()
            .id;
        FeatureRepository::new(conn)
            .create(pid, "auth-login", "Login flow")
            .unwrap()
            .id
    }

    #[test]
    fn test_save_bumps_version() {
        let conn = migrated_connection();
        let fid = feature_id(&conn);
        let repo = DocumentRepository::new(&conn);

        let first = repo.save(fid, "spec", "# Spec v1").unwrap();
        assert_eq!(first.version, 1);

        let second = repo.save(fid, "spec", "# Spec v2").unwrap();
        assert_eq!(second.id, first.id);
        assert_eq!(second.version, 2);
        assert_eq!(second.content, "# Spec v2");
    }

    #[test]
    fn test_types_are_independent() {
        let conn = migrated_connection();
        let fid = feature_id(&conn);
        let repo = DocumentRepository::new(&conn);

        repo.save(fid, "spec", "# Spec").unwrap();
        repo.save(fid, "tech", "# Tech").unwrap();

        assert_eq!(repo.find_by_feature(fid).unwrap().len(), 2);
        assert_eq!(
            repo.find_current(fid, "spec").unwrap().unwrap().content,
            "# Spec"
        );
    }

    #[test]
    fn test_invalid_type_rejected_by_schema() {
        let conn = migrated_connection();
        let fid = feature_id(&conn);
        let repo = DocumentRepository::new(&conn);

        assert!(repo.save(fid, "poem", "roses are red").is_err());
    }

    #[test]
    fn test_content_hash_is_stable() {
        assert_eq!(content_hash("hello"), content_hash("hello"));
        assert_ne!(content_hash("hello"), content_hash("hello "));
        assert_eq!(content_hash("").len(), 64);
    }
}
