//! Sandboxed filesystem service
//!
//! All paths the shell hands us are validated against an allow-listed set of
//! root directories before any I/O happens. Reads enforce a size cap; writes
//! go through a temp file in the destination directory so a crash never
//! leaves a half-written document behind.

use crate::validation::{self, ValidationError, MAX_FILE_BYTES};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FilesError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("File exceeds size limit: {size} bytes (max: {max} bytes)")]
    FileTooLarge { size: u64, max: usize },
    #[error("File is not valid UTF-8: {0}")]
    NotUtf8(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The deepest ancestor of `path` that already exists on disk
fn nearest_existing_ancestor(path: &Path) -> &Path {
    path.ancestors()
        .find(|p| p.exists())
        .unwrap_or_else(|| Path::new("."))
}

/// Filesystem access restricted to a set of allowed root directories
pub struct SandboxedFs {
    allowed_roots: Vec<PathBuf>,
    max_file_size: usize,
}

impl SandboxedFs {
    pub fn new(allowed_roots: Vec<PathBuf>) -> Self {
        Self {
            allowed_roots,
            max_file_size: MAX_FILE_BYTES,
        }
    }

    pub fn with_max_file_size(mut self, max: usize) -> Self {
        self.max_file_size = max;
        self
    }

    /// Whether a path exists. An out-of-sandbox path reports `false` rather
    /// than leaking whether it exists.
    pub fn exists(&self, path: &Path) -> bool {
        match self.validate(path) {
            Ok(validated) => validated.exists(),
            Err(_) => false,
        }
    }

    /// Read a UTF-8 text file, enforcing the size cap
    pub fn read_file(&self, path: &Path) -> Result<String, FilesError> {
        let validated = self.validate(path)?;

        let metadata = fs::metadata(&validated)?;
        if metadata.len() > self.max_file_size as u64 {
            return Err(FilesError::FileTooLarge {
                size: metadata.len(),
                max: self.max_file_size,
            });
        }

        let bytes = fs::read(&validated)?;
        String::from_utf8(bytes).map_err(|e| FilesError::NotUtf8(e.to_string()))
    }

    /// Write a text file atomically, creating parent directories as needed
    pub fn write_file(&self, path: &Path, content: &str) -> Result<(), FilesError> {
        // Validate the nearest existing ancestor before creating anything,
        // so traversal cannot escape through not-yet-created directories
        let anchor = nearest_existing_ancestor(path).to_path_buf();
        self.validate(&anchor)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let validated = self.validate(path)?;

        let parent = validated
            .parent()
            .ok_or_else(|| ValidationError::InvalidFormat("Invalid path".into()))?;
        let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
        tmp.write_all(content.as_bytes())?;
        tmp.persist(&validated).map_err(|e| e.error)?;

        tracing::debug!(path = %validated.display(), "file written");
        Ok(())
    }

    /// Create a directory (and parents) within the sandbox
    pub fn create_dir(&self, path: &Path) -> Result<(), FilesError> {
        let anchor = nearest_existing_ancestor(path).to_path_buf();
        self.validate(&anchor)?;

        fs::create_dir_all(path)?;
        self.validate(path)?;
        Ok(())
    }

    /// List files directly inside a directory, optionally filtered by
    /// extension, sorted by name
    pub fn list_files(
        &self,
        dir: &Path,
        extension: Option<&str>,
    ) -> Result<Vec<PathBuf>, FilesError> {
        let validated = self.validate(dir)?;

        let mut files: Vec<PathBuf> = fs::read_dir(&validated)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.is_file())
            .filter(|p| match extension {
                Some(ext) => p.extension().and_then(|e| e.to_str()) == Some(ext),
                None => true,
            })
            .collect();

        files.sort();
        Ok(files)
    }

    /// Validate against each allowed root in turn, keeping the last error
    fn validate(&self, path: &Path) -> Result<PathBuf, ValidationError> {
        let mut last_err = ValidationError::PathTraversal;
        for root in &self.allowed_roots {
            match validation::validate_path_within(path, root) {
                Ok(validated) => return Ok(validated),
                Err(e) => last_err = e,
            }
        }
        Err(last_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sandbox(root: &Path) -> SandboxedFs {
        SandboxedFs::new(vec![root.to_path_buf()])
    }

    #[test]
    fn test_write_then_read_round_trip() {
        let dir = tempdir().unwrap();
        let fs_svc = sandbox(dir.path());
        let file = dir.path().join("docs").join("spec.md");

        fs_svc.write_file(&file, "# Spec\n").unwrap();
        assert_eq!(fs_svc.read_file(&file).unwrap(), "# Spec\n");
        assert!(fs_svc.exists(&file));
    }

    #[test]
    fn test_read_outside_sandbox_rejected() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let outside = other.path().join("secret.txt");
        std::fs::write(&outside, "secret").unwrap();

        let fs_svc = sandbox(dir.path());
        assert!(matches!(
            fs_svc.read_file(&outside),
            Err(FilesError::Validation(_))
        ));
        assert!(!fs_svc.exists(&outside));
    }

    #[test]
    fn test_write_outside_sandbox_rejected() {
        let dir = tempdir().unwrap();
        let other = tempdir().unwrap();
        let fs_svc = sandbox(dir.path());

        // Target directory doesn't exist yet; validation must still refuse
        let outside = other.path().join("new-dir").join("escape.txt");
        assert!(matches!(
            fs_svc.write_file(&outside, "nope"),
            Err(FilesError::Validation(_))
        ));
        assert!(!outside.exists());
        assert!(!other.path().join("new-dir").exists());
    }

    #[test]
    fn test_read_enforces_size_cap() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("big.txt");
        std::fs::write(&file, "x".repeat(128)).unwrap();

        let fs_svc = sandbox(dir.path()).with_max_file_size(64);
        assert!(matches!(
            fs_svc.read_file(&file),
            Err(FilesError::FileTooLarge { .. })
        ));
    }

    #[test]
    fn test_list_files_filters_by_extension() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.md"), "a").unwrap();
        std::fs::write(dir.path().join("b.md"), "b").unwrap();
        std::fs::write(dir.path().join("c.txt"), "c").unwrap();

        let fs_svc = sandbox(dir.path());
        let md_files = fs_svc.list_files(dir.path(), Some("md")).unwrap();
        assert_eq!(md_files.len(), 2);
        assert!(md_files[0].ends_with("a.md"));

        let all_files = fs_svc.list_files(dir.path(), None).unwrap();
        assert_eq!(all_files.len(), 3);
    }

    #[test]
    fn test_multiple_roots() {
        let dir_a = tempdir().unwrap();
        let dir_b = tempdir().unwrap();
        std::fs::write(dir_b.path().join("in_b.txt"), "b").unwrap();

        let fs_svc = SandboxedFs::new(vec![
            dir_a.path().to_path_buf(),
            dir_b.path().to_path_buf(),
        ]);
        assert_eq!(fs_svc.read_file(&dir_b.path().join("in_b.txt")).unwrap(), "b");
    }
}
