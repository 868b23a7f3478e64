//! Input validation module for DevStudio
//! Provides security checks for paths, sizes, and input formats

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Sensitive directories under home that must never be served to the shell
/// These contain credentials, keys, and other sensitive data
const SENSITIVE_HOME_PATHS: &[&str] = &[
    ".ssh",              // SSH private keys
    ".aws",              // AWS credentials
    ".gnupg",            // GPG keys
    ".config",           // App configs (often contain tokens)
    "Library/Keychains", // macOS Keychains
];

/// Maximum size for files read through the sandboxed filesystem (1 MiB)
pub const MAX_FILE_BYTES: usize = 1024 * 1024;

/// Maximum size for document content saved to the database (10 MiB)
pub const MAX_DOCUMENT_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Path traversal detected: path escapes allowed directory")]
    PathTraversal,
    #[error("Path is within a sensitive directory")]
    SensitivePath,
    #[error("Path not found: {0}")]
    PathNotFound(String),
    #[error("Input exceeds size limit: {size} bytes (max: {max} bytes)")]
    InputTooLarge { size: usize, max: usize },
    #[error("Invalid input format: {0}")]
    InvalidFormat(String),
    #[error("Empty input not allowed")]
    EmptyInput,
}

/// Validate that a path is within an allowed directory (prevents path traversal)
///
/// The target itself may not exist yet (e.g. a file about to be written); in
/// that case its parent is canonicalized and checked instead. Returns the
/// canonicalized path if valid.
pub fn validate_path_within(path: &Path, allowed_root: &Path) -> Result<PathBuf, ValidationError> {
    let canonical_root = allowed_root
        .canonicalize()
        .map_err(|_| ValidationError::PathNotFound(allowed_root.display().to_string()))?;

    let canonical = if path.exists() {
        path.canonicalize()
            .map_err(|_| ValidationError::PathNotFound(path.display().to_string()))?
    } else {
        let parent = path
            .parent()
            .ok_or_else(|| ValidationError::InvalidFormat("Invalid path".into()))?;
        let file_name = path
            .file_name()
            .ok_or_else(|| ValidationError::InvalidFormat("Invalid path".into()))?;
        let canonical_parent = parent
            .canonicalize()
            .map_err(|_| ValidationError::PathNotFound(parent.display().to_string()))?;
        canonical_parent.join(file_name)
    };

    if !canonical.starts_with(&canonical_root) {
        return Err(ValidationError::PathTraversal);
    }

    if let Some(home) = dirs::home_dir() {
        if let Ok(canonical_home) = home.canonicalize() {
            if is_sensitive_path(&canonical, &canonical_home) {
                return Err(ValidationError::SensitivePath);
            }
        }
    }

    Ok(canonical)
}

/// Check if a path is within a sensitive subdirectory of home
fn is_sensitive_path(path: &Path, home: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(home) else {
        return false;
    };

    for sensitive in SENSITIVE_HOME_PATHS {
        if relative.starts_with(sensitive) {
            return true;
        }
    }

    false
}

/// Validate text input size
pub fn validate_text_size(text: &str, max_bytes: usize) -> Result<(), ValidationError> {
    let size = text.len();
    if size > max_bytes {
        return Err(ValidationError::InputTooLarge { size, max: max_bytes });
    }
    Ok(())
}

/// Validate non-empty input
pub fn validate_non_empty(text: &str) -> Result<(), ValidationError> {
    if text.trim().is_empty() {
        return Err(ValidationError::EmptyInput);
    }
    Ok(())
}

/// Validate a feature identifier slug (e.g. "auth-login")
/// Lowercase alphanumeric with dashes, 1-64 characters
pub fn validate_feature_slug(slug: &str) -> Result<(), ValidationError> {
    let re = regex_lite::Regex::new(r"^[a-z0-9][a-z0-9-]{0,63}$").unwrap();
    if !re.is_match(slug) {
        return Err(ValidationError::InvalidFormat(
            "Invalid feature id. Expected lowercase slug like 'auth-login'".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_validate_text_size_ok() {
        assert!(validate_text_size("hello", 1000).is_ok());
    }

    #[test]
    fn test_validate_text_size_too_large() {
        let large = "x".repeat(1001);
        assert!(matches!(
            validate_text_size(&large, 1000),
            Err(ValidationError::InputTooLarge { .. })
        ));
    }

    #[test]
    fn test_validate_non_empty() {
        assert!(validate_non_empty("hello").is_ok());
        assert!(matches!(validate_non_empty(""), Err(ValidationError::EmptyInput)));
        assert!(matches!(validate_non_empty("   "), Err(ValidationError::EmptyInput)));
    }

    #[test]
    fn test_validate_feature_slug() {
        assert!(validate_feature_slug("auth-login").is_ok());
        assert!(validate_feature_slug("v2").is_ok());

        assert!(validate_feature_slug("Auth-Login").is_err()); // uppercase
        assert!(validate_feature_slug("-auth").is_err()); // leading dash
        assert!(validate_feature_slug("").is_err()); // empty
        assert!(validate_feature_slug(&"x".repeat(65)).is_err()); // too long
    }

    #[test]
    fn test_validate_path_within_allows_contained() {
        let root = tempdir().unwrap();
        let file = root.path().join("notes.md");
        std::fs::write(&file, "hello").unwrap();

        let validated = validate_path_within(&file, root.path()).unwrap();
        assert!(validated.ends_with("notes.md"));
    }

    #[test]
    fn test_validate_path_within_allows_new_file_with_valid_parent() {
        let root = tempdir().unwrap();
        let file = root.path().join("not-yet-written.md");

        assert!(validate_path_within(&file, root.path()).is_ok());
    }

    #[test]
    fn test_validate_path_within_rejects_escape() {
        let root = tempdir().unwrap();
        let other = tempdir().unwrap();
        let outside = other.path().join("escape.md");
        std::fs::write(&outside, "nope").unwrap();

        assert!(matches!(
            validate_path_within(&outside, root.path()),
            Err(ValidationError::PathTraversal)
        ));
    }

    #[test]
    fn test_validate_path_within_rejects_dotdot_traversal() {
        let root = tempdir().unwrap();
        let sub = root.path().join("sub");
        std::fs::create_dir(&sub).unwrap();
        let sneaky = sub.join("..").join("..");

        let result = validate_path_within(&sneaky, &sub);
        assert!(matches!(
            result,
            Err(ValidationError::PathTraversal) | Err(ValidationError::PathNotFound(_))
        ));
    }
}
