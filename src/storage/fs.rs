//! Directory and file utilities.
//!
//! Directory creation is idempotent and never touches existing contents.
//! Artifact writes truncate and replace whatever was there before.

use crate::error::{LabPkiError, Result};
use std::fs;
use std::path::Path;

/// Permission bits applied to directories created for CA and node artifacts.
pub const DIRECTORY_MODE: u32 = 0o755;

/// Create `path` and any missing parents.
///
/// An existing directory is not an error and its contents are preserved.
///
/// # Example
///
/// ```rust,no_run
/// use labpki::storage::fs::create_directory;
/// use std::path::Path;
///
/// create_directory(Path::new("./lab/ca/root")).unwrap();
/// ```
pub fn create_directory(path: &Path) -> Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(DIRECTORY_MODE);
    }

    builder
        .create(path)
        .map_err(|source| LabPkiError::FileWriteError {
            path: path.to_path_buf(),
            source,
        })
}

/// Write `contents` to `path`, creating or truncating the file.
pub fn create_file(path: &Path, contents: impl AsRef<[u8]>) -> Result<()> {
    fs::write(path, contents).map_err(|source| LabPkiError::FileWriteError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_directory_nested() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ca").join("root");

        create_directory(&path).unwrap();
        assert!(path.is_dir());
    }

    #[test]
    fn test_create_directory_existing_preserves_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("r1");
        create_directory(&path).unwrap();
        fs::write(path.join("keep.txt"), "still here").unwrap();

        create_directory(&path).unwrap();

        let contents = fs::read_to_string(path.join("keep.txt")).unwrap();
        assert_eq!(contents, "still here");
    }

    #[cfg(unix)]
    #[test]
    fn test_create_directory_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("modes");
        create_directory(&path).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        // umask may clear bits but never adds any
        assert_eq!(mode & !DIRECTORY_MODE & 0o777, 0);
    }

    #[test]
    fn test_create_directory_over_file_fails() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("taken");
        fs::write(&path, "file").unwrap();

        let result = create_directory(&path);
        assert!(matches!(result, Err(LabPkiError::FileWriteError { .. })));
    }

    #[test]
    fn test_create_file_empty_contents() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("r1.csr");

        create_file(&path, "").unwrap();

        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_create_file_overwrites() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("root-ca.pem");

        create_file(&path, "first").unwrap();
        create_file(&path, "second").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_create_file_missing_parent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent").join("r1.pem");

        match create_file(&path, "data") {
            Err(LabPkiError::FileWriteError { path: failed, .. }) => assert_eq!(failed, path),
            other => panic!("Expected FileWriteError, got {:?}", other),
        }
    }
}
