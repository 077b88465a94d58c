//! Byte-level file access behind a trait, so command logic stays
//! testable without touching the real disk.

use std::path::Path;

use crate::error::{Error, Result};

/// Opaque storage for stack and manifest files.
pub trait FileStore {
    fn exists(&self, path: &Path) -> bool;

    fn load(&self, path: &Path) -> Result<Vec<u8>>;

    fn write(&self, path: &Path, data: &[u8]) -> Result<()>;
}

/// The local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFs;

impl FileStore for LocalFs {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn load(&self, path: &Path) -> Result<Vec<u8>> {
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }
        Ok(std::fs::read(path)?)
    }

    fn write(&self, path: &Path, data: &[u8]) -> Result<()> {
        Ok(std::fs::write(path, data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_on_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("stack.yml");
        let fs = LocalFs;

        assert!(!fs.exists(&path));
        fs.write(&path, b"project: demo\n").expect("write");
        assert!(fs.exists(&path));
        assert_eq!(fs.load(&path).expect("load"), b"project: demo\n");
    }

    #[test]
    fn missing_file_is_a_named_error() {
        let fs = LocalFs;
        let err = fs.load(Path::new("/nonexistent/stack.yml")).unwrap_err();

        assert!(matches!(err, Error::FileNotFound(_)));
    }
}
