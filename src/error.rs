//! Error types shared across the rendering pipeline

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while loading, caching or rendering files
#[derive(Debug, Error)]
pub enum Error {
    /// The requested file or template does not exist
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The process has no read access to the file
    #[error("access denied: {0}")]
    AccessDenied(PathBuf),

    /// A template violates the structural rules (missing or duplicated
    /// content slot). Indicates a misconfigured deployment, not a
    /// transient condition.
    #[error("invalid template: {0}")]
    InvalidTemplate(String),

    /// Any other filesystem failure
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Classify an I/O error for a given path into the error taxonomy
    pub fn from_io(path: &Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            std::io::ErrorKind::PermissionDenied => Error::AccessDenied(path.to_path_buf()),
            _ => Error::Io {
                path: path.to_path_buf(),
                source: err,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_not_found() {
        let err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err = Error::from_io(Path::new("/tmp/x.md"), err);
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_classify_permission_denied() {
        let err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "nope");
        let err = Error::from_io(Path::new("/tmp/x.md"), err);
        assert!(matches!(err, Error::AccessDenied(_)));
    }

    #[test]
    fn test_other_kinds_stay_io() {
        let err = std::io::Error::new(std::io::ErrorKind::Interrupted, "eintr");
        let err = Error::from_io(Path::new("/tmp/x.md"), err);
        assert!(matches!(err, Error::Io { .. }));
    }
}
