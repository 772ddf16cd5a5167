//! Filesystem error types.

use gcsfs_path::{GsPath, PathError};
use gcsfs_storage::StorageError;
use thiserror::Error;

/// Errors surfaced by filesystem operations.
///
/// The POSIX-like kinds (`NoSuchFile`, `FileAlreadyExists`,
/// `DirectoryNotEmpty`, `AccessDenied`) are produced by classifying the
/// backend's error kinds; anything unclassified surfaces as
/// [`FsError::Storage`] with the cause attached.
#[derive(Debug, Error)]
pub enum FsError {
    /// Target blob, directory marker, or bucket does not exist.
    #[error("No such file: {path}")]
    NoSuchFile {
        /// The missing path.
        path: String,
    },

    /// Target already exists and may not be overwritten.
    #[error("File already exists: {path}")]
    FileAlreadyExists {
        /// The conflicting path.
        path: String,
    },

    /// Directory or bucket still has children.
    #[error("Directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The non-empty directory.
        path: String,
    },

    /// Authorization failure, or an access mode the store cannot grant.
    #[error("Access denied: {path}")]
    AccessDenied {
        /// The path access was denied to.
        path: String,
    },

    /// Malformed URI, missing bucket, mismatched path, or invalid open-mode
    /// combination.
    #[error("Invalid argument: {message}")]
    IllegalArgument {
        /// What is wrong.
        message: String,
    },

    /// Operation the store cannot express.
    #[error("Unsupported operation: {operation}")]
    Unsupported {
        /// The refused operation.
        operation: &'static str,
    },

    /// A filesystem is already registered for the bucket.
    #[error("Filesystem already exists for bucket: {bucket}")]
    FileSystemAlreadyExists {
        /// The conflicting bucket.
        bucket: String,
    },

    /// No filesystem is registered for the bucket.
    #[error("Filesystem not found for bucket: {bucket}")]
    FileSystemNotFound {
        /// The unregistered bucket.
        bucket: String,
    },

    /// The channel or filesystem was closed before the operation.
    #[error("Closed: {context}")]
    Closed {
        /// What was closed.
        context: String,
    },

    /// Path parsing or manipulation failure.
    #[error(transparent)]
    Path(#[from] PathError),

    /// Any other backend failure, wrapping the underlying cause.
    #[error("Storage backend error: {0}")]
    Storage(#[source] StorageError),
}

impl FsError {
    /// Classify a backend error against the path being operated on.
    ///
    /// Not-found becomes [`FsError::NoSuchFile`] and authorization failures
    /// become [`FsError::AccessDenied`]; conflicts stay with the caller,
    /// which knows whether they mean "already exists" or "not empty".
    pub fn from_storage(err: StorageError, path: &GsPath) -> Self {
        if err.is_not_found() {
            FsError::NoSuchFile {
                path: path.to_string(),
            }
        } else if err.is_access_denied() {
            FsError::AccessDenied {
                path: path.to_string(),
            }
        } else {
            FsError::Storage(err)
        }
    }

    /// Shorthand for [`FsError::NoSuchFile`].
    pub fn no_such_file(path: &GsPath) -> Self {
        FsError::NoSuchFile {
            path: path.to_string(),
        }
    }

    /// Shorthand for [`FsError::FileAlreadyExists`].
    pub fn already_exists(path: &GsPath) -> Self {
        FsError::FileAlreadyExists {
            path: path.to_string(),
        }
    }

    /// Shorthand for [`FsError::IllegalArgument`].
    pub fn illegal_argument(message: impl Into<String>) -> Self {
        FsError::IllegalArgument {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_classification() {
        let path: GsPath = GsPath::parse("/b/missing");

        let err: FsError = FsError::from_storage(
            StorageError::ObjectNotFound {
                bucket: "b".to_string(),
                key: "missing".to_string(),
            },
            &path,
        );
        assert!(matches!(err, FsError::NoSuchFile { .. }));

        let err: FsError = FsError::from_storage(
            StorageError::Backend {
                code: 403,
                message: "forbidden".to_string(),
            },
            &path,
        );
        assert!(matches!(err, FsError::AccessDenied { .. }));

        let err: FsError = FsError::from_storage(
            StorageError::Backend {
                code: 500,
                message: "boom".to_string(),
            },
            &path,
        );
        assert!(matches!(err, FsError::Storage(_)));
    }
}
