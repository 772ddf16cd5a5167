//! Error types for storage backend operations.

use thiserror::Error;

/// Errors surfaced by a [`StorageClient`](crate::StorageClient) backend.
///
/// The filesystem layer classifies these by kind through the predicate
/// methods rather than by matching messages; backends built on HTTP map their
/// status codes either onto the dedicated variants or onto
/// [`StorageError::Backend`].
#[derive(Debug, Error)]
pub enum StorageError {
    /// Object does not exist.
    #[error("Object not found: {bucket}/{key}")]
    ObjectNotFound {
        /// Owning bucket.
        bucket: String,
        /// Object key.
        key: String,
    },

    /// Bucket does not exist.
    #[error("Bucket not found: {bucket}")]
    BucketNotFound {
        /// The missing bucket.
        bucket: String,
    },

    /// Bucket name is already taken.
    #[error("Bucket already exists: {bucket}")]
    BucketAlreadyExists {
        /// The conflicting bucket.
        bucket: String,
    },

    /// Operation conflicts with current state, e.g. deleting a non-empty
    /// bucket.
    #[error("Conflict: {message}")]
    Conflict {
        /// Backend-provided detail.
        message: String,
    },

    /// Authorization failure.
    #[error("Access denied: {message}")]
    AccessDenied {
        /// Backend-provided detail.
        message: String,
    },

    /// Invalid client or credential configuration.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        message: String,
    },

    /// Local IO failure, e.g. reading a credential file.
    #[error("IO error at {context}: {source}")]
    Io {
        /// What was being accessed.
        context: String,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Any other backend failure, tagged with its HTTP status code.
    #[error("Backend error (HTTP {code}): {message}")]
    Backend {
        /// HTTP status code reported by the backend.
        code: u16,
        /// Backend-provided detail.
        message: String,
    },
}

impl StorageError {
    /// True when the error means the target object or bucket does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StorageError::ObjectNotFound { .. }
                | StorageError::BucketNotFound { .. }
                | StorageError::Backend { code: 404, .. }
        )
    }

    /// True when the error is a state conflict (HTTP 409 class).
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            StorageError::Conflict { .. }
                | StorageError::BucketAlreadyExists { .. }
                | StorageError::Backend { code: 409, .. }
        )
    }

    /// True when the error is an authorization failure (HTTP 401/403 class).
    pub fn is_access_denied(&self) -> bool {
        matches!(
            self,
            StorageError::AccessDenied { .. } | StorageError::Backend { code: 401 | 403, .. }
        )
    }
}
