//! Filesystem configuration and open/access modes.

use std::collections::HashMap;
use std::path::PathBuf;

/// Options recognized when creating a filesystem for a bucket.
#[derive(Debug, Clone, Default)]
pub struct FileSystemConfig {
    /// Path to a service-account key file.
    pub credentials: Option<PathBuf>,
    /// Project identifier.
    pub project_id: Option<String>,
    /// Bucket location used when this filesystem creates its bucket.
    pub location: Option<String>,
    /// Storage class used when this filesystem creates its bucket.
    pub storage_class: Option<String>,
}

impl FileSystemConfig {
    /// Empty configuration: credentials resolve from the environment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from a string options map.
    ///
    /// Recognized keys: `credentials`, `projectId`, `location`,
    /// `storageClass`. Unknown keys are ignored.
    pub fn from_map(map: &HashMap<String, String>) -> Self {
        Self {
            credentials: map.get("credentials").map(PathBuf::from),
            project_id: map.get("projectId").cloned(),
            location: map.get("location").cloned(),
            storage_class: map.get("storageClass").cloned(),
        }
    }

    /// Set the service-account key file.
    pub fn with_credentials(mut self, path: impl Into<PathBuf>) -> Self {
        self.credentials = Some(path.into());
        self
    }

    /// Set the project identifier.
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    /// Set the bucket location for bucket creation.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the storage class for bucket creation.
    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = Some(storage_class.into());
        self
    }
}

/// Open modes accepted by `new_byte_channel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    /// Open for reading.
    Read,
    /// Open for sequential writing.
    Write,
    /// Create the target when it does not exist.
    Create,
    /// Create the target, failing when it already exists.
    CreateNew,
    /// Truncate an existing target. A no-op here: writes always replace the
    /// whole object.
    TruncateExisting,
    /// Append to an existing target. Rejected: the store has no append.
    Append,
    /// Synchronous content-and-metadata writes. Rejected.
    Sync,
    /// Synchronous content writes. Rejected.
    Dsync,
}

/// Access modes accepted by `check_access`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read access.
    Read,
    /// Write access.
    Write,
    /// Execute access. Never grantable on an object store.
    Execute,
}
