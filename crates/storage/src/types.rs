//! Record types exchanged with storage backends.

use std::fmt;
use std::time::Duration;

use gcsfs_path::GsFileAttributes;

/// Identifies one blob as a (bucket, key) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobId {
    /// Owning bucket.
    pub bucket: String,
    /// Object key. May contain `/` without the store interpreting it.
    pub key: String,
}

impl BlobId {
    /// Create a blob id.
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

/// A stored object as reported by list/head operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Owning bucket.
    pub bucket: String,
    /// Object key.
    pub name: String,
    /// Object size in bytes.
    pub size: u64,
    /// Creation time (epoch milliseconds).
    pub create_time: Option<i64>,
    /// Last modification time (epoch milliseconds).
    pub update_time: Option<i64>,
}

impl Blob {
    /// True when this blob is a directory marker (key ends in `/`) rather
    /// than a regular object.
    pub fn is_directory_marker(&self) -> bool {
        self.name.ends_with('/')
    }

    /// Convert to filesystem attributes, choosing file vs directory by the
    /// trailing-slash marker rule.
    pub fn to_attributes(&self) -> GsFileAttributes {
        if self.is_directory_marker() {
            GsFileAttributes::directory(&self.bucket, &self.name)
        } else {
            GsFileAttributes::file(
                &self.bucket,
                &self.name,
                self.size,
                self.create_time,
                self.update_time,
            )
        }
    }
}

/// A bucket as reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketInfo {
    /// Bucket name.
    pub name: String,
    /// Bucket location, e.g. `"eu"`.
    pub location: Option<String>,
    /// Storage class, e.g. `"nearline"`.
    pub storage_class: Option<String>,
    /// Creation time (epoch milliseconds).
    pub create_time: Option<i64>,
}

impl BucketInfo {
    /// Convert to filesystem attributes.
    pub fn to_attributes(&self) -> GsFileAttributes {
        GsFileAttributes::bucket(&self.name, self.create_time)
    }
}

/// Options for a blob listing.
///
/// With `delimiter = "/"` the listing runs in current-directory mode: it
/// yields the objects directly under the prefix plus synthesized directory
/// markers for immediate sub-prefixes, instead of recursing into the whole
/// key space.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// Only keys with this prefix are returned.
    pub prefix: Option<String>,
    /// Key separator for current-directory listings.
    pub delimiter: Option<String>,
    /// Continuation token from a previous page.
    pub page_token: Option<String>,
    /// Maximum entries per page; backend default when unset.
    pub page_size: Option<usize>,
}

impl ListOptions {
    /// Listing of every key under `prefix`, recursively.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Self::default()
        }
    }

    /// Current-directory listing under `prefix`.
    pub fn current_directory(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            delimiter: Some("/".to_string()),
            ..Self::default()
        }
    }

    /// Set the continuation token.
    pub fn page_token(mut self, token: Option<String>) -> Self {
        self.page_token = token;
        self
    }

    /// Set the page size.
    pub fn page_size(mut self, size: usize) -> Self {
        self.page_size = Some(size);
        self
    }
}

/// One page of a blob listing.
#[derive(Debug, Clone)]
pub struct BlobPage {
    /// Entries in this page, lexicographically ordered.
    pub blobs: Vec<Blob>,
    /// Token for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

/// One page of a bucket listing.
#[derive(Debug, Clone)]
pub struct BucketPage {
    /// Buckets in this page, ordered by name.
    pub buckets: Vec<BucketInfo>,
    /// Token for the next page; `None` on the last page.
    pub next_page_token: Option<String>,
}

/// Progress of one server-side rewrite step.
///
/// A rewrite may be chunked by the backend; the caller loops, feeding
/// `rewrite_token` back in, until `done`.
#[derive(Debug, Clone)]
pub struct RewriteProgress {
    /// True once the destination object is complete.
    pub done: bool,
    /// Token to pass to the next rewrite call.
    pub rewrite_token: Option<String>,
    /// Bytes rewritten so far.
    pub total_bytes_rewritten: u64,
}

/// Options for bucket creation.
#[derive(Debug, Clone, Default)]
pub struct CreateBucketOptions {
    /// Bucket location.
    pub location: Option<String>,
    /// Storage class.
    pub storage_class: Option<String>,
}

/// Bounded retry policy for transient backend conflicts.
#[derive(Debug, Clone)]
pub struct RetrySettings {
    /// Maximum attempts, first try included.
    pub max_attempts: u32,
    /// Delay between attempts.
    pub backoff: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff: Duration::from_millis(100),
        }
    }
}
