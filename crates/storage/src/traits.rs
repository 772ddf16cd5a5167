//! Client traits for object-store backends.

use std::sync::Arc;

use async_trait::async_trait;

use crate::credentials::GcsCredentials;
use crate::error::StorageError;
use crate::types::{
    Blob, BlobId, BlobPage, BucketInfo, BucketPage, CreateBucketOptions, ListOptions,
    RewriteProgress,
};

/// Seekable ranged reader over one blob.
///
/// Not safe for concurrent use; each reader is owned by one task at a time.
#[async_trait]
pub trait BlobReader: Send {
    /// Move the read position. Seeking past the end is allowed; subsequent
    /// reads return end-of-stream.
    async fn seek(&mut self, pos: u64) -> Result<(), StorageError>;

    /// Read into `buf`, returning the number of bytes read. Zero means
    /// end-of-stream.
    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError>;
}

/// Sequential resumable-style writer to one blob.
///
/// Written bytes become visible as an object only when `close` completes;
/// a writer dropped without closing leaves no trace in the store.
#[async_trait]
pub trait BlobWriter: Send {
    /// Append `buf`, returning the number of bytes accepted.
    async fn write(&mut self, buf: &[u8]) -> Result<usize, StorageError>;

    /// Finalize the upload and make the object visible.
    async fn close(self: Box<Self>) -> Result<(), StorageError>;
}

/// Narrow interface over the object store.
///
/// Implementations must be safe for concurrent use; the filesystem layer
/// shares one client across all operations on a bucket.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Fetch blob metadata by exact key. `Ok(None)` when the blob (or its
    /// bucket) does not exist.
    async fn get_blob(&self, bucket: &str, key: &str) -> Result<Option<Blob>, StorageError>;

    /// Open a seekable reader over an existing blob.
    async fn open_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn BlobReader>, StorageError>;

    /// Open a sequential writer. The object appears only when the writer is
    /// closed.
    async fn open_writer(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn BlobWriter>, StorageError>;

    /// One-shot small-object upload, used for directory markers and
    /// convenience writes.
    async fn insert_blob(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
    ) -> Result<Blob, StorageError>;

    /// One page of a prefix listing. Listings are eventually consistent: a
    /// write followed immediately by a list may not observe the new object.
    async fn list_blobs(&self, bucket: &str, opts: ListOptions)
        -> Result<BlobPage, StorageError>;

    /// One step of a server-side copy. Pass the returned token back in until
    /// `done`.
    async fn rewrite_blob(
        &self,
        src: &BlobId,
        dst: &BlobId,
        rewrite_token: Option<String>,
    ) -> Result<RewriteProgress, StorageError>;

    /// Delete a blob by exact key. Returns whether anything was deleted.
    async fn delete_blob(&self, bucket: &str, key: &str) -> Result<bool, StorageError>;

    /// Fetch bucket metadata. `Ok(None)` when the bucket does not exist.
    async fn get_bucket(&self, name: &str) -> Result<Option<BucketInfo>, StorageError>;

    /// Create a bucket. Fails with a conflict when the name is taken.
    async fn create_bucket(
        &self,
        name: &str,
        opts: CreateBucketOptions,
    ) -> Result<BucketInfo, StorageError>;

    /// Delete an empty bucket. Returns whether the bucket existed; a
    /// non-empty bucket is a conflict.
    async fn delete_bucket(&self, name: &str) -> Result<bool, StorageError>;

    /// One page of the bucket listing.
    async fn list_buckets(
        &self,
        page_token: Option<String>,
    ) -> Result<BucketPage, StorageError>;
}

/// Builds storage clients from resolved credentials.
///
/// The provider memoizes clients per credential identity, so a factory is
/// only invoked once per distinct (credentials, project) pair.
pub trait StorageClientFactory: Send + Sync {
    /// Construct a client for the given credentials.
    fn create(
        &self,
        credentials: &GcsCredentials,
    ) -> Result<Arc<dyn StorageClient>, StorageError>;
}
