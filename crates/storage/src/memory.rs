//! In-memory storage backend.
//!
//! A complete, immediately consistent implementation of [`StorageClient`]
//! over process memory. Used by the test suites and by embeddings that want
//! the filesystem semantics without a remote store. Keys are held in sorted
//! order so listings come back lexicographically, like the real backend.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::credentials::GcsCredentials;
use crate::error::StorageError;
use crate::traits::{BlobReader, BlobWriter, StorageClient, StorageClientFactory};
use crate::types::{
    Blob, BlobId, BlobPage, BucketInfo, BucketPage, CreateBucketOptions, ListOptions,
    RewriteProgress,
};

/// Default number of entries per listing page.
const DEFAULT_PAGE_SIZE: usize = 1000;

fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[derive(Debug, Clone)]
struct StoredBlob {
    data: Arc<Vec<u8>>,
    create_time: i64,
    update_time: i64,
}

#[derive(Debug)]
struct StoredBucket {
    info: BucketInfo,
    blobs: BTreeMap<String, StoredBlob>,
}

/// In-memory [`StorageClient`] implementation.
///
/// `rewrite_chunk_size` bounds how many bytes one rewrite step processes, so
/// callers exercise the same copy loop a remote backend forces on them.
pub struct MemoryStorageClient {
    buckets: Arc<RwLock<BTreeMap<String, StoredBucket>>>,
    rewrite_chunk_size: u64,
    page_size: usize,
}

impl MemoryStorageClient {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            buckets: Arc::new(RwLock::new(BTreeMap::new())),
            rewrite_chunk_size: u64::MAX,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Bound the bytes processed per rewrite step.
    pub fn with_rewrite_chunk_size(mut self, chunk_size: u64) -> Self {
        self.rewrite_chunk_size = chunk_size.max(1);
        self
    }

    /// Bound the entries per listing page.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    fn make_blob(bucket: &str, name: &str, stored: &StoredBlob) -> Blob {
        Blob {
            bucket: bucket.to_string(),
            name: name.to_string(),
            size: stored.data.len() as u64,
            create_time: Some(stored.create_time),
            update_time: Some(stored.update_time),
        }
    }

    fn read_blob_data(&self, bucket: &str, key: &str) -> Result<Arc<Vec<u8>>, StorageError> {
        let buckets = self.buckets.read();
        buckets
            .get(bucket)
            .and_then(|b| b.blobs.get(key))
            .map(|stored| stored.data.clone())
            .ok_or_else(|| StorageError::ObjectNotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    fn store_blob(&self, bucket: &str, key: &str, data: Vec<u8>) -> Result<Blob, StorageError> {
        let mut buckets = self.buckets.write();
        let stored_bucket: &mut StoredBucket =
            buckets
                .get_mut(bucket)
                .ok_or_else(|| StorageError::BucketNotFound {
                    bucket: bucket.to_string(),
                })?;
        let now: i64 = now_millis();
        let stored: StoredBlob = StoredBlob {
            data: Arc::new(data),
            create_time: now,
            update_time: now,
        };
        let blob: Blob = Self::make_blob(bucket, key, &stored);
        stored_bucket.blobs.insert(key.to_string(), stored);
        Ok(blob)
    }

    /// Resolve the current-directory or recursive view of a bucket's keys.
    ///
    /// With a delimiter, keys reaching past the first separator after the
    /// prefix collapse into synthesized zero-byte directory markers, one per
    /// immediate sub-prefix.
    fn list_entries(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: Option<&str>,
    ) -> Result<Vec<Blob>, StorageError> {
        let buckets = self.buckets.read();
        let stored_bucket: &StoredBucket =
            buckets
                .get(bucket)
                .ok_or_else(|| StorageError::BucketNotFound {
                    bucket: bucket.to_string(),
                })?;

        let mut entries: BTreeMap<String, Blob> = BTreeMap::new();
        let mut prefixes: BTreeSet<String> = BTreeSet::new();

        for (name, stored) in stored_bucket.blobs.range(prefix.to_string()..) {
            let Some(rest) = name.strip_prefix(prefix) else {
                break;
            };
            match delimiter.and_then(|d| rest.find(d).map(|i| (d, i))) {
                Some((delim, idx)) => {
                    // Collapses everything below the first separator into one
                    // synthesized marker.
                    prefixes.insert(format!("{}{}{}", prefix, &rest[..idx], delim));
                }
                None => {
                    entries.insert(name.clone(), Self::make_blob(bucket, name, stored));
                }
            }
        }

        for sub_prefix in prefixes {
            entries.entry(sub_prefix.clone()).or_insert(Blob {
                bucket: bucket.to_string(),
                name: sub_prefix,
                size: 0,
                create_time: None,
                update_time: None,
            });
        }

        Ok(entries.into_values().collect())
    }
}

impl Default for MemoryStorageClient {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_offset_token(token: Option<&str>) -> Result<usize, StorageError> {
    match token {
        None => Ok(0),
        Some(t) => t.parse().map_err(|_| StorageError::InvalidConfig {
            message: format!("Malformed page token: {}", t),
        }),
    }
}

#[async_trait]
impl StorageClient for MemoryStorageClient {
    async fn get_blob(&self, bucket: &str, key: &str) -> Result<Option<Blob>, StorageError> {
        let buckets = self.buckets.read();
        Ok(buckets
            .get(bucket)
            .and_then(|b| b.blobs.get(key))
            .map(|stored| Self::make_blob(bucket, key, stored)))
    }

    async fn open_reader(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn BlobReader>, StorageError> {
        let data: Arc<Vec<u8>> = self.read_blob_data(bucket, key)?;
        Ok(Box::new(MemoryBlobReader { data, pos: 0 }))
    }

    async fn open_writer(
        &self,
        bucket: &str,
        key: &str,
    ) -> Result<Box<dyn BlobWriter>, StorageError> {
        if !self.buckets.read().contains_key(bucket) {
            return Err(StorageError::BucketNotFound {
                bucket: bucket.to_string(),
            });
        }
        Ok(Box::new(MemoryBlobWriter {
            buckets: self.buckets.clone(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            buf: Vec::new(),
        }))
    }

    async fn insert_blob(
        &self,
        bucket: &str,
        key: &str,
        data: &[u8],
    ) -> Result<Blob, StorageError> {
        self.store_blob(bucket, key, data.to_vec())
    }

    async fn list_blobs(
        &self,
        bucket: &str,
        opts: ListOptions,
    ) -> Result<BlobPage, StorageError> {
        let prefix: &str = opts.prefix.as_deref().unwrap_or("");
        let entries: Vec<Blob> = self.list_entries(bucket, prefix, opts.delimiter.as_deref())?;

        let offset: usize = parse_offset_token(opts.page_token.as_deref())?;
        let page_size: usize = opts.page_size.unwrap_or(self.page_size);
        let page: Vec<Blob> = entries.iter().skip(offset).take(page_size).cloned().collect();
        let next_offset: usize = offset + page.len();
        let next_page_token: Option<String> =
            (next_offset < entries.len()).then(|| next_offset.to_string());

        Ok(BlobPage {
            blobs: page,
            next_page_token,
        })
    }

    async fn rewrite_blob(
        &self,
        src: &BlobId,
        dst: &BlobId,
        rewrite_token: Option<String>,
    ) -> Result<RewriteProgress, StorageError> {
        let data: Arc<Vec<u8>> = self.read_blob_data(&src.bucket, &src.key)?;
        let total: u64 = data.len() as u64;

        let done_so_far: u64 = parse_offset_token(rewrite_token.as_deref())? as u64;
        let rewritten: u64 = total.min(done_so_far + self.rewrite_chunk_size);

        if rewritten < total {
            return Ok(RewriteProgress {
                done: false,
                rewrite_token: Some(rewritten.to_string()),
                total_bytes_rewritten: rewritten,
            });
        }

        self.store_blob(&dst.bucket, &dst.key, data.as_ref().clone())?;
        Ok(RewriteProgress {
            done: true,
            rewrite_token: None,
            total_bytes_rewritten: total,
        })
    }

    async fn delete_blob(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.write();
        Ok(buckets
            .get_mut(bucket)
            .map(|b| b.blobs.remove(key).is_some())
            .unwrap_or(false))
    }

    async fn get_bucket(&self, name: &str) -> Result<Option<BucketInfo>, StorageError> {
        let buckets = self.buckets.read();
        Ok(buckets.get(name).map(|b| b.info.clone()))
    }

    async fn create_bucket(
        &self,
        name: &str,
        opts: CreateBucketOptions,
    ) -> Result<BucketInfo, StorageError> {
        let mut buckets = self.buckets.write();
        if buckets.contains_key(name) {
            return Err(StorageError::BucketAlreadyExists {
                bucket: name.to_string(),
            });
        }
        let info: BucketInfo = BucketInfo {
            name: name.to_string(),
            location: opts.location,
            storage_class: opts.storage_class,
            create_time: Some(now_millis()),
        };
        buckets.insert(
            name.to_string(),
            StoredBucket {
                info: info.clone(),
                blobs: BTreeMap::new(),
            },
        );
        Ok(info)
    }

    async fn delete_bucket(&self, name: &str) -> Result<bool, StorageError> {
        let mut buckets = self.buckets.write();
        match buckets.get(name) {
            None => Ok(false),
            Some(stored) if !stored.blobs.is_empty() => Err(StorageError::Conflict {
                message: format!("Bucket not empty: {}", name),
            }),
            Some(_) => {
                buckets.remove(name);
                Ok(true)
            }
        }
    }

    async fn list_buckets(
        &self,
        page_token: Option<String>,
    ) -> Result<BucketPage, StorageError> {
        let buckets = self.buckets.read();
        let all: Vec<BucketInfo> = buckets.values().map(|b| b.info.clone()).collect();

        let offset: usize = parse_offset_token(page_token.as_deref())?;
        let page: Vec<BucketInfo> = all.iter().skip(offset).take(self.page_size).cloned().collect();
        let next_offset: usize = offset + page.len();
        let next_page_token: Option<String> =
            (next_offset < all.len()).then(|| next_offset.to_string());

        Ok(BucketPage {
            buckets: page,
            next_page_token,
        })
    }
}

struct MemoryBlobReader {
    data: Arc<Vec<u8>>,
    pos: usize,
}

#[async_trait]
impl BlobReader for MemoryBlobReader {
    async fn seek(&mut self, pos: u64) -> Result<(), StorageError> {
        self.pos = pos.min(self.data.len() as u64) as usize;
        Ok(())
    }

    async fn read(&mut self, buf: &mut [u8]) -> Result<usize, StorageError> {
        let remaining: usize = self.data.len() - self.pos;
        let n: usize = remaining.min(buf.len());
        buf[..n].copy_from_slice(&self.data[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

struct MemoryBlobWriter {
    buckets: Arc<RwLock<BTreeMap<String, StoredBucket>>>,
    bucket: String,
    key: String,
    buf: Vec<u8>,
}

#[async_trait]
impl BlobWriter for MemoryBlobWriter {
    async fn write(&mut self, buf: &[u8]) -> Result<usize, StorageError> {
        self.buf.extend_from_slice(buf);
        Ok(buf.len())
    }

    async fn close(self: Box<Self>) -> Result<(), StorageError> {
        let mut buckets = self.buckets.write();
        let stored_bucket: &mut StoredBucket =
            buckets
                .get_mut(&self.bucket)
                .ok_or_else(|| StorageError::BucketNotFound {
                    bucket: self.bucket.clone(),
                })?;
        let now: i64 = now_millis();
        stored_bucket.blobs.insert(
            self.key,
            StoredBlob {
                data: Arc::new(self.buf),
                create_time: now,
                update_time: now,
            },
        );
        Ok(())
    }
}

/// Factory that hands every filesystem the same shared memory store.
pub struct MemoryStorageFactory {
    client: Arc<MemoryStorageClient>,
}

impl MemoryStorageFactory {
    /// Wrap an existing store.
    pub fn new(client: Arc<MemoryStorageClient>) -> Self {
        Self { client }
    }

    /// The shared store, for direct seeding in tests.
    pub fn client(&self) -> Arc<MemoryStorageClient> {
        self.client.clone()
    }
}

impl StorageClientFactory for MemoryStorageFactory {
    fn create(
        &self,
        _credentials: &GcsCredentials,
    ) -> Result<Arc<dyn StorageClient>, StorageError> {
        Ok(self.client.clone())
    }
}
