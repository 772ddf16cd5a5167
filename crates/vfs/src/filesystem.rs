//! One bucket bound to one storage client.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use gcsfs_path::{GsFileAttributes, GsPath};
use gcsfs_storage::{
    Blob, BlobId, BlobPage, CreateBucketOptions, ListOptions, RetrySettings, RewriteProgress,
    StorageClient,
};
use tracing::{debug, warn};

use crate::channel::{GsReadChannel, GsWriteChannel};
use crate::config::FileSystemConfig;
use crate::dirstream::GsDirectoryStream;
use crate::error::FsError;

/// Bucket name of the special read-only root filesystem, which exists only
/// to enumerate buckets under `gs:///`.
pub const ROOT_BUCKET: &str = "/";

/// What `check_exist_or_empty` found under a key.
enum Existence {
    /// A plain blob with exactly the target key.
    File,
    /// A directory marker with no children.
    EmptyDirectory,
}

/// A filesystem over one bucket.
///
/// Immutable after construction apart from the open flag. All I/O goes
/// through the injected [`StorageClient`]; the instance itself never blocks
/// outside client calls.
pub struct GsFileSystem {
    bucket: String,
    client: Arc<dyn StorageClient>,
    location: Option<String>,
    storage_class: Option<String>,
    retry: RetrySettings,
    open: AtomicBool,
}

impl GsFileSystem {
    /// Bind a bucket to a storage client.
    pub fn new(bucket: impl Into<String>, client: Arc<dyn StorageClient>) -> Self {
        Self::with_config(bucket, client, &FileSystemConfig::default())
    }

    /// Bind a bucket to a storage client, keeping the configured location
    /// and storage class for later bucket creation.
    pub fn with_config(
        bucket: impl Into<String>,
        client: Arc<dyn StorageClient>,
        config: &FileSystemConfig,
    ) -> Self {
        Self {
            bucket: bucket.into(),
            client,
            location: config.location.clone(),
            storage_class: config.storage_class.clone(),
            retry: RetrySettings::default(),
            open: AtomicBool::new(true),
        }
    }

    /// The bucket this filesystem serves.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// True for the special `/` filesystem that only enumerates buckets.
    pub fn is_root_filesystem(&self) -> bool {
        self.bucket == ROOT_BUCKET
    }

    /// True until the provider closes this filesystem.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    pub(crate) fn close(&self) {
        self.open.store(false, Ordering::Release);
    }

    /// The storage client serving this bucket.
    pub fn client(&self) -> Arc<dyn StorageClient> {
        self.client.clone()
    }

    /// The bucket root path `/bucket`.
    pub fn root_path(&self) -> GsPath {
        if self.is_root_filesystem() {
            GsPath::parse("/")
        } else {
            GsPath::parse(&format!("/{}", self.bucket))
        }
    }

    fn ensure_open(&self) -> Result<(), FsError> {
        if self.is_open() {
            Ok(())
        } else {
            Err(FsError::Closed {
                context: format!("filesystem for bucket {}", self.bucket),
            })
        }
    }

    fn marker_key(path: &GsPath) -> String {
        format!("{}/", path.object_name())
    }

    /// The backend key a path denotes: the bare key, or the `key/` marker
    /// when the path carries the directory hint.
    fn blob_key(path: &GsPath) -> String {
        if path.dir_hint() {
            Self::marker_key(path)
        } else {
            path.object_name()
        }
    }

    /// Open a readable channel. The blob must exist; its size is captured
    /// into the channel.
    pub async fn new_read_channel(&self, path: &GsPath) -> Result<GsReadChannel, FsError> {
        self.ensure_open()?;
        let key: String = path.object_name();
        debug!(bucket = %self.bucket, key = %key, "open read channel");

        let blob: Blob = self
            .client
            .get_blob(&self.bucket, &key)
            .await
            .map_err(|e| FsError::from_storage(e, path))?
            .ok_or_else(|| FsError::no_such_file(path))?;

        let reader = self
            .client
            .open_reader(&self.bucket, &key)
            .await
            .map_err(|e| FsError::from_storage(e, path))?;
        Ok(GsReadChannel::new(reader, path, blob.size))
    }

    /// Open a writable channel. The object becomes visible when the channel
    /// closes.
    pub async fn new_write_channel(&self, path: &GsPath) -> Result<GsWriteChannel, FsError> {
        self.ensure_open()?;
        let key: String = path.object_name();
        debug!(bucket = %self.bucket, key = %key, "open write channel");

        let writer = self
            .client
            .open_writer(&self.bucket, &key)
            .await
            .map_err(|e| FsError::from_storage(e, path))?;
        Ok(GsWriteChannel::new(writer, path))
    }

    /// Create a directory.
    ///
    /// A bucket root creates the bucket itself, with any configured location
    /// and storage class. Any other path creates a zero-byte `key/` marker
    /// blob. Intermediate directories are not created implicitly; each level
    /// is the caller's request.
    pub async fn create_directory(&self, path: &GsPath) -> Result<(), FsError> {
        self.ensure_open()?;
        if path.is_bucket_root() {
            debug!(bucket = %self.bucket, "create bucket");
            let opts: CreateBucketOptions = CreateBucketOptions {
                location: self.location.clone(),
                storage_class: self.storage_class.clone(),
            };
            return match self.client.create_bucket(&self.bucket, opts).await {
                Ok(_) => Ok(()),
                Err(e) if e.is_conflict() => Err(FsError::already_exists(path)),
                Err(e) => Err(FsError::from_storage(e, path)),
            };
        }

        let marker: String = Self::marker_key(path);
        debug!(bucket = %self.bucket, key = %marker, "create directory marker");
        self.client
            .insert_blob(&self.bucket, &marker, &[])
            .await
            .map_err(|e| FsError::from_storage(e, path))?;
        Ok(())
    }

    /// Delete a file, directory, or bucket.
    ///
    /// Buckets delete through the backend, with `DirectoryNotEmpty` on a
    /// non-empty bucket; transient conflicts (the last object still being
    /// reaped) are retried a bounded number of times first. Files and
    /// directories are classified by one prefix listing before the one blob
    /// is removed.
    pub async fn delete(&self, path: &GsPath) -> Result<(), FsError> {
        self.ensure_open()?;
        if path.is_bucket_root() {
            return self.delete_bucket(path).await;
        }

        let target: String = match self.check_exist_or_empty(path).await? {
            Existence::File => path.object_name(),
            Existence::EmptyDirectory => Self::marker_key(path),
        };
        debug!(bucket = %self.bucket, key = %target, "delete blob");
        self.client
            .delete_blob(&self.bucket, &target)
            .await
            .map_err(|e| FsError::from_storage(e, path))?;
        Ok(())
    }

    async fn delete_bucket(&self, path: &GsPath) -> Result<(), FsError> {
        let mut attempt: u32 = 1;
        loop {
            match self.client.delete_bucket(&self.bucket).await {
                Ok(true) => return Ok(()),
                Ok(false) => return Err(FsError::no_such_file(path)),
                Err(e) if e.is_conflict() => {
                    if attempt >= self.retry.max_attempts {
                        return Err(FsError::DirectoryNotEmpty {
                            path: path.to_string(),
                        });
                    }
                    warn!(
                        bucket = %self.bucket,
                        attempt,
                        "bucket delete conflict, retrying"
                    );
                    tokio::time::sleep(self.retry.backoff).await;
                    attempt += 1;
                }
                Err(e) => return Err(FsError::from_storage(e, path)),
            }
        }
    }

    /// Classify what exists at `path` by one prefix listing.
    ///
    /// An entry equal to the bare key proves a file; an entry equal to the
    /// `key/` marker proves a directory; any entry strictly below `key/`
    /// proves the directory is non-empty. Keys that merely share the textual
    /// prefix (`foobar` under prefix `foo`) are ignored.
    async fn check_exist_or_empty(&self, path: &GsPath) -> Result<Existence, FsError> {
        let key: String = path.object_name();
        let dir_key: String = Self::marker_key(path);

        let mut found_file: bool = false;
        let mut found_marker: bool = false;
        let mut token: Option<String> = None;
        loop {
            let page: BlobPage = self
                .client
                .list_blobs(
                    &self.bucket,
                    ListOptions::with_prefix(key.clone()).page_token(token.take()),
                )
                .await
                .map_err(|e| FsError::from_storage(e, path))?;

            for blob in &page.blobs {
                if blob.name == key {
                    found_file = true;
                } else if blob.name == dir_key {
                    found_marker = true;
                } else if blob.name.starts_with(&dir_key) {
                    return Err(FsError::DirectoryNotEmpty {
                        path: path.to_string(),
                    });
                }
            }
            match page.next_page_token {
                Some(t) => token = Some(t),
                None => break,
            }
        }

        if path.dir_hint() {
            if found_marker {
                return Ok(Existence::EmptyDirectory);
            }
        } else if found_file {
            return Ok(Existence::File);
        } else if found_marker {
            return Ok(Existence::EmptyDirectory);
        }
        Err(FsError::no_such_file(path))
    }

    /// Server-side copy, iterating rewrite steps until the backend reports
    /// completion.
    pub async fn copy(&self, source: &GsPath, target: &GsPath) -> Result<(), FsError> {
        self.ensure_open()?;
        let src: BlobId = BlobId::new(
            source.bucket().unwrap_or(&self.bucket),
            Self::blob_key(source),
        );
        let dst: BlobId = BlobId::new(
            target.bucket().unwrap_or(&self.bucket),
            Self::blob_key(target),
        );
        debug!(src = %src, dst = %dst, "copy blob");

        let mut token: Option<String> = None;
        loop {
            let progress: RewriteProgress = self
                .client
                .rewrite_blob(&src, &dst, token.take())
                .await
                .map_err(|e| FsError::from_storage(e, source))?;
            if progress.done {
                return Ok(());
            }
            token = progress.rewrite_token;
        }
    }

    /// Attributes of a file, directory, or bucket; `NoSuchFile` when nothing
    /// exists at the path.
    pub async fn read_attributes(&self, path: &GsPath) -> Result<GsFileAttributes, FsError> {
        self.lookup_attributes(path)
            .await?
            .ok_or_else(|| FsError::no_such_file(path))
    }

    /// True when something exists at the path.
    pub async fn exists(&self, path: &GsPath) -> Result<bool, FsError> {
        Ok(self.lookup_attributes(path).await?.is_some())
    }

    /// Attribute resolution.
    ///
    /// Order: listing-seeded cache, global root, bucket root, directory
    /// probe when the path carries the directory hint, then blob fetch with
    /// a directory probe as fallback. The fallback is what disambiguates a
    /// name that exists both as file and directory: the bare name finds the
    /// file, the trailing-slash form finds the directory.
    pub async fn lookup_attributes(
        &self,
        path: &GsPath,
    ) -> Result<Option<GsFileAttributes>, FsError> {
        self.ensure_open()?;

        if let Some(cached) = path.take_cached_attributes() {
            return Ok(Some(cached));
        }

        if path.is_global_root() {
            return Ok(Some(GsFileAttributes::global_root()));
        }

        if path.is_bucket_root() {
            let info = self
                .client
                .get_bucket(&self.bucket)
                .await
                .map_err(|e| FsError::from_storage(e, path))?;
            return Ok(info.map(|i| i.to_attributes()));
        }

        if path.dir_hint() {
            return self.probe_directory(path).await;
        }

        let key: String = path.object_name();
        let blob = self
            .client
            .get_blob(&self.bucket, &key)
            .await
            .map_err(|e| FsError::from_storage(e, path))?;
        match blob {
            Some(blob) => Ok(Some(blob.to_attributes())),
            None => self.probe_directory(path).await,
        }
    }

    /// Directory probe: one current-directory listing under `key/`.
    ///
    /// A marker blob with exactly that key yields its attributes; any other
    /// entry proves the prefix exists and yields synthesized directory
    /// attributes; an empty listing means no directory.
    async fn probe_directory(&self, path: &GsPath) -> Result<Option<GsFileAttributes>, FsError> {
        let marker: String = Self::marker_key(path);
        let page: BlobPage = match self
            .client
            .list_blobs(&self.bucket, ListOptions::current_directory(marker.clone()))
            .await
        {
            Ok(page) => page,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(FsError::from_storage(e, path)),
        };

        for blob in &page.blobs {
            if blob.name == marker {
                return Ok(Some(blob.to_attributes()));
            }
        }
        if page.blobs.is_empty() {
            Ok(None)
        } else {
            Ok(Some(GsFileAttributes::directory(&self.bucket, &marker)))
        }
    }

    /// Open a directory stream.
    ///
    /// The global root streams buckets. A bucket root streams the bucket's
    /// top-level entries; any other path streams the current-directory
    /// listing under `key/`. Listings are eventually consistent.
    pub fn new_directory_stream(
        &self,
        dir: &GsPath,
        filter: impl Fn(&GsPath) -> bool + Send + 'static,
    ) -> Result<GsDirectoryStream, FsError> {
        self.ensure_open()?;
        if dir.is_global_root() {
            return Ok(GsDirectoryStream::buckets(self.client.clone(), filter));
        }

        let origin: String = if dir.is_bucket_root() {
            String::new()
        } else {
            Self::marker_key(dir)
        };
        Ok(GsDirectoryStream::blobs(
            self.client.clone(),
            self.bucket.clone(),
            origin,
            filter,
        ))
    }

    /// Read the whole object at `path`.
    pub async fn read_all_bytes(&self, path: &GsPath) -> Result<Vec<u8>, FsError> {
        let mut channel: GsReadChannel = self.new_read_channel(path).await?;
        let mut out: Vec<u8> = Vec::with_capacity(channel.size() as usize);
        let mut buf: [u8; 8192] = [0; 8192];
        loop {
            let n: usize = channel.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            out.extend_from_slice(&buf[..n]);
        }
        channel.close();
        Ok(out)
    }

    /// Write `data` as the whole object at `path`, replacing any previous
    /// content.
    pub async fn write_all_bytes(&self, path: &GsPath, data: &[u8]) -> Result<(), FsError> {
        let mut channel: GsWriteChannel = self.new_write_channel(path).await?;
        let mut offset: usize = 0;
        while offset < data.len() {
            offset += channel.write(&data[offset..]).await?;
        }
        channel.close().await
    }
}

impl std::fmt::Debug for GsFileSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GsFileSystem")
            .field("bucket", &self.bucket)
            .field("open", &self.is_open())
            .finish()
    }
}
