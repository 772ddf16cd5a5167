//! Process-wide filesystem registry and public operation dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use gcsfs_path::{GsFileAttributes, GsPath};
use gcsfs_storage::{GcsCredentials, StorageClient, StorageClientFactory};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::channel::{GsByteChannel, GsReadChannel, GsWriteChannel};
use crate::config::{AccessMode, FileSystemConfig, OpenMode};
use crate::dirstream::GsDirectoryStream;
use crate::error::FsError;
use crate::filesystem::{GsFileSystem, ROOT_BUCKET};

/// The only supported attribute view name.
pub const BASIC_VIEW: &str = "basic";

/// Process-wide registry of bucket filesystems and entry point for all
/// public file operations.
///
/// One instance owns every [`GsFileSystem`] it hands out; filesystems are
/// created on first demand for a bucket and cached until closed. Registry
/// mutations are serialized behind a write lock while lookups proceed
/// concurrently. Storage clients are memoized per resolved credential
/// identity, so many buckets under one account share one client.
pub struct GsFileSystemProvider {
    factory: Arc<dyn StorageClientFactory>,
    filesystems: RwLock<HashMap<String, Arc<GsFileSystem>>>,
    clients: DashMap<GcsCredentials, Arc<dyn StorageClient>>,
}

impl GsFileSystemProvider {
    /// Create a provider backed by the given client factory.
    pub fn new(factory: Arc<dyn StorageClientFactory>) -> Self {
        Self {
            factory,
            filesystems: RwLock::new(HashMap::new()),
            clients: DashMap::new(),
        }
    }

    /// Create a provider over a fresh in-memory store. Intended for tests
    /// and embeddings.
    pub fn in_memory() -> Self {
        let client = Arc::new(gcsfs_storage::MemoryStorageClient::new());
        Self::new(Arc::new(gcsfs_storage::MemoryStorageFactory::new(client)))
    }

    fn client_for(&self, credentials: &GcsCredentials) -> Result<Arc<dyn StorageClient>, FsError> {
        if let Some(client) = self.clients.get(credentials) {
            return Ok(client.clone());
        }
        let client: Arc<dyn StorageClient> = self
            .factory
            .create(credentials)
            .map_err(FsError::Storage)?;
        self.clients.insert(credentials.clone(), client.clone());
        Ok(client)
    }

    fn resolve_credentials(config: &FileSystemConfig) -> Result<GcsCredentials, FsError> {
        GcsCredentials::resolve(config.credentials.as_deref(), config.project_id.as_deref())
            .map_err(FsError::Storage)
    }

    fn bucket_of(uri_path: &GsPath) -> Result<String, FsError> {
        if uri_path.is_global_root() {
            return Ok(ROOT_BUCKET.to_string());
        }
        uri_path
            .bucket()
            .map(str::to_string)
            .ok_or_else(|| FsError::illegal_argument(format!("Path has no bucket: {}", uri_path)))
    }

    /// The registered filesystem for a `gs://bucket` URI.
    pub fn get_file_system(&self, uri: &str) -> Result<Arc<GsFileSystem>, FsError> {
        let path: GsPath = GsPath::from_uri(uri)?;
        let bucket: String = Self::bucket_of(&path)?;
        self.filesystems
            .read()
            .get(&bucket)
            .cloned()
            .ok_or(FsError::FileSystemNotFound { bucket })
    }

    /// Create and register a filesystem for a `gs://bucket` URI.
    ///
    /// Fails when the bucket is already bound. Credentials resolve from the
    /// configuration, falling back to the environment.
    pub fn new_file_system(
        &self,
        uri: &str,
        config: FileSystemConfig,
    ) -> Result<Arc<GsFileSystem>, FsError> {
        let path: GsPath = GsPath::from_uri(uri)?;
        let bucket: String = Self::bucket_of(&path)?;

        let mut filesystems = self.filesystems.write();
        if filesystems.contains_key(&bucket) {
            return Err(FsError::FileSystemAlreadyExists { bucket });
        }
        let credentials: GcsCredentials = Self::resolve_credentials(&config)?;
        let client: Arc<dyn StorageClient> = self.client_for(&credentials)?;
        let fs: Arc<GsFileSystem> = Arc::new(GsFileSystem::with_config(
            bucket.clone(),
            client,
            &config,
        ));
        info!(bucket = %bucket, "filesystem created");
        filesystems.insert(bucket, fs.clone());
        Ok(fs)
    }

    /// Parse a `gs:` URI into a path, creating the bucket's filesystem on
    /// demand with environment-resolved credentials.
    pub fn get_path(&self, uri: &str) -> Result<GsPath, FsError> {
        let path: GsPath = GsPath::from_uri(uri)?;
        if !path.is_absolute() {
            return Err(FsError::illegal_argument(format!(
                "URI does not name an absolute path: {}",
                uri
            )));
        }
        self.file_system_for(&path)?;
        Ok(path)
    }

    /// The filesystem owning `path`, created on demand.
    pub fn file_system_for(&self, path: &GsPath) -> Result<Arc<GsFileSystem>, FsError> {
        if !path.is_absolute() {
            return Err(FsError::illegal_argument(format!(
                "Not an absolute gs path: {}",
                path
            )));
        }
        let bucket: String = Self::bucket_of(path)?;

        if let Some(fs) = self.filesystems.read().get(&bucket) {
            return Ok(fs.clone());
        }

        let mut filesystems = self.filesystems.write();
        if let Some(fs) = filesystems.get(&bucket) {
            return Ok(fs.clone());
        }
        let credentials: GcsCredentials =
            Self::resolve_credentials(&FileSystemConfig::default())?;
        let client: Arc<dyn StorageClient> = self.client_for(&credentials)?;
        let fs: Arc<GsFileSystem> = Arc::new(GsFileSystem::new(bucket.clone(), client));
        info!(bucket = %bucket, "filesystem created on demand");
        filesystems.insert(bucket, fs.clone());
        Ok(fs)
    }

    /// Close and unregister the filesystem bound to `bucket`. Later lookups
    /// raise `FileSystemNotFound` until the bucket is bound again.
    pub fn close_file_system(&self, bucket: &str) -> Result<(), FsError> {
        let removed = self.filesystems.write().remove(bucket);
        match removed {
            Some(fs) => {
                fs.close();
                info!(bucket = %bucket, "filesystem closed");
                Ok(())
            }
            None => Err(FsError::FileSystemNotFound {
                bucket: bucket.to_string(),
            }),
        }
    }

    fn require_object_path(path: &GsPath) -> Result<(), FsError> {
        if path.is_global_root() {
            return Err(FsError::illegal_argument(
                "Operation not allowed on the global root",
            ));
        }
        if !path.is_absolute() {
            return Err(FsError::illegal_argument(format!(
                "Not an absolute gs path: {}",
                path
            )));
        }
        Ok(())
    }

    /// Open a byte channel with POSIX-style open-mode enforcement.
    ///
    /// `READ` (or no modes at all) opens a read channel; `WRITE` opens a
    /// write channel honoring `CREATE` / `CREATE_NEW`. Mixing read and write
    /// is invalid, and `APPEND`, `SYNC` and `DSYNC` are unsupported by the
    /// store.
    pub async fn new_byte_channel(
        &self,
        path: &GsPath,
        modes: &[OpenMode],
    ) -> Result<GsByteChannel, FsError> {
        Self::require_object_path(path)?;

        for mode in modes {
            if matches!(mode, OpenMode::Append | OpenMode::Sync | OpenMode::Dsync) {
                return Err(FsError::Unsupported {
                    operation: "APPEND/SYNC/DSYNC open modes",
                });
            }
        }

        let wants_read: bool = modes.contains(&OpenMode::Read);
        let wants_write: bool = modes.contains(&OpenMode::Write);
        if wants_read && wants_write {
            return Err(FsError::illegal_argument(
                "READ cannot be combined with WRITE",
            ));
        }

        if !wants_write {
            return Ok(GsByteChannel::Read(self.new_read_channel(path).await?));
        }

        let fs: Arc<GsFileSystem> = self.file_system_for(path)?;
        let create: bool = modes.contains(&OpenMode::Create);
        let create_new: bool = modes.contains(&OpenMode::CreateNew);
        if create_new || !create {
            let exists: bool = fs.exists(path).await?;
            if create_new && exists {
                return Err(FsError::already_exists(path));
            }
            if !create && !create_new && !exists {
                return Err(FsError::no_such_file(path));
            }
        }
        Ok(GsByteChannel::Write(fs.new_write_channel(path).await?))
    }

    /// Open a read channel.
    pub async fn new_read_channel(&self, path: &GsPath) -> Result<GsReadChannel, FsError> {
        Self::require_object_path(path)?;
        self.file_system_for(path)?.new_read_channel(path).await
    }

    /// Open a write channel, creating the target if needed.
    pub async fn new_write_channel(&self, path: &GsPath) -> Result<GsWriteChannel, FsError> {
        Self::require_object_path(path)?;
        self.file_system_for(path)?.new_write_channel(path).await
    }

    /// Create a directory (a bucket for a bucket-root path, a `key/` marker
    /// otherwise). Intermediate directories must be created individually.
    pub async fn create_directory(&self, path: &GsPath) -> Result<(), FsError> {
        Self::require_object_path(path)?;
        self.file_system_for(path)?.create_directory(path).await
    }

    /// Delete a file, directory, or bucket.
    pub async fn delete(&self, path: &GsPath) -> Result<(), FsError> {
        Self::require_object_path(path)?;
        self.file_system_for(path)?.delete(path).await
    }

    /// Copy `source` to `target` as one server-side rewrite.
    ///
    /// Without `replace_existing`, an existing target fails the copy; with
    /// it, the target is deleted first.
    pub async fn copy(
        &self,
        source: &GsPath,
        target: &GsPath,
        replace_existing: bool,
    ) -> Result<(), FsError> {
        Self::require_object_path(source)?;
        Self::require_object_path(target)?;
        debug!(source = %source, target = %target, replace_existing, "copy");

        let target_fs: Arc<GsFileSystem> = self.file_system_for(target)?;
        if target_fs.exists(target).await? {
            if !replace_existing {
                return Err(FsError::already_exists(target));
            }
            target_fs.delete(target).await?;
        }

        self.file_system_for(source)?.copy(source, target).await
    }

    /// Move `source` to `target`: copy, then delete the source.
    pub async fn move_file(
        &self,
        source: &GsPath,
        target: &GsPath,
        replace_existing: bool,
    ) -> Result<(), FsError> {
        self.copy(source, target, replace_existing).await?;
        self.delete(source).await
    }

    /// Attributes of the file, directory, or bucket at `path`.
    pub async fn read_attributes(&self, path: &GsPath) -> Result<GsFileAttributes, FsError> {
        self.file_system_for(path)?.read_attributes(path).await
    }

    /// Attributes through a named view. Only `"basic"` is supported.
    pub async fn read_attributes_view(
        &self,
        path: &GsPath,
        view: &str,
    ) -> Result<GsFileAttributes, FsError> {
        if view != BASIC_VIEW {
            return Err(FsError::Unsupported {
                operation: "attribute views other than basic",
            });
        }
        self.read_attributes(path).await
    }

    /// True when something exists at `path`.
    pub async fn exists(&self, path: &GsPath) -> Result<bool, FsError> {
        self.file_system_for(path)?.exists(path).await
    }

    /// Structural path equality: same bucket, segments, and directory hint.
    pub fn is_same_file(&self, a: &GsPath, b: &GsPath) -> bool {
        a == b
    }

    /// True when the file name begins with a dot.
    pub fn is_hidden(&self, path: &GsPath) -> bool {
        path.file_name()
            .map(|name| name.to_string().starts_with('.'))
            .unwrap_or(false)
    }

    /// Verify `path` exists and every requested access mode is grantable.
    /// `Execute` is never grantable on an object store.
    pub async fn check_access(
        &self,
        path: &GsPath,
        modes: &[AccessMode],
    ) -> Result<(), FsError> {
        if modes.contains(&AccessMode::Execute) {
            return Err(FsError::AccessDenied {
                path: path.to_string(),
            });
        }
        self.read_attributes(path).await.map(|_| ())
    }

    /// Open a directory stream over `dir`, yielding entries that pass
    /// `filter`. The global root yields bucket roots.
    pub fn new_directory_stream(
        &self,
        dir: &GsPath,
        filter: impl Fn(&GsPath) -> bool + Send + 'static,
    ) -> Result<GsDirectoryStream, FsError> {
        self.file_system_for(dir)?.new_directory_stream(dir, filter)
    }

    /// Walk the tree under `origin` depth-first, origin excluded.
    ///
    /// Directory entries are visited and descended into; a name existing
    /// both as file and directory yields two distinct entries. Listings are
    /// eventually consistent, so a walk right after a write may miss the new
    /// object.
    pub async fn walk(&self, origin: &GsPath) -> Result<Vec<GsPath>, FsError> {
        let mut out: Vec<GsPath> = Vec::new();
        let mut queue: Vec<GsPath> = vec![origin.clone()];
        while let Some(dir) = queue.pop() {
            let stream: GsDirectoryStream = self.new_directory_stream(&dir, |_| true)?;
            let entries: Vec<GsPath> = stream.collect_paths().await?;
            for entry in entries {
                if entry.dir_hint() {
                    queue.push(entry.clone());
                }
                out.push(entry);
            }
        }
        Ok(out)
    }

    /// Always fails: the store exposes no file-store metadata.
    pub fn file_store(&self, _path: &GsPath) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            operation: "file stores",
        })
    }

    /// Always fails: listings cannot be watched.
    pub fn new_watch_service(&self) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            operation: "watch services",
        })
    }

    /// Always fails: attributes are read-only.
    pub fn set_attribute(
        &self,
        _path: &GsPath,
        _attribute: &str,
        _value: &str,
    ) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            operation: "setting attributes",
        })
    }
}

impl std::fmt::Debug for GsFileSystemProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let buckets: Vec<String> = self.filesystems.read().keys().cloned().collect();
        f.debug_struct("GsFileSystemProvider")
            .field("filesystems", &buckets)
            .finish()
    }
}
