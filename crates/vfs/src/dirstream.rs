//! Lazy directory streams over listing pages.

use std::collections::VecDeque;
use std::sync::Arc;

use gcsfs_path::GsPath;
use gcsfs_storage::{Blob, BucketInfo, ListOptions, StorageClient};

use crate::error::FsError;

/// Caller-supplied entry filter.
pub type DirFilter = Box<dyn Fn(&GsPath) -> bool + Send>;

enum StreamKind {
    /// Current-directory listing of one bucket prefix.
    Blobs {
        bucket: String,
        /// The `key/` marker of the directory being listed (empty for a
        /// bucket root). Never yielded.
        origin: String,
    },
    /// Bucket enumeration for the global root.
    Buckets,
}

/// Single-pass, lazily paged stream of directory entries.
///
/// Entries advance one listing page at a time. The stream never yields the
/// origin directory itself, applies the caller's filter before yielding, and
/// seeds each yielded path's attribute cache so an immediate `read_attributes`
/// needs no further I/O. Not restartable; drop it to release the cursor.
pub struct GsDirectoryStream {
    client: Arc<dyn StorageClient>,
    kind: StreamKind,
    filter: DirFilter,
    pending: VecDeque<GsPath>,
    page_token: Option<String>,
    exhausted: bool,
}

impl GsDirectoryStream {
    pub(crate) fn blobs(
        client: Arc<dyn StorageClient>,
        bucket: String,
        origin: String,
        filter: impl Fn(&GsPath) -> bool + Send + 'static,
    ) -> Self {
        Self {
            client,
            kind: StreamKind::Blobs { bucket, origin },
            filter: Box::new(filter),
            pending: VecDeque::new(),
            page_token: None,
            exhausted: false,
        }
    }

    pub(crate) fn buckets(
        client: Arc<dyn StorageClient>,
        filter: impl Fn(&GsPath) -> bool + Send + 'static,
    ) -> Self {
        Self {
            client,
            kind: StreamKind::Buckets,
            filter: Box::new(filter),
            pending: VecDeque::new(),
            page_token: None,
            exhausted: false,
        }
    }

    fn blob_entry(bucket: &str, blob: &Blob) -> GsPath {
        let path: GsPath = GsPath::parse(&format!("/{}/{}", bucket, blob.name));
        path.set_cached_attributes(blob.to_attributes());
        path
    }

    fn bucket_entry(info: &BucketInfo) -> GsPath {
        let path: GsPath = GsPath::parse(&format!("/{}", info.name));
        path.set_cached_attributes(info.to_attributes());
        path
    }

    async fn fetch_page(&mut self) -> Result<(), FsError> {
        match &self.kind {
            StreamKind::Blobs { bucket, origin } => {
                let opts: ListOptions = ListOptions::current_directory(origin.clone())
                    .page_token(self.page_token.take());
                let page = self
                    .client
                    .list_blobs(bucket, opts)
                    .await
                    .map_err(|e| FsError::from_storage(e, &GsPath::parse(&format!("/{}", bucket))))?;
                for blob in &page.blobs {
                    // The listing includes the origin's own marker.
                    if blob.name == *origin {
                        continue;
                    }
                    self.pending.push_back(Self::blob_entry(bucket, blob));
                }
                self.page_token = page.next_page_token;
            }
            StreamKind::Buckets => {
                let page = self
                    .client
                    .list_buckets(self.page_token.take())
                    .await
                    .map_err(FsError::Storage)?;
                for info in &page.buckets {
                    self.pending.push_back(Self::bucket_entry(info));
                }
                self.page_token = page.next_page_token;
            }
        }
        self.exhausted = self.page_token.is_none();
        Ok(())
    }

    /// The next entry passing the filter, or `None` when the listing is
    /// finished.
    pub async fn next(&mut self) -> Result<Option<GsPath>, FsError> {
        loop {
            if let Some(path) = self.pending.pop_front() {
                if (self.filter)(&path) {
                    return Ok(Some(path));
                }
                continue;
            }
            if self.exhausted {
                return Ok(None);
            }
            self.fetch_page().await?;
        }
    }

    /// Drain the remaining entries into a vector.
    pub async fn collect_paths(mut self) -> Result<Vec<GsPath>, FsError> {
        let mut out: Vec<GsPath> = Vec::new();
        while let Some(path) = self.next().await? {
            out.push(path);
        }
        Ok(out)
    }
}
