//! Immutable file, directory and bucket attribute descriptors.

use std::fmt;

/// What kind of entry an attribute set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    /// A regular object.
    File,
    /// A directory marker or synthesized prefix.
    Directory,
    /// A bucket root.
    Bucket,
}

/// Attributes of a file, directory or bucket as observed in the store.
///
/// The `file_key` is the canonical `/bucket/key` identity string; it stays
/// stable across path re-creations and is how callers compare entries.
/// Timestamps are epoch milliseconds. The store records no access times, so
/// [`GsFileAttributes::last_access_time`] is always `None`; directories carry
/// no timestamps at all and buckets carry a creation time only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GsFileAttributes {
    kind: FileKind,
    size: u64,
    create_time: Option<i64>,
    update_time: Option<i64>,
    file_key: String,
}

impl GsFileAttributes {
    /// Attributes for a regular object.
    ///
    /// # Arguments
    /// * `bucket` - Owning bucket
    /// * `key` - Object key
    /// * `size` - Object size in bytes
    /// * `create_time` - Creation time (epoch milliseconds)
    /// * `update_time` - Last modification time (epoch milliseconds)
    pub fn file(
        bucket: &str,
        key: &str,
        size: u64,
        create_time: Option<i64>,
        update_time: Option<i64>,
    ) -> Self {
        Self {
            kind: FileKind::File,
            size,
            create_time,
            update_time,
            file_key: format!("/{}/{}", bucket, key),
        }
    }

    /// Attributes for a directory. Size is zero and no times are recorded.
    pub fn directory(bucket: &str, key: &str) -> Self {
        let trimmed: &str = key.trim_end_matches('/');
        Self {
            kind: FileKind::Directory,
            size: 0,
            create_time: None,
            update_time: None,
            file_key: format!("/{}/{}", bucket, trimmed),
        }
    }

    /// Attributes for a bucket root. Only the creation time is recorded.
    pub fn bucket(name: &str, create_time: Option<i64>) -> Self {
        Self {
            kind: FileKind::Bucket,
            size: 0,
            create_time,
            update_time: None,
            file_key: format!("/{}", name),
        }
    }

    /// Synthetic attributes for the global root `gs:///`.
    pub fn global_root() -> Self {
        Self {
            kind: FileKind::Directory,
            size: 0,
            create_time: None,
            update_time: None,
            file_key: "/".to_string(),
        }
    }

    /// The entry kind.
    pub fn kind(&self) -> FileKind {
        self.kind
    }

    /// Size in bytes. Zero for directories and buckets.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Creation time in epoch milliseconds, if recorded.
    pub fn creation_time(&self) -> Option<i64> {
        self.create_time
    }

    /// Last modification time in epoch milliseconds, if recorded.
    pub fn last_modified_time(&self) -> Option<i64> {
        self.update_time
    }

    /// Always `None`: the store does not record access times.
    pub fn last_access_time(&self) -> Option<i64> {
        None
    }

    /// Canonical `/bucket/key` identity string.
    pub fn file_key(&self) -> &str {
        &self.file_key
    }

    /// True for a regular object.
    pub fn is_regular_file(&self) -> bool {
        self.kind == FileKind::File
    }

    /// True for a directory marker, synthesized prefix, or the global root.
    pub fn is_directory(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// True for a bucket root.
    pub fn is_bucket(&self) -> bool {
        self.kind == FileKind::Bucket
    }
}

impl fmt::Display for GsFileAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?} {} ({} bytes)",
            self.kind, self.file_key, self.size
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_attributes() {
        let attrs: GsFileAttributes =
            GsFileAttributes::file("bucket", "a/b.txt", 12, Some(1_000), Some(2_000));
        assert!(attrs.is_regular_file());
        assert!(!attrs.is_directory());
        assert_eq!(attrs.size(), 12);
        assert_eq!(attrs.file_key(), "/bucket/a/b.txt");
        assert_eq!(attrs.creation_time(), Some(1_000));
        assert_eq!(attrs.last_modified_time(), Some(2_000));
        assert_eq!(attrs.last_access_time(), None);
    }

    #[test]
    fn test_directory_attributes_strip_marker_slash() {
        let attrs: GsFileAttributes = GsFileAttributes::directory("bucket", "a/sub/");
        assert!(attrs.is_directory());
        assert_eq!(attrs.size(), 0);
        assert_eq!(attrs.file_key(), "/bucket/a/sub");
        assert_eq!(attrs.last_modified_time(), None);
    }

    #[test]
    fn test_bucket_attributes() {
        let attrs: GsFileAttributes = GsFileAttributes::bucket("bucket", Some(42));
        assert!(attrs.is_bucket());
        assert_eq!(attrs.file_key(), "/bucket");
        assert_eq!(attrs.creation_time(), Some(42));
        assert_eq!(attrs.last_modified_time(), None);
    }
}
