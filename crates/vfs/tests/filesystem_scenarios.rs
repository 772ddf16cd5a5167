//! End-to-end filesystem scenarios over the in-memory backend.
//!
//! Covers the core emulation semantics: write-then-read, current-directory
//! listing, a name existing both as file and directory, copy with and
//! without replace, and delete semantics for files, directories and buckets.

use std::sync::Arc;

use gcsfs_storage::{MemoryStorageClient, MemoryStorageFactory, StorageClient};
use gcsfs_vfs::{FsError, GsFileAttributes, GsFileSystemProvider, GsPath};

/// Provider over a fresh memory store, with direct access to the store for
/// seeding and inspection.
fn memory_provider() -> (GsFileSystemProvider, Arc<MemoryStorageClient>) {
    let client: Arc<MemoryStorageClient> = Arc::new(MemoryStorageClient::new());
    let provider: GsFileSystemProvider =
        GsFileSystemProvider::new(Arc::new(MemoryStorageFactory::new(client.clone())));
    (provider, client)
}

/// Create bucket `name` through the filesystem surface.
async fn create_bucket(provider: &GsFileSystemProvider, name: &str) -> GsPath {
    let root: GsPath = provider.get_path(&format!("gs://{}", name)).unwrap();
    provider.create_directory(&root).await.unwrap();
    root
}

async fn write(provider: &GsFileSystemProvider, uri: &str, data: &[u8]) -> GsPath {
    let path: GsPath = provider.get_path(uri).unwrap();
    let fs = provider.file_system_for(&path).unwrap();
    fs.write_all_bytes(&path, data).await.unwrap();
    path
}

async fn read(provider: &GsFileSystemProvider, uri: &str) -> Vec<u8> {
    let path: GsPath = provider.get_path(uri).unwrap();
    let fs = provider.file_system_for(&path).unwrap();
    fs.read_all_bytes(&path).await.unwrap()
}

mod write_then_read {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "nxf-bucket").await;

        let path: GsPath =
            write(&provider, "gs://nxf-bucket/file.txt", b"Hello world!").await;

        let attrs: GsFileAttributes = provider.read_attributes(&path).await.unwrap();
        assert_eq!(attrs.size(), 12);
        assert!(attrs.is_regular_file());
        assert_eq!(attrs.file_key(), "/nxf-bucket/file.txt");
        assert!(attrs.last_modified_time().is_some());

        assert_eq!(read(&provider, "gs://nxf-bucket/file.txt").await, b"Hello world!");
    }

    #[tokio::test]
    async fn test_read_channel_is_seekable() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        let path: GsPath = write(&provider, "gs://b/seek.bin", b"0123456789").await;

        let mut channel = provider.new_read_channel(&path).await.unwrap();
        assert_eq!(channel.size(), 10);

        let mut buf: [u8; 3] = [0; 3];
        channel.read(&mut buf).await.unwrap();
        assert_eq!(&buf, b"012");
        assert_eq!(channel.position(), 3);

        channel.set_position(7).await.unwrap();
        channel.read(&mut buf).await.unwrap();
        assert_eq!(&buf, b"789");

        // Backward seek re-reads earlier content.
        channel.set_position(1).await.unwrap();
        channel.read(&mut buf).await.unwrap();
        assert_eq!(&buf, b"123");

        channel.close();
        assert!(matches!(
            channel.read(&mut buf).await,
            Err(FsError::Closed { .. })
        ));
    }

    #[tokio::test]
    async fn test_write_channel_atomic_on_close() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        let path: GsPath = provider.get_path("gs://b/pending.txt").unwrap();

        let mut channel = provider.new_write_channel(&path).await.unwrap();
        channel.write(b"part one, ").await.unwrap();
        channel.write(b"part two").await.unwrap();
        assert_eq!(channel.size(), 18);
        assert!(!provider.exists(&path).await.unwrap());

        channel.close().await.unwrap();
        assert!(provider.exists(&path).await.unwrap());
        assert_eq!(read(&provider, "gs://b/pending.txt").await, b"part one, part two");
    }

    #[tokio::test]
    async fn test_channel_unsupported_operations() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        let path: GsPath = write(&provider, "gs://b/f", b"x").await;

        let mut reader = provider.new_read_channel(&path).await.unwrap();
        assert!(matches!(
            reader.write(b"nope"),
            Err(FsError::Unsupported { .. })
        ));
        assert!(matches!(reader.truncate(0), Err(FsError::Unsupported { .. })));

        let mut writer = provider.new_write_channel(&path).await.unwrap();
        let mut buf: [u8; 1] = [0];
        assert!(matches!(
            writer.read(&mut buf),
            Err(FsError::Unsupported { .. })
        ));
        assert!(matches!(
            writer.set_position(0),
            Err(FsError::Unsupported { .. })
        ));
    }
}

mod listing {
    use super::*;

    #[tokio::test]
    async fn test_current_directory_listing_is_not_recursive() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        for key in ["foo/file1.txt", "foo/file2.txt", "foo/bar/file3.txt", "foo/file6.txt"] {
            write(&provider, &format!("gs://b/{}", key), b"x").await;
        }

        let dir: GsPath = provider.get_path("gs://b/foo").unwrap();
        let stream = provider.new_directory_stream(&dir, |_| true).unwrap();
        let mut names: Vec<String> = stream
            .collect_paths()
            .await
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string())
            .collect();
        names.sort();
        assert_eq!(names, vec!["bar", "file1.txt", "file2.txt", "file6.txt"]);
    }

    #[tokio::test]
    async fn test_stream_skips_origin_marker() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;

        let dir: GsPath = provider.get_path("gs://b/data/").unwrap();
        provider.create_directory(&dir).await.unwrap();
        write(&provider, "gs://b/data/one", b"1").await;

        let stream = provider.new_directory_stream(&dir, |_| true).unwrap();
        let paths: Vec<GsPath> = stream.collect_paths().await.unwrap();
        let rendered: Vec<String> = paths.iter().map(GsPath::to_string).collect();
        assert_eq!(rendered, vec!["/b/data/one"]);
    }

    #[tokio::test]
    async fn test_stream_applies_filter() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        for key in ["logs/a.txt", "logs/b.log", "logs/c.txt"] {
            write(&provider, &format!("gs://b/{}", key), b"x").await;
        }

        let dir: GsPath = provider.get_path("gs://b/logs").unwrap();
        let stream = provider
            .new_directory_stream(&dir, |p| p.to_string().ends_with(".txt"))
            .unwrap();
        let names: Vec<String> = stream
            .collect_paths()
            .await
            .unwrap()
            .iter()
            .map(GsPath::to_string)
            .collect();
        assert_eq!(names, vec!["/b/logs/a.txt", "/b/logs/c.txt"]);
    }

    #[tokio::test]
    async fn test_listed_entries_carry_cached_attributes() {
        let (provider, store) = memory_provider();
        create_bucket(&provider, "b").await;
        write(&provider, "gs://b/dir/cached.txt", b"cached!").await;

        let dir: GsPath = provider.get_path("gs://b/dir").unwrap();
        let stream = provider.new_directory_stream(&dir, |_| true).unwrap();
        let entry: GsPath = stream.collect_paths().await.unwrap().remove(0);

        // Remove the blob behind the listing's back: the seeded cache must
        // still answer the first stat without I/O.
        store.delete_blob("b", "dir/cached.txt").await.unwrap();
        let attrs: GsFileAttributes = provider.read_attributes(&entry).await.unwrap();
        assert_eq!(attrs.size(), 7);

        // The cache is one-shot; the next stat hits the store and misses.
        assert!(matches!(
            provider.read_attributes(&entry).await,
            Err(FsError::NoSuchFile { .. })
        ));
    }

    #[tokio::test]
    async fn test_global_root_lists_buckets() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "alpha").await;
        create_bucket(&provider, "beta").await;

        let root: GsPath = provider.get_path("gs:///").unwrap();
        let stream = provider.new_directory_stream(&root, |_| true).unwrap();
        let paths: Vec<GsPath> = stream.collect_paths().await.unwrap();
        let rendered: Vec<String> = paths.iter().map(GsPath::to_string).collect();
        assert_eq!(rendered, vec!["/alpha", "/beta"]);
        assert!(paths.iter().all(GsPath::is_bucket_root));

        let attrs: GsFileAttributes = provider.read_attributes(&paths[0]).await.unwrap();
        assert!(attrs.is_bucket());
    }
}

mod coexisting_file_and_directory {
    use super::*;

    #[tokio::test]
    async fn test_same_name_file_and_directory() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        write(&provider, "gs://b/foo", b"sixsix").await;
        write(&provider, "gs://b/foo/bar", b"barbar").await;

        // The bare name finds the file.
        let file: GsPath = provider.get_path("gs://b/foo").unwrap();
        let attrs: GsFileAttributes = provider.read_attributes(&file).await.unwrap();
        assert!(attrs.is_regular_file());
        assert_eq!(attrs.size(), 6);
        assert_eq!(read(&provider, "gs://b/foo").await, b"sixsix");

        // The trailing-slash form finds the directory.
        let dir: GsPath = provider.get_path("gs://b/foo/").unwrap();
        let attrs: GsFileAttributes = provider.read_attributes(&dir).await.unwrap();
        assert!(attrs.is_directory());
    }

    #[tokio::test]
    async fn test_walk_visits_file_and_directory_distinctly() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        write(&provider, "gs://b/foo", b"sixsix").await;
        write(&provider, "gs://b/foo/bar", b"barbar").await;

        let root: GsPath = provider.get_path("gs://b").unwrap();
        let visited: Vec<GsPath> = provider.walk(&root).await.unwrap();

        let mut rendered: Vec<(String, bool)> = visited
            .iter()
            .map(|p| (p.to_string(), p.dir_hint()))
            .collect();
        rendered.sort();
        assert_eq!(
            rendered,
            vec![
                ("/b/foo".to_string(), false),
                ("/b/foo".to_string(), true),
                ("/b/foo/bar".to_string(), false),
            ]
        );
    }

    #[tokio::test]
    async fn test_directory_without_marker_blob_still_exists() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        // No marker for `data/`; only a child.
        write(&provider, "gs://b/data/child", b"x").await;

        let dir: GsPath = provider.get_path("gs://b/data/").unwrap();
        let attrs: GsFileAttributes = provider.read_attributes(&dir).await.unwrap();
        assert!(attrs.is_directory());
        assert_eq!(attrs.size(), 0);

        // The bare name has no blob and falls back to the directory probe.
        let bare: GsPath = provider.get_path("gs://b/data").unwrap();
        assert!(provider.read_attributes(&bare).await.unwrap().is_directory());
    }
}

mod copy_and_move {
    use super::*;

    #[tokio::test]
    async fn test_copy_without_replace_fails_on_existing_target() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        let src: GsPath = write(&provider, "gs://b/src", b"X").await;
        let dst: GsPath = write(&provider, "gs://b/dst", b"Y").await;

        let err: FsError = provider.copy(&src, &dst, false).await.unwrap_err();
        assert!(matches!(err, FsError::FileAlreadyExists { .. }));
        assert_eq!(read(&provider, "gs://b/dst").await, b"Y");
    }

    #[tokio::test]
    async fn test_copy_with_replace_overwrites_target() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        let src: GsPath = write(&provider, "gs://b/src", b"X").await;
        let dst: GsPath = write(&provider, "gs://b/dst", b"Y").await;

        provider.copy(&src, &dst, true).await.unwrap();
        assert_eq!(read(&provider, "gs://b/dst").await, b"X");
        // Source untouched.
        assert_eq!(read(&provider, "gs://b/src").await, b"X");
    }

    #[tokio::test]
    async fn test_copy_iterates_chunked_rewrite() {
        let client: Arc<MemoryStorageClient> =
            Arc::new(MemoryStorageClient::new().with_rewrite_chunk_size(4));
        let provider: GsFileSystemProvider =
            GsFileSystemProvider::new(Arc::new(MemoryStorageFactory::new(client)));
        create_bucket(&provider, "b").await;

        let src: GsPath = write(&provider, "gs://b/big", b"0123456789abcdef").await;
        let dst: GsPath = provider.get_path("gs://b/big-copy").unwrap();
        provider.copy(&src, &dst, false).await.unwrap();
        assert_eq!(read(&provider, "gs://b/big-copy").await, b"0123456789abcdef");
    }

    #[tokio::test]
    async fn test_copy_missing_source() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        let src: GsPath = provider.get_path("gs://b/ghost").unwrap();
        let dst: GsPath = provider.get_path("gs://b/dst").unwrap();

        let err: FsError = provider.copy(&src, &dst, false).await.unwrap_err();
        assert!(matches!(err, FsError::NoSuchFile { .. }));
    }

    #[tokio::test]
    async fn test_move_removes_source() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        let src: GsPath = write(&provider, "gs://b/from", b"payload").await;
        let dst: GsPath = provider.get_path("gs://b/to").unwrap();

        provider.move_file(&src, &dst, false).await.unwrap();
        assert!(!provider.exists(&src).await.unwrap());
        assert_eq!(read(&provider, "gs://b/to").await, b"payload");
    }

    #[tokio::test]
    async fn test_copy_across_buckets() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "src-bucket").await;
        create_bucket(&provider, "dst-bucket").await;

        let src: GsPath = write(&provider, "gs://src-bucket/f", b"cross").await;
        let dst: GsPath = provider.get_path("gs://dst-bucket/f").unwrap();
        provider.copy(&src, &dst, false).await.unwrap();
        assert_eq!(read(&provider, "gs://dst-bucket/f").await, b"cross");
    }
}

mod delete {
    use super::*;

    #[tokio::test]
    async fn test_delete_file_then_missing() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        let path: GsPath = write(&provider, "gs://b/f", b"x").await;

        provider.delete(&path).await.unwrap();
        assert!(!provider.exists(&path).await.unwrap());

        let err: FsError = provider.delete(&path).await.unwrap_err();
        assert!(matches!(err, FsError::NoSuchFile { .. }));
    }

    #[tokio::test]
    async fn test_delete_non_empty_directory() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        write(&provider, "gs://b/dir/child", b"x").await;

        let dir: GsPath = provider.get_path("gs://b/dir/").unwrap();
        let err: FsError = provider.delete(&dir).await.unwrap_err();
        assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));
    }

    #[tokio::test]
    async fn test_delete_empty_directory_removes_marker() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;

        let dir: GsPath = provider.get_path("gs://b/empty/").unwrap();
        provider.create_directory(&dir).await.unwrap();
        assert!(provider.exists(&dir).await.unwrap());

        provider.delete(&dir).await.unwrap();
        assert!(!provider.exists(&dir).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_file_with_same_name_directory_is_not_empty() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        write(&provider, "gs://b/foo", b"file").await;
        write(&provider, "gs://b/foo/bar", b"child").await;

        // Any entry under `foo/` makes the bare delete a non-empty
        // directory error.
        let bare: GsPath = provider.get_path("gs://b/foo").unwrap();
        let err: FsError = provider.delete(&bare).await.unwrap_err();
        assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));
    }

    #[tokio::test]
    async fn test_delete_ignores_sibling_sharing_textual_prefix() {
        let (provider, _store) = memory_provider();
        create_bucket(&provider, "b").await;
        write(&provider, "gs://b/foo", b"x").await;
        write(&provider, "gs://b/foobar", b"y").await;

        let path: GsPath = provider.get_path("gs://b/foo").unwrap();
        provider.delete(&path).await.unwrap();
        assert!(provider.exists(&provider.get_path("gs://b/foobar").unwrap()).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_empty_bucket_succeeds() {
        let (provider, _store) = memory_provider();
        let root: GsPath = create_bucket(&provider, "b").await;

        provider.delete(&root).await.unwrap();
        assert!(!provider.exists(&root).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_non_empty_bucket_is_directory_not_empty() {
        let (provider, _store) = memory_provider();
        let root: GsPath = create_bucket(&provider, "b").await;
        write(&provider, "gs://b/this/that", b"x").await;

        let err: FsError = provider.delete(&root).await.unwrap_err();
        assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));
    }

    #[tokio::test]
    async fn test_delete_missing_bucket_is_no_such_file() {
        let (provider, _store) = memory_provider();
        let root: GsPath = provider.get_path("gs://never-created").unwrap();

        let err: FsError = provider.delete(&root).await.unwrap_err();
        assert!(matches!(err, FsError::NoSuchFile { .. }));
    }
}
