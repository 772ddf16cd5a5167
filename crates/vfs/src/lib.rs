//! Hierarchical filesystem emulation over a flat object store.
//!
//! This crate makes a Google Cloud Storage-like bucket namespace usable
//! through ordinary file operations. Client code parses `gs://bucket/key`
//! URIs into [`GsPath`] values and asks the [`GsFileSystemProvider`] to
//! open channels, list directories, stat, copy, move and delete - without
//! knowing the backend is a flat, prefix-indexed key space.
//!
//! # Architecture
//!
//! ```text
//! GsFileSystemProvider   registry, URI parsing, open-mode rules, dispatch
//!         │
//! GsFileSystem           one bucket: attributes, channels, delete, copy
//!         │
//! StorageClient          narrow backend trait (gcsfs-storage)
//! ```
//!
//! Directories are emulated: a directory is a zero-byte blob whose key ends
//! in `/`, or a synthesized listing prefix. A name can exist both as a file
//! (`foo`) and as a directory (`foo/`); the trailing slash on a path decides
//! which one an operation addresses.
//!
//! Listings are eventually consistent. Reads of a known key are
//! read-your-writes, but a listing issued right after a write may not see
//! the new object yet.
//!
//! # Example
//!
//! ```no_run
//! use gcsfs_vfs::{FileSystemConfig, GsFileSystemProvider};
//!
//! # async fn demo() -> Result<(), gcsfs_vfs::FsError> {
//! let provider = GsFileSystemProvider::in_memory();
//! provider.new_file_system("gs://my-bucket", FileSystemConfig::new())?;
//!
//! let dir = provider.get_path("gs://my-bucket/data/")?;
//! provider.create_directory(&dir.root().unwrap()).await?;
//! # Ok(())
//! # }
//! ```

mod channel;
mod config;
mod dirstream;
mod error;
mod filesystem;
mod provider;

pub use channel::{GsByteChannel, GsReadChannel, GsWriteChannel};
pub use config::{AccessMode, FileSystemConfig, OpenMode};
pub use dirstream::{DirFilter, GsDirectoryStream};
pub use error::FsError;
pub use filesystem::{GsFileSystem, ROOT_BUCKET};
pub use provider::{GsFileSystemProvider, BASIC_VIEW};

pub use gcsfs_path::{FileKind, GsFileAttributes, GsPath, PathError};
