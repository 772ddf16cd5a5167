//! Path algebra and attribute model for the gcsfs object-store filesystem.
//!
//! This crate holds the pure value types of the system:
//!
//! - [`GsPath`] - an immutable, purely syntactic object path. Absolute paths
//!   take the form `/bucket/key`; relative paths are bare keys. Path
//!   operations (resolve, relativize, normalize, iteration, URI round-trip)
//!   perform no I/O.
//! - [`GsFileAttributes`] - immutable descriptors for files, directories and
//!   buckets as observed in the store.
//!
//! The higher layers (`gcsfs-storage`, `gcsfs-vfs`) build the actual
//! filesystem emulation on top of these types.

mod attrs;
mod error;
mod path;

pub use attrs::{FileKind, GsFileAttributes};
pub use error::PathError;
pub use path::{GsPath, SCHEME};
