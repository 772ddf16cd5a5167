//! Storage abstraction for the gcsfs object-store filesystem.
//!
//! This crate defines the narrow interface the filesystem layer speaks to a
//! Google Cloud Storage-like backend:
//!
//! - [`StorageClient`] - blob metadata, ranged readers, resumable-style
//!   writers, paged prefix listings, server-side rewrite, bucket lifecycle.
//! - [`MemoryStorageClient`] - a complete in-memory backend used by tests and
//!   embeddings; immediately consistent, with configurable rewrite chunking
//!   so copy loops are exercised.
//! - [`GcsCredentials`] - credential resolution from explicit configuration,
//!   the `GOOGLE_APPLICATION_CREDENTIALS` / `GOOGLE_PROJECT_ID` environment,
//!   or application-default fallback.
//!
//! A remote backend implements [`StorageClient`] against the JSON API and
//! plugs in through [`StorageClientFactory`]; nothing in the filesystem layer
//! depends on a concrete backend.

mod credentials;
mod error;
mod memory;
mod traits;
mod types;

pub use credentials::{
    CredentialsSource, GcsCredentials, ServiceAccountKey, ENV_CREDENTIALS, ENV_PROJECT_ID,
};
pub use error::StorageError;
pub use memory::{MemoryStorageClient, MemoryStorageFactory};
pub use traits::{BlobReader, BlobWriter, StorageClient, StorageClientFactory};
pub use types::{
    Blob, BlobId, BlobPage, BucketInfo, BucketPage, CreateBucketOptions, ListOptions,
    RetrySettings, RewriteProgress,
};
