//! Error types for path parsing and manipulation.

use thiserror::Error;

/// Errors that can occur while parsing or manipulating paths.
#[derive(Debug, Error)]
pub enum PathError {
    /// URI scheme is not `gs`.
    #[error("Invalid URI scheme, expected gs: {uri}")]
    InvalidScheme {
        /// The offending URI.
        uri: String,
    },

    /// URI has no bucket authority but a non-root path.
    #[error("URI has no bucket: {uri}")]
    MissingBucket {
        /// The offending URI.
        uri: String,
    },

    /// Segment index outside `0..name_count()`.
    #[error("Path segment index {index} out of range for {count} segments")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The number of segments in the path.
        count: usize,
    },

    /// Invalid subpath bounds.
    #[error("Invalid subpath range {begin}..{end} for {count} segments")]
    InvalidSubpath {
        /// Inclusive start index.
        begin: usize,
        /// Exclusive end index.
        end: usize,
        /// The number of segments in the path.
        count: usize,
    },

    /// `relativize` called on paths that do not share an absolute root.
    #[error("Cannot relativize {other} against {base}")]
    CannotRelativize {
        /// The base path.
        base: String,
        /// The target path.
        other: String,
    },
}
