//! The `GsPath` value type and its algebra.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::attrs::GsFileAttributes;
use crate::error::PathError;

/// URI scheme handled by this filesystem.
pub const SCHEME: &str = "gs";

/// An immutable object-store path.
///
/// Two textual forms exist:
///
/// - **absolute**: leading `/`, first segment is the bucket, remaining
///   segments form the object key (`/bucket/some/key`);
/// - **relative**: no leading `/`, used as an operand to [`GsPath::resolve`].
///
/// A path records whether its original textual form ended in `/` (the
/// *directory hint*). `/bucket/foo/` and `/bucket/foo` order the same but are
/// distinct values: the hint decides whether attribute lookup probes for a
/// directory marker or a plain blob.
///
/// Invariants:
/// - an absolute path with zero segments is the global root (`gs:///`);
/// - an absolute path with exactly one segment is a bucket root and always
///   carries the directory hint;
/// - all operations are purely syntactic and perform no I/O.
#[derive(Clone)]
pub struct GsPath {
    /// Leading `/` in the textual form.
    absolute: bool,
    /// `/`-separated segments, bucket first for absolute paths.
    segments: Vec<String>,
    /// Trailing `/` in the textual form, or a bucket/global root.
    dir_hint: bool,
    /// Attributes seeded by a directory listing; consumed by the first
    /// `read_attributes` on this path. Excluded from equality and hashing.
    attr_cache: Arc<Mutex<Option<GsFileAttributes>>>,
}

impl GsPath {
    fn new(absolute: bool, segments: Vec<String>, dir_hint: bool) -> Self {
        // A bucket root or the global root is always a directory.
        let dir_hint: bool = dir_hint || (absolute && segments.len() <= 1);
        Self {
            absolute,
            segments,
            dir_hint,
            attr_cache: Arc::new(Mutex::new(None)),
        }
    }

    /// Parse a path from its textual form.
    ///
    /// A leading `/` makes the path absolute; a trailing `/` sets the
    /// directory hint. Empty segments collapse, so `/bucket//a` and
    /// `/bucket/a` parse identically.
    pub fn parse(input: &str) -> Self {
        let absolute: bool = input.starts_with('/');
        let dir_hint: bool = input.ends_with('/');
        let segments: Vec<String> = input
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::new(absolute, segments, dir_hint)
    }

    /// Parse a `gs:` URI.
    ///
    /// `gs://bucket/key` yields an absolute path; the bucket authority is
    /// canonicalised to lowercase. `gs:///` is the global root. A trailing
    /// `/` on the key is preserved as the directory hint. A URI without the
    /// `//` authority marker is parsed as a bare textual path.
    pub fn from_uri(uri: &str) -> Result<Self, PathError> {
        let Some((scheme, rest)) = uri.split_once(':') else {
            return Err(PathError::InvalidScheme {
                uri: uri.to_string(),
            });
        };
        if !scheme.eq_ignore_ascii_case(SCHEME) {
            return Err(PathError::InvalidScheme {
                uri: uri.to_string(),
            });
        }

        let Some(after_authority) = rest.strip_prefix("//") else {
            // No authority marker: the remainder is a plain textual path.
            return Ok(Self::parse(rest));
        };

        let (authority, key_part): (&str, &str) = match after_authority.find('/') {
            Some(idx) => (&after_authority[..idx], &after_authority[idx..]),
            None => (after_authority, ""),
        };

        if authority.is_empty() {
            // `gs:///` selects the global root; anything else is missing its
            // bucket.
            if key_part.is_empty() || key_part == "/" {
                return Ok(Self::new(true, Vec::new(), true));
            }
            return Err(PathError::MissingBucket {
                uri: uri.to_string(),
            });
        }

        let text: String = format!("/{}{}", authority.to_ascii_lowercase(), key_part);
        Ok(Self::parse(&text))
    }

    /// Render this path as a `gs:` URI. Inverse of [`GsPath::from_uri`].
    pub fn to_uri(&self) -> String {
        if !self.absolute {
            let trailer: &str = if self.dir_hint && !self.segments.is_empty() {
                "/"
            } else {
                ""
            };
            return format!("{}:{}{}", SCHEME, self, trailer);
        }
        if self.segments.is_empty() {
            return format!("{}:///", SCHEME);
        }
        if self.segments.len() == 1 {
            return format!("{}://{}", SCHEME, self.segments[0]);
        }
        let trailer: &str = if self.dir_hint { "/" } else { "" };
        format!("{}:/{}{}", SCHEME, self, trailer)
    }

    /// True when the textual form has a leading `/`.
    pub fn is_absolute(&self) -> bool {
        self.absolute
    }

    /// True when the original textual form ended in `/`, or the path is a
    /// bucket or global root.
    pub fn dir_hint(&self) -> bool {
        self.dir_hint
    }

    /// True for the global root `gs:///`.
    pub fn is_global_root(&self) -> bool {
        self.absolute && self.segments.is_empty()
    }

    /// True for a bucket root such as `/bucket`.
    pub fn is_bucket_root(&self) -> bool {
        self.absolute && self.segments.len() == 1
    }

    /// The bucket of an absolute path.
    pub fn bucket(&self) -> Option<&str> {
        if self.absolute {
            self.segments.first().map(String::as_str)
        } else {
            None
        }
    }

    /// The object key: every segment after the bucket for absolute paths,
    /// all segments for relative ones, joined by `/`. Empty for roots.
    pub fn object_name(&self) -> String {
        let skip: usize = usize::from(self.absolute);
        self.segments
            .get(skip..)
            .unwrap_or(&[])
            .join("/")
    }

    /// Number of segments, bucket included for absolute paths.
    pub fn name_count(&self) -> usize {
        self.segments.len()
    }

    /// The root of an absolute path: the bucket root, or the global root for
    /// the global root itself. Relative paths have no root.
    pub fn root(&self) -> Option<GsPath> {
        if !self.absolute {
            return None;
        }
        if self.segments.is_empty() {
            return Some(Self::new(true, Vec::new(), true));
        }
        Some(Self::new(true, vec![self.segments[0].clone()], true))
    }

    /// The last segment as a relative path, preserving this path's directory
    /// hint. Roots have no file name.
    pub fn file_name(&self) -> Option<GsPath> {
        if self.segments.is_empty() || (self.absolute && self.segments.len() == 1) {
            return None;
        }
        let last: String = self.segments[self.segments.len() - 1].clone();
        Some(Self::new(false, vec![last], self.dir_hint))
    }

    /// All but the last segment. Only absolute paths below a bucket root have
    /// a parent; the parent is always a directory.
    pub fn parent(&self) -> Option<GsPath> {
        if !self.absolute || self.segments.len() < 2 {
            return None;
        }
        Some(Self::new(
            true,
            self.segments[..self.segments.len() - 1].to_vec(),
            true,
        ))
    }

    /// The `index`-th segment as a relative path. Intermediate segments carry
    /// the directory hint; the final segment inherits this path's hint.
    pub fn name(&self, index: usize) -> Result<GsPath, PathError> {
        if index >= self.segments.len() {
            return Err(PathError::IndexOutOfRange {
                index,
                count: self.segments.len(),
            });
        }
        let hint: bool = index < self.segments.len() - 1 || self.dir_hint;
        Ok(Self::new(false, vec![self.segments[index].clone()], hint))
    }

    /// The relative path formed by segments `begin..end` (end exclusive).
    pub fn subpath(&self, begin: usize, end: usize) -> Result<GsPath, PathError> {
        if begin >= end || end > self.segments.len() {
            return Err(PathError::InvalidSubpath {
                begin,
                end,
                count: self.segments.len(),
            });
        }
        let hint: bool = end < self.segments.len() || self.dir_hint;
        Ok(Self::new(false, self.segments[begin..end].to_vec(), hint))
    }

    /// Segment-prefix test. The comparison is per segment, never textual:
    /// `/bucket/some/data` starts with `/bucket/some` but not `/bucket/so`.
    pub fn starts_with(&self, other: &GsPath) -> bool {
        if self.absolute != other.absolute || other.segments.len() > self.segments.len() {
            return false;
        }
        self.segments[..other.segments.len()] == other.segments[..]
    }

    /// Segment-suffix test. An absolute `other` only matches an identical
    /// absolute path: `/a/b` never ends with `/b`.
    pub fn ends_with(&self, other: &GsPath) -> bool {
        if other.absolute {
            return self.absolute && self.segments == other.segments;
        }
        let n: usize = other.segments.len();
        if n > self.segments.len() {
            return false;
        }
        self.segments[self.segments.len() - n..] == other.segments[..]
    }

    /// Resolve `.` and `..` segment-wise.
    ///
    /// An absolute path is clamped at its bucket root: `..` never escapes the
    /// bucket. A relative path keeps leading `..` segments.
    pub fn normalize(&self) -> GsPath {
        let floor: usize = usize::from(self.absolute);
        let mut out: Vec<String> = Vec::with_capacity(self.segments.len());
        for seg in &self.segments {
            match seg.as_str() {
                "." => {}
                ".." => {
                    let poppable: bool =
                        out.len() > floor && out.last().map(|s| s != "..").unwrap_or(false);
                    if poppable {
                        out.pop();
                    } else if !self.absolute {
                        out.push(seg.clone());
                    }
                }
                _ => out.push(seg.clone()),
            }
        }
        Self::new(self.absolute, out, self.dir_hint)
    }

    /// Resolve `other` against this path.
    ///
    /// An absolute `other` wins outright. An empty `other` yields this path.
    /// Otherwise the segments concatenate and the result takes `other`'s
    /// directory hint.
    pub fn resolve(&self, other: &GsPath) -> GsPath {
        if other.absolute {
            return other.clone();
        }
        if other.segments.is_empty() {
            return self.clone();
        }
        let mut segments: Vec<String> = self.segments.clone();
        segments.extend(other.segments.iter().cloned());
        Self::new(self.absolute, segments, other.dir_hint)
    }

    /// Parse `other` as a textual path and resolve it. An operand with a
    /// leading `/` replaces this path entirely, switching bucket if needed.
    pub fn resolve_str(&self, other: &str) -> GsPath {
        self.resolve(&Self::parse(other))
    }

    /// Resolve `other` against this path's parent, falling back to `other`
    /// itself when there is no parent.
    pub fn resolve_sibling(&self, other: &GsPath) -> GsPath {
        match self.parent() {
            Some(parent) => parent.resolve(other),
            None => other.clone(),
        }
    }

    /// The shortest relative path from this path to `other`.
    ///
    /// Both paths must be absolute and share the same bucket. The round trip
    /// `base.resolve(base.relativize(other)).normalize()` reproduces
    /// `other.normalize()`.
    pub fn relativize(&self, other: &GsPath) -> Result<GsPath, PathError> {
        let same_root: bool = self.absolute
            && other.absolute
            && !self.segments.is_empty()
            && self.segments.first() == other.segments.first();
        if !same_root {
            return Err(PathError::CannotRelativize {
                base: self.to_string(),
                other: other.to_string(),
            });
        }

        let common: usize = self
            .segments
            .iter()
            .zip(other.segments.iter())
            .take_while(|(a, b)| a == b)
            .count();

        let mut segments: Vec<String> = vec!["..".to_string(); self.segments.len() - common];
        segments.extend(other.segments[common..].iter().cloned());
        Ok(Self::new(false, segments, other.dir_hint))
    }

    /// Iterate over the segments, each as a single-segment relative path.
    /// Intermediate segments carry the directory hint.
    pub fn iter(&self) -> impl Iterator<Item = GsPath> + '_ {
        let count: usize = self.segments.len();
        self.segments.iter().enumerate().map(move |(i, seg)| {
            let hint: bool = i < count - 1 || self.dir_hint;
            Self::new(false, vec![seg.clone()], hint)
        })
    }

    /// Seed the attribute cache, as done by directory listings.
    pub fn set_cached_attributes(&self, attrs: GsFileAttributes) {
        *self.attr_cache.lock() = Some(attrs);
    }

    /// Consume the cached attributes, if any.
    pub fn take_cached_attributes(&self) -> Option<GsFileAttributes> {
        self.attr_cache.lock().take()
    }
}

impl fmt::Display for GsPath {
    /// The canonical textual form: any trailing `/` is stripped, but the
    /// directory hint survives on the value itself.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.absolute {
            write!(f, "/{}", self.segments.join("/"))
        } else {
            write!(f, "{}", self.segments.join("/"))
        }
    }
}

impl fmt::Debug for GsPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GsPath({}", self)?;
        if self.dir_hint {
            write!(f, " dir")?;
        }
        write!(f, ")")
    }
}

impl PartialEq for GsPath {
    fn eq(&self, other: &Self) -> bool {
        self.absolute == other.absolute
            && self.dir_hint == other.dir_hint
            && self.segments == other.segments
    }
}

impl Eq for GsPath {}

impl Hash for GsPath {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.absolute.hash(state);
        self.dir_hint.hash(state);
        self.segments.hash(state);
    }
}

impl PartialOrd for GsPath {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GsPath {
    /// Lexicographic on the textual form, with the directory hint as a
    /// tie-breaker so ordering stays consistent with equality.
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string()
            .cmp(&other.to_string())
            .then(self.dir_hint.cmp(&other.dir_hint))
    }
}
