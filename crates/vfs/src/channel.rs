//! Seekable read and sequential write byte channels.

use gcsfs_path::GsPath;
use gcsfs_storage::{BlobReader, BlobWriter};

use crate::error::FsError;

/// Seekable readable byte channel over one blob.
///
/// The size is captured from blob metadata when the channel opens. A channel
/// is owned by one task at a time; it is not a shared handle. Writing and
/// truncation are unsupported.
pub struct GsReadChannel {
    reader: Option<Box<dyn BlobReader>>,
    path: String,
    position: u64,
    size: u64,
}

impl GsReadChannel {
    pub(crate) fn new(reader: Box<dyn BlobReader>, path: &GsPath, size: u64) -> Self {
        Self {
            reader: Some(reader),
            path: path.to_string(),
            position: 0,
            size,
        }
    }

    fn reader(&mut self) -> Result<&mut Box<dyn BlobReader>, FsError> {
        let path: &str = &self.path;
        self.reader.as_mut().ok_or_else(|| FsError::Closed {
            context: path.to_string(),
        })
    }

    /// Read into `buf` at the current position. Returns the number of bytes
    /// read; zero means end-of-stream.
    pub async fn read(&mut self, buf: &mut [u8]) -> Result<usize, FsError> {
        let path: String = self.path.clone();
        let reader: &mut Box<dyn BlobReader> = self.reader()?;
        let n: usize = reader
            .read(buf)
            .await
            .map_err(|e| FsError::from_storage(e, &GsPath::parse(&path)))?;
        self.position += n as u64;
        Ok(n)
    }

    /// The current read position.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Move the read position, forward or backward.
    pub async fn set_position(&mut self, pos: u64) -> Result<(), FsError> {
        let path: String = self.path.clone();
        let reader: &mut Box<dyn BlobReader> = self.reader()?;
        reader
            .seek(pos)
            .await
            .map_err(|e| FsError::from_storage(e, &GsPath::parse(&path)))?;
        self.position = pos;
        Ok(())
    }

    /// The blob size as known when the channel opened.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// True until the channel is closed.
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// Release the underlying reader. Idempotent.
    pub fn close(&mut self) {
        self.reader = None;
    }

    /// Always fails: channels opened for reading cannot write.
    pub fn write(&mut self, _buf: &[u8]) -> Result<usize, FsError> {
        Err(FsError::Unsupported {
            operation: "write on read channel",
        })
    }

    /// Always fails: the store cannot truncate objects in place.
    pub fn truncate(&mut self, _size: u64) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            operation: "truncate",
        })
    }
}

impl Drop for GsReadChannel {
    fn drop(&mut self) {
        self.close();
    }
}

/// Sequential writable byte channel over one blob.
///
/// Bytes are streamed to the backend's resumable writer; the object becomes
/// visible atomically when [`GsWriteChannel::close`] completes. Reading,
/// seeking and truncation are unsupported.
pub struct GsWriteChannel {
    writer: Option<Box<dyn BlobWriter>>,
    path: String,
    written: u64,
}

impl GsWriteChannel {
    pub(crate) fn new(writer: Box<dyn BlobWriter>, path: &GsPath) -> Self {
        Self {
            writer: Some(writer),
            path: path.to_string(),
            written: 0,
        }
    }

    /// Append `buf` to the pending upload.
    pub async fn write(&mut self, buf: &[u8]) -> Result<usize, FsError> {
        let path: &str = &self.path;
        let writer: &mut Box<dyn BlobWriter> =
            self.writer.as_mut().ok_or_else(|| FsError::Closed {
                context: path.to_string(),
            })?;
        let n: usize = writer
            .write(buf)
            .await
            .map_err(|e| FsError::from_storage(e, &GsPath::parse(path)))?;
        self.written += n as u64;
        Ok(n)
    }

    /// Bytes written so far.
    pub fn size(&self) -> u64 {
        self.written
    }

    /// True until the channel is closed.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    /// Finalize the upload, making the object visible. Idempotent; a channel
    /// dropped without closing leaves no object behind.
    pub async fn close(&mut self) -> Result<(), FsError> {
        let Some(writer) = self.writer.take() else {
            return Ok(());
        };
        writer
            .close()
            .await
            .map_err(|e| FsError::from_storage(e, &GsPath::parse(&self.path)))
    }

    /// Always fails: channels opened for writing cannot read.
    pub fn read(&mut self, _buf: &mut [u8]) -> Result<usize, FsError> {
        Err(FsError::Unsupported {
            operation: "read on write channel",
        })
    }

    /// Always fails: writes are sequential only.
    pub fn set_position(&mut self, _pos: u64) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            operation: "seek on write channel",
        })
    }

    /// Always fails: the store cannot truncate objects in place.
    pub fn truncate(&mut self, _size: u64) -> Result<(), FsError> {
        Err(FsError::Unsupported {
            operation: "truncate",
        })
    }
}

/// A byte channel opened through the provider, readable or writable
/// depending on the requested open modes.
pub enum GsByteChannel {
    /// Channel opened for reading.
    Read(GsReadChannel),
    /// Channel opened for writing.
    Write(GsWriteChannel),
}

impl std::fmt::Debug for GsByteChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GsByteChannel::Read(_) => f.write_str("GsByteChannel::Read(..)"),
            GsByteChannel::Write(_) => f.write_str("GsByteChannel::Write(..)"),
        }
    }
}

impl GsByteChannel {
    /// Unwrap a read channel.
    pub fn into_read(self) -> Result<GsReadChannel, FsError> {
        match self {
            GsByteChannel::Read(ch) => Ok(ch),
            GsByteChannel::Write(_) => Err(FsError::Unsupported {
                operation: "read on write channel",
            }),
        }
    }

    /// Unwrap a write channel.
    pub fn into_write(self) -> Result<GsWriteChannel, FsError> {
        match self {
            GsByteChannel::Write(ch) => Ok(ch),
            GsByteChannel::Read(_) => Err(FsError::Unsupported {
                operation: "write on read channel",
            }),
        }
    }
}
