//! Narrow byte-level capabilities consumed by [`Vector`](crate::Vector) and
//! [`BitVector`](crate::BitVector).
//!
//! Any [`std::io::Read`] is a [`ByteSource`] and any [`std::io::Write`] is a
//! [`ByteSink`]. Short reads and short writes are reported as
//! [`ErrorKind::IoError`](crate::ErrorKind::IoError).

use std::fs::File;
use std::io::{self, BufWriter, Read, Write};
use std::path::Path;

use bytemuck::Pod;

use crate::error::{fail, Result};

/// Something that can fill a buffer completely.
pub trait ByteSource {
    /// Copy exactly `buf.len()` bytes into `buf`.
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()>;
}

/// Something that accepts bytes and can commit them.
pub trait ByteSink {
    /// Write all of `buf`.
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()>;

    /// Push buffered bytes to the underlying store.
    fn flush(&mut self) -> Result<()>;
}

impl<R: Read + ?Sized> ByteSource for R {
    fn read_bytes(&mut self, buf: &mut [u8]) -> Result<()> {
        self.read_exact(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::UnexpectedEof {
                fail!(IoError, "failed to read bytes: short read of {} bytes", buf.len())
                    .with_source(e)
            } else {
                e.into()
            }
        })
    }
}

impl<W: Write + ?Sized> ByteSink for W {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.write_all(buf).map_err(|e| {
            if e.kind() == io::ErrorKind::WriteZero {
                fail!(IoError, "failed to write bytes: short write of {} bytes", buf.len())
                    .with_source(e)
            } else {
                e.into()
            }
        })
    }

    fn flush(&mut self) -> Result<()> {
        Write::flush(self).map_err(Into::into)
    }
}

/// A buffered file sink whose [`flush`](ByteSink::flush) is a durable commit.
///
/// `flush` drains the buffer and then calls `File::sync_all`, so a successful
/// flush means the bytes reached stable storage.
#[derive(Debug)]
pub struct FileWriter {
    inner: BufWriter<File>,
}

impl FileWriter {
    /// Create (or truncate) `path` for writing.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref()).map_err(|e| {
            fail!(IoError, "failed to open file: {}", path.as_ref().display()).with_source(e)
        })?;
        Ok(Self::from_file(file))
    }

    /// Wrap an already opened file.
    pub fn from_file(file: File) -> Self {
        Self {
            inner: BufWriter::new(file),
        }
    }

    /// Flush and return the underlying file.
    pub fn into_inner(self) -> Result<File> {
        self.inner
            .into_inner()
            .map_err(|e| fail!(IoError, "failed to flush buffer: {}", e.error()))
    }
}

impl ByteSink for FileWriter {
    fn write_bytes(&mut self, buf: &[u8]) -> Result<()> {
        self.inner.write_bytes(buf)
    }

    fn flush(&mut self) -> Result<()> {
        Write::flush(&mut self.inner)?;
        self.inner
            .get_ref()
            .sync_all()
            .map_err(|e| fail!(IoError, "failed to flush buffer: sync failed").with_source(e))
    }
}

/// Read one plain record from `source`.
pub fn read_pod<T: Pod, S: ByteSource + ?Sized>(source: &mut S) -> Result<T> {
    let mut value = T::zeroed();
    source.read_bytes(bytemuck::bytes_of_mut(&mut value))?;
    Ok(value)
}

/// Write one plain record to `sink`.
pub fn write_pod<T: Pod, S: ByteSink + ?Sized>(sink: &mut S, value: &T) -> Result<()> {
    sink.write_bytes(bytemuck::bytes_of(value))
}
