//! Read-only byte cursor over a memory region.
//!
//! A [`Mapper`] hands out non-overlapping borrowed views of the region it
//! covers, front to back. The region is either a read-only memory mapping of a
//! file (owned by the mapper) or a buffer supplied by the caller (borrowed).
//!
//! ```
//! use trie_substrate::Mapper;
//!
//! let bytes = [1u8, 2, 3, 4, 5];
//! let mapper = Mapper::from_bytes(&bytes).unwrap();
//! assert_eq!(mapper.map_bytes(2).unwrap(), &[1, 2]);
//! assert_eq!(mapper.map_bytes(3).unwrap(), &[3, 4, 5]);
//! assert!(mapper.map_bytes(1).is_err());
//! ```

use std::borrow::Cow;
use std::cell::Cell;
use std::fmt;
use std::fs::File;
use std::path::Path;

use bytemuck::Pod;
use memmap2::Mmap;

use crate::error::{fail, Result};
use crate::logging::substrate_log;

enum Region<'a> {
    Unopened,
    // Field order matters: the mapping is dropped before the file is closed.
    File { mmap: Mmap, _file: File },
    Borrowed(&'a [u8]),
}

/// A monotonic cursor over a mapped file or a caller-supplied buffer.
///
/// The cursor only moves forward. It lives in a [`Cell`], so views handed out
/// by earlier calls stay borrowed from the mapper while later calls advance;
/// consequently a `Mapper` is not `Sync`.
pub struct Mapper<'a> {
    region: Region<'a>,
    offset: Cell<usize>,
}

impl Mapper<'static> {
    /// Memory-map `path` read-only.
    ///
    /// The file stays open for as long as the mapper lives; the mapping is
    /// released first, then the file is closed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            fail!(IoError, "failed to map file: open failed: {}", path.display()).with_source(e)
        })?;
        let len = file
            .metadata()
            .map_err(|e| {
                fail!(IoError, "failed to map file: stat failed: {}", path.display())
                    .with_source(e)
            })?
            .len();
        if usize::try_from(len).is_err() {
            return Err(fail!(SizeError, "failed to map file: {} bytes is too large", len));
        }
        // SAFETY: the mapping is read-only and callers must not truncate or
        // rewrite the file while it is mapped.
        let mmap = unsafe { Mmap::map(&file) }.map_err(|e| {
            fail!(IoError, "failed to map file: mmap failed: {}", path.display()).with_source(e)
        })?;

        substrate_log!(
            log::Level::Debug,
            "mapper_open",
            "source=file path={} len={}",
            path.display(),
            mmap.len()
        );

        Ok(Self {
            region: Region::File { mmap, _file: file },
            offset: Cell::new(0),
        })
    }
}

impl<'a> Mapper<'a> {
    /// An unopened mapper. Every `map` call on it fails with
    /// [`StateError`](crate::ErrorKind::StateError).
    pub fn new() -> Self {
        Self {
            region: Region::Unopened,
            offset: Cell::new(0),
        }
    }

    /// Borrow a caller-supplied buffer. An empty buffer is rejected with
    /// [`RangeError`](crate::ErrorKind::RangeError).
    pub fn from_bytes(bytes: &'a [u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(fail!(RangeError, "failed to map bytes: num_bytes == 0"));
        }
        substrate_log!(
            log::Level::Debug,
            "mapper_open",
            "source=buffer len={}",
            bytes.len()
        );
        Ok(Self {
            region: Region::Borrowed(bytes),
            offset: Cell::new(0),
        })
    }

    /// Borrow raw caller memory.
    ///
    /// Fails with [`NullError`](crate::ErrorKind::NullError) for a null
    /// address and [`RangeError`](crate::ErrorKind::RangeError) for a zero
    /// length.
    ///
    /// # Safety
    ///
    /// `address` must be valid for reads of `len` bytes for `'a`, and the
    /// memory must not be mutated during `'a`.
    pub unsafe fn open_raw(address: *const u8, len: usize) -> Result<Self> {
        if address.is_null() {
            return Err(fail!(NullError, "failed to map bytes: address == null"));
        }
        if len == 0 {
            return Err(fail!(RangeError, "failed to map bytes: num_bytes == 0"));
        }
        // SAFETY: upheld by the caller.
        let bytes = unsafe { std::slice::from_raw_parts(address, len) };
        Self::from_bytes(bytes)
    }

    /// Whether the mapper covers a region.
    #[inline]
    pub fn is_open(&self) -> bool {
        !matches!(self.region, Region::Unopened)
    }

    /// Total size of the covered region in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.region_bytes().len()
    }

    /// Whether the covered region is empty (always true when unopened).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes consumed so far.
    #[inline]
    pub fn position(&self) -> usize {
        self.offset.get()
    }

    /// Bytes still available.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.len() - self.offset.get()
    }

    fn region_bytes(&self) -> &[u8] {
        match &self.region {
            Region::Unopened => &[],
            Region::File { mmap, .. } => &mmap[..],
            Region::Borrowed(bytes) => bytes,
        }
    }

    /// Take the next `num_bytes` bytes and advance the cursor.
    pub fn map_bytes(&self, num_bytes: usize) -> Result<&[u8]> {
        if !self.is_open() {
            return Err(fail!(StateError, "failed to map bytes: not ready"));
        }
        let start = self.offset.get();
        let bytes = self.region_bytes();
        if num_bytes > bytes.len() - start {
            return Err(fail!(
                BoundError,
                "failed to map bytes: mapped bytes are exhausted ({} requested, {} left)",
                num_bytes,
                bytes.len() - start
            ));
        }
        self.offset.set(start + num_bytes);
        Ok(&bytes[start..start + num_bytes])
    }

    /// Take the next `count` records of type `T`.
    ///
    /// The view is borrowed when the bytes are suitably aligned for `T`;
    /// otherwise they are copied into an owned buffer. A zero `count` succeeds
    /// without moving the cursor.
    pub fn map<T: Pod>(&self, count: usize) -> Result<Cow<'_, [T]>> {
        if !self.is_open() {
            return Err(fail!(StateError, "failed to map objects: not ready"));
        }
        let elem_size = std::mem::size_of::<T>();
        if elem_size == 0 {
            return Err(fail!(RangeError, "failed to map objects: obj_size == 0"));
        }
        if count == 0 {
            return Ok(Cow::Borrowed(&[]));
        }
        let Some(num_bytes) = count.checked_mul(elem_size) else {
            return Err(fail!(RangeError, "failed to map objects: too many objects"));
        };
        let bytes = self.map_bytes(num_bytes)?;
        Ok(match bytemuck::try_cast_slice::<u8, T>(bytes) {
            Ok(view) => Cow::Borrowed(view),
            Err(_) => Cow::Owned(
                bytes
                    .chunks_exact(elem_size)
                    .map(bytemuck::pod_read_unaligned::<T>)
                    .collect(),
            ),
        })
    }

    /// Take exactly one record of type `T`, by value.
    pub fn map_value<T: Pod>(&self) -> Result<T> {
        if !self.is_open() {
            return Err(fail!(StateError, "failed to map objects: not ready"));
        }
        let bytes = self.map_bytes(std::mem::size_of::<T>())?;
        Ok(bytemuck::pod_read_unaligned(bytes))
    }
}

impl Default for Mapper<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Mapper<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = match self.region {
            Region::Unopened => "unopened",
            Region::File { .. } => "file",
            Region::Borrowed(_) => "buffer",
        };
        f.debug_struct("Mapper")
            .field("source", &source)
            .field("len", &self.len())
            .field("position", &self.position())
            .finish()
    }
}
