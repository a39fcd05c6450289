//! Growable array of plain records with owned, mapped and loaded phases.
//!
//! A [`Vector`] starts out owning a growable buffer. [`Vector::map`] rebinds it
//! to a view borrowed from a [`Mapper`], and [`Vector::read`] rebinds it to a
//! freshly allocated buffer filled from a [`ByteSource`]. Only the owned phase
//! accepts mutation; the other two are read-only.
//!
//! The persisted form is a [`VectorHeader`] (optional, see
//! [`Vector::write_with_header`]) followed by the raw element bytes in
//! insertion order, without padding.
//!
//! ```
//! use trie_substrate::Vector;
//!
//! let mut v: Vector<'_, u32> = Vector::new();
//! v.push_back(1).unwrap();
//! v.push_back(10).unwrap();
//! v.push_back(100).unwrap();
//! assert_eq!(v.len(), 3);
//! assert_eq!(v.capacity(), 4);
//! assert_eq!(&v[..], &[1, 10, 100]);
//! ```

mod raw;

use std::borrow::Cow;
use std::fmt;
use std::ops::Deref;

use bytemuck::{Pod, Zeroable};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{fail, Result};
use crate::io::{read_pod, write_pod, ByteSink, ByteSource};
use crate::logging::substrate_log;
use crate::mapper::Mapper;

use self::raw::ElemLayout;

/// The only persisted metadata of a vector: element size and element count.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VectorHeader {
    /// Size of one element in bytes.
    pub elem_size: u64,
    /// Number of elements that follow.
    pub len: u64,
}

impl VectorHeader {
    /// Header describing `len` elements of type `T`.
    pub fn of<T>(len: usize) -> Self {
        Self {
            elem_size: std::mem::size_of::<T>() as u64,
            len: len as u64,
        }
    }
}

/// Where the elements of a [`Vector`] live.
#[derive(Clone)]
pub enum Storage<'a, T> {
    /// Growable buffer owned by the vector.
    Owned(Vec<T>),
    /// Read-only view into a mapped region.
    Mapped(&'a [T]),
    /// Read-only buffer filled from a byte source (or copied out of a
    /// misaligned mapping).
    Loaded(Box<[T]>),
}

/// A growable array of plain records.
#[derive(Clone)]
pub struct Vector<'a, T: Pod> {
    storage: Storage<'a, T>,
    capacity: usize,
}

impl<'a, T: Pod> Vector<'a, T> {
    /// An empty, owned, mutable vector.
    pub const fn new() -> Self {
        Self {
            storage: Storage::Owned(Vec::new()),
            capacity: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of elements that fit before the next reallocation. Mapped and
    /// loaded vectors report their length.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The header that describes this vector when persisted.
    pub fn header(&self) -> VectorHeader {
        VectorHeader::of::<T>(self.len())
    }

    /// Where the elements currently live.
    pub fn storage(&self) -> &Storage<'a, T> {
        &self.storage
    }

    /// True while the vector borrows its elements from a [`Mapper`].
    #[inline]
    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, Storage::Mapped(_))
    }

    /// True when the vector owns its elements (growable or loaded).
    #[inline]
    pub fn is_owned(&self) -> bool {
        !self.is_mapped()
    }

    /// True when push/resize/reserve/shrink are allowed.
    #[inline]
    pub fn is_mutable(&self) -> bool {
        matches!(self.storage, Storage::Owned(_))
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        match &self.storage {
            Storage::Owned(buf) => buf,
            Storage::Mapped(view) => view,
            Storage::Loaded(buf) => buf,
        }
    }

    /// Mutable element access; fails on a read-only vector.
    pub fn as_mut_slice(&mut self) -> Result<&mut [T]> {
        Ok(self.buffer_mut("access objects")?.as_mut_slice())
    }

    fn buffer_mut(&mut self, op: &str) -> Result<&mut Vec<T>> {
        match &mut self.storage {
            Storage::Owned(buf) => Ok(buf),
            Storage::Mapped(_) | Storage::Loaded(_) => {
                Err(fail!(StateError, "failed to {}: read-only vector", op))
            }
        }
    }

    /// Reallocate to exactly `capacity` elements (never below the length).
    fn reallocate(&mut self, capacity: usize, op: &str) -> Result<()> {
        let buf = self.buffer_mut(op)?;
        if capacity > buf.len() {
            let additional = capacity - buf.len();
            if additional > buf.capacity() - buf.len() {
                buf.try_reserve_exact(additional).map_err(|e| {
                    fail!(MemoryError, "failed to {}: allocation failed: {}", op, e)
                })?;
            }
        } else {
            buf.shrink_to(capacity);
        }
        self.capacity = capacity;
        Ok(())
    }

    fn grow_to(&mut self, required: usize, op: &str) -> Result<()> {
        let capacity = ElemLayout::of::<T>().grown_capacity(self.capacity, required);
        self.reallocate(capacity, op)
    }

    /// Append one element, doubling the capacity when full.
    pub fn push_back(&mut self, value: T) -> Result<()> {
        self.buffer_mut("push object")?;
        let len = self.len();
        if len == self.capacity {
            if len >= ElemLayout::of::<T>().max_len() {
                return Err(fail!(SizeError, "failed to push object: too many objects"));
            }
            self.grow_to(len + 1, "push object")?;
        }
        self.buffer_mut("push object")?.push(value);
        Ok(())
    }

    /// Set the length to `len`, zero-filling new slots.
    pub fn resize(&mut self, len: usize) -> Result<()> {
        self.resize_fill(len, T::zeroed())
    }

    /// Set the length to `len`, filling new slots with `value`.
    pub fn resize_fill(&mut self, len: usize, value: T) -> Result<()> {
        self.buffer_mut("resize vector")?;
        ElemLayout::of::<T>().byte_len(len)?;
        if len > self.capacity {
            self.grow_to(len, "resize vector")?;
        }
        self.buffer_mut("resize vector")?.resize(len, value);
        Ok(())
    }

    /// Make room for at least `capacity` elements. Reallocates to exactly
    /// `capacity` when the current capacity is smaller.
    pub fn reserve(&mut self, capacity: usize) -> Result<()> {
        self.buffer_mut("reserve objects")?;
        if capacity <= self.capacity {
            return Ok(());
        }
        ElemLayout::of::<T>().byte_len(capacity)?;
        self.reallocate(capacity, "reserve objects")
    }

    /// Release spare capacity so that `capacity() == len()`.
    pub fn shrink(&mut self) -> Result<()> {
        self.buffer_mut("shrink vector")?;
        let len = self.len();
        if len != self.capacity {
            self.reallocate(len, "shrink vector")?;
        }
        Ok(())
    }

    /// Reset to an empty owned vector, dropping any mapped view.
    pub fn clear(&mut self) {
        self.storage = Storage::Owned(Vec::new());
        self.capacity = 0;
    }

    /// Bind to the next `header.len` elements of `mapper` without copying.
    ///
    /// Misaligned regions are copied into a loaded buffer instead. Either way
    /// the vector becomes read-only.
    pub fn map(&mut self, mapper: &'a Mapper<'_>, header: &VectorHeader) -> Result<()> {
        let (len, num_bytes) = ElemLayout::of::<T>().check_header(header)?;
        let view = mapper.map::<T>(len)?;
        let copied = matches!(view, Cow::Owned(_));
        self.storage = match view {
            Cow::Borrowed(view) => Storage::Mapped(view),
            Cow::Owned(buf) => Storage::Loaded(buf.into_boxed_slice()),
        };
        self.capacity = len;
        substrate_log!(
            log::Level::Trace,
            "vector_map",
            "elem_size={} len={} bytes={} copied={}",
            header.elem_size,
            len,
            num_bytes,
            copied
        );
        Ok(())
    }

    /// Read a header from `mapper`, then [`map`](Self::map) the elements.
    pub fn map_with_header(&mut self, mapper: &'a Mapper<'_>) -> Result<()> {
        let header = mapper.map_value::<VectorHeader>()?;
        self.map(mapper, &header)
    }

    /// Allocate `header.len` elements and fill them from `source`.
    pub fn read<S: ByteSource + ?Sized>(
        &mut self,
        source: &mut S,
        header: &VectorHeader,
    ) -> Result<()> {
        let (len, num_bytes) = ElemLayout::of::<T>().check_header(header)?;
        let mut buf: Vec<T> = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|e| fail!(MemoryError, "failed to read vector: allocation failed: {}", e))?;
        buf.resize(len, T::zeroed());
        source.read_bytes(bytemuck::cast_slice_mut(buf.as_mut_slice()))?;

        self.storage = Storage::Loaded(buf.into_boxed_slice());
        self.capacity = len;
        substrate_log!(
            log::Level::Trace,
            "vector_read",
            "elem_size={} len={} bytes={}",
            header.elem_size,
            len,
            num_bytes
        );
        Ok(())
    }

    /// Read a header from `source`, then [`read`](Self::read) the elements.
    pub fn read_with_header<S: ByteSource + ?Sized>(&mut self, source: &mut S) -> Result<()> {
        let header: VectorHeader = read_pod(source)?;
        self.read(source, &header)
    }

    /// Emit the raw element bytes in insertion order.
    pub fn write<S: ByteSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        ElemLayout::of::<T>().byte_len(self.len())?;
        sink.write_bytes(bytemuck::cast_slice(self.as_slice()))
    }

    /// Emit [`header`](Self::header) followed by the element bytes.
    pub fn write_with_header<S: ByteSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        write_pod(sink, &self.header())?;
        self.write(sink)
    }

    /// Bytes produced by [`write_with_header`](Self::write_with_header).
    pub fn io_size(&self) -> usize {
        std::mem::size_of::<VectorHeader>() + ElemLayout::of::<T>().size() * self.len()
    }
}

impl<T: Pod> Default for Vector<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Pod> Deref for Vector<'_, T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<'v, T: Pod> IntoIterator for &'v Vector<'_, T> {
    type Item = &'v T;
    type IntoIter = std::slice::Iter<'v, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<T: Pod> From<Vec<T>> for Vector<'_, T> {
    fn from(buf: Vec<T>) -> Self {
        let capacity = buf.len();
        let mut buf = buf;
        buf.shrink_to_fit();
        Self {
            storage: Storage::Owned(buf),
            capacity,
        }
    }
}

impl<T: Pod + fmt::Debug> fmt::Debug for Vector<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self.storage {
            Storage::Owned(_) => "owned",
            Storage::Mapped(_) => "mapped",
            Storage::Loaded(_) => "loaded",
        };
        f.debug_struct("Vector")
            .field("phase", &phase)
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}
