//! Untyped arithmetic shared by every [`Vector`](super::Vector) instantiation.
//!
//! Nothing here touches element memory; it only answers questions about
//! byte lengths, capacities and persisted headers for a given element size.

use crate::error::{fail, Result};

use super::VectorHeader;

/// Size facts about one element type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct ElemLayout {
    size: usize,
}

impl ElemLayout {
    pub(crate) const fn of<T>() -> Self {
        Self {
            size: std::mem::size_of::<T>(),
        }
    }

    #[inline]
    pub(crate) const fn size(self) -> usize {
        self.size
    }

    /// Largest element count whose byte length still fits an allocation.
    #[inline]
    pub(crate) const fn max_len(self) -> usize {
        if self.size == 0 {
            usize::MAX
        } else {
            isize::MAX as usize / self.size
        }
    }

    /// Byte length of `len` elements.
    pub(crate) fn byte_len(self, len: usize) -> Result<usize> {
        if self.size == 0 {
            return Err(fail!(RangeError, "failed to size vector: obj_size == 0"));
        }
        if len > self.max_len() {
            return Err(fail!(
                RangeError,
                "failed to size vector: too many objects ({})",
                len
            ));
        }
        Ok(len * self.size)
    }

    /// Capacity to allocate when `required` elements no longer fit in
    /// `capacity`: at least `required`, otherwise double the current
    /// capacity, saturating at [`max_len`](Self::max_len).
    ///
    /// The caller has already checked `required <= max_len()`.
    pub(crate) fn grown_capacity(self, capacity: usize, required: usize) -> usize {
        debug_assert!(required > capacity);
        debug_assert!(required <= self.max_len());
        capacity.saturating_mul(2).min(self.max_len()).max(required)
    }

    /// Validate a persisted header against this layout and return the
    /// `(element count, byte length)` it describes.
    pub(crate) fn check_header(self, header: &VectorHeader) -> Result<(usize, usize)> {
        if header.elem_size == 0 {
            return Err(fail!(RangeError, "failed to load vector: obj_size == 0"));
        }
        if header.elem_size != self.size as u64 {
            return Err(fail!(
                FormatError,
                "failed to load vector: obj_size mismatch ({} stored, {} expected)",
                header.elem_size,
                self.size
            ));
        }
        let Ok(len) = usize::try_from(header.len) else {
            return Err(fail!(
                RangeError,
                "failed to load vector: too many objects ({})",
                header.len
            ));
        };
        Ok((len, self.byte_len(len)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn test_growth_doubles_then_saturates() {
        let layout = ElemLayout::of::<u32>();
        assert_eq!(layout.grown_capacity(0, 1), 1);
        assert_eq!(layout.grown_capacity(1, 2), 2);
        assert_eq!(layout.grown_capacity(2, 3), 4);
        assert_eq!(layout.grown_capacity(4, 10), 10);
        assert_eq!(layout.grown_capacity(10, 15), 20);
        assert_eq!(layout.grown_capacity(20, 21), 40);
        assert_eq!(layout.grown_capacity(40, 100), 100);

        let max = layout.max_len();
        assert_eq!(layout.grown_capacity(max - 1, max), max);
        assert_eq!(layout.grown_capacity(max / 2 + 1, max / 2 + 2), max);
    }

    #[test]
    fn test_byte_len() {
        let layout = ElemLayout::of::<u64>();
        assert_eq!(layout.byte_len(0).unwrap(), 0);
        assert_eq!(layout.byte_len(3).unwrap(), 24);
        assert_eq!(
            layout.byte_len(usize::MAX).unwrap_err().kind(),
            ErrorKind::RangeError
        );
        assert_eq!(
            ElemLayout::of::<()>().byte_len(1).unwrap_err().kind(),
            ErrorKind::RangeError
        );
    }

    #[test]
    fn test_check_header() {
        let layout = ElemLayout::of::<u32>();
        let ok = VectorHeader { elem_size: 4, len: 5 };
        assert_eq!(layout.check_header(&ok).unwrap(), (5, 20));

        let zero = VectorHeader { elem_size: 0, len: 5 };
        assert_eq!(
            layout.check_header(&zero).unwrap_err().kind(),
            ErrorKind::RangeError
        );

        let mismatch = VectorHeader { elem_size: 8, len: 5 };
        assert_eq!(
            layout.check_header(&mismatch).unwrap_err().kind(),
            ErrorKind::FormatError
        );

        let huge = VectorHeader {
            elem_size: 4,
            len: u64::MAX,
        };
        assert_eq!(
            layout.check_header(&huge).unwrap_err().kind(),
            ErrorKind::RangeError
        );
    }
}
