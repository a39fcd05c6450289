//! Word population counts, selected at compile time.
//!
//! - Default: uses Rust's `count_ones()`, which lowers to the hardware
//!   population-count instruction where the target has one
//! - `portable-popcount`: uses the parallel mask-and-shift reduction
//!   (no intrinsics)
//!
//! [`PopCount`] additionally exposes cumulative counts of the low bytes of a
//! word, which the select scan uses to skip whole bytes at a time.

const M1: u64 = 0x5555_5555_5555_5555; // 01010101...
const M2: u64 = 0x3333_3333_3333_3333; // 00110011...
const M4: u64 = 0x0f0f_0f0f_0f0f_0f0f; // 00001111...
const L8: u64 = 0x0101_0101_0101_0101; // 1 in each byte's LSB

/// Number of set bits in `word`.
#[inline(always)]
pub fn popcount_word(word: u64) -> u32 {
    #[cfg(feature = "portable-popcount")]
    {
        popcount_word_portable(word)
    }

    #[cfg(not(feature = "portable-popcount"))]
    {
        word.count_ones()
    }
}

/// Total number of set bits across `words`.
#[inline]
pub fn popcount_words(words: &[u64]) -> u64 {
    words.iter().map(|&word| popcount_word(word) as u64).sum()
}

/// Mask-and-shift popcount without intrinsics.
///
/// Pairs, nibbles and bytes are summed with masks; the byte sums are then
/// folded by halving shifts into the low byte.
#[inline(always)]
pub fn popcount_word_portable(mut x: u64) -> u32 {
    x = (x & M1) + ((x >> 1) & M1);
    x = (x & M2) + ((x >> 2) & M2);
    x = (x + (x >> 4)) & M4;
    x += x >> 8;
    x += x >> 16;
    x += x >> 32;
    (x & 0x7f) as u32
}

/// Byte-wise cumulative population counts of one word.
///
/// Byte `k` of the packed value holds the number of set bits in the lowest
/// `(k + 1) * 8` bits of the source word. Computing it costs a handful of
/// arithmetic operations and all eight prefixes are then free.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PopCount {
    prefixes: u64,
}

impl PopCount {
    /// Compute the prefix counts of `x`.
    #[inline]
    pub fn new(x: u64) -> Self {
        let mut t = x - ((x >> 1) & M1);
        t = (t & M2) + ((t >> 2) & M2);
        t = (t + (t >> 4)) & M4;
        Self {
            prefixes: t.wrapping_mul(L8),
        }
    }

    /// Number of set bits in the lowest `(k + 1) * 8` bits, for `k` in `0..8`.
    ///
    /// # Panics
    ///
    /// Panics if `k >= 8`.
    #[inline]
    pub fn prefix_count(&self, k: usize) -> u32 {
        assert!(k < 8, "byte index {} out of range", k);
        ((self.prefixes >> (k * 8)) & 0xFF) as u32
    }

    /// Number of set bits in the whole word.
    #[inline]
    pub fn total(&self) -> u32 {
        (self.prefixes >> 56) as u32
    }
}

/// Position (0..64) of the `k`-th set bit of `word`, 0-indexed.
///
/// The caller guarantees `k < popcount_word(word)`. The byte holding the bit
/// is located through [`PopCount`] prefixes, then scanned bit by bit.
#[inline]
pub(crate) fn select_in_word(word: u64, k: u32) -> u32 {
    debug_assert!(k < popcount_word(word), "k={} word={:#x}", k, word);
    let counts = PopCount::new(word);
    let mut byte = 0usize;
    while byte < 7 && counts.prefix_count(byte) <= k {
        byte += 1;
    }
    let mut remaining = if byte == 0 {
        k
    } else {
        k - counts.prefix_count(byte - 1)
    };
    let shift = (byte * 8) as u32;
    let bits = (word >> shift) & 0xFF;
    for bit in 0..8u32 {
        if (bits >> bit) & 1 == 1 {
            if remaining == 0 {
                return shift + bit;
            }
            remaining -= 1;
        }
    }
    64
}
