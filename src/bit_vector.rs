//! Append-only bit vector with constant-time rank and sampled select.
//!
//! Bits are appended into 256-bit [`Pack`]s. [`BitVector::build`] freezes the
//! vector and fills in the [`Rank`] record embedded in every pack, and
//! optionally builds select sample tables.
//!
//! # Rank
//!
//! For bit position `i`, with `p = i / 256` and `j = (i / 64) % 4`:
//!
//! ```text
//! rank_1(i) = (packs[p].rank.abs << 6) + packs[p].rank.rels[j]
//!           + popcount(packs[p].words[j] & ((1 << (i % 64)) - 1))
//! ```
//!
//! `abs` is the running total at the start of the pack divided by 64, and
//! `rels[j]` is the remainder of the running total before word `j`. Since
//! the remainder starts below 64 and a pack adds at most 192 bits before its
//! last word, every `rels[j]` fits in a byte.
//!
//! # Select
//!
//! Each sample table stores the global word index holding every 256th
//! occurrence of the target bit, followed by a sentinel `size >> 6`. A query
//! jumps to sample `i / 256`, counts the occurrences before that word through
//! rank, scans forward word by word and finishes inside the final word.
//!
//! ```
//! use trie_substrate::{BitVector, BuildFlags};
//!
//! let mut bv = BitVector::new();
//! bv.push_back(true).unwrap();
//! bv.push_back(false).unwrap();
//! bv.push_back(true).unwrap();
//! bv.build(BuildFlags::SELECT_1).unwrap();
//!
//! assert_eq!(bv.rank_1(2), 1);
//! assert_eq!(bv.rank_1(3), 2);
//! assert_eq!(bv.select_1(1).unwrap(), 2);
//! ```

use std::fmt;
use std::ops::Index;

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{fail, Result};
use crate::io::{read_pod, write_pod, ByteSink, ByteSource};
use crate::logging::substrate_log;
use crate::mapper::Mapper;
use crate::popcount::{popcount_word, select_in_word};
use crate::vector::Vector;

/// Bits per pack.
pub const PACK_BITS: usize = 256;

/// Occurrences between two select samples.
pub const SELECT_INTERVAL: usize = 256;

/// Largest number of bits a bit vector can hold. Rank `abs` fields and
/// select samples are 32-bit word counts.
pub const MAX_SIZE: u64 = (u32::MAX as u64) << 6;

const WORDS_PER_PACK: usize = PACK_BITS / 64;

/// Rank record embedded in every pack.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rank {
    /// Set bits before this pack, divided by 64.
    pub abs: u32,
    /// Set bits before word `j` of this pack, minus `abs << 6`.
    pub rels: [u8; 4],
}

impl Rank {
    #[inline]
    fn base(&self, j: usize) -> usize {
        ((self.abs as usize) << 6) + self.rels[j] as usize
    }
}

/// Rank lookup over raw packs. `packs` must cover position `i`.
#[inline]
fn rank_in(packs: &[Pack], i: usize) -> usize {
    let pack = &packs[i / PACK_BITS];
    let j = (i / 64) % WORDS_PER_PACK;
    let below = pack.words[j] & ((1u64 << (i % 64)) - 1);
    pack.rank.base(j) + popcount_word(below) as usize
}

/// 256 data bits and their rank record. 40 bytes, no padding.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Pack {
    /// Data bits, least significant bit first.
    pub words: [u64; WORDS_PER_PACK],
    /// Rank record for the start of each word.
    pub rank: Rank,
}

bitflags! {
    /// Indices to build in [`BitVector::build`]. `RANK` is always built.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct BuildFlags: u64 {
        const RANK = 1 << 0;
        const SELECT_1 = 1 << 1;
        const SELECT_0 = 1 << 2;
    }
}

/// Persisted summary of a bit vector.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BitVectorHeader {
    pub size: u64,
    pub num_1s: u64,
    pub flags: u64,
}

impl BitVectorHeader {
    /// Check the header on its own and return the flags it carries.
    pub fn validate(&self) -> Result<BuildFlags> {
        let Some(flags) = BuildFlags::from_bits(self.flags) else {
            return Err(fail!(
                FormatError,
                "failed to load bit vector: unknown flags {:#x}",
                self.flags
            ));
        };
        if !flags.contains(BuildFlags::RANK) {
            return Err(fail!(FormatError, "failed to load bit vector: rank index missing"));
        }
        if self.size > MAX_SIZE || usize::try_from(self.size).is_err() {
            return Err(fail!(
                SizeError,
                "failed to load bit vector: size {} too large",
                self.size
            ));
        }
        if self.num_1s > self.size {
            return Err(fail!(
                FormatError,
                "failed to load bit vector: num_1s > size ({} > {})",
                self.num_1s,
                self.size
            ));
        }
        Ok(flags)
    }
}

/// An append-only bit sequence with rank and select indices.
///
/// The vector is mutable until [`build`](Self::build) succeeds; afterwards
/// only queries are allowed. A vector obtained through [`map`](Self::map)
/// borrows its arrays from the [`Mapper`] for `'a`.
#[derive(Clone)]
pub struct BitVector<'a> {
    packs: Vector<'a, Pack>,
    size: usize,
    num_1s: usize,
    flags: BuildFlags,
    select_1s: Vector<'a, u32>,
    select_0s: Vector<'a, u32>,
}

impl<'a> BitVector<'a> {
    /// An empty vector in the building state.
    pub const fn new() -> Self {
        Self {
            packs: Vector::new(),
            size: 0,
            num_1s: 0,
            flags: BuildFlags::empty(),
            select_1s: Vector::new(),
            select_0s: Vector::new(),
        }
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    #[inline]
    pub fn num_1s(&self) -> usize {
        self.num_1s
    }

    #[inline]
    pub fn num_0s(&self) -> usize {
        self.size - self.num_1s
    }

    /// Indices built so far; empty while the vector is still mutable.
    #[inline]
    pub fn flags(&self) -> BuildFlags {
        self.flags
    }

    #[inline]
    pub fn is_built(&self) -> bool {
        self.flags.contains(BuildFlags::RANK)
    }

    /// True when the packs are borrowed from a mapped region.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.packs.is_mapped()
    }

    pub fn header(&self) -> BitVectorHeader {
        BitVectorHeader {
            size: self.size as u64,
            num_1s: self.num_1s as u64,
            flags: self.flags.bits(),
        }
    }

    /// Number of entries in the select-1 and select-0 tables (sentinel
    /// included).
    pub fn sample_counts(&self) -> (usize, usize) {
        (self.select_1s.len(), self.select_0s.len())
    }

    /// Append one bit.
    pub fn push_back(&mut self, bit: bool) -> Result<()> {
        if self.is_built() {
            return Err(fail!(StateError, "failed to push bit: already built"));
        }
        if self.size as u64 >= MAX_SIZE {
            return Err(fail!(SizeError, "failed to push bit: full"));
        }
        if self.size == self.packs.len() * PACK_BITS {
            self.packs.push_back(Pack::zeroed())?;
        }
        if bit {
            let i = self.size;
            let packs = self.packs.as_mut_slice()?;
            packs[i / PACK_BITS].words[(i / 64) % WORDS_PER_PACK] |= 1u64 << (i % 64);
            self.num_1s += 1;
        }
        self.size += 1;
        Ok(())
    }

    /// Append every bit of `bits`, stopping at the first failure.
    pub fn extend_bits<I: IntoIterator<Item = bool>>(&mut self, bits: I) -> Result<()> {
        bits.into_iter().try_for_each(|bit| self.push_back(bit))
    }

    /// Freeze the vector and build the requested indices.
    ///
    /// `RANK` is implied. A second call fails with
    /// [`StateError`](crate::ErrorKind::StateError). If a select table fails
    /// to build, the indices completed before it stay enabled.
    pub fn build(&mut self, flags: BuildFlags) -> Result<()> {
        if self.is_built() {
            return Err(fail!(StateError, "failed to build bit vector: already built"));
        }
        self.build_rank()?;
        self.flags |= BuildFlags::RANK;

        if flags.contains(BuildFlags::SELECT_1) {
            self.select_1s = self.build_select(true)?;
            self.flags |= BuildFlags::SELECT_1;
        }
        if flags.contains(BuildFlags::SELECT_0) {
            self.select_0s = self.build_select(false)?;
            self.flags |= BuildFlags::SELECT_0;
        }

        substrate_log!(
            log::Level::Debug,
            "bit_vector_build",
            "size={} num_1s={} flags={:?} packs={} select_1s={} select_0s={}",
            self.size,
            self.num_1s,
            self.flags,
            self.packs.len(),
            self.select_1s.len(),
            self.select_0s.len()
        );
        Ok(())
    }

    fn build_rank(&mut self) -> Result<()> {
        // A trailing pack keeps rank_1(size) in range when the last one is full.
        if self.size == self.packs.len() * PACK_BITS {
            self.packs.push_back(Pack::zeroed())?;
        }
        self.packs.shrink()?;

        let mut total = 0usize;
        for pack in self.packs.as_mut_slice()? {
            let abs = total >> 6;
            pack.rank.abs = abs as u32;
            for (j, &word) in pack.words.iter().enumerate() {
                pack.rank.rels[j] = (total - (abs << 6)) as u8;
                total += popcount_word(word) as usize;
            }
        }
        debug_assert_eq!(total, self.num_1s);
        Ok(())
    }

    fn build_select(&self, bit: bool) -> Result<Vector<'a, u32>> {
        let count = if bit { self.num_1s } else { self.num_0s() };
        let mut samples = Vector::new();
        samples.reserve(count.div_ceil(SELECT_INTERVAL) + 1)?;

        let mut seen = 0usize;
        for w in 0..self.size.div_ceil(64) {
            let n = popcount_word(self.masked_word(w, bit)) as usize;
            // At most one sample per word since n <= 64.
            if samples.len() * SELECT_INTERVAL < seen + n {
                samples.push_back(w as u32)?;
            }
            seen += n;
        }
        samples.push_back((self.size >> 6) as u32)?;
        Ok(samples)
    }

    #[inline]
    fn word(&self, w: usize) -> u64 {
        self.packs[w / WORDS_PER_PACK].words[w % WORDS_PER_PACK]
    }

    /// Word `w` with clear bits inverted when `bit` is false, and bits at or
    /// beyond `size` masked off.
    #[inline]
    fn masked_word(&self, w: usize, bit: bool) -> u64 {
        let word = if bit { self.word(w) } else { !self.word(w) };
        let valid = self.size.saturating_sub(w * 64);
        if valid >= 64 {
            word
        } else {
            word & ((1u64 << valid) - 1)
        }
    }

    /// The bit at position `i`. Legal in any state.
    ///
    /// # Panics
    ///
    /// Panics if `i >= size()`.
    #[inline]
    pub fn get(&self, i: usize) -> bool {
        assert!(i < self.size, "index {} out of bounds (size={})", i, self.size);
        (self.word(i / 64) >> (i % 64)) & 1 == 1
    }

    /// Number of set bits in `[0, i)`. Requires [`build`](Self::build).
    ///
    /// # Panics
    ///
    /// Panics if `i > size()`.
    #[inline]
    pub fn rank_1(&self, i: usize) -> usize {
        assert!(i <= self.size, "rank position {} out of bounds (size={})", i, self.size);
        debug_assert!(self.is_built(), "rank_1 before build");
        rank_in(&self.packs, i)
    }

    /// Number of clear bits in `[0, i)`. Requires [`build`](Self::build).
    #[inline]
    pub fn rank_0(&self, i: usize) -> usize {
        i - self.rank_1(i)
    }

    /// Position of the `(i + 1)`-th set bit.
    ///
    /// Fails with `StateError` unless built with `SELECT_1`, and with
    /// `RangeError` when `i >= num_1s()`.
    pub fn select_1(&self, i: usize) -> Result<usize> {
        if !self.flags.contains(BuildFlags::SELECT_1) {
            return Err(fail!(StateError, "failed to select 1: select-1 index not built"));
        }
        if i >= self.num_1s {
            return Err(fail!(
                RangeError,
                "failed to select 1: {} >= num_1s ({})",
                i,
                self.num_1s
            ));
        }
        self.select(&self.select_1s, i, true)
    }

    /// Position of the `(i + 1)`-th clear bit.
    ///
    /// Fails with `StateError` unless built with `SELECT_0`, and with
    /// `RangeError` when `i >= num_0s()`.
    pub fn select_0(&self, i: usize) -> Result<usize> {
        if !self.flags.contains(BuildFlags::SELECT_0) {
            return Err(fail!(StateError, "failed to select 0: select-0 index not built"));
        }
        if i >= self.num_0s() {
            return Err(fail!(
                RangeError,
                "failed to select 0: {} >= num_0s ({})",
                i,
                self.num_0s()
            ));
        }
        self.select(&self.select_0s, i, false)
    }

    fn select(&self, samples: &[u32], i: usize, bit: bool) -> Result<usize> {
        let q = i / SELECT_INTERVAL;
        let (start, end) = match (samples.get(q), samples.get(q + 1)) {
            (Some(&start), Some(&end)) => (start as usize, end as usize),
            _ => return Err(fail!(FormatError, "failed to select: sample table too short")),
        };
        if start > end || end > self.size >> 6 {
            return Err(fail!(FormatError, "failed to select: corrupt sample table"));
        }

        let ones_before = self.rank_1(start * 64);
        let before = if bit {
            Some(ones_before)
        } else {
            (start * 64).checked_sub(ones_before)
        };
        // The sample must not skip past the target occurrence.
        let mut seen = match before {
            Some(n) if n <= i => n,
            _ => return Err(fail!(FormatError, "failed to select: corrupt sample table")),
        };
        for w in start..=end {
            let word = self.masked_word(w, bit);
            let n = popcount_word(word) as usize;
            if seen + n > i {
                return Ok(w * 64 + select_in_word(word, (i - seen) as u32) as usize);
            }
            seen += n;
        }
        Err(fail!(FormatError, "failed to select: corrupt sample table"))
    }

    /// Persist the header, the packs and the enabled select tables.
    pub fn write<S: ByteSink + ?Sized>(&self, sink: &mut S) -> Result<()> {
        if !self.is_built() {
            return Err(fail!(StateError, "failed to write bit vector: not built"));
        }
        write_pod(sink, &self.header())?;
        self.packs.write_with_header(sink)?;
        if self.flags.contains(BuildFlags::SELECT_1) {
            self.select_1s.write_with_header(sink)?;
        }
        if self.flags.contains(BuildFlags::SELECT_0) {
            self.select_0s.write_with_header(sink)?;
        }
        Ok(())
    }

    /// Bytes produced by [`write`](Self::write).
    pub fn io_size(&self) -> usize {
        let mut n = std::mem::size_of::<BitVectorHeader>() + self.packs.io_size();
        if self.flags.contains(BuildFlags::SELECT_1) {
            n += self.select_1s.io_size();
        }
        if self.flags.contains(BuildFlags::SELECT_0) {
            n += self.select_0s.io_size();
        }
        n
    }

    /// Load a vector written by [`write`](Self::write) into owned buffers.
    pub fn read<S: ByteSource + ?Sized>(source: &mut S) -> Result<BitVector<'static>> {
        let header: BitVectorHeader = read_pod(source)?;
        let flags = header.validate()?;

        let mut bv = BitVector::new();
        bv.packs.read_with_header(source)?;
        if flags.contains(BuildFlags::SELECT_1) {
            bv.select_1s.read_with_header(source)?;
        }
        if flags.contains(BuildFlags::SELECT_0) {
            bv.select_0s.read_with_header(source)?;
        }
        bv.restore(&header, flags)?;
        Ok(bv)
    }

    /// Bind to a vector written by [`write`](Self::write), borrowing its
    /// arrays from `mapper` where alignment allows.
    pub fn map(mapper: &'a Mapper<'_>) -> Result<Self> {
        let header: BitVectorHeader = mapper.map_value()?;
        let flags = header.validate()?;

        let mut bv = BitVector::new();
        bv.packs.map_with_header(mapper)?;
        if flags.contains(BuildFlags::SELECT_1) {
            bv.select_1s.map_with_header(mapper)?;
        }
        if flags.contains(BuildFlags::SELECT_0) {
            bv.select_0s.map_with_header(mapper)?;
        }
        bv.restore(&header, flags)?;
        Ok(bv)
    }

    /// Adopt a validated header and cross-check the loaded arrays against it.
    fn restore(&mut self, header: &BitVectorHeader, flags: BuildFlags) -> Result<()> {
        let size = header.size as usize;
        let num_1s = header.num_1s as usize;

        let expected_packs = size / PACK_BITS + 1;
        if self.packs.len() != expected_packs {
            return Err(fail!(
                FormatError,
                "failed to load bit vector: {} packs, expected {}",
                self.packs.len(),
                expected_packs
            ));
        }
        let mut running = 0usize;
        for (p, pack) in self.packs.iter().enumerate() {
            for (j, &word) in pack.words.iter().enumerate() {
                if pack.rank.base(j) != running {
                    return Err(fail!(
                        FormatError,
                        "failed to load bit vector: rank of pack {} word {} is {}, expected {}",
                        p,
                        j,
                        pack.rank.base(j),
                        running
                    ));
                }
                running += popcount_word(word) as usize;
            }
        }
        let total = rank_in(&self.packs, size);
        if total != num_1s {
            return Err(fail!(
                FormatError,
                "failed to load bit vector: rank index counts {} ones, header {}",
                total,
                num_1s
            ));
        }

        for (flag, samples, count) in [
            (BuildFlags::SELECT_1, &self.select_1s, num_1s),
            (BuildFlags::SELECT_0, &self.select_0s, size - num_1s),
        ] {
            if !flags.contains(flag) {
                continue;
            }
            let expected = count.div_ceil(SELECT_INTERVAL) + 1;
            if samples.len() != expected {
                return Err(fail!(
                    FormatError,
                    "failed to load bit vector: {} select samples, expected {}",
                    samples.len(),
                    expected
                ));
            }
            if samples.last().map(|&s| s as usize) != Some(size >> 6) {
                return Err(fail!(FormatError, "failed to load bit vector: bad select sentinel"));
            }
            if samples.windows(2).any(|pair| pair[0] > pair[1]) {
                return Err(fail!(
                    FormatError,
                    "failed to load bit vector: select samples out of order"
                ));
            }
        }

        self.size = size;
        self.num_1s = num_1s;
        self.flags = flags;
        substrate_log!(
            log::Level::Debug,
            "bit_vector_load",
            "size={} num_1s={} flags={:?} mapped={}",
            size,
            num_1s,
            flags,
            self.is_mapped()
        );
        Ok(())
    }
}

impl Default for BitVector<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl Index<usize> for BitVector<'_> {
    type Output = bool;

    #[inline]
    fn index(&self, i: usize) -> &bool {
        if self.get(i) {
            &true
        } else {
            &false
        }
    }
}

impl fmt::Debug for BitVector<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitVector")
            .field("size", &self.size)
            .field("num_1s", &self.num_1s)
            .field("flags", &self.flags)
            .field("packs", &self.packs.len())
            .field("select_1s", &self.select_1s.len())
            .field("select_0s", &self.select_0s.len())
            .field("mapped", &self.is_mapped())
            .finish()
    }
}
