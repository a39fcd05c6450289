//! # Trie Substrate
//!
//! Storage primitives for a compressed trie: a frozen bit vector with rank and
//! select, a growable array of plain records that can own, load or borrow its
//! elements, and a read-only cursor over memory-mapped files.
//!
//! ## Quick Start
//!
//! ```
//! use trie_substrate::{BitVector, BuildFlags, Mapper};
//!
//! let mut bv = BitVector::new();
//! bv.extend_bits([true, false, true, true, false]).unwrap();
//! bv.build(BuildFlags::SELECT_1 | BuildFlags::SELECT_0).unwrap();
//!
//! // rank (count of 1-bits in [0, i))
//! assert_eq!(bv.rank_1(4), 3);
//! // select (position of the k-th 1-bit, 0-indexed)
//! assert_eq!(bv.select_1(2).unwrap(), 3);
//! assert_eq!(bv.select_0(1).unwrap(), 4);
//!
//! // Persist, then view the arrays through a mapper.
//! let mut bytes = Vec::<u8>::new();
//! bv.write(&mut bytes).unwrap();
//! let mapper = Mapper::from_bytes(&bytes).unwrap();
//! let view = BitVector::map(&mapper).unwrap();
//! assert_eq!(view.rank_1(5), 3);
//! ```
//!
//! ## Features
//!
//! - `portable-popcount` - Use the portable bitwise popcount (no intrinsics)
//! - `serde` - Serialization of headers, flags and error kinds
//! - `cli` - The `trie-substrate` command-line tool
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade under the `trie_substrate`
//! target. No logger is installed.

pub mod bit_vector;
pub mod error;
pub mod io;
mod logging;
pub mod mapper;
pub mod popcount;
pub mod vector;

pub use bit_vector::{BitVector, BitVectorHeader, BuildFlags, Pack, Rank};
pub use error::{Error, ErrorKind, Result};
pub use io::{ByteSink, ByteSource, FileWriter};
pub use mapper::Mapper;
pub use popcount::{popcount_word, popcount_words, PopCount};
pub use vector::{Storage, Vector, VectorHeader};

/// The library version, e.g. `"0.1.0"`.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
