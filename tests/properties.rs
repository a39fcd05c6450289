//! Property-based tests for rank/select, vector growth and mapping.

use proptest::prelude::*;
use trie_substrate::{BitVector, BuildFlags, ErrorKind, Mapper, Vector};

fn build_all(bits: &[bool]) -> BitVector<'static> {
    let mut bv = BitVector::new();
    bv.extend_bits(bits.iter().copied()).unwrap();
    bv.build(BuildFlags::all()).unwrap();
    bv
}

/// Bit sequences with runs long enough to cross pack and sample boundaries.
fn bit_strategy(max_len: usize) -> impl Strategy<Value = Vec<bool>> {
    prop_oneof![
        prop::collection::vec(any::<bool>(), 0..max_len),
        prop::collection::vec(prop::bool::weighted(0.02), 0..max_len),
        prop::collection::vec(prop::bool::weighted(0.98), 0..max_len),
    ]
}

proptest! {
    /// rank_1(i) counts the set bits among the first i pushed
    #[test]
    fn prop_rank_matches_prefix_count(bits in bit_strategy(3000)) {
        let bv = build_all(&bits);
        let mut ones = 0;
        for i in 0..=bits.len() {
            prop_assert_eq!(bv.rank_1(i), ones, "rank_1({})", i);
            if i < bits.len() && bits[i] {
                ones += 1;
            }
        }
        prop_assert_eq!(bv.rank_1(bits.len()), bv.num_1s());
        prop_assert_eq!(bv.rank_0(bits.len()), bv.num_0s());
    }

    /// rank_1(i) + rank_0(i) == i
    #[test]
    fn prop_rank_sum(bits in bit_strategy(2000), ratio in 0.0..=1.0f64) {
        let bv = build_all(&bits);
        let i = ((bits.len() as f64) * ratio) as usize;
        prop_assert_eq!(bv.rank_1(i) + bv.rank_0(i), i);
    }

    /// select_1(rank_1(i)) == i for set bits, select_0(rank_0(i)) == i for clear bits
    #[test]
    fn prop_select_inverts_rank(bits in bit_strategy(3000)) {
        let bv = build_all(&bits);
        for (i, &bit) in bits.iter().enumerate() {
            if bit {
                prop_assert_eq!(bv.select_1(bv.rank_1(i)).unwrap(), i);
            } else {
                prop_assert_eq!(bv.select_0(bv.rank_0(i)).unwrap(), i);
            }
        }
    }

    /// select past the last occurrence is a range error
    #[test]
    fn prop_select_out_of_range(bits in bit_strategy(600)) {
        let bv = build_all(&bits);
        prop_assert_eq!(bv.select_1(bv.num_1s()).unwrap_err().kind(), ErrorKind::RangeError);
        prop_assert_eq!(bv.select_0(bv.num_0s()).unwrap_err().kind(), ErrorKind::RangeError);
    }

    /// write then read reproduces every answer
    #[test]
    fn prop_bit_vector_io(bits in bit_strategy(1500), select1: bool, select0: bool) {
        let mut flags = BuildFlags::empty();
        flags.set(BuildFlags::SELECT_1, select1);
        flags.set(BuildFlags::SELECT_0, select0);

        let mut bv = BitVector::new();
        bv.extend_bits(bits.iter().copied()).unwrap();
        bv.build(flags).unwrap();

        let mut bytes = Vec::<u8>::new();
        bv.write(&mut bytes).unwrap();
        prop_assert_eq!(bytes.len(), bv.io_size());

        let loaded = BitVector::read(&mut bytes.as_slice()).unwrap();
        prop_assert_eq!(loaded.header(), bv.header());
        for i in 0..=bits.len() {
            prop_assert_eq!(loaded.rank_1(i), bv.rank_1(i));
        }
        if select1 {
            for k in 0..bv.num_1s() {
                prop_assert_eq!(loaded.select_1(k).unwrap(), bv.select_1(k).unwrap());
            }
        }
        if select0 {
            for k in 0..bv.num_0s() {
                prop_assert_eq!(loaded.select_0(k).unwrap(), bv.select_0(k).unwrap());
            }
        }
    }

    /// capacity never decreases on push_back and only ever doubles
    #[test]
    fn prop_push_back_capacity(n in 0usize..5000) {
        let mut v: Vector<'_, u32> = Vector::new();
        let mut prev = 0usize;
        for i in 0..n {
            v.push_back(i as u32).unwrap();
            let cap = v.capacity();
            prop_assert!(cap >= prev);
            prop_assert!(cap == prev || cap == (prev * 2).max(1));
            prev = cap;
        }
        let expected = if n == 0 { 0 } else { n.next_power_of_two() };
        prop_assert_eq!(v.capacity(), expected);
        prop_assert!(v.iter().copied().eq(0..n as u32));
    }

    /// successive maps partition the region and the overflowing map is a bound error
    #[test]
    fn prop_mapper_partitions(len in 1usize..512, chunk in 1usize..64) {
        let bytes: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let mapper = Mapper::from_bytes(&bytes).unwrap();
        let mut next = 0usize;
        while mapper.remaining() >= chunk {
            let view = mapper.map_bytes(chunk).unwrap();
            prop_assert_eq!(view[0], next as u8);
            next += chunk;
        }
        prop_assert_eq!(mapper.position(), next);
        prop_assert_eq!(mapper.map_bytes(chunk).unwrap_err().kind(), ErrorKind::BoundError);
    }
}
