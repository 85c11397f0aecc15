//! Hashing primitives for the state tree.
//!
//! The tree-visible hash is a capacity-seeded sponge over the Poseidon2 permutation: the 4-limb
//! domain tag is loaded into the capacity portion of the state, the input is absorbed into the
//! rate portion in chunks of 8 elements, and the digest is read back from the first 4 rate
//! elements. Branch nodes, leaf nodes, and leaf values are separated by their domain tags, so no
//! two of them can collide structurally.
//!
//! Keccak256 lives here as well; it keys the contract-code map but never touches the tree.

use core::ops::Range;

use winter_math::StarkField;

use crate::{Felt, KEY_LIMBS, ZERO};

mod poseidon2;
use poseidon2::{STATE_WIDTH, apply_permutation};

mod keccak;
pub use keccak::keccak256;

mod bytecode;
pub use bytecode::hash_bytecode;

// CONSTANTS
// ================================================================================================

/// Number of rate elements absorbed per permutation call.
const RATE_WIDTH: usize = 8;

/// The capacity portion of the state is located in elements 0, 1, 2, and 3. It carries the
/// domain tag and is never touched by absorption.
const CAPACITY_RANGE: Range<usize> = 0..4;

/// The rate portion of the state is located in elements 4 through 11.
const RATE_RANGE: Range<usize> = 4..12;

/// The digest is read from state elements 4, 5, 6, and 7.
const DIGEST_RANGE: Range<usize> = 4..8;

/// Domain tag under which branch payloads and leaf values are hashed.
pub const BRANCH_DOMAIN: [u64; KEY_LIMBS] = [0, 0, 0, 0];

/// Domain tag under which leaf payloads are hashed.
pub const LEAF_DOMAIN: [u64; KEY_LIMBS] = [1, 0, 0, 0];

// TREE HASH
// ================================================================================================

/// Hashes `input` under the given 4-limb domain tag and returns the 4-limb digest.
///
/// The domain seeds the capacity portion of the sponge state; the input is absorbed into the
/// rate portion in chunks of [RATE_WIDTH] elements, zero-padded in the final chunk, with one
/// permutation per chunk. Input limbs are reduced into the field on absorption, so callers must
/// only pass canonical values where bit-exactness matters (all tree payloads are canonical by
/// construction).
pub fn hash_with_domain(input: &[u64], domain: [u64; KEY_LIMBS]) -> [u64; KEY_LIMBS] {
    debug_assert!(!input.is_empty(), "hash input must not be empty");

    let mut state = [ZERO; STATE_WIDTH];
    for (slot, limb) in state[CAPACITY_RANGE].iter_mut().zip(domain) {
        *slot = Felt::new(limb);
    }

    // absorb the input into the rate portion one chunk at a time, permuting whenever the rate
    // fills up; the final partial chunk is zero-padded
    let mut pos = 0;
    for &limb in input {
        state[RATE_RANGE.start + pos] = Felt::new(limb);
        pos += 1;
        if pos == RATE_WIDTH {
            apply_permutation(&mut state);
            pos = 0;
        }
    }
    if pos > 0 {
        state[RATE_RANGE.start + pos..RATE_RANGE.end].fill(ZERO);
        apply_permutation(&mut state);
    }

    let mut digest = [0u64; KEY_LIMBS];
    for (limb, element) in digest.iter_mut().zip(&state[DIGEST_RANGE]) {
        *limb = element.as_int();
    }
    digest
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let input = [1u64, 2, 3, 4, 5, 6, 7, 8];
        assert_eq!(hash_with_domain(&input, BRANCH_DOMAIN), hash_with_domain(&input, BRANCH_DOMAIN));
    }

    #[test]
    fn domains_separate() {
        let input = [7u64; 8];
        assert_ne!(hash_with_domain(&input, BRANCH_DOMAIN), hash_with_domain(&input, LEAF_DOMAIN));
    }

    #[test]
    fn inputs_separate() {
        let a = hash_with_domain(&[1u64, 0, 0, 0, 0, 0, 0, 0], BRANCH_DOMAIN);
        let b = hash_with_domain(&[2u64, 0, 0, 0, 0, 0, 0, 0], BRANCH_DOMAIN);
        assert_ne!(a, b);
    }

    #[test]
    fn wide_input_absorbs_in_two_chunks() {
        // a 16-element input must not collide with either of its 8-element halves
        let wide = [3u64; 16];
        let half = [3u64; 8];
        let wide_digest = hash_with_domain(&wide, BRANCH_DOMAIN);
        assert_ne!(wide_digest, hash_with_domain(&half, BRANCH_DOMAIN));
    }

    #[test]
    fn digest_limbs_are_canonical() {
        let digest = hash_with_domain(&[42u64; 8], LEAF_DOMAIN);
        for limb in digest {
            assert!(limb < Felt::MODULUS);
        }
    }
}
