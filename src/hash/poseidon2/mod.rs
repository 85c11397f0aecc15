//! Poseidon2 permutation over the Goldilocks field.
//!
//! The permutation follows the original [specification](https://eprint.iacr.org/2023/323) and
//! its accompanying reference [implementation](https://github.com/HorizenLabs/poseidon2),
//! instantiated with:
//! * Field: 64-bit prime field with modulus 2^64 - 2^32 + 1.
//! * State width: 12 field elements.
//! * S-Box degree: 7.
//! * Rounds: 4 initial external rounds, 22 internal rounds, 4 terminal external rounds, with an
//!   additional external linear layer applied to the input.
//!
//! These parameters target a 128-bit security level. The sponge built on top of the permutation
//! lives in the parent module; this module only exposes the raw state transformation.

use winter_math::FieldElement;

use crate::{Felt, ZERO};

mod constants;
use constants::{ARK_EXT_INITIAL, ARK_EXT_TERMINAL, ARK_INT, MAT_DIAG, NUM_EXTERNAL_ROUNDS_HALF, NUM_INTERNAL_ROUNDS};

#[cfg(test)]
mod tests;

// CONSTANTS
// ================================================================================================

/// Width of the permutation state: 8 rate elements plus 4 capacity elements.
pub const STATE_WIDTH: usize = 12;

// PERMUTATION
// ================================================================================================

/// Applies the Poseidon2 permutation to the given state in place.
pub fn apply_permutation(state: &mut [Felt; STATE_WIDTH]) {
    // the external linear layer is applied to the input once before any round to protect
    // against recently published attacks on the original round structure
    apply_matmul_external(state);
    initial_external_rounds(state);
    internal_rounds(state);
    terminal_external_rounds(state);
}

// HELPER FUNCTIONS
// ================================================================================================

/// Applies the initial external rounds of the permutation.
#[inline(always)]
fn initial_external_rounds(state: &mut [Felt; STATE_WIDTH]) {
    for ark in ARK_EXT_INITIAL.iter().take(NUM_EXTERNAL_ROUNDS_HALF) {
        add_rc(state, ark);
        apply_sbox(state);
        apply_matmul_external(state);
    }
}

/// Applies the internal rounds of the permutation. The round constant and the sbox apply only to
/// the first entry of the state.
#[inline(always)]
fn internal_rounds(state: &mut [Felt; STATE_WIDTH]) {
    for ark in ARK_INT.iter().take(NUM_INTERNAL_ROUNDS) {
        state[0] += *ark;
        state[0] = state[0].exp7();
        matmul_internal(state);
    }
}

/// Applies the terminal external rounds of the permutation.
#[inline(always)]
fn terminal_external_rounds(state: &mut [Felt; STATE_WIDTH]) {
    for ark in ARK_EXT_TERMINAL.iter().take(NUM_EXTERNAL_ROUNDS_HALF) {
        add_rc(state, ark);
        apply_sbox(state);
        apply_matmul_external(state);
    }
}

/// Applies the M_E linear layer to the state.
///
/// This takes a 4 x 4 MDS matrix M and computes the matrix-vector product with the matrix
/// `[[2M, M, ..., M], [M, 2M, ..., M], ..., [M, M, ..., 2M]]`. Given that structure, the
/// product of the state with `[M, M, ..., M]` is computed first and the final result follows
/// with a few additions.
#[inline(always)]
fn apply_matmul_external(state: &mut [Felt; STATE_WIDTH]) {
    matmul_m4(state);

    // accumulate column-wise sums
    let number_blocks = STATE_WIDTH / 4;
    let mut stored = [ZERO; 4];
    for j in 0..number_blocks {
        let base = j * 4;
        for l in 0..4 {
            stored[l] += state[base + l];
        }
    }

    // add stored column-sums to each element
    for (i, val) in state.iter_mut().enumerate() {
        *val += stored[i % 4];
    }
}

/// Multiplies the state block-wise with a 4 x 4 MDS matrix.
#[inline(always)]
fn matmul_m4(state: &mut [Felt; STATE_WIDTH]) {
    for block in 0..STATE_WIDTH / 4 {
        let idx = block * 4;

        let a = state[idx];
        let b = state[idx + 1];
        let c = state[idx + 2];
        let d = state[idx + 3];

        let t0 = a + b;
        let t1 = c + d;
        let two_b = b.double();
        let two_d = d.double();

        let t2 = two_b + t1;
        let t3 = two_d + t0;

        let t4 = t1.mul_small(4) + t3;
        let t5 = t0.mul_small(4) + t2;

        let t6 = t3 + t5;
        let t7 = t2 + t4;

        state[idx] = t6;
        state[idx + 1] = t5;
        state[idx + 2] = t7;
        state[idx + 3] = t4;
    }
}

/// Applies the M_I linear layer to the state.
///
/// The matrix is given by its diagonal entries with the remaining entries set equal to 1, so
/// given the sum of the state entries the matrix-vector product is a multiply-and-add per entry.
#[inline(always)]
fn matmul_internal(state: &mut [Felt; STATE_WIDTH]) {
    let mut sum = ZERO;
    for s in state.iter() {
        sum += *s;
    }

    for (s, diag) in state.iter_mut().zip(MAT_DIAG) {
        *s = *s * diag + sum;
    }
}

/// Adds the round constants to the state during external rounds.
#[inline(always)]
fn add_rc(state: &mut [Felt; STATE_WIDTH], ark: &[Felt; STATE_WIDTH]) {
    state.iter_mut().zip(ark).for_each(|(s, &k)| *s += k);
}

/// Applies the sbox entry-wise to the state.
#[inline(always)]
fn apply_sbox(state: &mut [Felt; STATE_WIDTH]) {
    for s in state.iter_mut() {
        *s = s.exp7();
    }
}
