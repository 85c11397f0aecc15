use alloc::vec::Vec;

use super::hash_with_domain;
use crate::KEY_LIMBS;

// CONSTANTS
// ================================================================================================

/// Number of bytes absorbed per sponge invocation: 8 elements of 7 bytes each.
const BLOCK_BYTES: usize = 56;

/// Number of bytes packed into one field element. Seven bytes always fit below the modulus.
const BYTES_PER_ELEMENT: usize = 7;

// BYTECODE COMMITMENT
// ================================================================================================

/// Returns the 4-limb commitment to a contract's bytecode, stored under the CODE leaf of the
/// account.
///
/// The bytecode is padded with a `0x01` terminator, zero-filled to a block boundary, and the
/// high bit of the final byte is set, so no two byte strings share a padded form. Each 56-byte
/// block is packed into 8 little-endian field elements; the digest of each block seeds the
/// capacity for the next one, chaining the blocks together.
pub fn hash_bytecode(code: &[u8]) -> [u64; KEY_LIMBS] {
    let mut padded: Vec<u8> = Vec::with_capacity(code.len() + BLOCK_BYTES);
    padded.extend_from_slice(code);
    padded.push(0x01);
    padded.resize(padded.len().div_ceil(BLOCK_BYTES) * BLOCK_BYTES, 0);
    let last = padded.len() - 1;
    padded[last] |= 0x80;

    let mut digest = [0u64; KEY_LIMBS];
    for block in padded.chunks_exact(BLOCK_BYTES) {
        let mut elements = [0u64; 8];
        for (element, chunk) in elements.iter_mut().zip(block.chunks_exact(BYTES_PER_ELEMENT)) {
            let mut buf = [0u8; 8];
            buf[..BYTES_PER_ELEMENT].copy_from_slice(chunk);
            *element = u64::from_le_bytes(buf);
        }
        digest = hash_with_domain(&elements, digest);
    }
    digest
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commitment_is_deterministic() {
        let code = [0x60, 0x80, 0x60, 0x40, 0x52];
        assert_eq!(hash_bytecode(&code), hash_bytecode(&code));
    }

    #[test]
    fn padding_separates_prefixes() {
        // a code and the same code with a trailing zero must commit differently
        let code = [0xfe, 0x00, 0x01];
        let mut extended = code.to_vec();
        extended.push(0);
        assert_ne!(hash_bytecode(&code), hash_bytecode(&extended));
    }

    #[test]
    fn empty_code_differs_from_zero_byte() {
        assert_ne!(hash_bytecode(&[]), hash_bytecode(&[0]));
    }

    #[test]
    fn multi_block_code_chains() {
        // 56 bytes of code spill into a second padded block
        let one_block = vec![0xabu8; 55];
        let two_blocks = vec![0xabu8; 56];
        assert_ne!(hash_bytecode(&one_block), hash_bytecode(&two_blocks));
    }
}
