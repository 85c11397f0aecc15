//! Tree keys, bit-paths, and key derivation.
//!
//! A tree key is a 256-bit value carried as four little-endian 64-bit limbs. Keys are produced
//! by hashing a domain-tagged tuple of account address, leaf kind, and storage slot; the hash
//! digest's limbs are the key's limbs. Node hashes share the same representation, so [TreeKey]
//! doubles as the content address of stored nodes.
//!
//! The path from the root to a key's leaf interleaves the limbs at the bit level: the path bit
//! at depth `i` is bit `i / 4` of limb `i % 4`. This interleave is consensus-visible; changing
//! it changes every root.

use alloc::vec::Vec;
use core::fmt;

use num_bigint::BigUint;

use crate::{
    KEY_BITS, KEY_LIMBS,
    error::SmtError,
    hash::hash_with_domain,
    scalar,
};

// CONSTANTS
// ================================================================================================

/// Length of an account address in bytes.
pub const ADDRESS_BYTES: usize = 20;

/// Length of a storage slot in bytes.
pub const SLOT_BYTES: usize = 32;

/// Serialized length of a key-source record: kind byte, address, slot.
pub const KEY_SOURCE_BYTES: usize = 1 + ADDRESS_BYTES + SLOT_BYTES;

/// The all-zero storage slot used for non-storage leaves.
const ZERO_SLOT: [u8; SLOT_BYTES] = [0; SLOT_BYTES];

// LEAF KIND
// ================================================================================================

/// The kind of state a leaf commits to. The kind is mixed into key derivation as the hash
/// domain, so the five leaves of one account never collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LeafKind {
    /// Account balance.
    Balance = 0,
    /// Account nonce.
    Nonce = 1,
    /// Contract bytecode commitment.
    Code = 2,
    /// Contract storage slot.
    Storage = 3,
    /// Contract bytecode length in bytes.
    CodeLength = 4,
}

impl LeafKind {
    /// Decodes a leaf kind from its wire byte.
    ///
    /// # Errors
    /// Returns [SmtError::InvalidInput] for bytes outside the defined range.
    pub fn from_byte(byte: u8) -> Result<Self, SmtError> {
        match byte {
            0 => Ok(Self::Balance),
            1 => Ok(Self::Nonce),
            2 => Ok(Self::Code),
            3 => Ok(Self::Storage),
            4 => Ok(Self::CodeLength),
            other => Err(SmtError::InvalidInput(format!("unknown leaf kind {other}"))),
        }
    }
}

// TREE KEY
// ================================================================================================

/// A 256-bit tree key (or node hash) as four little-endian 64-bit limbs.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeKey(pub [u64; KEY_LIMBS]);

impl TreeKey {
    /// Serialized size of a key in bytes.
    pub const SERIALIZED_SIZE: usize = KEY_LIMBS * 8;

    /// Creates a key from its four limbs.
    pub const fn new(limbs: [u64; KEY_LIMBS]) -> Self {
        Self(limbs)
    }

    /// Returns true if all limbs are zero. The zero key doubles as the empty node hash.
    pub const fn is_zero(&self) -> bool {
        self.0[0] == 0 && self.0[1] == 0 && self.0[2] == 0 && self.0[3] == 0
    }

    /// Returns the key's limbs.
    pub const fn limbs(&self) -> &[u64; KEY_LIMBS] {
        &self.0
    }

    /// Returns the path bit at the given depth: bit `depth / 4` of limb `depth % 4`.
    pub const fn path_bit(&self, depth: usize) -> u8 {
        debug_assert!(depth < KEY_BITS);
        ((self.0[depth % KEY_LIMBS] >> (depth / KEY_LIMBS)) & 1) as u8
    }

    /// Packs the full bit-path into 32 bytes, most significant (root-side) bit first, so that
    /// byte-wise lexicographic order equals root-to-leaf path order.
    pub fn path_bytes(&self) -> [u8; 32] {
        let mut bytes = [0u8; 32];
        for depth in 0..KEY_BITS {
            bytes[depth / 8] |= self.path_bit(depth) << (7 - depth % 8);
        }
        bytes
    }

    /// Strips the first `n` path bits, returning the remaining-key suffix a leaf at depth `n`
    /// stores. Per the interleave this is a per-limb right shift.
    pub fn strip_path_bits(&self, n: usize) -> TreeKey {
        debug_assert!(n <= KEY_BITS);
        let mut limbs = [0u64; KEY_LIMBS];
        for (i, limb) in limbs.iter_mut().enumerate() {
            let shift = n / KEY_LIMBS + usize::from(n % KEY_LIMBS > i);
            *limb = if shift >= 64 { 0 } else { self.0[i] >> shift };
        }
        TreeKey(limbs)
    }

    /// Extends a suffix at depth `depth + 1` into a suffix at `depth` whose first path bit is
    /// `bit`. This is the single-step inverse of [Self::strip_path_bits] and is what re-homes a
    /// leaf one level up during path compression.
    pub fn with_path_bit(&self, bit: u8, depth: usize) -> TreeKey {
        debug_assert!(bit <= 1);
        debug_assert!(depth < KEY_BITS);
        let mut limbs = self.0;
        limbs[depth % KEY_LIMBS] = (limbs[depth % KEY_LIMBS] << 1) | bit as u64;
        TreeKey(limbs)
    }

    /// Reconstructs the full key of a leaf from the path walked to reach it and its stored
    /// suffix: the first `depth` path bits are taken from `path_key`, the rest from `suffix`.
    pub fn join_prefix(path_key: &TreeKey, depth: usize, suffix: TreeKey) -> TreeKey {
        let mut key = suffix;
        for d in (0..depth).rev() {
            key = key.with_path_bit(path_key.path_bit(d), d);
        }
        key
    }

    /// Converts the key to a 256-bit scalar.
    pub fn to_scalar(&self) -> BigUint {
        scalar::limbs_to_scalar(&self.0)
    }

    /// Creates a key from a 256-bit scalar.
    ///
    /// # Errors
    /// Returns [SmtError::InvalidInput] if the scalar does not fit in 256 bits.
    pub fn from_scalar(value: &BigUint) -> Result<Self, SmtError> {
        Ok(Self(scalar::scalar_to_limbs(value)?))
    }

    /// Serializes the key as 32 bytes, limbs little-endian in limb order.
    pub fn to_bytes(&self) -> [u8; Self::SERIALIZED_SIZE] {
        let mut bytes = [0u8; Self::SERIALIZED_SIZE];
        for (chunk, limb) in bytes.chunks_exact_mut(8).zip(&self.0) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        bytes
    }

    /// Deserializes a key from its 32-byte form.
    ///
    /// # Errors
    /// Returns [SmtError::InvalidInput] if `bytes` is not exactly 32 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SmtError> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(SmtError::InvalidInput(format!(
                "expected {} key bytes, found {}",
                Self::SERIALIZED_SIZE,
                bytes.len()
            )));
        }
        let mut limbs = [0u64; KEY_LIMBS];
        for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
            *limb = u64::from_le_bytes(chunk.try_into().expect("chunk is 8 bytes"));
        }
        Ok(Self(limbs))
    }
}

impl fmt::Display for TreeKey {
    /// Prints the key as a 0x-prefixed big-endian hex scalar.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x")?;
        for limb in self.0.iter().rev() {
            write!(f, "{limb:016x}")?;
        }
        Ok(())
    }
}

impl From<[u64; KEY_LIMBS]> for TreeKey {
    fn from(limbs: [u64; KEY_LIMBS]) -> Self {
        Self(limbs)
    }
}

// KEY DERIVATION
// ================================================================================================

/// Derives the tree key for a storage slot of an account, or for any leaf kind when the caller
/// supplies the slot explicitly.
///
/// The hash input is `[a0..a4, 0, 0, 0, s0..s7]`, where `a0..a4` are the address's 32-bit limbs
/// (least significant first) and `s0..s7` the slot's; the domain tag is `[kind, 0, 0, 0]`. The
/// digest's limbs are the key's limbs.
pub fn derive_key(kind: LeafKind, address: &[u8; ADDRESS_BYTES], slot: &[u8; SLOT_BYTES]) -> TreeKey {
    let mut input = [0u64; 16];
    for (i, element) in input[..5].iter_mut().enumerate() {
        *element = be_chunk32(address, i);
    }
    // input[5..8] stays zero
    for (i, element) in input[8..].iter_mut().enumerate() {
        *element = be_chunk32(slot, i);
    }
    TreeKey(hash_with_domain(&input, [kind as u64, 0, 0, 0]))
}

/// Derives the tree key for a non-storage leaf of an account (balance, nonce, code, or code
/// length); the slot limbs are all zero.
pub fn derive_account_key(kind: LeafKind, address: &[u8; ADDRESS_BYTES]) -> TreeKey {
    debug_assert!(kind != LeafKind::Storage, "storage keys need a slot");
    derive_key(kind, address, &ZERO_SLOT)
}

/// Returns the `i`-th 32-bit limb (least significant first) of a big-endian byte string.
fn be_chunk32(bytes: &[u8], i: usize) -> u64 {
    let end = bytes.len() - 4 * i;
    u32::from_be_bytes(bytes[end - 4..end].try_into().expect("4-byte chunk")) as u64
}

// KEY SOURCE
// ================================================================================================

/// Encodes the origin of a tree key as the opaque blob stored in the key-source map:
/// one kind byte, the 20-byte address, the 32-byte slot.
pub fn encode_key_source(
    kind: LeafKind,
    address: &[u8; ADDRESS_BYTES],
    slot: &[u8; SLOT_BYTES],
) -> Vec<u8> {
    let mut blob = Vec::with_capacity(KEY_SOURCE_BYTES);
    blob.push(kind as u8);
    blob.extend_from_slice(address);
    blob.extend_from_slice(slot);
    blob
}

/// Decodes a key-source blob back into its kind, address, and slot.
///
/// # Errors
/// Returns [SmtError::InvalidInput] if the blob has the wrong length or an unknown kind byte.
pub fn decode_key_source(
    blob: &[u8],
) -> Result<(LeafKind, [u8; ADDRESS_BYTES], [u8; SLOT_BYTES]), SmtError> {
    if blob.len() != KEY_SOURCE_BYTES {
        return Err(SmtError::InvalidInput(format!(
            "expected {KEY_SOURCE_BYTES} key-source bytes, found {}",
            blob.len()
        )));
    }
    let kind = LeafKind::from_byte(blob[0])?;
    let address: [u8; ADDRESS_BYTES] =
        blob[1..1 + ADDRESS_BYTES].try_into().expect("length checked above");
    let slot: [u8; SLOT_BYTES] =
        blob[1 + ADDRESS_BYTES..].try_into().expect("length checked above");
    Ok((kind, address, slot))
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    const ADDRESS: [u8; ADDRESS_BYTES] = [
        0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
        0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
    ];

    #[test]
    fn path_bit_interleaves_limbs() {
        // bit i of the path is bit i/4 of limb i%4
        assert_eq!(TreeKey::new([1, 0, 0, 0]).path_bit(0), 1);
        assert_eq!(TreeKey::new([0, 1, 0, 0]).path_bit(1), 1);
        assert_eq!(TreeKey::new([0, 0, 1, 0]).path_bit(2), 1);
        assert_eq!(TreeKey::new([0, 0, 0, 1]).path_bit(3), 1);
        assert_eq!(TreeKey::new([2, 0, 0, 0]).path_bit(4), 1);
        assert_eq!(TreeKey::new([0, 0, 0, 1 << 63]).path_bit(255), 1);

        let key = TreeKey::new([2, 0, 0, 0]);
        for depth in (0..KEY_BITS).filter(|d| *d != 4) {
            assert_eq!(key.path_bit(depth), 0);
        }
    }

    #[test]
    fn path_bytes_follow_path_order() {
        let key = TreeKey::new([1, 1, 0, 0]);
        let bytes = key.path_bytes();
        // path bits 0 and 1 set => the two most significant bits of the first byte
        assert_eq!(bytes[0], 0b1100_0000);
        assert_eq!(&bytes[1..], &[0; 31]);
    }

    #[test]
    fn strip_then_join_round_trips() {
        let key = TreeKey::new([
            0x0123_4567_89ab_cdef,
            0xfedc_ba98_7654_3210,
            0x0f1e_2d3c_4b5a_6978,
            0x1122_3344_5566_7788,
        ]);
        for depth in [0, 1, 3, 4, 17, 64, 255, 256] {
            let suffix = key.strip_path_bits(depth);
            assert_eq!(TreeKey::join_prefix(&key, depth, suffix), key);
        }
    }

    #[test]
    fn with_path_bit_inverts_one_strip_step() {
        let key = TreeKey::new([0xdead_beef, 0xcafe_f00d, 0x1234, 0x5678]);
        for depth in 0..64 {
            let deeper = key.strip_path_bits(depth + 1);
            let restored = deeper.with_path_bit(key.path_bit(depth), depth);
            assert_eq!(restored, key.strip_path_bits(depth));
        }
    }

    #[test]
    fn full_strip_yields_zero_suffix() {
        let key = TreeKey::new([u64::MAX; 4]);
        assert!(key.strip_path_bits(KEY_BITS).is_zero());
    }

    #[test]
    fn derived_keys_are_kind_separated() {
        let balance = derive_account_key(LeafKind::Balance, &ADDRESS);
        let nonce = derive_account_key(LeafKind::Nonce, &ADDRESS);
        let code = derive_account_key(LeafKind::Code, &ADDRESS);
        let length = derive_account_key(LeafKind::CodeLength, &ADDRESS);
        assert!(!balance.is_zero());
        assert_ne!(balance, nonce);
        assert_ne!(balance, code);
        assert_ne!(nonce, code);
        assert_ne!(code, length);
    }

    #[test]
    fn derived_keys_are_slot_separated() {
        let mut slot_a = [0u8; SLOT_BYTES];
        slot_a[31] = 1;
        let mut slot_b = [0u8; SLOT_BYTES];
        slot_b[31] = 2;
        let key_a = derive_key(LeafKind::Storage, &ADDRESS, &slot_a);
        let key_b = derive_key(LeafKind::Storage, &ADDRESS, &slot_b);
        assert_ne!(key_a, key_b);
    }

    #[test]
    fn derived_keys_are_address_separated() {
        let mut other = ADDRESS;
        other[19] ^= 0xff;
        assert_ne!(
            derive_account_key(LeafKind::Balance, &ADDRESS),
            derive_account_key(LeafKind::Balance, &other),
        );
    }

    #[test]
    fn key_bytes_round_trip() {
        let key = TreeKey::new([5, 6, 7, 8]);
        assert_eq!(TreeKey::from_bytes(&key.to_bytes()).unwrap(), key);
        assert_matches!(TreeKey::from_bytes(&[0u8; 31]), Err(SmtError::InvalidInput(_)));
    }

    #[test]
    fn key_scalar_round_trip() {
        let key = TreeKey::new([0xdead_beef, 0, 1, u64::MAX]);
        assert_eq!(TreeKey::from_scalar(&key.to_scalar()).unwrap(), key);
        assert_eq!(
            format!("{}", TreeKey::new([0x2a, 0, 0, 0])),
            "0x000000000000000000000000000000000000000000000000000000000000002a",
        );
    }

    #[test]
    fn key_source_round_trip() {
        let mut slot = [0u8; SLOT_BYTES];
        slot[0] = 0x11;
        slot[31] = 0x99;
        let blob = encode_key_source(LeafKind::Storage, &ADDRESS, &slot);
        assert_eq!(blob.len(), KEY_SOURCE_BYTES);
        let (kind, address, decoded_slot) = decode_key_source(&blob).unwrap();
        assert_eq!(kind, LeafKind::Storage);
        assert_eq!(address, ADDRESS);
        assert_eq!(decoded_slot, slot);
    }

    #[test]
    fn key_source_rejects_bad_input() {
        assert_matches!(decode_key_source(&[0u8; 10]), Err(SmtError::InvalidInput(_)));
        let mut blob = encode_key_source(LeafKind::Nonce, &ADDRESS, &[0; SLOT_BYTES]);
        blob[0] = 9;
        assert_matches!(decode_key_source(&blob), Err(SmtError::InvalidInput(_)));
    }
}
