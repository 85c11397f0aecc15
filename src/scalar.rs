//! Conversions between 256-bit scalars and the limb layouts used by the tree.
//!
//! All tree-visible quantities decompose into one of two layouts:
//! - four 64-bit limbs in little-endian limb order (keys, node hashes), or
//! - eight 32-bit lanes, each stored in the low half of a 64-bit word (leaf values).
//!
//! The lane layout feeds the hash permutation directly and must stay bit-exact.

use alloc::string::ToString;

use num_bigint::BigUint;

use crate::{KEY_LIMBS, VALUE_LANES, error::SmtError};

/// Maximum width of a tree scalar in bits.
const SCALAR_BITS: u64 = 256;

/// Splits a 256-bit scalar into four 64-bit limbs, least-significant limb first.
///
/// # Errors
/// Returns [SmtError::InvalidInput] if the scalar does not fit in 256 bits.
pub fn scalar_to_limbs(value: &BigUint) -> Result<[u64; KEY_LIMBS], SmtError> {
    if value.bits() > SCALAR_BITS {
        return Err(SmtError::InvalidInput("scalar exceeds 256 bits".to_string()));
    }
    let digits = value.to_u64_digits();
    let mut limbs = [0u64; KEY_LIMBS];
    limbs[..digits.len()].copy_from_slice(&digits);
    Ok(limbs)
}

/// Splits a 256-bit scalar into eight 32-bit lanes, least-significant lane first. Each lane
/// occupies the low half of a 64-bit word so that it is a canonical field element.
///
/// # Errors
/// Returns [SmtError::InvalidInput] if the scalar does not fit in 256 bits.
pub fn scalar_to_lanes(value: &BigUint) -> Result<[u64; VALUE_LANES], SmtError> {
    let limbs = scalar_to_limbs(value)?;
    Ok(limbs_to_lanes(&limbs))
}

/// Reassembles a scalar from four little-endian 64-bit limbs.
pub fn limbs_to_scalar(limbs: &[u64; KEY_LIMBS]) -> BigUint {
    let mut bytes = [0u8; KEY_LIMBS * 8];
    for (chunk, limb) in bytes.chunks_exact_mut(8).zip(limbs) {
        chunk.copy_from_slice(&limb.to_le_bytes());
    }
    BigUint::from_bytes_le(&bytes)
}

/// Reassembles a scalar from eight 32-bit lanes.
///
/// # Errors
/// Returns [SmtError::InvalidInput] if any lane exceeds 32 bits.
pub fn lanes_to_scalar(lanes: &[u64; VALUE_LANES]) -> Result<BigUint, SmtError> {
    Ok(limbs_to_scalar(&lanes_to_limbs(lanes)?))
}

/// Packs eight 32-bit lanes back into four 64-bit limbs.
///
/// # Errors
/// Returns [SmtError::InvalidInput] if any lane exceeds 32 bits.
pub fn lanes_to_limbs(lanes: &[u64; VALUE_LANES]) -> Result<[u64; KEY_LIMBS], SmtError> {
    if lanes.iter().any(|lane| *lane > u32::MAX as u64) {
        return Err(SmtError::InvalidInput("value lane exceeds 32 bits".to_string()));
    }
    let mut limbs = [0u64; KEY_LIMBS];
    for (i, limb) in limbs.iter_mut().enumerate() {
        *limb = lanes[2 * i] | (lanes[2 * i + 1] << 32);
    }
    Ok(limbs)
}

/// Splits four 64-bit limbs into eight 32-bit lanes.
pub fn limbs_to_lanes(limbs: &[u64; KEY_LIMBS]) -> [u64; VALUE_LANES] {
    let mut lanes = [0u64; VALUE_LANES];
    for (i, limb) in limbs.iter().enumerate() {
        lanes[2 * i] = limb & u32::MAX as u64;
        lanes[2 * i + 1] = limb >> 32;
    }
    lanes
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use num_bigint::BigUint;
    use num_traits::One;

    use super::*;
    use crate::error::SmtError;

    #[test]
    fn limb_round_trip() {
        let value = BigUint::parse_bytes(b"112233445566778899aabbccddeeff00", 16).unwrap();
        let limbs = scalar_to_limbs(&value).unwrap();
        assert_eq!(limbs_to_scalar(&limbs), value);
    }

    #[test]
    fn lane_round_trip() {
        let value = BigUint::parse_bytes(b"0123456789abcdef0123456789abcdef", 16).unwrap();
        let lanes = scalar_to_lanes(&value).unwrap();
        assert_eq!(lanes_to_scalar(&lanes).unwrap(), value);
    }

    #[test]
    fn lane_layout_is_32_bit() {
        // one limb of all ones must split into two saturated 32-bit lanes
        let lanes = scalar_to_lanes(&BigUint::from(u64::MAX)).unwrap();
        assert_eq!(lanes[0], u32::MAX as u64);
        assert_eq!(lanes[1], u32::MAX as u64);
        assert_eq!(&lanes[2..], &[0; 6]);
    }

    #[test]
    fn field_modulus_minus_one_round_trips() {
        // p - 1 for the Goldilocks modulus p = 2^64 - 2^32 + 1
        let value = BigUint::from(0xffff_ffff_0000_0000_u64);
        let lanes = scalar_to_lanes(&value).unwrap();
        assert_eq!(lanes_to_scalar(&lanes).unwrap(), value);
    }

    #[test]
    fn max_scalar_round_trips() {
        let value = (BigUint::one() << 256u32) - BigUint::one();
        let limbs = scalar_to_limbs(&value).unwrap();
        assert_eq!(limbs, [u64::MAX; 4]);
        assert_eq!(limbs_to_scalar(&limbs), value);
    }

    #[test]
    fn oversized_scalar_is_rejected() {
        let value = BigUint::one() << 256u32;
        assert_matches!(scalar_to_limbs(&value), Err(SmtError::InvalidInput(_)));
        assert_matches!(scalar_to_lanes(&value), Err(SmtError::InvalidInput(_)));
    }

    #[test]
    fn oversized_lane_is_rejected() {
        let mut lanes = [0u64; 8];
        lanes[3] = 1 << 32;
        assert_matches!(lanes_to_scalar(&lanes), Err(SmtError::InvalidInput(_)));
    }
}
