use sha3::Digest as Sha3Digest;

// KECCAK256
// ================================================================================================

/// Returns the Keccak256 hash of the provided bytes.
///
/// Contract bytecode is keyed in the code map by this hash; the tree itself never sees it.
pub fn keccak256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = sha3::Keccak256::new();
    hasher.update(bytes);
    hasher.finalize().into()
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::keccak256;

    #[test]
    fn empty_input_vector() {
        // keccak256("") from the reference specification
        let expected: [u8; 32] = [
            0xc5, 0xd2, 0x46, 0x01, 0x86, 0xf7, 0x23, 0x3c, 0x92, 0x7e, 0x7d, 0xb2, 0xdc, 0xc7,
            0x03, 0xc0, 0xe5, 0x00, 0xb6, 0x53, 0xca, 0x82, 0x27, 0x3b, 0x7b, 0xfa, 0xd8, 0x04,
            0x5d, 0x85, 0xa4, 0x70,
        ];
        assert_eq!(keccak256(&[]), expected);
    }

    #[test]
    fn short_input_vector() {
        // keccak256("abc")
        let expected: [u8; 32] = [
            0x4e, 0x03, 0x65, 0x7a, 0xea, 0x45, 0xa9, 0x4f, 0xc7, 0xd4, 0x7b, 0xa8, 0x26, 0xc8,
            0xd6, 0x67, 0xc0, 0xd1, 0xe6, 0xe3, 0x3a, 0x64, 0xa0, 0x36, 0xec, 0x44, 0xf5, 0x8f,
            0xa1, 0x2d, 0x6c, 0x45,
        ];
        assert_eq!(keccak256(b"abc"), expected);
    }
}
