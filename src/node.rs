//! Node model: branch and leaf nodes, their stored records, and the hashing rules.
//!
//! A stored node is twelve 64-bit limbs: eight payload limbs followed by the four capacity
//! limbs the payload was hashed under. The capacity limbs make records self-describing — a
//! leaf record carries [LEAF_DOMAIN](crate::hash::LEAF_DOMAIN), a branch record
//! [BRANCH_DOMAIN](crate::hash::BRANCH_DOMAIN) — and rehashing a record always reproduces its
//! content address.
//!
//! Leaf value preimages are stored in the same table: the 8-lane value under its value hash,
//! with the branch domain as capacity. The engine tells them apart from branches by context
//! (it only ever looks a value hash up through a leaf).

use num_bigint::BigUint;

use crate::{
    KEY_LIMBS, RECORD_LIMBS, VALUE_LANES,
    error::SmtError,
    hash::{BRANCH_DOMAIN, LEAF_DOMAIN, hash_with_domain},
    key::TreeKey,
    scalar,
};

// LEAF VALUE
// ================================================================================================

/// A 256-bit leaf value as eight 32-bit lanes. The all-zero value is the sentinel for "no
/// entry": inserting it deletes the key, and reading a missing key returns it.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LeafValue(pub [u64; VALUE_LANES]);

impl LeafValue {
    /// The zero value.
    pub const ZERO: LeafValue = LeafValue([0; VALUE_LANES]);

    /// Creates a leaf value from a 256-bit scalar.
    ///
    /// # Errors
    /// Returns [SmtError::InvalidInput] if the scalar does not fit in 256 bits.
    pub fn from_scalar(value: &BigUint) -> Result<Self, SmtError> {
        Ok(Self(scalar::scalar_to_lanes(value)?))
    }

    /// Converts the leaf value back to a scalar.
    pub fn to_scalar(&self) -> BigUint {
        scalar::lanes_to_scalar(&self.0).expect("stored lanes are 32-bit by construction")
    }

    /// Returns true if this is the zero value.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; VALUE_LANES]
    }

    /// Returns the value hash stored inside the owning leaf: the lanes hashed under the branch
    /// domain (domain-separated from the leaf hash itself).
    pub fn hash(&self) -> TreeKey {
        TreeKey(hash_with_domain(&self.0, BRANCH_DOMAIN))
    }
}

// NODE RECORD
// ================================================================================================

/// The 12-limb stored form of a node: 8 payload limbs followed by the 4 capacity limbs.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NodeRecord(pub [u64; RECORD_LIMBS]);

impl NodeRecord {
    /// Serialized size of a record in bytes.
    pub const SERIALIZED_SIZE: usize = RECORD_LIMBS * 8;

    /// Builds the record that stores a leaf value preimage under its value hash.
    pub fn for_value(value: &LeafValue) -> Self {
        let mut limbs = [0u64; RECORD_LIMBS];
        limbs[..VALUE_LANES].copy_from_slice(&value.0);
        Self(limbs)
    }

    /// Returns the 8 payload limbs.
    pub fn payload(&self) -> [u64; 8] {
        self.0[..8].try_into().expect("record has 12 limbs")
    }

    /// Returns the 4 capacity limbs.
    pub fn capacity(&self) -> [u64; KEY_LIMBS] {
        self.0[8..].try_into().expect("record has 12 limbs")
    }

    /// Returns true if the capacity limbs mark this record as a leaf.
    pub fn is_leaf(&self) -> bool {
        self.capacity() == LEAF_DOMAIN
    }

    /// Reads the record's payload as a leaf value preimage.
    pub fn value(&self) -> Result<LeafValue, SmtError> {
        let lanes: [u64; VALUE_LANES] = self.payload();
        // reject corrupted records whose lanes cannot have come from a 256-bit scalar
        scalar::lanes_to_scalar(&lanes)?;
        Ok(LeafValue(lanes))
    }

    /// Recomputes the record's content address.
    pub fn hash(&self) -> TreeKey {
        TreeKey(hash_with_domain(&self.payload(), self.capacity()))
    }

    /// Serializes the record as 96 bytes, limbs little-endian in limb order.
    pub fn to_bytes(&self) -> [u8; Self::SERIALIZED_SIZE] {
        let mut bytes = [0u8; Self::SERIALIZED_SIZE];
        for (chunk, limb) in bytes.chunks_exact_mut(8).zip(&self.0) {
            chunk.copy_from_slice(&limb.to_le_bytes());
        }
        bytes
    }

    /// Deserializes a record from its 96-byte form.
    ///
    /// # Errors
    /// Returns [SmtError::InvalidInput] if `bytes` is not exactly 96 bytes long.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SmtError> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return Err(SmtError::InvalidInput(format!(
                "expected {} record bytes, found {}",
                Self::SERIALIZED_SIZE,
                bytes.len()
            )));
        }
        let mut limbs = [0u64; RECORD_LIMBS];
        for (limb, chunk) in limbs.iter_mut().zip(bytes.chunks_exact(8)) {
            *limb = u64::from_le_bytes(chunk.try_into().expect("chunk is 8 bytes"));
        }
        Ok(Self(limbs))
    }
}

// NODE
// ================================================================================================

/// A materialized tree node. The empty node is not represented here; it is the zero hash in the
/// parent's child slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Node {
    /// An internal node holding the hashes of its two subtrees. Either side may be the zero
    /// hash, but never both.
    Branch {
        /// Hash of the left (path bit 0) subtree.
        left: TreeKey,
        /// Hash of the right (path bit 1) subtree.
        right: TreeKey,
    },
    /// A terminal node holding the key suffix below its depth and the hash of its value.
    Leaf {
        /// The key bits below the leaf's depth, reassembled into limbs.
        rem_key: TreeKey,
        /// Hash of the 8-lane value, under which the preimage is stored.
        value_hash: TreeKey,
    },
}

impl Node {
    /// Creates a branch node.
    pub const fn branch(left: TreeKey, right: TreeKey) -> Self {
        Self::Branch { left, right }
    }

    /// Creates a leaf node.
    pub const fn leaf(rem_key: TreeKey, value_hash: TreeKey) -> Self {
        Self::Leaf { rem_key, value_hash }
    }

    /// Decodes a node from its stored record, dispatching on the capacity limbs.
    pub fn from_record(record: &NodeRecord) -> Self {
        let payload = record.payload();
        let head = TreeKey::new(payload[..KEY_LIMBS].try_into().expect("payload has 8 limbs"));
        let tail = TreeKey::new(payload[KEY_LIMBS..].try_into().expect("payload has 8 limbs"));
        if record.is_leaf() {
            Self::Leaf { rem_key: head, value_hash: tail }
        } else {
            Self::Branch { left: head, right: tail }
        }
    }

    /// Encodes the node as its stored record.
    pub fn to_record(&self) -> NodeRecord {
        let (head, tail, capacity) = match self {
            Self::Branch { left, right } => (left, right, BRANCH_DOMAIN),
            Self::Leaf { rem_key, value_hash } => (rem_key, value_hash, LEAF_DOMAIN),
        };
        let mut limbs = [0u64; RECORD_LIMBS];
        limbs[..KEY_LIMBS].copy_from_slice(head.limbs());
        limbs[KEY_LIMBS..2 * KEY_LIMBS].copy_from_slice(tail.limbs());
        limbs[2 * KEY_LIMBS..].copy_from_slice(&capacity);
        NodeRecord(limbs)
    }

    /// Returns the node's hash: the payload limbs hashed under the node's domain.
    pub fn hash(&self) -> TreeKey {
        self.to_record().hash()
    }

    /// Returns the child hash on the given side of a branch.
    ///
    /// # Panics
    /// Panics if called on a leaf; callers dispatch on the variant first.
    pub fn child(&self, bit: u8) -> TreeKey {
        match self {
            Self::Branch { left, right } => {
                if bit == 0 {
                    *left
                } else {
                    *right
                }
            },
            Self::Leaf { .. } => panic!("leaf nodes have no children"),
        }
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use num_bigint::BigUint;

    use super::*;
    use crate::hash::hash_with_domain;

    #[test]
    fn value_scalar_round_trip() {
        let scalar = BigUint::from(0x2a_u64);
        let value = LeafValue::from_scalar(&scalar).unwrap();
        assert_eq!(value.to_scalar(), scalar);
        assert!(!value.is_zero());
        assert!(LeafValue::ZERO.is_zero());
    }

    #[test]
    fn leaf_hash_rule() {
        let rem_key = TreeKey::new([1, 2, 3, 4]);
        let value = LeafValue::from_scalar(&BigUint::from(100u32)).unwrap();
        let value_hash = value.hash();

        let leaf = Node::leaf(rem_key, value_hash);
        let mut payload = [0u64; 8];
        payload[..4].copy_from_slice(rem_key.limbs());
        payload[4..].copy_from_slice(value_hash.limbs());
        assert_eq!(leaf.hash().0, hash_with_domain(&payload, crate::hash::LEAF_DOMAIN));

        // the value hash is domain-separated from the leaf hash
        assert_eq!(value_hash.0, hash_with_domain(&value.0, crate::hash::BRANCH_DOMAIN));
    }

    #[test]
    fn branch_hash_rule() {
        let left = TreeKey::new([10, 20, 30, 40]);
        let right = TreeKey::new([50, 60, 70, 80]);
        let branch = Node::branch(left, right);
        let mut payload = [0u64; 8];
        payload[..4].copy_from_slice(left.limbs());
        payload[4..].copy_from_slice(right.limbs());
        assert_eq!(branch.hash().0, hash_with_domain(&payload, crate::hash::BRANCH_DOMAIN));
    }

    #[test]
    fn record_round_trip_preserves_variant() {
        let leaf = Node::leaf(TreeKey::new([1, 0, 0, 0]), TreeKey::new([2, 0, 0, 0]));
        let branch = Node::branch(TreeKey::new([3, 0, 0, 0]), TreeKey::new([4, 0, 0, 0]));

        let leaf_record = leaf.to_record();
        assert!(leaf_record.is_leaf());
        assert_eq!(Node::from_record(&leaf_record), leaf);

        let branch_record = branch.to_record();
        assert!(!branch_record.is_leaf());
        assert_eq!(Node::from_record(&branch_record), branch);
    }

    #[test]
    fn record_bytes_round_trip() {
        let record = Node::branch(TreeKey::new([9, 8, 7, 6]), TreeKey::new([5, 4, 3, 2])).to_record();
        let bytes = record.to_bytes();
        assert_eq!(bytes.len(), NodeRecord::SERIALIZED_SIZE);
        assert_eq!(NodeRecord::from_bytes(&bytes).unwrap(), record);
        assert_matches!(NodeRecord::from_bytes(&bytes[..95]), Err(SmtError::InvalidInput(_)));
    }

    #[test]
    fn value_record_reads_back() {
        let value = LeafValue::from_scalar(&BigUint::from(u128::MAX)).unwrap();
        let record = NodeRecord::for_value(&value);
        assert!(!record.is_leaf());
        assert_eq!(record.value().unwrap(), value);
        assert_eq!(record.hash(), value.hash());
    }

    #[test]
    fn corrupt_value_record_is_rejected() {
        let mut record = NodeRecord::for_value(&LeafValue::ZERO);
        record.0[0] = 1 << 32;
        assert_matches!(record.value(), Err(SmtError::InvalidInput(_)));
    }
}
