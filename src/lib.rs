#![no_std]

#[macro_use]
extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod error;
pub mod hash;
pub mod key;
pub mod node;
pub mod scalar;
#[cfg(feature = "std")]
pub mod storage;
#[cfg(feature = "std")]
pub mod tree;

// RE-EXPORTS
// ================================================================================================

pub use winter_math::{FieldElement, StarkField, fields::f64::BaseElement as Felt};

pub use error::SmtError;
pub use key::{LeafKind, TreeKey};
pub use node::{LeafValue, Node, NodeRecord};
#[cfg(feature = "std")]
pub use storage::{MemoryStorage, NodeStorage, StorageError};
#[cfg(feature = "rocksdb")]
pub use storage::{RocksDbConfig, RocksDbStorage};
#[cfg(feature = "std")]
pub use tree::{AccountState, CancelToken, Smt};

// TYPE ALIASES
// ================================================================================================

/// An alias for a key-value map.
///
/// By default, this is an alias for the [`alloc::collections::BTreeMap`], however, when the
/// `hashmaps` feature is enabled, this is an alias for the `hashbrown`'s `HashMap`.
#[cfg(feature = "hashmaps")]
pub type Map<K, V> = hashbrown::HashMap<K, V>;

#[cfg(feature = "hashmaps")]
pub use hashbrown::hash_map::Entry as MapEntry;

/// An alias for a key-value map.
///
/// By default, this is an alias for the [`alloc::collections::BTreeMap`], however, when the
/// `hashmaps` feature is enabled, this is an alias for the `hashbrown`'s `HashMap`.
#[cfg(not(feature = "hashmaps"))]
pub type Map<K, V> = alloc::collections::BTreeMap<K, V>;

#[cfg(not(feature = "hashmaps"))]
pub use alloc::collections::btree_map::Entry as MapEntry;

// CONSTANTS
// ================================================================================================

/// Number of 64-bit limbs in a tree key or node hash.
pub const KEY_LIMBS: usize = 4;

/// Number of 32-bit value lanes in a leaf value.
pub const VALUE_LANES: usize = 8;

/// Number of 64-bit limbs in a stored node record (payload plus capacity).
pub const RECORD_LIMBS: usize = 12;

/// Number of bits in a tree key, and the maximum depth of the tree.
pub const KEY_BITS: usize = 256;

/// Field element representing ZERO in the Goldilocks field.
pub const ZERO: Felt = Felt::ZERO;

/// Field element representing ONE in the Goldilocks field.
pub const ONE: Felt = Felt::ONE;

/// The hash of the empty subtree, and the root of an empty tree.
pub const EMPTY_ROOT: TreeKey = TreeKey::new([0; KEY_LIMBS]);
