//! Storage abstraction for the state tree.
//!
//! The engine reads and writes through [NodeStorage] only. The trait covers the
//! content-addressed node map, the auxiliary key-source / hash-key / code maps, the last-root
//! and depth metadata, and an optional batching surface. Two implementations ship with the
//! crate: [MemoryStorage] as the in-memory reference (and test backend), and
//! [RocksDbStorage](crate::storage::RocksDbStorage) for persistent deployments behind the
//! `rocksdb` feature.

use alloc::vec::Vec;
use core::fmt;

use crate::{key::TreeKey, node::NodeRecord};

mod error;
pub use error::StorageError;

mod memory;
pub use memory::MemoryStorage;

#[cfg(feature = "rocksdb")]
mod rocksdb;
#[cfg(feature = "rocksdb")]
pub use rocksdb::{RocksDbConfig, RocksDbStorage};

// NODE STORAGE TRAIT
// ================================================================================================

/// Storage backend for the state tree.
///
/// Nodes are content-addressed: once written under their hash they are immutable, and writing
/// the same record again is a no-op. Superseded nodes become unreferenced but the engine never
/// requires their removal.
///
/// The batching surface is optional: `open_batch`/`commit_batch`/`rollback_batch` may be no-ops
/// (as in [MemoryStorage]), in which case a cancelled or failed bulk operation can leave
/// partial state behind and callers must treat the store as indeterminate.
///
/// All methods may fail with [StorageError]; implementations must serialise writes and give
/// each reader a consistent snapshot.
pub trait NodeStorage: fmt::Debug + Send + Sync {
    // NODE MAP
    // --------------------------------------------------------------------------------------------

    /// Retrieves the node record stored under the given hash, or `None` if absent.
    fn get_node(&self, hash: &TreeKey) -> Result<Option<NodeRecord>, StorageError>;

    /// Stores a node record under its hash. Idempotent for identical records.
    fn put_node(&self, hash: &TreeKey, record: &NodeRecord) -> Result<(), StorageError>;

    /// Removes the node record stored under the given hash, if any. The engine tolerates stale
    /// nodes; this exists for external compaction.
    fn delete_node(&self, hash: &TreeKey) -> Result<(), StorageError>;

    // KEY SOURCES
    // --------------------------------------------------------------------------------------------

    /// Retrieves the opaque key-source blob recorded for a tree key.
    fn get_key_source(&self, key: &TreeKey) -> Result<Option<Vec<u8>>, StorageError>;

    /// Records the key-source blob for a tree key, replacing any previous one.
    fn put_key_source(&self, key: &TreeKey, source: &[u8]) -> Result<(), StorageError>;

    /// Removes the key-source blob for a tree key, if any.
    fn delete_key_source(&self, key: &TreeKey) -> Result<(), StorageError>;

    // HASH-KEY MAP
    // --------------------------------------------------------------------------------------------

    /// Retrieves the tree key recorded for a value hash (inverse lookup for witnesses).
    fn get_hash_key(&self, hash: &TreeKey) -> Result<Option<TreeKey>, StorageError>;

    /// Records the tree key a value hash belongs to.
    fn put_hash_key(&self, hash: &TreeKey, key: &TreeKey) -> Result<(), StorageError>;

    /// Removes the hash-key entry for a value hash, if any.
    fn delete_hash_key(&self, hash: &TreeKey) -> Result<(), StorageError>;

    // CODE MAP
    // --------------------------------------------------------------------------------------------

    /// Retrieves contract bytecode by its keccak hash. Hashes shorter than 32 bytes are
    /// zero-prefixed on the left before lookup.
    ///
    /// # Errors
    /// Returns [StorageError::BadKeyLen] if `code_hash` is longer than 32 bytes.
    fn get_code(&self, code_hash: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stores contract bytecode under its keccak hash.
    fn put_code(&self, code: &[u8]) -> Result<(), StorageError>;

    // METADATA
    // --------------------------------------------------------------------------------------------

    /// Retrieves the last committed root. The zero key denotes an empty tree.
    fn get_last_root(&self) -> Result<TreeKey, StorageError>;

    /// Persists the last committed root.
    fn set_last_root(&self, root: &TreeKey) -> Result<(), StorageError>;

    /// Retrieves the maximum leaf depth observed so far.
    fn get_depth(&self) -> Result<u8, StorageError>;

    /// Persists the maximum leaf depth observed so far.
    fn set_depth(&self, depth: u8) -> Result<(), StorageError>;

    // BATCHING
    // --------------------------------------------------------------------------------------------

    /// Starts buffering writes. Reads issued while a batch is open must observe the buffered
    /// writes. A no-op implementation is valid.
    fn open_batch(&self) -> Result<(), StorageError>;

    /// Atomically applies all writes buffered since [Self::open_batch]. A no-op when no batch
    /// is open.
    fn commit_batch(&self) -> Result<(), StorageError>;

    /// Discards all writes buffered since [Self::open_batch]. A no-op when no batch is open.
    fn rollback_batch(&self) -> Result<(), StorageError>;
}

// HELPERS
// ================================================================================================

/// Left-pads a code hash to 32 bytes with zeroes, the canonical form of code map keys.
pub(crate) fn resize_code_hash(code_hash: &[u8]) -> Result<[u8; 32], StorageError> {
    if code_hash.len() > 32 {
        return Err(StorageError::BadKeyLen { expected: 32, found: code_hash.len() });
    }
    let mut resized = [0u8; 32];
    resized[32 - code_hash.len()..].copy_from_slice(code_hash);
    Ok(resized)
}

// BLANKET IMPLEMENTATION
// ================================================================================================

// Allow any pointer to a `NodeStorage` (e.g. `Arc<MemoryStorage>`) to be used as storage.
impl<P, T> NodeStorage for P
where
    P: core::ops::Deref<Target = T> + fmt::Debug + Send + Sync,
    T: NodeStorage + ?Sized,
{
    #[inline]
    fn get_node(&self, hash: &TreeKey) -> Result<Option<NodeRecord>, StorageError> {
        self.deref().get_node(hash)
    }
    #[inline]
    fn put_node(&self, hash: &TreeKey, record: &NodeRecord) -> Result<(), StorageError> {
        self.deref().put_node(hash, record)
    }
    #[inline]
    fn delete_node(&self, hash: &TreeKey) -> Result<(), StorageError> {
        self.deref().delete_node(hash)
    }
    #[inline]
    fn get_key_source(&self, key: &TreeKey) -> Result<Option<Vec<u8>>, StorageError> {
        self.deref().get_key_source(key)
    }
    #[inline]
    fn put_key_source(&self, key: &TreeKey, source: &[u8]) -> Result<(), StorageError> {
        self.deref().put_key_source(key, source)
    }
    #[inline]
    fn delete_key_source(&self, key: &TreeKey) -> Result<(), StorageError> {
        self.deref().delete_key_source(key)
    }
    #[inline]
    fn get_hash_key(&self, hash: &TreeKey) -> Result<Option<TreeKey>, StorageError> {
        self.deref().get_hash_key(hash)
    }
    #[inline]
    fn put_hash_key(&self, hash: &TreeKey, key: &TreeKey) -> Result<(), StorageError> {
        self.deref().put_hash_key(hash, key)
    }
    #[inline]
    fn delete_hash_key(&self, hash: &TreeKey) -> Result<(), StorageError> {
        self.deref().delete_hash_key(hash)
    }
    #[inline]
    fn get_code(&self, code_hash: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.deref().get_code(code_hash)
    }
    #[inline]
    fn put_code(&self, code: &[u8]) -> Result<(), StorageError> {
        self.deref().put_code(code)
    }
    #[inline]
    fn get_last_root(&self) -> Result<TreeKey, StorageError> {
        self.deref().get_last_root()
    }
    #[inline]
    fn set_last_root(&self, root: &TreeKey) -> Result<(), StorageError> {
        self.deref().set_last_root(root)
    }
    #[inline]
    fn get_depth(&self) -> Result<u8, StorageError> {
        self.deref().get_depth()
    }
    #[inline]
    fn set_depth(&self, depth: u8) -> Result<(), StorageError> {
        self.deref().set_depth(depth)
    }
    #[inline]
    fn open_batch(&self) -> Result<(), StorageError> {
        self.deref().open_batch()
    }
    #[inline]
    fn commit_batch(&self) -> Result<(), StorageError> {
        self.deref().commit_batch()
    }
    #[inline]
    fn rollback_batch(&self) -> Result<(), StorageError> {
        self.deref().rollback_batch()
    }
}
