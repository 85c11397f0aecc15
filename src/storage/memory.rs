use alloc::vec::Vec;
use std::sync::RwLock;

use super::{NodeStorage, StorageError, resize_code_hash};
use crate::{Map, hash::keccak256, key::TreeKey, node::NodeRecord};

// MEMORY STORAGE
// ================================================================================================

/// In-memory storage for the state tree, implementing the [NodeStorage] trait.
///
/// Every map is guarded by its own `std::sync::RwLock`, so readers may coexist with one writer
/// at store granularity. This is the reference implementation: it backs tests and short-lived
/// trees, and anchors the semantics the persistent backend must match.
///
/// The batching surface is a no-op here; a cancelled or failed bulk operation can leave
/// partial state behind (callers must treat the store as indeterminate in that case).
#[derive(Debug)]
pub struct MemoryStorage {
    nodes: RwLock<Map<TreeKey, NodeRecord>>,
    key_sources: RwLock<Map<TreeKey, Vec<u8>>>,
    hash_keys: RwLock<Map<TreeKey, TreeKey>>,
    code: RwLock<Map<[u8; 32], Vec<u8>>>,
    last_root: RwLock<TreeKey>,
    depth: RwLock<u8>,
}

impl MemoryStorage {
    /// Creates a new, empty in-memory store with a zero root.
    pub fn new() -> Self {
        Self {
            nodes: RwLock::new(Map::new()),
            key_sources: RwLock::new(Map::new()),
            hash_keys: RwLock::new(Map::new()),
            code: RwLock::new(Map::new()),
            last_root: RwLock::new(TreeKey::default()),
            depth: RwLock::new(0),
        }
    }

    /// Returns the number of node records currently stored (including value preimages).
    pub fn node_count(&self) -> Result<usize, StorageError> {
        Ok(self.nodes.read()?.len())
    }

    /// Returns true if no node records are stored.
    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.nodes.read()?.is_empty())
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MemoryStorage {
    fn clone(&self) -> Self {
        MemoryStorage {
            nodes: RwLock::new(self.nodes.read().expect("nodes lock poisoned in clone").clone()),
            key_sources: RwLock::new(
                self.key_sources.read().expect("key-sources lock poisoned in clone").clone(),
            ),
            hash_keys: RwLock::new(
                self.hash_keys.read().expect("hash-keys lock poisoned in clone").clone(),
            ),
            code: RwLock::new(self.code.read().expect("code lock poisoned in clone").clone()),
            last_root: RwLock::new(
                *self.last_root.read().expect("last-root lock poisoned in clone"),
            ),
            depth: RwLock::new(*self.depth.read().expect("depth lock poisoned in clone")),
        }
    }
}

impl NodeStorage for MemoryStorage {
    fn get_node(&self, hash: &TreeKey) -> Result<Option<NodeRecord>, StorageError> {
        Ok(self.nodes.read()?.get(hash).copied())
    }

    fn put_node(&self, hash: &TreeKey, record: &NodeRecord) -> Result<(), StorageError> {
        self.nodes.write()?.insert(*hash, *record);
        Ok(())
    }

    fn delete_node(&self, hash: &TreeKey) -> Result<(), StorageError> {
        self.nodes.write()?.remove(hash);
        Ok(())
    }

    fn get_key_source(&self, key: &TreeKey) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.key_sources.read()?.get(key).cloned())
    }

    fn put_key_source(&self, key: &TreeKey, source: &[u8]) -> Result<(), StorageError> {
        self.key_sources.write()?.insert(*key, source.to_vec());
        Ok(())
    }

    fn delete_key_source(&self, key: &TreeKey) -> Result<(), StorageError> {
        self.key_sources.write()?.remove(key);
        Ok(())
    }

    fn get_hash_key(&self, hash: &TreeKey) -> Result<Option<TreeKey>, StorageError> {
        Ok(self.hash_keys.read()?.get(hash).copied())
    }

    fn put_hash_key(&self, hash: &TreeKey, key: &TreeKey) -> Result<(), StorageError> {
        self.hash_keys.write()?.insert(*hash, *key);
        Ok(())
    }

    fn delete_hash_key(&self, hash: &TreeKey) -> Result<(), StorageError> {
        self.hash_keys.write()?.remove(hash);
        Ok(())
    }

    fn get_code(&self, code_hash: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let key = resize_code_hash(code_hash)?;
        Ok(self.code.read()?.get(&key).cloned())
    }

    fn put_code(&self, code: &[u8]) -> Result<(), StorageError> {
        self.code.write()?.insert(keccak256(code), code.to_vec());
        Ok(())
    }

    fn get_last_root(&self) -> Result<TreeKey, StorageError> {
        Ok(*self.last_root.read()?)
    }

    fn set_last_root(&self, root: &TreeKey) -> Result<(), StorageError> {
        *self.last_root.write()? = *root;
        Ok(())
    }

    fn get_depth(&self) -> Result<u8, StorageError> {
        Ok(*self.depth.read()?)
    }

    fn set_depth(&self, depth: u8) -> Result<(), StorageError> {
        *self.depth.write()? = depth;
        Ok(())
    }

    fn open_batch(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn commit_batch(&self) -> Result<(), StorageError> {
        Ok(())
    }

    fn rollback_batch(&self) -> Result<(), StorageError> {
        Ok(())
    }
}

// TESTS
// ================================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Node;

    #[test]
    fn node_round_trip() {
        let storage = MemoryStorage::new();
        let node = Node::branch(TreeKey::new([1, 0, 0, 0]), TreeKey::new([2, 0, 0, 0]));
        let hash = node.hash();
        let record = node.to_record();

        assert!(storage.get_node(&hash).unwrap().is_none());
        storage.put_node(&hash, &record).unwrap();
        assert_eq!(storage.get_node(&hash).unwrap(), Some(record));

        // content-addressed writes are idempotent
        storage.put_node(&hash, &record).unwrap();
        assert_eq!(storage.node_count().unwrap(), 1);

        storage.delete_node(&hash).unwrap();
        assert!(storage.get_node(&hash).unwrap().is_none());
    }

    #[test]
    fn code_round_trip_with_short_hash() {
        let storage = MemoryStorage::new();
        let code = vec![0x60, 0x01, 0x60, 0x02];
        storage.put_code(&code).unwrap();

        let hash = keccak256(&code);
        assert_eq!(storage.get_code(&hash).unwrap(), Some(code.clone()));

        // a hash with leading zeroes stripped resolves after zero-prefixing
        let first_nonzero = hash.iter().position(|b| *b != 0).unwrap_or(31);
        assert_eq!(storage.get_code(&hash[first_nonzero..]).unwrap(), Some(code));
    }

    #[test]
    fn oversized_code_hash_is_rejected() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.get_code(&[0u8; 33]),
            Err(StorageError::BadKeyLen { expected: 32, found: 33 })
        ));
    }

    #[test]
    fn metadata_round_trip() {
        let storage = MemoryStorage::new();
        assert!(storage.get_last_root().unwrap().is_zero());
        assert_eq!(storage.get_depth().unwrap(), 0);

        let root = TreeKey::new([1, 2, 3, 4]);
        storage.set_last_root(&root).unwrap();
        storage.set_depth(17).unwrap();
        assert_eq!(storage.get_last_root().unwrap(), root);
        assert_eq!(storage.get_depth().unwrap(), 17);
    }
}
