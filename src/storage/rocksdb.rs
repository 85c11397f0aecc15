use alloc::vec::Vec;
use std::{
    path::PathBuf,
    sync::{Arc, RwLock},
};

use rocksdb::{
    BlockBasedOptions, Cache, ColumnFamilyDescriptor, DB, DBCompactionStyle, DBCompressionType,
    Options, WriteBatch,
};

use super::{NodeStorage, StorageError, resize_code_hash};
use crate::{Map, hash::keccak256, key::TreeKey, node::NodeRecord};

// CONSTANTS
// ================================================================================================

/// Column family holding node records keyed by their 32-byte hash.
const NODES_CF: &str = "nodes";
/// Column family holding key-source blobs keyed by tree key.
const KEY_SOURCE_CF: &str = "keysrc";
/// Column family holding the hash→key inverse map.
const HASH_KEY_CF: &str = "hashkey";
/// Column family holding contract bytecode keyed by keccak hash.
const CODE_CF: &str = "code";
/// Column family holding engine metadata (last root, depth).
const METADATA_CF: &str = "metadata";

/// The key under which the last committed root is stored in `METADATA_CF`.
const LAST_ROOT_KEY: &[u8] = b"last_root";
/// The key under which the maximum observed depth is stored in `METADATA_CF`.
const DEPTH_KEY: &[u8] = b"depth";

// CONFIG
// ================================================================================================

/// Configuration for opening a [RocksDbStorage].
#[derive(Debug, Clone)]
pub struct RocksDbConfig {
    /// Filesystem path of the database directory.
    pub path: PathBuf,
    /// Shared block cache size in bytes.
    pub cache_size: usize,
    /// Limit on open file handles.
    pub max_open_files: i32,
}

impl RocksDbConfig {
    /// Creates a config with default tuning for the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache_size: 256 * 1024 * 1024,
            max_open_files: 512,
        }
    }
}

// PENDING BATCH
// ================================================================================================

/// Buffered writes accumulated between `open_batch` and `commit_batch`. Reads consult this
/// overlay before the database so the engine observes its own uncommitted writes. `None` values
/// mark deletions.
#[derive(Debug, Default)]
struct PendingBatch {
    nodes: Map<TreeKey, Option<NodeRecord>>,
    key_sources: Map<TreeKey, Option<Vec<u8>>>,
    hash_keys: Map<TreeKey, Option<TreeKey>>,
    code: Map<[u8; 32], Vec<u8>>,
    last_root: Option<TreeKey>,
    depth: Option<u8>,
}

// ROCKSDB STORAGE
// ================================================================================================

/// A RocksDB-backed persistent implementation of [NodeStorage].
///
/// Data is organised into column families: `nodes` (content-addressed records), `keysrc`,
/// `hashkey`, `code`, and `metadata`. Writes issued while a batch is open are buffered in an
/// in-memory overlay and flushed as one atomic `WriteBatch` on commit; `rollback_batch` drops
/// the overlay without touching the database.
#[derive(Debug)]
pub struct RocksDbStorage {
    db: Arc<DB>,
    pending: RwLock<Option<PendingBatch>>,
}

impl RocksDbStorage {
    /// Opens or creates a RocksDB database at the configured path.
    ///
    /// Point lookups dominate the workload, so the node column family gets whole-key bloom
    /// filters and a shared LRU block cache; all column families use LZ4 compression and
    /// level-based compaction.
    ///
    /// # Errors
    /// Returns [StorageError::Backend] if the database cannot be opened or configured.
    pub fn open(config: RocksDbConfig) -> Result<Self, StorageError> {
        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.increase_parallelism(rayon::current_num_threads() as i32);
        db_opts.set_max_open_files(config.max_open_files);

        let cache = Cache::new_lru_cache(config.cache_size);

        let mut table_opts = BlockBasedOptions::default();
        table_opts.set_block_cache(&cache);
        table_opts.set_bloom_filter(10.0, false);
        table_opts.set_whole_key_filtering(true);
        table_opts.set_pin_l0_filter_and_index_blocks_in_cache(true);

        let cf_opts = || {
            let mut opts = Options::default();
            opts.set_block_based_table_factory(&table_opts);
            opts.set_compaction_style(DBCompactionStyle::Level);
            opts.set_compression_type(DBCompressionType::Lz4);
            opts
        };

        let mut metadata_opts = Options::default();
        metadata_opts.set_compression_type(DBCompressionType::None);

        let cfs = vec![
            ColumnFamilyDescriptor::new(NODES_CF, cf_opts()),
            ColumnFamilyDescriptor::new(KEY_SOURCE_CF, cf_opts()),
            ColumnFamilyDescriptor::new(HASH_KEY_CF, cf_opts()),
            ColumnFamilyDescriptor::new(CODE_CF, cf_opts()),
            ColumnFamilyDescriptor::new(METADATA_CF, metadata_opts),
        ];

        let db = DB::open_cf_descriptors(&db_opts, config.path, cfs)?;
        Ok(Self { db: Arc::new(db), pending: RwLock::new(None) })
    }

    /// Retrieves a handle to a column family by name.
    fn cf_handle(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::Unsupported(format!("unknown column family `{name}`")))
    }

    /// Reads a raw value, first from the pending overlay via `overlay`, then from the database.
    fn read_through<T>(
        &self,
        cf_name: &str,
        db_key: &[u8],
        overlay: impl FnOnce(&PendingBatch) -> Option<Option<T>>,
        decode: impl FnOnce(Vec<u8>) -> Result<T, StorageError>,
    ) -> Result<Option<T>, StorageError> {
        if let Some(batch) = self.pending.read()?.as_ref()
            && let Some(entry) = overlay(batch)
        {
            return Ok(entry);
        }
        match self.db.get_cf(self.cf_handle(cf_name)?, db_key)? {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn decode_record(bytes: Vec<u8>) -> Result<NodeRecord, StorageError> {
        NodeRecord::from_bytes(&bytes).map_err(|_| StorageError::BadValueLen {
            what: "node record",
            expected: NodeRecord::SERIALIZED_SIZE,
            found: bytes.len(),
        })
    }

    fn decode_key(bytes: Vec<u8>) -> Result<TreeKey, StorageError> {
        TreeKey::from_bytes(&bytes).map_err(|_| StorageError::BadValueLen {
            what: "tree key",
            expected: TreeKey::SERIALIZED_SIZE,
            found: bytes.len(),
        })
    }
}

impl NodeStorage for RocksDbStorage {
    fn get_node(&self, hash: &TreeKey) -> Result<Option<NodeRecord>, StorageError> {
        self.read_through(
            NODES_CF,
            &hash.to_bytes(),
            |batch| batch.nodes.get(hash).copied(),
            Self::decode_record,
        )
    }

    fn put_node(&self, hash: &TreeKey, record: &NodeRecord) -> Result<(), StorageError> {
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.nodes.insert(*hash, Some(*record));
            return Ok(());
        }
        self.db.put_cf(self.cf_handle(NODES_CF)?, hash.to_bytes(), record.to_bytes())?;
        Ok(())
    }

    fn delete_node(&self, hash: &TreeKey) -> Result<(), StorageError> {
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.nodes.insert(*hash, None);
            return Ok(());
        }
        self.db.delete_cf(self.cf_handle(NODES_CF)?, hash.to_bytes())?;
        Ok(())
    }

    fn get_key_source(&self, key: &TreeKey) -> Result<Option<Vec<u8>>, StorageError> {
        self.read_through(
            KEY_SOURCE_CF,
            &key.to_bytes(),
            |batch| batch.key_sources.get(key).cloned(),
            Ok,
        )
    }

    fn put_key_source(&self, key: &TreeKey, source: &[u8]) -> Result<(), StorageError> {
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.key_sources.insert(*key, Some(source.to_vec()));
            return Ok(());
        }
        self.db.put_cf(self.cf_handle(KEY_SOURCE_CF)?, key.to_bytes(), source)?;
        Ok(())
    }

    fn delete_key_source(&self, key: &TreeKey) -> Result<(), StorageError> {
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.key_sources.insert(*key, None);
            return Ok(());
        }
        self.db.delete_cf(self.cf_handle(KEY_SOURCE_CF)?, key.to_bytes())?;
        Ok(())
    }

    fn get_hash_key(&self, hash: &TreeKey) -> Result<Option<TreeKey>, StorageError> {
        self.read_through(
            HASH_KEY_CF,
            &hash.to_bytes(),
            |batch| batch.hash_keys.get(hash).copied(),
            Self::decode_key,
        )
    }

    fn put_hash_key(&self, hash: &TreeKey, key: &TreeKey) -> Result<(), StorageError> {
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.hash_keys.insert(*hash, Some(*key));
            return Ok(());
        }
        self.db.put_cf(self.cf_handle(HASH_KEY_CF)?, hash.to_bytes(), key.to_bytes())?;
        Ok(())
    }

    fn delete_hash_key(&self, hash: &TreeKey) -> Result<(), StorageError> {
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.hash_keys.insert(*hash, None);
            return Ok(());
        }
        self.db.delete_cf(self.cf_handle(HASH_KEY_CF)?, hash.to_bytes())?;
        Ok(())
    }

    fn get_code(&self, code_hash: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        let key = resize_code_hash(code_hash)?;
        self.read_through(CODE_CF, &key, |batch| batch.code.get(&key).cloned().map(Some), Ok)
    }

    fn put_code(&self, code: &[u8]) -> Result<(), StorageError> {
        let key = keccak256(code);
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.code.insert(key, code.to_vec());
            return Ok(());
        }
        self.db.put_cf(self.cf_handle(CODE_CF)?, key, code)?;
        Ok(())
    }

    fn get_last_root(&self) -> Result<TreeKey, StorageError> {
        let root = self.read_through(
            METADATA_CF,
            LAST_ROOT_KEY,
            |batch| batch.last_root.map(Some),
            Self::decode_key,
        )?;
        Ok(root.unwrap_or_default())
    }

    fn set_last_root(&self, root: &TreeKey) -> Result<(), StorageError> {
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.last_root = Some(*root);
            return Ok(());
        }
        self.db.put_cf(self.cf_handle(METADATA_CF)?, LAST_ROOT_KEY, root.to_bytes())?;
        Ok(())
    }

    fn get_depth(&self) -> Result<u8, StorageError> {
        let depth = self.read_through(
            METADATA_CF,
            DEPTH_KEY,
            |batch| batch.depth.map(Some),
            |bytes| {
                if bytes.len() != 1 {
                    return Err(StorageError::BadValueLen {
                        what: "depth",
                        expected: 1,
                        found: bytes.len(),
                    });
                }
                Ok(bytes[0])
            },
        )?;
        Ok(depth.unwrap_or(0))
    }

    fn set_depth(&self, depth: u8) -> Result<(), StorageError> {
        if let Some(batch) = self.pending.write()?.as_mut() {
            batch.depth = Some(depth);
            return Ok(());
        }
        self.db.put_cf(self.cf_handle(METADATA_CF)?, DEPTH_KEY, [depth])?;
        Ok(())
    }

    fn open_batch(&self) -> Result<(), StorageError> {
        let mut pending = self.pending.write()?;
        if pending.is_none() {
            *pending = Some(PendingBatch::default());
        }
        Ok(())
    }

    fn commit_batch(&self) -> Result<(), StorageError> {
        let Some(buffered) = self.pending.write()?.take() else {
            return Ok(());
        };

        let mut batch = WriteBatch::default();
        let nodes_cf = self.cf_handle(NODES_CF)?;
        for (hash, record) in &buffered.nodes {
            match record {
                Some(record) => batch.put_cf(nodes_cf, hash.to_bytes(), record.to_bytes()),
                None => batch.delete_cf(nodes_cf, hash.to_bytes()),
            }
        }
        let keysrc_cf = self.cf_handle(KEY_SOURCE_CF)?;
        for (key, source) in &buffered.key_sources {
            match source {
                Some(source) => batch.put_cf(keysrc_cf, key.to_bytes(), source),
                None => batch.delete_cf(keysrc_cf, key.to_bytes()),
            }
        }
        let hashkey_cf = self.cf_handle(HASH_KEY_CF)?;
        for (hash, key) in &buffered.hash_keys {
            match key {
                Some(key) => batch.put_cf(hashkey_cf, hash.to_bytes(), key.to_bytes()),
                None => batch.delete_cf(hashkey_cf, hash.to_bytes()),
            }
        }
        let code_cf = self.cf_handle(CODE_CF)?;
        for (hash, code) in &buffered.code {
            batch.put_cf(code_cf, hash, code);
        }
        let metadata_cf = self.cf_handle(METADATA_CF)?;
        if let Some(root) = buffered.last_root {
            batch.put_cf(metadata_cf, LAST_ROOT_KEY, root.to_bytes());
        }
        if let Some(depth) = buffered.depth {
            batch.put_cf(metadata_cf, DEPTH_KEY, [depth]);
        }

        self.db.write(batch)?;
        Ok(())
    }

    fn rollback_batch(&self) -> Result<(), StorageError> {
        self.pending.write()?.take();
        Ok(())
    }
}

// ERRORS
// ================================================================================================

impl From<rocksdb::Error> for StorageError {
    fn from(e: rocksdb::Error) -> Self {
        StorageError::Backend(alloc::boxed::Box::new(e))
    }
}
