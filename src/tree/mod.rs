//! The Sparse Merkle Tree engine.
//!
//! [Smt] maps 256-bit keys to 256-bit values over a pluggable [NodeStorage] backend and keeps a
//! running commitment to the whole mapping: the root hash. Mutations walk the key's bit-path
//! from the root, rewrite the touched nodes bottom-up, and persist the new root; nodes are
//! content-addressed and immutable, so superseded nodes simply become unreferenced.
//!
//! Structural invariants maintained by every mutation:
//! - no branch has two empty children;
//! - no branch has a leaf child on one side and an empty slot on the other — such a leaf is
//!   re-homed one level up (path compression);
//! - a leaf stores the suffix of its key below its depth, so depth plus suffix reconstruct the
//!   full key.
//!
//! Inserting the zero value deletes the key; reading a missing key yields the zero value; the
//! root of an empty tree is the zero hash.
//!
//! The engine is single-owner: one logical writer at a time. Readers may coexist with a writer
//! only if the backend serialises access (the in-memory backend does, at store granularity).

use alloc::{string::ToString, vec::Vec};
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use num_bigint::BigUint;

use crate::{
    EMPTY_ROOT, KEY_BITS,
    error::SmtError,
    key::TreeKey,
    node::{LeafValue, Node, NodeRecord},
    storage::NodeStorage,
};

mod entity;
pub use entity::AccountState;


#[cfg(test)]
mod property_tests;

// CONSTANTS
// ================================================================================================

/// Minimum number of values in a bulk operation before value hashing fans out across worker
/// threads. Below this the fan-out costs more than it saves.
pub(crate) const PARALLEL_HASH_THRESHOLD: usize = 100;

// CANCEL TOKEN
// ================================================================================================

/// A cancellation signal for long-running operations.
///
/// Clones share the flag. The engine checks the token between items and returns
/// [SmtError::Cancelled] after rolling back the open storage batch; with a no-op batching
/// backend the store is left indeterminate and must be treated as such.
#[derive(Debug, Default, Clone)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a new, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Signals cancellation to every holder of this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once [Self::cancel] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Returns [SmtError::Cancelled] if the token (when present) has been triggered.
pub(crate) fn check_cancel(cancel: Option<&CancelToken>) -> Result<(), SmtError> {
    match cancel {
        Some(token) if token.is_cancelled() => Err(SmtError::Cancelled),
        _ => Ok(()),
    }
}

// SLOT
// ================================================================================================

/// The state of one child slot after a recursive update. Carrying the leaf payload (and not
/// just the hash) lets the parent re-home a surviving leaf without re-reading it.
enum Slot {
    Empty,
    Leaf {
        hash: TreeKey,
        rem_key: TreeKey,
        value_hash: TreeKey,
    },
    Branch {
        hash: TreeKey,
    },
}

impl Slot {
    /// Returns the hash to store in the parent's child slot; the zero hash for an empty slot.
    fn hash(&self) -> TreeKey {
        match self {
            Slot::Empty => EMPTY_ROOT,
            Slot::Leaf { hash, .. } | Slot::Branch { hash } => *hash,
        }
    }
}

/// An entry prepared for bulk construction: the packed bit-path drives the radix sort and
/// partitioning, the value hash is precomputed so the build loop never hashes values.
struct BulkEntry {
    path: [u8; 32],
    key: TreeKey,
    value: LeafValue,
    value_hash: TreeKey,
}

/// Returns the path bit at `depth` from a packed path produced by [TreeKey::path_bytes].
fn path_bit_from_bytes(path: &[u8; 32], depth: usize) -> u8 {
    (path[depth / 8] >> (7 - depth % 8)) & 1
}

// SMT ENGINE
// ================================================================================================

/// A Sparse Merkle Tree over a [NodeStorage] backend.
///
/// The current root and the maximum observed leaf depth are cached in the struct and persisted
/// through the backend's metadata surface, so a tree reopened over existing storage resumes
/// where it left off.
#[derive(Debug)]
pub struct Smt<S: NodeStorage> {
    storage: S,
    root: TreeKey,
    max_depth: u8,
    depth_dirty: bool,
}

impl<S: NodeStorage> Smt<S> {
    /// Opens a tree over the given storage, resuming from its persisted root.
    pub fn new(storage: S) -> Result<Self, SmtError> {
        let root = storage.get_last_root()?;
        let max_depth = storage.get_depth()?;
        Ok(Self { storage, root, max_depth, depth_dirty: false })
    }

    // PUBLIC ACCESSORS
    // --------------------------------------------------------------------------------------------

    /// Returns the current root. The zero hash iff the tree is empty.
    pub fn root(&self) -> TreeKey {
        self.root
    }

    /// Returns true if the tree commits to no entries.
    pub fn is_empty(&self) -> bool {
        self.root.is_zero()
    }

    /// Returns the maximum leaf depth created so far (diagnostics only).
    pub fn max_depth(&self) -> u8 {
        self.max_depth
    }

    /// Returns a reference to the underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Consumes the tree and returns the underlying storage.
    pub fn into_storage(self) -> S {
        self.storage
    }

    // READS
    // --------------------------------------------------------------------------------------------

    /// Returns the scalar stored at `key`; zero if the key is absent.
    pub fn get(&self, key: &TreeKey) -> Result<BigUint, SmtError> {
        Ok(self.get_value(key)?.to_scalar())
    }

    /// Returns the 8-lane value stored at `key`; the zero value if the key is absent.
    pub fn get_value(&self, key: &TreeKey) -> Result<LeafValue, SmtError> {
        let mut slot = self.root;
        let mut depth = 0;
        while !slot.is_zero() {
            let record = self.fetch(&slot)?;
            match Node::from_record(&record) {
                Node::Leaf { rem_key, value_hash } => {
                    // the walked prefix matches by construction, so suffix equality is full
                    // key equality
                    if rem_key == key.strip_path_bits(depth) {
                        return self.fetch(&value_hash)?.value();
                    }
                    return Ok(LeafValue::ZERO);
                },
                Node::Branch { left, right } => {
                    slot = if key.path_bit(depth) == 0 { left } else { right };
                    depth += 1;
                },
            }
        }
        Ok(LeafValue::ZERO)
    }

    // MUTATIONS
    // --------------------------------------------------------------------------------------------

    /// Inserts `value` at `key` and returns the new root. Inserting zero deletes the key; a
    /// zero insert at an absent key leaves the tree unchanged.
    pub fn insert(&mut self, key: &TreeKey, value: &BigUint) -> Result<TreeKey, SmtError> {
        self.insert_value(key, LeafValue::from_scalar(value)?)
    }

    /// Deletes `key` and returns the new root. Equivalent to inserting the zero value.
    pub fn delete(&mut self, key: &TreeKey) -> Result<TreeKey, SmtError> {
        self.insert_value(key, LeafValue::ZERO)
    }

    /// Inserts an 8-lane value at `key` and returns the new root.
    pub fn insert_value(&mut self, key: &TreeKey, value: LeafValue) -> Result<TreeKey, SmtError> {
        let value_hash = if value.is_zero() { EMPTY_ROOT } else { value.hash() };
        self.insert_prepared(key, value, value_hash)
    }

    /// Inserts a value whose hash the caller has already computed (bulk paths hash values in
    /// parallel up front). A failed insert leaves the cached and persisted root unchanged.
    pub(crate) fn insert_prepared(
        &mut self,
        key: &TreeKey,
        value: LeafValue,
        value_hash: TreeKey,
    ) -> Result<TreeKey, SmtError> {
        let outcome = self.update_slot(self.root, key, 0, &value, &value_hash)?;
        let new_root = outcome.hash();
        self.storage.set_last_root(&new_root)?;
        self.root = new_root;
        self.flush_depth()?;
        Ok(new_root)
    }

    /// Applies a sequence of insertions in input order (duplicates: last write wins) inside one
    /// storage batch, and returns the final root.
    ///
    /// # Errors
    /// Returns [SmtError::InvalidInput] on length mismatch and [SmtError::Cancelled] if the
    /// token fires; in both cases the batch is rolled back and the cached root restored.
    pub fn insert_batch(
        &mut self,
        keys: &[TreeKey],
        values: &[LeafValue],
        cancel: Option<&CancelToken>,
    ) -> Result<TreeKey, SmtError> {
        if keys.len() != values.len() {
            return Err(SmtError::InvalidInput(format!(
                "{} keys but {} values",
                keys.len(),
                values.len()
            )));
        }
        self.storage.open_batch()?;
        let saved = self.save_state();
        match self.apply_batch(keys, values, cancel) {
            Ok(root) => match self.storage.commit_batch() {
                Ok(()) => Ok(root),
                Err(err) => {
                    self.restore_state(saved);
                    Err(err.into())
                },
            },
            Err(err) => {
                self.storage.rollback_batch()?;
                self.restore_state(saved);
                Err(err)
            },
        }
    }

    fn apply_batch(
        &mut self,
        keys: &[TreeKey],
        values: &[LeafValue],
        cancel: Option<&CancelToken>,
    ) -> Result<TreeKey, SmtError> {
        for (key, value) in keys.iter().zip(values) {
            check_cancel(cancel)?;
            self.insert_value(key, *value)?;
        }
        Ok(self.root)
    }

    // BULK CONSTRUCTION
    // --------------------------------------------------------------------------------------------

    /// Builds the tree from a snapshot of entries and returns the root. The result is
    /// bit-identical to inserting the same entries one by one in any order.
    ///
    /// Entries are sorted by bit-path and partitioned recursively by the leading bit at each
    /// depth: a singleton partition becomes a leaf, a larger one a branch over its halves.
    /// Value hashing fans out across worker threads for large snapshots; tree construction
    /// itself is sequential.
    ///
    /// # Errors
    /// - [SmtError::InvalidInput] if the tree is not empty or the snapshot contains a
    ///   duplicate key.
    /// - [SmtError::Cancelled] if the token fires mid-build; the batch is rolled back.
    pub fn bulk_build(
        &mut self,
        entries: Vec<(TreeKey, LeafValue)>,
        cancel: Option<&CancelToken>,
    ) -> Result<TreeKey, SmtError> {
        if !self.root.is_zero() {
            return Err(SmtError::InvalidInput("bulk build requires an empty tree".to_string()));
        }

        // zero values denote absent entries and never materialise
        let entries: Vec<(TreeKey, LeafValue)> =
            entries.into_iter().filter(|(_, value)| !value.is_zero()).collect();

        let prepare = |(key, value): &(TreeKey, LeafValue)| BulkEntry {
            path: key.path_bytes(),
            key: *key,
            value: *value,
            value_hash: value.hash(),
        };
        let mut items: Vec<BulkEntry> = if entries.len() > PARALLEL_HASH_THRESHOLD {
            use rayon::prelude::*;
            entries.par_iter().map(prepare).collect()
        } else {
            entries.iter().map(prepare).collect()
        };

        items.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        if items.windows(2).any(|pair| pair[0].key == pair[1].key) {
            return Err(SmtError::InvalidInput("duplicate key in bulk build".to_string()));
        }

        self.storage.open_batch()?;
        let saved = self.save_state();
        match self.apply_bulk(&items, cancel) {
            Ok(root) => match self.storage.commit_batch() {
                Ok(()) => Ok(root),
                Err(err) => {
                    self.restore_state(saved);
                    Err(err.into())
                },
            },
            Err(err) => {
                self.storage.rollback_batch()?;
                self.restore_state(saved);
                Err(err)
            },
        }
    }

    fn apply_bulk(
        &mut self,
        items: &[BulkEntry],
        cancel: Option<&CancelToken>,
    ) -> Result<TreeKey, SmtError> {
        let outcome = self.build_partition(items, 0, cancel)?;
        let new_root = outcome.hash();
        self.storage.set_last_root(&new_root)?;
        self.root = new_root;
        self.flush_depth()?;
        Ok(new_root)
    }

    /// Builds the subtree for a partition of entries sharing their first `depth` path bits.
    fn build_partition(
        &mut self,
        entries: &[BulkEntry],
        depth: usize,
        cancel: Option<&CancelToken>,
    ) -> Result<Slot, SmtError> {
        check_cancel(cancel)?;
        match entries {
            [] => Ok(Slot::Empty),
            [entry] => {
                self.storage.put_node(&entry.value_hash, &NodeRecord::for_value(&entry.value))?;
                self.write_leaf_node(entry.key.strip_path_bits(depth), entry.value_hash, depth)
            },
            _ => {
                let split =
                    entries.partition_point(|entry| path_bit_from_bytes(&entry.path, depth) == 0);
                let left = self.build_partition(&entries[..split], depth + 1, cancel)?;
                let right = self.build_partition(&entries[split..], depth + 1, cancel)?;
                self.write_branch_node(left.hash(), right.hash())
            },
        }
    }

    // RECURSIVE DESCENT
    // --------------------------------------------------------------------------------------------

    /// Updates the subtree rooted in `slot` at `depth` and returns the slot's new state.
    fn update_slot(
        &mut self,
        slot: TreeKey,
        key: &TreeKey,
        depth: usize,
        value: &LeafValue,
        value_hash: &TreeKey,
    ) -> Result<Slot, SmtError> {
        if slot.is_zero() {
            if value.is_zero() {
                // deleting an absent key changes nothing
                return Ok(Slot::Empty);
            }
            return self.write_new_leaf(key, depth, value, value_hash);
        }
        let record = self.fetch(&slot)?;
        match Node::from_record(&record) {
            Node::Leaf { rem_key, value_hash: existing_value_hash } => self.update_leaf_slot(
                slot,
                rem_key,
                existing_value_hash,
                key,
                depth,
                value,
                value_hash,
            ),
            Node::Branch { left, right } => {
                self.update_branch_slot(left, right, key, depth, value, value_hash)
            },
        }
    }

    /// Handles descent arriving at an existing leaf: overwrite, delete, or split.
    #[allow(clippy::too_many_arguments)]
    fn update_leaf_slot(
        &mut self,
        slot: TreeKey,
        rem_key: TreeKey,
        existing_value_hash: TreeKey,
        key: &TreeKey,
        depth: usize,
        value: &LeafValue,
        value_hash: &TreeKey,
    ) -> Result<Slot, SmtError> {
        if rem_key == key.strip_path_bits(depth) {
            if value.is_zero() {
                return Ok(Slot::Empty);
            }
            return self.write_new_leaf(key, depth, value, value_hash);
        }
        if value.is_zero() {
            // deleting a key that is not present; the resident leaf is untouched
            return Ok(Slot::Leaf { hash: slot, rem_key, value_hash: existing_value_hash });
        }

        // split: walk to the first depth where the two keys diverge, put both leaves one level
        // below it, and chain single-child branches back up to this depth
        let existing_key = TreeKey::join_prefix(key, depth, rem_key);
        let mut fork = depth;
        while key.path_bit(fork) == existing_key.path_bit(fork) {
            fork += 1;
            debug_assert!(fork < KEY_BITS, "distinct keys must diverge");
        }

        let new_leaf = self.write_new_leaf(key, fork + 1, value, value_hash)?;
        let moved_leaf = self.write_leaf_node(
            existing_key.strip_path_bits(fork + 1),
            existing_value_hash,
            fork + 1,
        )?;

        let (left, right) = if key.path_bit(fork) == 0 {
            (new_leaf.hash(), moved_leaf.hash())
        } else {
            (moved_leaf.hash(), new_leaf.hash())
        };
        let mut slot = self.write_branch_node(left, right)?;
        for d in (depth..fork).rev() {
            let hash = slot.hash();
            slot = if key.path_bit(d) == 0 {
                self.write_branch_node(hash, EMPTY_ROOT)?
            } else {
                self.write_branch_node(EMPTY_ROOT, hash)?
            };
        }
        Ok(slot)
    }

    /// Handles descent through a branch: recurse into the addressed child, then rebuild or
    /// collapse this branch from the updated child and its sibling.
    fn update_branch_slot(
        &mut self,
        left: TreeKey,
        right: TreeKey,
        key: &TreeKey,
        depth: usize,
        value: &LeafValue,
        value_hash: &TreeKey,
    ) -> Result<Slot, SmtError> {
        let bit = key.path_bit(depth);
        let (child, sibling) = if bit == 0 { (left, right) } else { (right, left) };
        let updated = self.update_slot(child, key, depth + 1, value, value_hash)?;

        match updated {
            Slot::Empty if sibling.is_zero() => Ok(Slot::Empty),
            Slot::Empty => {
                // the deletion may leave a lone leaf sibling: re-home it one level up
                let record = self.fetch(&sibling)?;
                match Node::from_record(&record) {
                    Node::Leaf { rem_key, value_hash: sibling_value_hash } => {
                        let promoted = rem_key.with_path_bit(1 - bit, depth);
                        self.write_leaf_node(promoted, sibling_value_hash, depth)
                    },
                    Node::Branch { .. } => {
                        // the sibling subtree still branches, so this node stays
                        let (l, r) =
                            if bit == 0 { (EMPTY_ROOT, sibling) } else { (sibling, EMPTY_ROOT) };
                        self.write_branch_node(l, r)
                    },
                }
            },
            Slot::Leaf { rem_key, value_hash: child_value_hash, .. } if sibling.is_zero() => {
                // the collapse cascades: the surviving leaf keeps moving up while its sibling
                // side stays empty
                let promoted = rem_key.with_path_bit(bit, depth);
                self.write_leaf_node(promoted, child_value_hash, depth)
            },
            updated => {
                let (l, r) =
                    if bit == 0 { (updated.hash(), sibling) } else { (sibling, updated.hash()) };
                self.write_branch_node(l, r)
            },
        }
    }

    // NODE WRITES
    // --------------------------------------------------------------------------------------------

    /// Writes the value record and a leaf for `key` at `depth`.
    fn write_new_leaf(
        &mut self,
        key: &TreeKey,
        depth: usize,
        value: &LeafValue,
        value_hash: &TreeKey,
    ) -> Result<Slot, SmtError> {
        self.storage.put_node(value_hash, &NodeRecord::for_value(value))?;
        self.write_leaf_node(key.strip_path_bits(depth), *value_hash, depth)
    }

    /// Writes a leaf node whose value record already exists.
    fn write_leaf_node(
        &mut self,
        rem_key: TreeKey,
        value_hash: TreeKey,
        depth: usize,
    ) -> Result<Slot, SmtError> {
        let leaf = Node::leaf(rem_key, value_hash);
        let hash = leaf.hash();
        self.storage.put_node(&hash, &leaf.to_record())?;
        self.note_depth(depth);
        Ok(Slot::Leaf { hash, rem_key, value_hash })
    }

    /// Writes a branch node over the given children.
    fn write_branch_node(&mut self, left: TreeKey, right: TreeKey) -> Result<Slot, SmtError> {
        debug_assert!(!(left.is_zero() && right.is_zero()), "branches never have two empty sides");
        let branch = Node::branch(left, right);
        let hash = branch.hash();
        self.storage.put_node(&hash, &branch.to_record())?;
        Ok(Slot::Branch { hash })
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    /// Reads a node record the tree references; a miss is fatal for the calling operation.
    fn fetch(&self, hash: &TreeKey) -> Result<NodeRecord, SmtError> {
        self.storage.get_node(hash)?.ok_or(SmtError::NotFound(*hash))
    }

    /// Captures the cached engine state so a failed batch can restore it.
    pub(crate) fn save_state(&self) -> (TreeKey, u8, bool) {
        (self.root, self.max_depth, self.depth_dirty)
    }

    /// Restores engine state captured by [Self::save_state].
    pub(crate) fn restore_state(&mut self, saved: (TreeKey, u8, bool)) {
        (self.root, self.max_depth, self.depth_dirty) = saved;
    }

    /// Records a newly created leaf depth, saturating at the metadata byte.
    fn note_depth(&mut self, depth: usize) {
        let depth = depth.min(u8::MAX as usize) as u8;
        if depth > self.max_depth {
            self.max_depth = depth;
            self.depth_dirty = true;
        }
    }

    /// Persists the depth metadata if it grew since the last flush.
    fn flush_depth(&mut self) -> Result<(), SmtError> {
        if self.depth_dirty {
            self.storage.set_depth(self.max_depth)?;
            self.depth_dirty = false;
        }
        Ok(())
    }
}
