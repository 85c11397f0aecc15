//! Account and contract operations over the tree.
//!
//! These wrap the raw key/value engine with Ethereum-style entities: balances, nonces,
//! contract bytecode, and storage slots. Every write maintains the auxiliary maps alongside
//! the tree — the key source (so a tree key can be traced back to its kind, address, and
//! slot) and the hash→key inverse map (used when building witnesses). Writing the zero value
//! clears the key source.

use alloc::vec::Vec;

use num_bigint::BigUint;
use num_traits::Zero;

use crate::{
    EMPTY_ROOT, Map,
    error::SmtError,
    hash::hash_bytecode,
    key::{
        ADDRESS_BYTES, LeafKind, SLOT_BYTES, TreeKey, decode_key_source, derive_account_key,
        derive_key, encode_key_source,
    },
    node::LeafValue,
    scalar,
    storage::NodeStorage,
};

use super::{CancelToken, PARALLEL_HASH_THRESHOLD, Smt, check_cancel};

// CONSTANTS
// ================================================================================================

/// The all-zero slot recorded in key sources of non-storage leaves.
const ZERO_SLOT: [u8; SLOT_BYTES] = [0; SLOT_BYTES];

// TYPES
// ================================================================================================

/// The tree-visible state of an account: its balance and nonce.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountState {
    /// Account balance in wei.
    pub balance: BigUint,
    /// Account transaction count.
    pub nonce: BigUint,
}

/// A storage slot prepared for insertion: the derived value lanes and their precomputed hash.
type PreparedSlot = ([u8; SLOT_BYTES], LeafValue, TreeKey);

// ACCOUNT & CONTRACT OPERATIONS
// ================================================================================================

impl<S: NodeStorage> Smt<S> {
    /// Sets the balance of an account and returns the new root.
    pub fn set_account_balance(
        &mut self,
        address: &[u8; ADDRESS_BYTES],
        balance: &BigUint,
    ) -> Result<TreeKey, SmtError> {
        self.set_account_leaf(LeafKind::Balance, address, balance)
    }

    /// Sets the nonce of an account and returns the new root.
    pub fn set_account_nonce(
        &mut self,
        address: &[u8; ADDRESS_BYTES],
        nonce: &BigUint,
    ) -> Result<TreeKey, SmtError> {
        self.set_account_leaf(LeafKind::Nonce, address, nonce)
    }

    /// Sets the balance and nonce of an account and returns the new root.
    pub fn set_account_state(
        &mut self,
        address: &[u8; ADDRESS_BYTES],
        state: &AccountState,
    ) -> Result<TreeKey, SmtError> {
        self.set_account_balance(address, &state.balance)?;
        self.set_account_nonce(address, &state.nonce)
    }

    /// Returns the balance of an account; zero for unknown accounts.
    pub fn get_account_balance(
        &self,
        address: &[u8; ADDRESS_BYTES],
    ) -> Result<BigUint, SmtError> {
        self.get(&derive_account_key(LeafKind::Balance, address))
    }

    /// Returns the nonce of an account; zero for unknown accounts.
    pub fn get_account_nonce(&self, address: &[u8; ADDRESS_BYTES]) -> Result<BigUint, SmtError> {
        self.get(&derive_account_key(LeafKind::Nonce, address))
    }

    /// Returns the value of a contract storage slot; zero for unset slots.
    pub fn get_storage_slot(
        &self,
        address: &[u8; ADDRESS_BYTES],
        slot: &[u8; SLOT_BYTES],
    ) -> Result<BigUint, SmtError> {
        self.get(&derive_key(LeafKind::Storage, address, slot))
    }

    /// Sets a contract's bytecode: the CODE leaf commits to the code, the LENGTH leaf to its
    /// byte length, and the raw code is registered in the code map under its keccak hash.
    /// Empty code clears both leaves. Returns the new root.
    pub fn set_contract_bytecode(
        &mut self,
        address: &[u8; ADDRESS_BYTES],
        code: &[u8],
    ) -> Result<TreeKey, SmtError> {
        self.write_bytecode_leaves(address, code)?;
        Ok(self.root())
    }

    /// Applies a map of storage slot updates for one contract and returns the new root.
    ///
    /// Value hashing fans out across worker threads once the update exceeds roughly a hundred
    /// slots; the tree mutations that follow are sequential. The whole update runs inside one
    /// storage batch and rolls back on error or cancellation.
    pub fn set_contract_storage(
        &mut self,
        address: &[u8; ADDRESS_BYTES],
        slots: &Map<[u8; SLOT_BYTES], BigUint>,
        cancel: Option<&CancelToken>,
    ) -> Result<TreeKey, SmtError> {
        let prepared = prepare_storage_values(slots)?;

        self.run_in_batch(|tree| {
            for (slot, value, value_hash) in &prepared {
                check_cancel(cancel)?;
                let key = derive_key(LeafKind::Storage, address, slot);
                tree.write_entity_leaf(&key, LeafKind::Storage, address, slot, *value, *value_hash)?;
            }
            Ok(tree.root())
        })
    }

    /// Applies a block's worth of state changes — account states, contract bytecodes, and
    /// storage slots — as one batch, in that order, and returns the inserted keys and values
    /// (including zero values for deletions) for downstream witness generation.
    ///
    /// A `None` account state clears the account's balance and nonce. The cancellation token
    /// is checked between items; on cancellation or error the batch is rolled back.
    pub fn set_storage(
        &mut self,
        account_changes: &Map<[u8; ADDRESS_BYTES], Option<AccountState>>,
        code_changes: &Map<[u8; ADDRESS_BYTES], Vec<u8>>,
        storage_changes: &Map<[u8; ADDRESS_BYTES], Map<[u8; SLOT_BYTES], BigUint>>,
        cancel: Option<&CancelToken>,
    ) -> Result<(Vec<TreeKey>, Vec<LeafValue>), SmtError> {
        if account_changes.is_empty() && code_changes.is_empty() && storage_changes.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let capacity = account_changes.len() * 2
            + code_changes.len() * 2
            + storage_changes.values().map(Map::len).sum::<usize>();

        self.run_in_batch(|tree| {
            let mut keys = Vec::with_capacity(capacity);
            let mut values = Vec::with_capacity(capacity);

            for (address, state) in account_changes {
                check_cancel(cancel)?;
                let state = state.clone().unwrap_or_default();
                for (kind, amount) in
                    [(LeafKind::Balance, &state.balance), (LeafKind::Nonce, &state.nonce)]
                {
                    let key = derive_account_key(kind, address);
                    let value = LeafValue::from_scalar(amount)?;
                    let value_hash = if value.is_zero() { EMPTY_ROOT } else { value.hash() };
                    tree.write_entity_leaf(&key, kind, address, &ZERO_SLOT, value, value_hash)?;
                    keys.push(key);
                    values.push(value);
                }
            }

            for (address, code) in code_changes {
                check_cancel(cancel)?;
                for (key, value) in tree.write_bytecode_leaves(address, code)? {
                    keys.push(key);
                    values.push(value);
                }
            }

            for (address, slots) in storage_changes {
                check_cancel(cancel)?;
                for (slot, value, value_hash) in prepare_storage_values(slots)? {
                    check_cancel(cancel)?;
                    let key = derive_key(LeafKind::Storage, address, &slot);
                    tree.write_entity_leaf(
                        &key,
                        LeafKind::Storage,
                        address,
                        &slot,
                        value,
                        value_hash,
                    )?;
                    keys.push(key);
                    values.push(value);
                }
            }

            Ok((keys, values))
        })
    }

    // WITNESS SUPPORT
    // --------------------------------------------------------------------------------------------

    /// Reconstructs the origin of a tree key from its recorded key source, if one exists.
    pub fn key_source(
        &self,
        key: &TreeKey,
    ) -> Result<Option<(LeafKind, [u8; ADDRESS_BYTES], [u8; SLOT_BYTES])>, SmtError> {
        match self.storage().get_key_source(key)? {
            Some(blob) => Ok(Some(decode_key_source(&blob)?)),
            None => Ok(None),
        }
    }

    /// Returns the tree key a value hash was inserted under, if recorded.
    pub fn hash_key(&self, value_hash: &TreeKey) -> Result<Option<TreeKey>, SmtError> {
        Ok(self.storage().get_hash_key(value_hash)?)
    }

    /// Returns the contract bytecode registered under a keccak hash, if any. Hashes shorter
    /// than 32 bytes are zero-prefixed on the left.
    pub fn contract_code(&self, code_hash: &[u8]) -> Result<Option<Vec<u8>>, SmtError> {
        Ok(self.storage().get_code(code_hash)?)
    }

    // HELPERS
    // --------------------------------------------------------------------------------------------

    fn set_account_leaf(
        &mut self,
        kind: LeafKind,
        address: &[u8; ADDRESS_BYTES],
        amount: &BigUint,
    ) -> Result<TreeKey, SmtError> {
        let key = derive_account_key(kind, address);
        let value = LeafValue::from_scalar(amount)?;
        let value_hash = if value.is_zero() { EMPTY_ROOT } else { value.hash() };
        self.write_entity_leaf(&key, kind, address, &ZERO_SLOT, value, value_hash)
    }

    /// Writes one entity leaf and keeps the auxiliary maps in step: non-zero values record
    /// their key source and hash→key entry, zero values clear the key source.
    fn write_entity_leaf(
        &mut self,
        key: &TreeKey,
        kind: LeafKind,
        address: &[u8; ADDRESS_BYTES],
        slot: &[u8; SLOT_BYTES],
        value: LeafValue,
        value_hash: TreeKey,
    ) -> Result<TreeKey, SmtError> {
        let root = self.insert_prepared(key, value, value_hash)?;
        if value.is_zero() {
            self.storage().delete_key_source(key)?;
        } else {
            self.storage().put_key_source(key, &encode_key_source(kind, address, slot))?;
            self.storage().put_hash_key(&value_hash, key)?;
        }
        Ok(root)
    }

    /// Writes the CODE and LENGTH leaves for a contract and registers the bytecode in the
    /// code map; returns the two key-value pairs written.
    fn write_bytecode_leaves(
        &mut self,
        address: &[u8; ADDRESS_BYTES],
        code: &[u8],
    ) -> Result<[(TreeKey, LeafValue); 2], SmtError> {
        let (commitment, length) = if code.is_empty() {
            (BigUint::zero(), BigUint::zero())
        } else {
            (scalar::limbs_to_scalar(&hash_bytecode(code)), BigUint::from(code.len()))
        };

        let code_key = derive_account_key(LeafKind::Code, address);
        let code_value = LeafValue::from_scalar(&commitment)?;
        let code_hash = if code_value.is_zero() { EMPTY_ROOT } else { code_value.hash() };
        self.write_entity_leaf(&code_key, LeafKind::Code, address, &ZERO_SLOT, code_value, code_hash)?;

        let length_key = derive_account_key(LeafKind::CodeLength, address);
        let length_value = LeafValue::from_scalar(&length)?;
        let length_hash = if length_value.is_zero() { EMPTY_ROOT } else { length_value.hash() };
        self.write_entity_leaf(
            &length_key,
            LeafKind::CodeLength,
            address,
            &ZERO_SLOT,
            length_value,
            length_hash,
        )?;

        if !code.is_empty() {
            self.storage().put_code(code)?;
        }
        Ok([(code_key, code_value), (length_key, length_value)])
    }

    /// Runs `op` inside a storage batch: commit on success, rollback (restoring the cached
    /// root and depth) on failure.
    fn run_in_batch<T>(
        &mut self,
        op: impl FnOnce(&mut Self) -> Result<T, SmtError>,
    ) -> Result<T, SmtError> {
        self.storage().open_batch()?;
        let saved = self.save_state();
        match op(self) {
            Ok(result) => match self.storage().commit_batch() {
                Ok(()) => Ok(result),
                Err(err) => {
                    self.restore_state(saved);
                    Err(err.into())
                },
            },
            Err(err) => {
                self.storage().rollback_batch()?;
                self.restore_state(saved);
                Err(err)
            },
        }
    }
}

// HELPER FUNCTIONS
// ================================================================================================

/// Converts a slot map into prepared insertions, hashing values across worker threads when the
/// map is large. Each worker hashes independently; results are merged after the join, before
/// any tree mutation starts.
fn prepare_storage_values(
    slots: &Map<[u8; SLOT_BYTES], BigUint>,
) -> Result<Vec<PreparedSlot>, SmtError> {
    let entries: Vec<(&[u8; SLOT_BYTES], &BigUint)> = slots.iter().collect();
    let convert = |&(slot, amount): &(&[u8; SLOT_BYTES], &BigUint)| -> Result<PreparedSlot, SmtError> {
        let value = LeafValue::from_scalar(amount)?;
        let value_hash = if value.is_zero() { EMPTY_ROOT } else { value.hash() };
        Ok((*slot, value, value_hash))
    };

    if entries.len() > PARALLEL_HASH_THRESHOLD {
        use rayon::prelude::*;
        entries.par_iter().map(convert).collect()
    } else {
        entries.iter().map(convert).collect()
    }
}
