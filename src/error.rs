use alloc::string::String;

use thiserror::Error;

use crate::key::TreeKey;

// ERROR TYPES
// ================================================================================================

/// Errors that can occur during tree operations.
///
/// The engine never retries: every error surfaces to the caller, and a failed mutation leaves
/// the persisted last root unchanged.
#[derive(Debug, Error)]
pub enum SmtError {
    /// A node or auxiliary record referenced by the tree is missing from storage. This is fatal
    /// for the calling operation; the engine does not attempt repair.
    #[error("node {0} not found in storage")]
    NotFound(TreeKey),

    /// The caller supplied a malformed key, an out-of-range scalar, or an inconsistent value.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The storage backend failed.
    #[cfg(feature = "std")]
    #[error("storage operation failed")]
    Storage(#[from] crate::storage::StorageError),

    /// A long-running operation was aborted through its cancellation token.
    #[error("operation cancelled")]
    Cancelled,
}

#[cfg(all(test, feature = "std"))]
// Compile-time assertion that SmtError implements the required traits
const _: fn() = || {
    fn assert_impl<T: std::error::Error + Send + Sync + 'static>() {}
    assert_impl::<SmtError>();
};
