use alloc::{boxed::Box, string::String};

/// Errors returned by any [NodeStorage](super::NodeStorage) implementation.
///
/// Categories:
/// - Backend errors (DB/I/O, poisoned locks)
/// - Key/value length mismatches with expected/actual parameters
/// - Unsupported operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Backend I/O or database error (e.g., RocksDB).
    #[error("backend error: {0}")]
    Backend(#[from] Box<dyn core::error::Error + Send + Sync + 'static>),
    /// Key bytes had the wrong length (e.g., node hash key, code hash key).
    #[error("invalid key length: expected {expected} bytes, found {found}")]
    BadKeyLen { expected: usize, found: usize },
    /// Value/metadata bytes had the wrong length (e.g., node record, depth byte).
    #[error("invalid value length for {what}: expected {expected} bytes, found {found}")]
    BadValueLen {
        what: &'static str,
        expected: usize,
        found: usize,
    },
    /// The requested operation is not supported by this backend.
    #[error("operation not supported: {0}")]
    Unsupported(String),
}

impl<T> From<std::sync::PoisonError<T>> for StorageError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        // Simple string-based error since we can't box PoisonError<T> directly
        // (T might not implement Send)
        #[derive(Debug)]
        struct LockError(String);

        impl core::fmt::Display for LockError {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::error::Error for LockError {}

        StorageError::Backend(Box::new(LockError(format!("Lock poisoned: {e}"))))
    }
}
