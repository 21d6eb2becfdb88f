//! Durable local key-value storage for the persisted session.
//!
//! SYSTEM CONTEXT
//! ==============
//! The session store writes the authenticated user record here on login and
//! reads it back on every navigation. The contract mirrors browser
//! `localStorage`: string keys, string values, synchronous calls.

pub mod file;
pub mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

/// Error returned by [`DurableStorage`] implementations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The backing file could not be read or written.
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),
    /// The backing document is not a JSON object of string values.
    #[error("storage document is malformed: {0}")]
    Format(#[from] serde_json::Error),
}

/// Synchronous string key-value storage that survives process restarts.
pub trait DurableStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns a [`StorageError`] if the write fails.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
