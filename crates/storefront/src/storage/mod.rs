//! Durable key-value storage for guest carts, tokens and session markers.
//!
//! # Backends
//!
//! - [`FileStore`] - one file per key under a directory (survives restarts)
//! - [`MemoryStore`] - process-local map, used when no durable store can be opened
//!
//! All operations are synchronous. Callers write through on every state
//! change, so implementations should keep writes cheap and atomic.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

/// Errors that can occur when reading or writing a storage slot.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("I/O error on slot {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    /// Key contains characters that cannot name a slot.
    #[error("Invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Another thread panicked while holding the store lock.
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// A synchronous string key-value store.
///
/// Keys are short ASCII identifiers (`[A-Za-z0-9_-]+`). Values are opaque
/// strings; callers own their serialization format.
pub trait KeyValueStore: Send + Sync {
    /// Read a slot. Returns `Ok(None)` if the slot is empty.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a slot, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a slot. Removing an empty slot is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Open a durable store at `dir`, falling back to memory if that fails.
///
/// The fallback keeps the cart usable on read-only or sandboxed filesystems;
/// guest carts simply stop surviving restarts.
#[must_use]
pub fn open_durable(dir: &Path) -> Arc<dyn KeyValueStore> {
    match FileStore::open(dir) {
        Ok(store) => {
            tracing::debug!(dir = %dir.display(), "Opened durable store");
            Arc::new(store)
        }
        Err(e) => {
            tracing::warn!(
                dir = %dir.display(),
                error = %e,
                "Durable store unavailable, falling back to in-memory storage"
            );
            Arc::new(MemoryStore::new())
        }
    }
}

/// Check that a key only uses characters safe for every backend.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_string()))
    }
}
