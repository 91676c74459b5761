// # Store Implementations
//
// This module provides implementations of the Store trait for
// different persistence strategies.

pub mod file;
pub mod memory;

use std::sync::Arc;

pub use file::FileStore;
pub use memory::MemoryStore;

use crate::config::StoreConfig;
use crate::traits::Store;

/// Build the store described by a configuration
pub async fn open_store(config: &StoreConfig) -> Result<Arc<dyn Store>, crate::Error> {
    match config {
        StoreConfig::Memory => {
            tracing::debug!("Using in-memory store");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreConfig::File { path } => {
            if path.trim().is_empty() {
                return Err(crate::Error::config("File store path cannot be empty"));
            }
            tracing::debug!("Using file store at {}", path);
            Ok(Arc::new(FileStore::new(path).await?))
        }
    }
}
