//! Persistence of the routing snapshot across reboots.
//!
//! Writes go to a temporary sibling file first and are renamed into
//! place, so a power cut mid-write leaves the previous snapshot intact.

use std::path::Path;

use meshstatic_engine::RouteEntry;

use crate::storage_codec::{self, StorageCodecError};

/// Errors from snapshot persistence.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("corrupt snapshot: {0}")]
    Corrupt(#[from] StorageCodecError),
}

/// Persist a routing snapshot atomically.
pub fn save_routes(path: &Path, entries: &[RouteEntry]) -> Result<(), StorageError> {
    let bytes = storage_codec::encode_routes(entries)?;

    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, &bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Load a routing snapshot, enforcing the table capacity.
///
/// A corrupt snapshot is a fatal condition for the caller: starting the
/// engine with state that violates its invariants is refused.
pub fn load_routes(path: &Path, capacity: usize) -> Result<Vec<RouteEntry>, StorageError> {
    let bytes = std::fs::read(path)?;
    Ok(storage_codec::decode_routes(&bytes, capacity)?)
}
