//! Pure serialization for the persisted routing snapshot.
//!
//! The on-disk form mirrors the in-memory layout: a leading `count: u8`
//! followed by `count` packed 20-byte records, little-endian integers.
//!
//! ```text
//! offset  size  field
//!      0     6  device address
//!      6     6  parent address
//!     12     1  rssi (i8)
//!     13     4  last_seen_ms (LE)
//!     17     1  status (0 = offline, 1 = online, 2 = stale)
//!     18     2  battery_mv (LE; 0 = unknown)
//! ```
//!
//! Decoding is strict: a count above the table capacity or a truncated
//! record means the persisted state is corrupt, which per the failure
//! policy must refuse to start rather than limp along.

use meshstatic_core::types::Address;
use meshstatic_engine::{DeviceStatus, RouteEntry};

/// Size of one packed routing record.
pub const RECORD_SIZE: usize = 20;

/// Errors from the pure codec (no I/O variants).
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum StorageCodecError {
    #[error("snapshot holds {count} records but capacity is {capacity}")]
    CountExceedsCapacity { count: usize, capacity: usize },
    #[error("snapshot truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
    #[error("snapshot of {0} records does not fit the u8 count")]
    TooManyRecords(usize),
    #[error("invalid status byte 0x{0:02X} in record")]
    InvalidStatus(u8),
    #[error("snapshot is empty (missing count byte)")]
    MissingCount,
}

fn encode_status(status: DeviceStatus) -> u8 {
    match status {
        DeviceStatus::Offline => 0,
        DeviceStatus::Online => 1,
        DeviceStatus::Stale => 2,
    }
}

fn decode_status(byte: u8) -> Result<DeviceStatus, StorageCodecError> {
    match byte {
        0 => Ok(DeviceStatus::Offline),
        1 => Ok(DeviceStatus::Online),
        2 => Ok(DeviceStatus::Stale),
        other => Err(StorageCodecError::InvalidStatus(other)),
    }
}

/// Serialize a routing snapshot.
pub fn encode_routes(entries: &[RouteEntry]) -> Result<Vec<u8>, StorageCodecError> {
    if entries.len() > u8::MAX as usize {
        return Err(StorageCodecError::TooManyRecords(entries.len()));
    }

    let mut out = Vec::with_capacity(1 + entries.len() * RECORD_SIZE);
    out.push(entries.len() as u8);
    for entry in entries {
        out.extend_from_slice(entry.device.as_ref());
        out.extend_from_slice(entry.parent.as_ref());
        out.push(entry.rssi_dbm as u8);
        out.extend_from_slice(&entry.last_seen_ms.to_le_bytes());
        out.push(encode_status(entry.status));
        out.extend_from_slice(&entry.battery_mv.unwrap_or(0).to_le_bytes());
    }
    Ok(out)
}

/// Deserialize a routing snapshot, refusing anything that would
/// violate the table invariants.
pub fn decode_routes(bytes: &[u8], capacity: usize) -> Result<Vec<RouteEntry>, StorageCodecError> {
    let Some((&count, records)) = bytes.split_first() else {
        return Err(StorageCodecError::MissingCount);
    };
    let count = count as usize;

    if count > capacity {
        return Err(StorageCodecError::CountExceedsCapacity { count, capacity });
    }
    let expected = count * RECORD_SIZE;
    if records.len() < expected {
        return Err(StorageCodecError::Truncated {
            expected: expected + 1,
            actual: bytes.len(),
        });
    }

    let mut entries = Vec::with_capacity(count);
    for record in records[..expected].chunks_exact(RECORD_SIZE) {
        let device = Address::try_from(&record[0..6]).expect("record slice is 6 bytes");
        let parent = Address::try_from(&record[6..12]).expect("record slice is 6 bytes");
        let rssi_dbm = record[12] as i8;
        let last_seen_ms =
            u32::from_le_bytes(record[13..17].try_into().expect("slice is 4 bytes"));
        let status = decode_status(record[17])?;
        let battery = u16::from_le_bytes([record[18], record[19]]);
        entries.push(RouteEntry {
            device,
            parent,
            rssi_dbm,
            last_seen_ms,
            status,
            battery_mv: (battery != 0).then_some(battery),
        });
    }
    Ok(entries)
}
