//! Error types for the meshstatic-core crate.

use core::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    TooShort { min: usize, actual: usize },
    InvalidMessageType(u8),
}

impl fmt::Display for PacketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PacketError::TooShort { min, actual } => {
                write!(
                    f,
                    "frame too short: need at least {min} bytes, got {actual}"
                )
            }
            PacketError::InvalidMessageType(v) => {
                write!(f, "invalid message type: 0x{v:02X}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PacketError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadError {
    TooShort { min: usize, actual: usize },
    InvalidFieldLength { field: &'static str, max: usize, actual: usize },
}

impl fmt::Display for PayloadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadError::TooShort { min, actual } => {
                write!(
                    f,
                    "payload too short: need at least {min} bytes, got {actual}"
                )
            }
            PayloadError::InvalidFieldLength { field, max, actual } => {
                write!(f, "{field} length {actual} exceeds maximum {max}")
            }
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for PayloadError {}

#[cfg(test)]
mod tests {
    extern crate alloc;
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn test_packet_error_display_all_variants() {
        let variants: &[PacketError] = &[
            PacketError::TooShort {
                min: 210,
                actual: 12,
            },
            PacketError::InvalidMessageType(0x0B),
        ];
        for v in variants {
            assert!(!v.to_string().is_empty(), "{v:?} should have Display");
        }
    }

    #[test]
    fn test_payload_error_display_all_variants() {
        let variants: &[PayloadError] = &[
            PayloadError::TooShort { min: 18, actual: 4 },
            PayloadError::InvalidFieldLength {
                field: "parameters",
                max: 16,
                actual: 200,
            },
        ];
        for v in variants {
            assert!(!v.to_string().is_empty(), "{v:?} should have Display");
        }
    }
}
