//! Packet flag byte encoding and decoding.
//!
//! The flag byte layout:
//! ```text
//! Bit 0: require_ack
//! Bit 1: local_process
//! Bit 2: emergency
//! Bit 3: encrypted
//! Bit 6: broadcast
//! ```
//! Bits 4, 5, and 7 are reserved; they are ignored on decode and
//! re-encoded as zero.

/// Decoded packet flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PacketFlags {
    /// The originator wants a unicast ACK from the final recipient.
    pub require_ack: bool,
    /// Group commands: process locally even when relaying.
    pub local_process: bool,
    /// Emergency traffic; bypasses duplicate suppression.
    pub emergency: bool,
    /// The payload field carries AEAD ciphertext and tag.
    pub encrypted: bool,
    /// The destination is the broadcast address.
    pub broadcast: bool,
}

const REQUIRE_ACK: u8 = 1 << 0;
const LOCAL_PROCESS: u8 = 1 << 1;
const EMERGENCY: u8 = 1 << 2;
const ENCRYPTED: u8 = 1 << 3;
const BROADCAST: u8 = 1 << 6;

impl PacketFlags {
    #[must_use]
    pub fn from_byte(byte: u8) -> Self {
        PacketFlags {
            require_ack: byte & REQUIRE_ACK != 0,
            local_process: byte & LOCAL_PROCESS != 0,
            emergency: byte & EMERGENCY != 0,
            encrypted: byte & ENCRYPTED != 0,
            broadcast: byte & BROADCAST != 0,
        }
    }

    #[must_use]
    pub fn to_byte(self) -> u8 {
        (self.require_ack as u8 * REQUIRE_ACK)
            | (self.local_process as u8 * LOCAL_PROCESS)
            | (self.emergency as u8 * EMERGENCY)
            | (self.encrypted as u8 * ENCRYPTED)
            | (self.broadcast as u8 * BROADCAST)
    }
}
