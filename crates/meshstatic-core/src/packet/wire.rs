//! Fixed-layout packet wire format parsing and serialization.
//!
//! The frame is exactly 210 bytes: a 30-byte header followed by the
//! 180-byte payload field. Multi-byte integers are little-endian.
//! The codec is a pure byte-layout mapping; semantic validation
//! (network id, version, TTL, address classes) belongs to the engine.
//!
//! ```text
//! offset  size  field
//!      0     2  network_id (LE)
//!      2     1  version
//!      3     1  ttl
//!      4     4  packet_id (LE)
//!      8     6  src
//!     14     6  dst
//!     20     6  last_hop
//!     26     1  msg_type
//!     27     1  flags
//!     28     2  group_id (LE)
//!     30   180  payload
//! ```

use crate::constants::{HEADER_SIZE, MsgType, PACKET_SIZE, PAYLOAD_SIZE};
use crate::error::PacketError;
use crate::packet::flags::PacketFlags;
use crate::types::Address;

const OFF_NETWORK_ID: usize = 0;
const OFF_VERSION: usize = 2;
const OFF_TTL: usize = 3;
const OFF_PACKET_ID: usize = 4;
const OFF_SRC: usize = 8;
const OFF_DST: usize = 14;
const OFF_LAST_HOP: usize = 20;
const OFF_MSG_TYPE: usize = 26;
const OFF_FLAGS: usize = 27;
const OFF_GROUP_ID: usize = 28;
const OFF_PAYLOAD: usize = 30;

/// A decoded mesh packet.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use]
pub struct Packet {
    pub network_id: u16,
    pub version: u8,
    pub ttl: u8,
    pub packet_id: u32,
    pub src: Address,
    pub dst: Address,
    pub last_hop: Address,
    pub msg_type: MsgType,
    pub flags: PacketFlags,
    pub group_id: u16,
    pub payload: [u8; PAYLOAD_SIZE],
}

impl Packet {
    /// Decode a packet from wire bytes.
    ///
    /// Fails when the input is shorter than the fixed frame size or the
    /// message-type byte is not a known value. Trailing bytes beyond
    /// the frame are ignored.
    #[must_use = "decoding may fail; check the Result"]
    pub fn decode(raw: &[u8]) -> Result<Self, PacketError> {
        if raw.len() < PACKET_SIZE {
            return Err(PacketError::TooShort {
                min: PACKET_SIZE,
                actual: raw.len(),
            });
        }

        let network_id = u16::from_le_bytes([raw[OFF_NETWORK_ID], raw[OFF_NETWORK_ID + 1]]);
        let version = raw[OFF_VERSION];
        let ttl = raw[OFF_TTL];
        let packet_id = u32::from_le_bytes(
            raw[OFF_PACKET_ID..OFF_PACKET_ID + 4]
                .try_into()
                .expect("slice is exactly 4 bytes"),
        );

        let src_bytes: [u8; 6] = raw[OFF_SRC..OFF_SRC + 6]
            .try_into()
            .expect("slice is exactly 6 bytes");
        let dst_bytes: [u8; 6] = raw[OFF_DST..OFF_DST + 6]
            .try_into()
            .expect("slice is exactly 6 bytes");
        let hop_bytes: [u8; 6] = raw[OFF_LAST_HOP..OFF_LAST_HOP + 6]
            .try_into()
            .expect("slice is exactly 6 bytes");

        let msg_type = MsgType::from_u8(raw[OFF_MSG_TYPE])?;
        let flags = PacketFlags::from_byte(raw[OFF_FLAGS]);
        let group_id = u16::from_le_bytes([raw[OFF_GROUP_ID], raw[OFF_GROUP_ID + 1]]);

        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&raw[OFF_PAYLOAD..PACKET_SIZE]);

        Ok(Packet {
            network_id,
            version,
            ttl,
            packet_id,
            src: Address::new(src_bytes),
            dst: Address::new(dst_bytes),
            last_hop: Address::new(hop_bytes),
            msg_type,
            flags,
            group_id,
            payload,
        })
    }

    /// Serialize the packet to its fixed 210-byte wire form. Never fails.
    #[must_use = "serialization produces a new frame without modifying the packet"]
    pub fn encode(&self) -> [u8; PACKET_SIZE] {
        let mut raw = [0u8; PACKET_SIZE];
        self.write_header(&mut raw);
        raw[OFF_PAYLOAD..].copy_from_slice(&self.payload);
        raw
    }

    /// The associated data authenticated alongside an encrypted payload:
    /// the 30-byte header with the `ttl` and `last_hop` fields zeroed,
    /// since those mutate at every relay hop.
    #[must_use = "returns the AAD bytes without modifying the packet"]
    pub fn aad_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut aad = [0u8; HEADER_SIZE];
        self.write_header(&mut aad);
        aad[OFF_TTL] = 0;
        aad[OFF_LAST_HOP..OFF_LAST_HOP + 6].fill(0);
        aad
    }

    fn write_header(&self, out: &mut [u8]) {
        out[OFF_NETWORK_ID..OFF_NETWORK_ID + 2].copy_from_slice(&self.network_id.to_le_bytes());
        out[OFF_VERSION] = self.version;
        out[OFF_TTL] = self.ttl;
        out[OFF_PACKET_ID..OFF_PACKET_ID + 4].copy_from_slice(&self.packet_id.to_le_bytes());
        out[OFF_SRC..OFF_SRC + 6].copy_from_slice(self.src.as_ref());
        out[OFF_DST..OFF_DST + 6].copy_from_slice(self.dst.as_ref());
        out[OFF_LAST_HOP..OFF_LAST_HOP + 6].copy_from_slice(self.last_hop.as_ref());
        out[OFF_MSG_TYPE] = self.msg_type as u8;
        out[OFF_FLAGS] = self.flags.to_byte();
        out[OFF_GROUP_ID..OFF_GROUP_ID + 2].copy_from_slice(&self.group_id.to_le_bytes());
    }
}
