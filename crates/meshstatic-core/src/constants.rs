//! Protocol constants and enumerations for the MeshStatic wire format.

use crate::error::PacketError;

/// Fixed network magic; frames with any other value are silently dropped.
pub const NETWORK_ID: u16 = 0xFA23;
/// Current protocol version byte.
pub const PROTOCOL_VERSION: u8 = 0x01;

// Wire format sizes
pub const PACKET_SIZE: usize = 210;
pub const HEADER_SIZE: usize = 30;
pub const PAYLOAD_SIZE: usize = 180;
/// Link-layer MTU; the packet uses 210 of these and leaves headroom.
pub const LINK_MTU: usize = 250;

/// Poly1305 authentication tag length.
pub const TAG_SIZE: usize = 16;
/// Plaintext capacity of an encrypted payload: the tag shares the
/// 180-byte payload field, occupying its last 16 bytes.
pub const SEALED_PAYLOAD_SIZE: usize = PAYLOAD_SIZE - TAG_SIZE;

/// Hop budget given to packets at origination.
pub const DEFAULT_TTL: u8 = 7;

/// Message type byte of the packet header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MsgType {
    DataSensor = 0x01,
    DataActuator = 0x02,
    CmdSet = 0x03,
    CmdGet = 0x04,
    RoutingUpdate = 0x05,
    Heartbeat = 0x06,
    Discovery = 0x07,
    CmdGroup = 0x08,
    EventBroadcast = 0x09,
    DeviceStateUpdate = 0x0A,
    Ack = 0x0E,
    Nack = 0x0F,
}

impl MsgType {
    pub fn from_u8(v: u8) -> Result<Self, PacketError> {
        match v {
            0x01 => Ok(MsgType::DataSensor),
            0x02 => Ok(MsgType::DataActuator),
            0x03 => Ok(MsgType::CmdSet),
            0x04 => Ok(MsgType::CmdGet),
            0x05 => Ok(MsgType::RoutingUpdate),
            0x06 => Ok(MsgType::Heartbeat),
            0x07 => Ok(MsgType::Discovery),
            0x08 => Ok(MsgType::CmdGroup),
            0x09 => Ok(MsgType::EventBroadcast),
            0x0A => Ok(MsgType::DeviceStateUpdate),
            0x0E => Ok(MsgType::Ack),
            0x0F => Ok(MsgType::Nack),
            _ => Err(PacketError::InvalidMessageType(v)),
        }
    }

    /// Whether this type is an acknowledgement (positive or negative).
    /// ACKs are never themselves acknowledged.
    #[must_use]
    pub fn is_ack(self) -> bool {
        matches!(self, MsgType::Ack | MsgType::Nack)
    }
}
