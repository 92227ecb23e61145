//! Core types, constants, and wire formats for the MeshStatic mesh protocol.
//!
//! This crate defines the node address type, the fixed 210-byte packet
//! layout, the flag and message-type enumerations, and the typed payload
//! codecs shared by every node role.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod constants;
pub mod error;
pub mod packet;
pub mod payload;
pub mod types;

pub use constants::MsgType;
pub use error::{PacketError, PayloadError};
pub use packet::flags::PacketFlags;
pub use packet::wire::Packet;
pub use payload::{AckPayload, DeviceState, EmergencyEvent, GroupCommand, SensorData};
pub use types::{Address, InvalidLength};
