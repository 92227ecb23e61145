//! Typed payload codecs.
//!
//! Payloads occupy the leading bytes of the fixed 180-byte payload
//! field; the remainder is zero on the wire. All integers are
//! little-endian, matching the header.

use crate::error::PayloadError;
use crate::types::Address;

/// Periodic reading from a sensor node (device → coordinator).
///
/// Wire layout (18 bytes): device_type u16, timestamp u32 (seconds),
/// temperature f32, humidity f32, battery_mv u16, rssi i8, accuracy u8.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorData {
    pub device_type: u16,
    pub timestamp: u32,
    pub temperature: f32,
    pub humidity: f32,
    pub battery_mv: u16,
    pub rssi: i8,
    pub accuracy: u8,
}

impl SensorData {
    pub const WIRE_SIZE: usize = 18;

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < Self::WIRE_SIZE {
            return Err(PayloadError::TooShort {
                min: Self::WIRE_SIZE,
                actual: payload.len(),
            });
        }
        Ok(SensorData {
            device_type: u16::from_le_bytes([payload[0], payload[1]]),
            timestamp: u32::from_le_bytes([payload[2], payload[3], payload[4], payload[5]]),
            temperature: f32::from_le_bytes([payload[6], payload[7], payload[8], payload[9]]),
            humidity: f32::from_le_bytes([payload[10], payload[11], payload[12], payload[13]]),
            battery_mv: u16::from_le_bytes([payload[14], payload[15]]),
            rssi: payload[16] as i8,
            accuracy: payload[17],
        })
    }

    pub fn encode_into(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.device_type.to_le_bytes());
        out[2..6].copy_from_slice(&self.timestamp.to_le_bytes());
        out[6..10].copy_from_slice(&self.temperature.to_le_bytes());
        out[10..14].copy_from_slice(&self.humidity.to_le_bytes());
        out[14..16].copy_from_slice(&self.battery_mv.to_le_bytes());
        out[16] = self.rssi as u8;
        out[17] = self.accuracy;
    }
}

/// A command addressed to every member of a device group.
///
/// Wire layout (20 bytes): group_id u16, command_code u8,
/// parameter_len u8, parameters `[u8; 16]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupCommand {
    pub group_id: u16,
    pub command_code: u8,
    pub parameter_len: u8,
    pub parameters: [u8; 16],
}

impl GroupCommand {
    pub const WIRE_SIZE: usize = 20;

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < Self::WIRE_SIZE {
            return Err(PayloadError::TooShort {
                min: Self::WIRE_SIZE,
                actual: payload.len(),
            });
        }
        let parameter_len = payload[3];
        if parameter_len as usize > 16 {
            return Err(PayloadError::InvalidFieldLength {
                field: "parameters",
                max: 16,
                actual: parameter_len as usize,
            });
        }
        let mut parameters = [0u8; 16];
        parameters.copy_from_slice(&payload[4..20]);
        Ok(GroupCommand {
            group_id: u16::from_le_bytes([payload[0], payload[1]]),
            command_code: payload[2],
            parameter_len,
            parameters,
        })
    }

    pub fn encode_into(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.group_id.to_le_bytes());
        out[2] = self.command_code;
        out[3] = self.parameter_len;
        out[4..20].copy_from_slice(&self.parameters);
    }

    /// The meaningful prefix of the parameter block.
    #[must_use]
    pub fn parameters(&self) -> &[u8] {
        &self.parameters[..self.parameter_len as usize]
    }
}

/// An emergency event (fire, leak, intrusion) flooded through the mesh.
///
/// Wire layout (25 bytes): event_type u8, severity u8, sensor address,
/// detail_len u8, detail `[u8; 16]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmergencyEvent {
    pub event_type: u8,
    pub severity: u8,
    pub sensor: Address,
    pub detail_len: u8,
    pub detail: [u8; 16],
}

impl EmergencyEvent {
    pub const WIRE_SIZE: usize = 25;

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < Self::WIRE_SIZE {
            return Err(PayloadError::TooShort {
                min: Self::WIRE_SIZE,
                actual: payload.len(),
            });
        }
        let detail_len = payload[8];
        if detail_len as usize > 16 {
            return Err(PayloadError::InvalidFieldLength {
                field: "detail",
                max: 16,
                actual: detail_len as usize,
            });
        }
        let sensor_bytes: [u8; 6] = payload[2..8]
            .try_into()
            .expect("slice is exactly 6 bytes");
        let mut detail = [0u8; 16];
        detail.copy_from_slice(&payload[9..25]);
        Ok(EmergencyEvent {
            event_type: payload[0],
            severity: payload[1],
            sensor: Address::new(sensor_bytes),
            detail_len,
            detail,
        })
    }

    pub fn encode_into(&self, out: &mut [u8]) {
        out[0] = self.event_type;
        out[1] = self.severity;
        out[2..8].copy_from_slice(self.sensor.as_ref());
        out[8] = self.detail_len;
        out[9..25].copy_from_slice(&self.detail);
    }

    /// The meaningful prefix of the event-specific detail block.
    #[must_use]
    pub fn detail(&self) -> &[u8] {
        &self.detail[..self.detail_len as usize]
    }
}

/// Self-description sent in reply to a discovery probe.
///
/// Wire layout (9 bytes): device_type u16, role u8, battery_mv u16,
/// uptime_s u32.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceState {
    pub device_type: u16,
    pub role: u8,
    pub battery_mv: u16,
    pub uptime_s: u32,
}

impl DeviceState {
    pub const WIRE_SIZE: usize = 9;

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < Self::WIRE_SIZE {
            return Err(PayloadError::TooShort {
                min: Self::WIRE_SIZE,
                actual: payload.len(),
            });
        }
        Ok(DeviceState {
            device_type: u16::from_le_bytes([payload[0], payload[1]]),
            role: payload[2],
            battery_mv: u16::from_le_bytes([payload[3], payload[4]]),
            uptime_s: u32::from_le_bytes([payload[5], payload[6], payload[7], payload[8]]),
        })
    }

    pub fn encode_into(&self, out: &mut [u8]) {
        out[0..2].copy_from_slice(&self.device_type.to_le_bytes());
        out[2] = self.role;
        out[3..5].copy_from_slice(&self.battery_mv.to_le_bytes());
        out[5..9].copy_from_slice(&self.uptime_s.to_le_bytes());
    }
}

/// Body of an ACK or NACK: the packet id being answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckPayload {
    pub acked_packet_id: u32,
}

impl AckPayload {
    pub const WIRE_SIZE: usize = 4;

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        if payload.len() < Self::WIRE_SIZE {
            return Err(PayloadError::TooShort {
                min: Self::WIRE_SIZE,
                actual: payload.len(),
            });
        }
        Ok(AckPayload {
            acked_packet_id: u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        })
    }

    pub fn encode_into(&self, out: &mut [u8]) {
        out[0..4].copy_from_slice(&self.acked_packet_id.to_le_bytes());
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        #[test]
        fn sensor_data_roundtrip(
            device_type in any::<u16>(),
            timestamp in any::<u32>(),
            temperature in -100.0f32..150.0,
            humidity in 0.0f32..100.0,
            battery_mv in any::<u16>(),
            rssi in any::<i8>(),
            accuracy in any::<u8>(),
        ) {
            let data = SensorData {
                device_type, timestamp, temperature, humidity,
                battery_mv, rssi, accuracy,
            };
            let mut buf = [0u8; SensorData::WIRE_SIZE];
            data.encode_into(&mut buf);
            prop_assert_eq!(SensorData::decode(&buf).unwrap(), data);
        }

        #[test]
        fn group_command_roundtrip(
            group_id in any::<u16>(),
            command_code in any::<u8>(),
            parameter_len in 0u8..=16,
            parameters in any::<[u8; 16]>(),
        ) {
            let cmd = GroupCommand { group_id, command_code, parameter_len, parameters };
            let mut buf = [0u8; GroupCommand::WIRE_SIZE];
            cmd.encode_into(&mut buf);
            prop_assert_eq!(GroupCommand::decode(&buf).unwrap(), cmd);
        }

        #[test]
        fn payload_decoders_never_panic(raw in proptest::collection::vec(any::<u8>(), 0..64)) {
            let _ = SensorData::decode(&raw);
            let _ = GroupCommand::decode(&raw);
            let _ = EmergencyEvent::decode(&raw);
            let _ = DeviceState::decode(&raw);
            let _ = AckPayload::decode(&raw);
        }
    }
}
