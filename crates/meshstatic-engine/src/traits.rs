//! Collaborator seams consumed by the engine.
//!
//! The engine is single-threaded and cooperative, so these are small
//! synchronous traits; concrete drivers bridge them to whatever I/O
//! model the host platform uses. No runtime is required or assumed.

use meshstatic_core::payload::{EmergencyEvent, SensorData};
use meshstatic_core::types::Address;

use core::fmt;

/// Error from a non-blocking link transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSendError {
    /// The driver is applying back-pressure; the frame was not queued.
    Busy,
    /// The driver failed to hand the frame to the radio.
    Failed,
}

/// The broadcast-capable link layer.
pub trait LinkDriver {
    /// Queue a frame for transmission to `next_hop` (possibly the
    /// broadcast address). Must not block.
    fn send(&mut self, next_hop: Address, frame: &[u8]) -> Result<(), LinkSendError>;
}

/// Monotonic millisecond clock. Wraps around every ~49.7 days; all
/// engine arithmetic on these values is wrap-aware.
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Failure to obtain randomness. Fatal at engine construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomError;

impl fmt::Display for RandomError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "random source unavailable")
    }
}

impl std::error::Error for RandomError {}

/// Cryptographically strong randomness.
pub trait RandomSource {
    fn try_fill(&mut self, buf: &mut [u8]) -> Result<(), RandomError>;
}

/// Access to the node's provisioned key material.
pub trait KeyStore {
    /// The 32-byte master key. Held by the engine in a wipe-on-drop
    /// container for the rest of its life.
    fn master_key(&self) -> [u8; 32];

    /// The session id to adopt at startup (for example, days since the
    /// deployment epoch). Sessions advance monotonically from here.
    fn current_session(&self) -> u32;
}

/// Advisory signals raised while delivering sensor data.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Advisory {
    HighTemperature { celsius: f32 },
    LowBattery { millivolts: u16 },
}

/// Local delivery surface for packets addressed to this node.
pub trait EventSink {
    /// A sensor reading reached this node.
    fn on_sensor(&mut self, src: Address, data: SensorData);

    /// A command payload (set/get/actuator/group) reached this node.
    fn on_command(&mut self, src: Address, payload: &[u8]);

    /// An emergency event reached this node.
    fn on_event(&mut self, src: Address, event: EmergencyEvent);

    /// A sensor reading crossed an advisory threshold.
    fn on_advisory(&mut self, src: Address, advisory: Advisory) {
        let _ = (src, advisory);
    }

    /// A `REQUIRE_ACK` submission exhausted its retries without an ACK,
    /// or was answered with a NACK.
    fn on_delivery_failed(&mut self, packet_id: u32) {
        let _ = packet_id;
    }
}
