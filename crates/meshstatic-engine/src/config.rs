//! Engine configuration.

use meshstatic_core::constants::DEFAULT_TTL;
use meshstatic_core::types::Address;

use crate::error::ConfigError;

/// The node's role in the mesh; governs the heartbeat cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// An ordinary node (sensor, actuator, coordinator).
    Node,
    /// A dedicated relay; heartbeats twice as often so neighbours keep
    /// routing through it.
    Repeater,
}

impl Role {
    #[must_use]
    pub fn default_heartbeat_interval_ms(self) -> u32 {
        match self {
            Role::Node => 60_000,
            Role::Repeater => 30_000,
        }
    }
}

/// Explicit configuration passed at engine construction.
///
/// Every cadence and window carries the protocol default; hosts
/// normally only set the address, role, and group memberships.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub self_addr: Address,
    pub role: Role,
    /// Reported in discovery replies.
    pub device_type: u16,
    /// Group ids this node participates in (for `CMD_GROUP` delivery).
    pub groups: Vec<u16>,

    pub default_ttl: u8,

    // Bounded-table capacities; all memory is allocated up front.
    pub routing_capacity: usize,
    pub dedup_capacity: usize,
    pub waiter_capacity: usize,

    // Timer cadences.
    pub heartbeat_interval_ms: u32,
    pub discovery_interval_ms: u32,
    pub sweep_interval_ms: u32,
    pub dedup_purge_interval_ms: u32,
    pub session_check_interval_ms: u32,

    // Protocol windows.
    pub dedup_window_ms: u32,
    pub online_window_ms: u32,
    pub offline_horizon_ms: u32,
    pub session_lifetime_ms: u32,
    pub session_overlap_ms: u32,

    // Acknowledgement policy.
    pub ack_timeout_ms: u32,
    pub ack_retries: u8,
}

/// Bounds the configurable ACK deadline.
pub const ACK_TIMEOUT_MIN_MS: u32 = 500;
pub const ACK_TIMEOUT_MAX_MS: u32 = 5_000;

impl EngineConfig {
    pub fn new(self_addr: Address, role: Role) -> Self {
        EngineConfig {
            self_addr,
            role,
            device_type: 0,
            groups: Vec::new(),
            default_ttl: DEFAULT_TTL,
            routing_capacity: 100,
            dedup_capacity: 128,
            waiter_capacity: 16,
            heartbeat_interval_ms: role.default_heartbeat_interval_ms(),
            discovery_interval_ms: 600_000,
            sweep_interval_ms: 60_000,
            dedup_purge_interval_ms: 30_000,
            session_check_interval_ms: 60_000,
            dedup_window_ms: 30_000,
            online_window_ms: 300_000,
            offline_horizon_ms: 3_600_000,
            session_lifetime_ms: meshstatic_crypto::session::SESSION_LIFETIME_MS,
            session_overlap_ms: meshstatic_crypto::session::SESSION_OVERLAP_MS,
            ack_timeout_ms: 2_000,
            ack_retries: 1,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.self_addr.is_zero() || self.self_addr.is_broadcast() {
            return Err(ConfigError::InvalidSelfAddress);
        }
        if self.default_ttl == 0 {
            return Err(ConfigError::ZeroTtl);
        }
        if self.routing_capacity == 0 {
            return Err(ConfigError::ZeroCapacity { table: "routing" });
        }
        if self.dedup_capacity == 0 {
            return Err(ConfigError::ZeroCapacity { table: "dedup" });
        }
        if self.waiter_capacity == 0 {
            return Err(ConfigError::ZeroCapacity { table: "waiter" });
        }
        Ok(())
    }

    /// The ACK deadline actually applied, clamped to its bounds.
    #[must_use]
    pub fn effective_ack_timeout_ms(&self) -> u32 {
        self.ack_timeout_ms
            .clamp(ACK_TIMEOUT_MIN_MS, ACK_TIMEOUT_MAX_MS)
    }

    #[must_use]
    pub fn is_group_member(&self, group_id: u16) -> bool {
        group_id != 0 && self.groups.contains(&group_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr() -> Address {
        Address::new([0x02, 0, 0, 0, 0, 0x01])
    }

    #[test]
    fn test_defaults_match_protocol() {
        let cfg = EngineConfig::new(addr(), Role::Node);
        assert_eq!(cfg.default_ttl, 7);
        assert_eq!(cfg.routing_capacity, 100);
        assert_eq!(cfg.dedup_capacity, 128);
        assert_eq!(cfg.heartbeat_interval_ms, 60_000);
        assert_eq!(cfg.dedup_window_ms, 30_000);
        assert_eq!(cfg.online_window_ms, 300_000);
        assert_eq!(cfg.session_lifetime_ms, 86_400_000);
        assert_eq!(cfg.session_overlap_ms, 300_000);
        cfg.validate().unwrap();
    }

    #[test]
    fn test_repeater_heartbeat_is_faster() {
        let cfg = EngineConfig::new(addr(), Role::Repeater);
        assert_eq!(cfg.heartbeat_interval_ms, 30_000);
    }

    #[test]
    fn test_validate_rejects_bad_self_addr() {
        let zero = EngineConfig::new(Address::new([0; 6]), Role::Node);
        assert_eq!(zero.validate(), Err(ConfigError::InvalidSelfAddress));

        let bcast = EngineConfig::new(Address::BROADCAST, Role::Node);
        assert_eq!(bcast.validate(), Err(ConfigError::InvalidSelfAddress));
    }

    #[test]
    fn test_validate_rejects_zero_ttl_and_capacity() {
        let mut cfg = EngineConfig::new(addr(), Role::Node);
        cfg.default_ttl = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroTtl));

        let mut cfg = EngineConfig::new(addr(), Role::Node);
        cfg.dedup_capacity = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ZeroCapacity { table: "dedup" })
        ));
    }

    #[test]
    fn test_ack_timeout_clamped() {
        let mut cfg = EngineConfig::new(addr(), Role::Node);
        assert_eq!(cfg.effective_ack_timeout_ms(), 2_000);
        cfg.ack_timeout_ms = 10;
        assert_eq!(cfg.effective_ack_timeout_ms(), 500);
        cfg.ack_timeout_ms = 60_000;
        assert_eq!(cfg.effective_ack_timeout_ms(), 5_000);
    }

    #[test]
    fn test_group_membership() {
        let mut cfg = EngineConfig::new(addr(), Role::Node);
        cfg.groups = vec![1, 7];
        assert!(cfg.is_group_member(7));
        assert!(!cfg.is_group_member(2));
        // Group 0 means "no group" on the wire.
        assert!(!cfg.is_group_member(0));
    }
}
