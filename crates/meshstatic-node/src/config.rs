//! TOML-based configuration for MeshStatic nodes.

use std::path::Path;

use serde::Deserialize;

use meshstatic_core::types::Address;
use meshstatic_engine::{EngineConfig, KeyStore, Role};

use crate::error::NodeError;

/// Top-level node configuration loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct NodeConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub logging: LoggingSection,
    #[serde(default)]
    pub mesh: MeshSection,
    #[serde(default)]
    pub security: SecuritySection,
}

/// The `[node]` section.
#[derive(Debug, Default, Deserialize)]
pub struct NodeSection {
    /// This node's address, e.g. `"02:00:00:00:00:01"`. Required.
    pub address: Option<String>,
    #[serde(default)]
    pub role: RoleName,
    #[serde(default)]
    pub device_type: u16,
    /// Group ids this node participates in.
    #[serde(default)]
    pub groups: Vec<u16>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleName {
    #[default]
    Node,
    Repeater,
}

/// The `[logging]` section.
#[derive(Debug, Default, Deserialize)]
pub struct LoggingSection {
    /// Filter directive, e.g. `"debug"`; `RUST_LOG` wins when set.
    pub level: Option<String>,
    #[serde(default)]
    pub json: bool,
}

/// The `[mesh]` section: protocol knobs, all optional.
#[derive(Debug, Default, Deserialize)]
pub struct MeshSection {
    pub default_ttl: Option<u8>,
    pub heartbeat_interval_ms: Option<u32>,
    pub discovery_interval_ms: Option<u32>,
    pub routing_capacity: Option<usize>,
    pub ack_timeout_ms: Option<u32>,
    pub ack_retries: Option<u8>,
}

/// The `[security]` section.
#[derive(Debug, Default, Deserialize)]
pub struct SecuritySection {
    /// The 32-byte master key as 64 hex characters. Omitted means the
    /// node sends and accepts cleartext only.
    pub master_key: Option<String>,
    /// Initial session id; defaults to 0.
    pub session_id: Option<u32>,
}

impl NodeConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, NodeError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| NodeError::Config(format!("failed to read config file: {e}")))?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self, NodeError> {
        toml::from_str(s).map_err(|e| NodeError::Config(format!("failed to parse config: {e}")))
    }

    /// Lower this file configuration into the engine's explicit config.
    pub fn to_engine_config(&self) -> Result<EngineConfig, NodeError> {
        let address = self
            .node
            .address
            .as_deref()
            .ok_or_else(|| NodeError::Config("node.address is required".into()))?;
        let self_addr: Address = address
            .parse()
            .map_err(|e| NodeError::Config(format!("invalid node.address: {e}")))?;

        let role = match self.node.role {
            RoleName::Node => Role::Node,
            RoleName::Repeater => Role::Repeater,
        };

        let mut cfg = EngineConfig::new(self_addr, role);
        cfg.device_type = self.node.device_type;
        cfg.groups = self.node.groups.clone();
        if let Some(v) = self.mesh.default_ttl {
            cfg.default_ttl = v;
        }
        if let Some(v) = self.mesh.heartbeat_interval_ms {
            cfg.heartbeat_interval_ms = v;
        }
        if let Some(v) = self.mesh.discovery_interval_ms {
            cfg.discovery_interval_ms = v;
        }
        if let Some(v) = self.mesh.routing_capacity {
            cfg.routing_capacity = v;
        }
        if let Some(v) = self.mesh.ack_timeout_ms {
            cfg.ack_timeout_ms = v;
        }
        if let Some(v) = self.mesh.ack_retries {
            cfg.ack_retries = v;
        }

        cfg.validate()
            .map_err(|e| NodeError::Config(e.to_string()))?;
        Ok(cfg)
    }

    /// Build a key store from the `[security]` section, if one is
    /// configured.
    pub fn key_store(&self) -> Result<Option<ConfigKeyStore>, NodeError> {
        let Some(hex_key) = self.security.master_key.as_deref() else {
            return Ok(None);
        };
        let master = decode_key_hex(hex_key)?;
        Ok(Some(ConfigKeyStore {
            master,
            session_id: self.security.session_id.unwrap_or(0),
        }))
    }
}

/// Key material sourced from the configuration file.
pub struct ConfigKeyStore {
    master: [u8; 32],
    session_id: u32,
}

impl KeyStore for ConfigKeyStore {
    fn master_key(&self) -> [u8; 32] {
        self.master
    }

    fn current_session(&self) -> u32 {
        self.session_id
    }
}

fn decode_key_hex(s: &str) -> Result<[u8; 32], NodeError> {
    if !s.is_ascii() {
        return Err(NodeError::Config(
            "security.master_key contains non-hex characters".into(),
        ));
    }
    if s.len() != 64 {
        return Err(NodeError::Config(format!(
            "security.master_key must be 64 hex characters, got {}",
            s.len()
        )));
    }
    let mut key = [0u8; 32];
    for (i, slot) in key.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&s[i * 2..i * 2 + 2], 16).map_err(|_| {
            NodeError::Config("security.master_key contains non-hex characters".into())
        })?;
    }
    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
        [node]
        address = "02:00:00:00:00:01"
        role = "repeater"
        device_type = 3
        groups = [1, 7]

        [logging]
        level = "debug"
        json = true

        [mesh]
        default_ttl = 5
        heartbeat_interval_ms = 15000
        ack_retries = 2

        [security]
        master_key = "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
        session_id = 42
    "#;

    #[test]
    fn test_parse_full_config() {
        let cfg = NodeConfig::parse(FULL).unwrap();
        assert_eq!(cfg.node.role, RoleName::Repeater);
        assert_eq!(cfg.node.groups, vec![1, 7]);
        assert_eq!(cfg.logging.level.as_deref(), Some("debug"));
        assert!(cfg.logging.json);

        let engine = cfg.to_engine_config().unwrap();
        assert_eq!(engine.role, Role::Repeater);
        assert_eq!(engine.default_ttl, 5);
        assert_eq!(engine.heartbeat_interval_ms, 15_000);
        assert_eq!(engine.ack_retries, 2);
        assert_eq!(engine.device_type, 3);
        // Untouched knobs keep protocol defaults.
        assert_eq!(engine.dedup_window_ms, 30_000);
    }

    #[test]
    fn test_key_store_from_config() {
        let cfg = NodeConfig::parse(FULL).unwrap();
        let ks = cfg.key_store().unwrap().unwrap();
        assert_eq!(ks.current_session(), 42);
        let expected: Vec<u8> =
            hex::decode("000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f")
                .unwrap();
        assert_eq!(ks.master_key().as_slice(), expected.as_slice());
    }

    #[test]
    fn test_minimal_config_defaults() {
        let cfg = NodeConfig::parse("[node]\naddress = \"02:00:00:00:00:09\"\n").unwrap();
        let engine = cfg.to_engine_config().unwrap();
        assert_eq!(engine.role, Role::Node);
        assert_eq!(engine.heartbeat_interval_ms, 60_000);
        assert!(cfg.key_store().unwrap().is_none());
    }

    #[test]
    fn test_missing_address_is_an_error() {
        let cfg = NodeConfig::parse("").unwrap();
        let err = cfg.to_engine_config().unwrap_err();
        assert!(err.to_string().contains("node.address"));
    }

    #[test]
    fn test_invalid_address_is_an_error() {
        let cfg = NodeConfig::parse("[node]\naddress = \"not-a-mac\"\n").unwrap();
        assert!(cfg.to_engine_config().is_err());
    }

    #[test]
    fn test_broadcast_address_rejected_by_validation() {
        let cfg = NodeConfig::parse("[node]\naddress = \"FF:FF:FF:FF:FF:FF\"\n").unwrap();
        assert!(cfg.to_engine_config().is_err());
    }

    #[test]
    fn test_bad_master_key_rejected() {
        for bad in ["abcd", &"zz".repeat(32)] {
            let toml = format!("[security]\nmaster_key = \"{bad}\"\n");
            let cfg = NodeConfig::parse(&toml).unwrap();
            assert!(cfg.key_store().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_unknown_role_fails_to_parse() {
        assert!(NodeConfig::parse("[node]\nrole = \"gateway\"\n").is_err());
    }
}
