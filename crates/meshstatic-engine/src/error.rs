//! Error types for the meshstatic-engine crate.

use core::fmt;

/// Fatal conditions that refuse to start the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// No randomness could be obtained at initialisation.
    RandomUnavailable,
    /// The supplied configuration violates an invariant.
    InvalidConfig(ConfigError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::RandomUnavailable => {
                write!(f, "random source unavailable at initialisation")
            }
            EngineError::InvalidConfig(e) => write!(f, "invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for EngineError {}

impl From<ConfigError> for EngineError {
    fn from(e: ConfigError) -> Self {
        EngineError::InvalidConfig(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The node's own address must be neither zero nor broadcast.
    InvalidSelfAddress,
    ZeroTtl,
    ZeroCapacity { table: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidSelfAddress => {
                write!(f, "self address must be neither zero nor broadcast")
            }
            ConfigError::ZeroTtl => write!(f, "default TTL must be at least 1"),
            ConfigError::ZeroCapacity { table } => {
                write!(f, "{table} capacity must be non-zero")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Synchronous errors from [`crate::MeshEngine::submit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    PayloadTooLarge { max: usize, actual: usize },
    /// No routing entry exists for the destination.
    NoRoute,
    /// The link driver signalled back-pressure.
    LinkBusy,
    /// The link driver failed outright.
    LinkFailed,
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitError::PayloadTooLarge { max, actual } => {
                write!(f, "payload of {actual} bytes exceeds maximum {max}")
            }
            SubmitError::NoRoute => write!(f, "no route to destination"),
            SubmitError::LinkBusy => write!(f, "link busy"),
            SubmitError::LinkFailed => write!(f, "link send failed"),
        }
    }
}

impl std::error::Error for SubmitError {}
