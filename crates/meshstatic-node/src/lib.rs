//! Host-side wiring for a MeshStatic node.
//!
//! This crate carries the concerns that live outside the protocol
//! engine proper: TOML configuration, tracing setup, and persistence of
//! the routing-table snapshot across reboots.

pub mod config;
pub mod error;
pub mod logging;
pub mod storage;
pub mod storage_codec;

pub use config::NodeConfig;
pub use error::NodeError;
pub use storage::{load_routes, save_routes};
