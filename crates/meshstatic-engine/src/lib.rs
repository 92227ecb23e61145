//! Routing and packet-processing engine for the MeshStatic mesh protocol.
//!
//! The engine owns all mutable protocol state (routing table, duplicate
//! cache, pending-ACK set, counters) and is driven entirely by external
//! calls: the link driver feeds frames through [`MeshEngine::ingest`],
//! the application submits datagrams through [`MeshEngine::submit`],
//! and the host timer pumps [`MeshEngine::tick`]. It performs no
//! blocking I/O and spawns nothing.

pub mod config;
pub mod counters;
pub mod dedup;
pub mod engine;
pub mod error;
pub mod routing;
pub mod traits;
pub mod waiters;

pub use config::{EngineConfig, Role};
pub use counters::{Counters, DropKind, IngestOutcome};
pub use dedup::SeenCache;
pub use engine::MeshEngine;
pub use error::{ConfigError, EngineError, SubmitError};
pub use routing::{DeviceStatus, RouteEntry, RouteTable};
pub use traits::{
    Advisory, Clock, EventSink, KeyStore, LinkDriver, LinkSendError, RandomError, RandomSource,
};
pub use waiters::{AckWaiters, Expiry};
