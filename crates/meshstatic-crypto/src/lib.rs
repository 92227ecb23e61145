//! Cryptographic layer for the MeshStatic mesh protocol.
//!
//! Provides the RFC 8439 ChaCha20-Poly1305 AEAD composition used to
//! protect packet payloads, the per-packet nonce construction, and the
//! rotating session-key schedule derived from the node's master key.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod aead;
pub mod error;
pub mod session;

pub use aead::{open, packet_nonce, seal, KEY_SIZE, NONCE_SIZE, TAG_SIZE};
pub use error::CryptoError;
pub use session::{derive_session_key, MasterKey, SessionKey, SessionSchedule};
