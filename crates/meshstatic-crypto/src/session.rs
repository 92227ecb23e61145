//! Session-key derivation and the 24-hour rotation schedule.
//!
//! A session is a key epoch identified by a 32-bit id. The session key
//! is derived from the node's master key and the session id; the id
//! advances once per lifetime and the outgoing key stays valid for a
//! short overlap window so in-flight packets still decrypt across the
//! boundary. Key material lives in wipe-on-drop containers.
//!
//! All timestamps are monotonic milliseconds in `u32`; the arithmetic
//! is wrap-around aware throughout.

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::aead::{self, KEY_SIZE, NONCE_SIZE};

/// Default key epoch length: 24 hours.
pub const SESSION_LIFETIME_MS: u32 = 24 * 60 * 60 * 1000;
/// Default window during which the previous session key still decrypts.
pub const SESSION_OVERLAP_MS: u32 = 5 * 60 * 1000;

/// The node's long-lived master key. Never transmitted; wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    pub fn new(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

/// A derived session key bound to its epoch id. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    id: u32,
    key: [u8; KEY_SIZE],
}

impl SessionKey {
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }
}

/// Derive the session key for an epoch.
///
/// The construction reuses the packet AEAD as its KDF so the node
/// carries no additional primitive: the master key and big-endian
/// session id are encrypted under the master key with the zero nonce,
/// and the first 32 ciphertext bytes become the session key.
pub fn derive_session_key(master: &MasterKey, session_id: u32) -> SessionKey {
    let mut buf = [0u8; KEY_SIZE + 4];
    buf[..KEY_SIZE].copy_from_slice(master.as_bytes());
    buf[KEY_SIZE..].copy_from_slice(&session_id.to_be_bytes());

    let zero_nonce = [0u8; NONCE_SIZE];
    let mut tag = aead::seal(master.as_bytes(), &zero_nonce, &[], &mut buf);
    tag.zeroize();

    let mut key = [0u8; KEY_SIZE];
    key.copy_from_slice(&buf[..KEY_SIZE]);
    buf.zeroize();

    SessionKey {
        id: session_id,
        key,
    }
}

/// Owns the master key and the rotating session state.
pub struct SessionSchedule {
    master: MasterKey,
    current: SessionKey,
    previous: Option<SessionKey>,
    overlap_started: u32,
    epoch_started: u32,
    lifetime_ms: u32,
    overlap_ms: u32,
}

impl SessionSchedule {
    pub fn new(master: MasterKey, initial_id: u32, now: u32) -> Self {
        Self::with_policy(master, initial_id, now, SESSION_LIFETIME_MS, SESSION_OVERLAP_MS)
    }

    pub fn with_policy(
        master: MasterKey,
        initial_id: u32,
        now: u32,
        lifetime_ms: u32,
        overlap_ms: u32,
    ) -> Self {
        let current = derive_session_key(&master, initial_id);
        Self {
            master,
            current,
            previous: None,
            overlap_started: now,
            epoch_started: now,
            lifetime_ms,
            overlap_ms,
        }
    }

    /// Advance the schedule. Returns `true` when a new epoch was adopted.
    ///
    /// Called periodically from the tick loop; also retires the previous
    /// key once its overlap window closes.
    pub fn maybe_rotate(&mut self, now: u32) -> bool {
        if self.previous.is_some() && now.wrapping_sub(self.overlap_started) >= self.overlap_ms {
            self.previous = None;
        }

        if now.wrapping_sub(self.epoch_started) < self.lifetime_ms {
            return false;
        }

        let next = derive_session_key(&self.master, self.current.id.wrapping_add(1));
        let outgoing = core::mem::replace(&mut self.current, next);
        self.previous = Some(outgoing);
        self.overlap_started = now;
        self.epoch_started = now;
        true
    }

    #[must_use]
    pub fn current(&self) -> &SessionKey {
        &self.current
    }

    /// Decrypt candidates in trial order: the current key, then the
    /// previous key while its overlap window is open.
    #[must_use]
    pub fn candidates(&self, now: u32) -> (&SessionKey, Option<&SessionKey>) {
        let previous = self
            .previous
            .as_ref()
            .filter(|_| now.wrapping_sub(self.overlap_started) < self.overlap_ms);
        (&self.current, previous)
    }
}
