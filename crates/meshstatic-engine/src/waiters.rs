//! The outbound-waiting set for `REQUIRE_ACK` submissions.
//!
//! Each entry holds the encoded frame so an unanswered deadline can
//! retransmit it verbatim. The set is bounded; registering past the
//! capacity evicts the oldest waiter, which is then reported as failed.

use meshstatic_core::constants::PACKET_SIZE;
use meshstatic_core::types::Address;

/// One submission awaiting its ACK.
#[derive(Debug, Clone)]
pub struct PendingAck {
    pub packet_id: u32,
    pub next_hop: Address,
    pub frame: [u8; PACKET_SIZE],
    pub deadline: u32,
    pub retries_left: u8,
}

/// What to do about a waiter whose deadline passed.
#[derive(Debug, Clone)]
pub enum Expiry {
    /// Send the frame again; the waiter stays registered with a new
    /// deadline.
    Retransmit {
        packet_id: u32,
        next_hop: Address,
        frame: [u8; PACKET_SIZE],
    },
    /// Retries exhausted; surface `DeliveryFailed` to the submitter.
    Failed(u32),
}

/// Bounded set of submissions awaiting acknowledgement.
pub struct AckWaiters {
    entries: Vec<PendingAck>,
    capacity: usize,
    timeout_ms: u32,
}

impl AckWaiters {
    pub fn new(capacity: usize, timeout_ms: u32) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            timeout_ms,
        }
    }

    /// Register a submission. When the set is full the oldest waiter is
    /// evicted and returned so the caller can report its failure.
    pub fn register(
        &mut self,
        packet_id: u32,
        next_hop: Address,
        frame: [u8; PACKET_SIZE],
        now: u32,
        retries: u8,
    ) -> Option<PendingAck> {
        let evicted = if self.entries.len() == self.capacity {
            Some(self.entries.remove(0))
        } else {
            None
        };

        self.entries.push(PendingAck {
            packet_id,
            next_hop,
            frame,
            deadline: now.wrapping_add(self.timeout_ms),
            retries_left: retries,
        });
        evicted
    }

    /// Resolve a waiter by the packet id an ACK referenced. Returns
    /// whether anything was waiting.
    pub fn acknowledge(&mut self, packet_id: u32) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.packet_id != packet_id);
        self.entries.len() != before
    }

    /// Remove and return a waiter (used for NACK fast-failure).
    pub fn take(&mut self, packet_id: u32) -> Option<PendingAck> {
        let idx = self.entries.iter().position(|e| e.packet_id == packet_id)?;
        Some(self.entries.remove(idx))
    }

    /// Collect every waiter whose deadline has passed. Waiters with
    /// retries remaining are re-armed; the rest are removed.
    pub fn expire(&mut self, now: u32) -> Vec<Expiry> {
        let mut out = Vec::new();
        let timeout = self.timeout_ms;
        self.entries.retain_mut(|e| {
            let due = now.wrapping_sub(e.deadline) < u32::MAX / 2;
            if !due {
                return true;
            }
            if e.retries_left > 0 {
                e.retries_left -= 1;
                e.deadline = now.wrapping_add(timeout);
                out.push(Expiry::Retransmit {
                    packet_id: e.packet_id,
                    next_hop: e.next_hop,
                    frame: e.frame,
                });
                true
            } else {
                out.push(Expiry::Failed(e.packet_id));
                false
            }
        });
        out
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
