//! The routing table: bounded device records with parent/last-hop
//! learning and staleness-driven eviction.
//!
//! Every validated ingress refreshes the record for its source. The
//! parent field names the neighbour a packet should be handed to when
//! the destination is not a direct neighbour; parents are addresses,
//! not references, so resolution is always a table lookup.

use meshstatic_core::types::Address;

/// Freshness classification of a routing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceStatus {
    /// Heard from within the online window (default 5 minutes).
    Online,
    /// Quiet past the online window but not yet evicted.
    Stale,
    /// Quiet past the offline horizon; the next sweep evicts it.
    Offline,
}

impl DeviceStatus {
    #[must_use]
    pub fn from_age(age_ms: u32, online_window_ms: u32, offline_horizon_ms: u32) -> Self {
        if age_ms < online_window_ms {
            DeviceStatus::Online
        } else if age_ms < offline_horizon_ms {
            DeviceStatus::Stale
        } else {
            DeviceStatus::Offline
        }
    }
}

/// One known device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub device: Address,
    /// Neighbour to hand packets to when the destination is not a
    /// direct neighbour. Equals the device itself for direct neighbours.
    pub parent: Address,
    pub rssi_dbm: i8,
    pub last_seen_ms: u32,
    pub status: DeviceStatus,
    pub battery_mv: Option<u16>,
}

/// Bounded routing table; memory is allocated once at construction.
pub struct RouteTable {
    entries: Vec<RouteEntry>,
    capacity: usize,
    online_window_ms: u32,
    offline_horizon_ms: u32,
}

impl RouteTable {
    pub fn new(capacity: usize, online_window_ms: u32, offline_horizon_ms: u32) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            capacity,
            online_window_ms,
            offline_horizon_ms,
        }
    }

    /// Record a sighting of `src` relayed by `last_hop`.
    ///
    /// Creates the entry when absent (parent = last hop); otherwise
    /// refreshes freshness and signal, and re-learns the parent only
    /// when the packet arrived through a relay (`last_hop != src`).
    /// Returns `true` when a live entry had to be evicted to make room
    /// (FIFO by staleness).
    pub fn observe(&mut self, src: Address, last_hop: Address, rssi: i8, now: u32) -> bool {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.device == src) {
            entry.last_seen_ms = now;
            entry.rssi_dbm = rssi;
            entry.status = DeviceStatus::Online;
            if last_hop != src {
                entry.parent = last_hop;
            }
            return false;
        }

        let mut evicted = false;
        if self.entries.len() == self.capacity {
            if let Some(oldest) = self.oldest_index(now) {
                self.entries.swap_remove(oldest);
                evicted = true;
            }
        }

        self.entries.push(RouteEntry {
            device: src,
            parent: last_hop,
            rssi_dbm: rssi,
            last_seen_ms: now,
            status: DeviceStatus::Online,
            battery_mv: None,
        });
        evicted
    }

    fn oldest_index(&self, now: u32) -> Option<usize> {
        self.entries
            .iter()
            .enumerate()
            .max_by_key(|(_, e)| now.wrapping_sub(e.last_seen_ms))
            .map(|(i, _)| i)
    }

    #[must_use]
    pub fn lookup(&self, dst: &Address) -> Option<&RouteEntry> {
        self.entries.iter().find(|e| e.device == *dst)
    }

    /// Attach a battery reading to an existing entry.
    pub fn set_battery(&mut self, device: &Address, battery_mv: u16) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.device == *device) {
            entry.battery_mv = Some(battery_mv);
        }
    }

    /// Next-hop selection for a unicast destination.
    ///
    /// Direct when this node is the destination's parent, otherwise the
    /// recorded parent; `None` when the destination is unknown.
    #[must_use]
    pub fn next_hop(&self, self_addr: &Address, dst: &Address) -> Option<Address> {
        let entry = self.lookup(dst)?;
        if entry.parent == *self_addr {
            Some(entry.device)
        } else {
            Some(entry.parent)
        }
    }

    /// Reclassify freshness and evict entries past the offline horizon.
    /// Returns the number of entries evicted.
    pub fn sweep(&mut self, now: u32) -> usize {
        let before = self.entries.len();
        let online = self.online_window_ms;
        let horizon = self.offline_horizon_ms;
        for entry in &mut self.entries {
            entry.status =
                DeviceStatus::from_age(now.wrapping_sub(entry.last_seen_ms), online, horizon);
        }
        self.entries
            .retain(|e| now.wrapping_sub(e.last_seen_ms) < horizon);
        before - self.entries.len()
    }

    /// Whether the entry is inside the online window right now. The
    /// table is authoritative for online status.
    #[must_use]
    pub fn is_online(&self, device: &Address, now: u32) -> bool {
        self.lookup(device)
            .is_some_and(|e| now.wrapping_sub(e.last_seen_ms) < self.online_window_ms)
    }

    /// Copy of the table for the admin surface.
    #[must_use]
    pub fn snapshot(&self) -> Vec<RouteEntry> {
        self.entries.clone()
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

#[cfg(test)]
mod tests {
    use super::*;

    const ONLINE: u32 = 300_000;
    const HORIZON: u32 = 3_600_000;

    fn table() -> RouteTable {
        RouteTable::new(100, ONLINE, HORIZON)
    }

    fn addr(seed: u8) -> Address {
        Address::new([0x02, 0, 0, 0, 0, seed])
    }

    #[test]
    fn test_observe_creates_with_parent() {
        let mut t = table();
        assert!(!t.observe(addr(5), addr(9), -60, 1_000));

        let entry = t.lookup(&addr(5)).unwrap();
        assert_eq!(entry.parent, addr(9));
        assert_eq!(entry.rssi_dbm, -60);
        assert_eq!(entry.last_seen_ms, 1_000);
        assert_eq!(entry.status, DeviceStatus::Online);
        assert_eq!(entry.battery_mv, None);
    }

    #[test]
    fn test_observe_refreshes_and_relearns_parent_via_relay() {
        let mut t = table();
        t.observe(addr(5), addr(5), -60, 1_000); // direct neighbour
        t.observe(addr(5), addr(9), -70, 2_000); // now heard via relay 9

        let entry = t.lookup(&addr(5)).unwrap();
        assert_eq!(entry.parent, addr(9));
        assert_eq!(entry.rssi_dbm, -70);
        assert_eq!(entry.last_seen_ms, 2_000);
    }

    #[test]
    fn test_observe_direct_sighting_keeps_learned_parent() {
        let mut t = table();
        t.observe(addr(5), addr(9), -70, 1_000);
        // A direct frame (last_hop == src) refreshes but must not
        // overwrite the parent with the device itself.
        t.observe(addr(5), addr(5), -50, 2_000);
        assert_eq!(t.lookup(&addr(5)).unwrap().parent, addr(9));
    }

    #[test]
    fn test_next_hop_direct_when_we_are_parent() {
        let self_addr = addr(1);
        let mut t = table();
        // Device 5 was learned directly from us: parent is us.
        t.observe(addr(5), self_addr, -60, 0);
        assert_eq!(t.next_hop(&self_addr, &addr(5)), Some(addr(5)));
    }

    #[test]
    fn test_next_hop_via_parent() {
        let self_addr = addr(1);
        let mut t = table();
        t.observe(addr(5), addr(9), -60, 0);
        assert_eq!(t.next_hop(&self_addr, &addr(5)), Some(addr(9)));
    }

    #[test]
    fn test_next_hop_unknown_destination() {
        let t = table();
        assert_eq!(t.next_hop(&addr(1), &addr(77)), None);
    }

    #[test]
    fn test_full_table_evicts_stalest() {
        let mut t = RouteTable::new(3, ONLINE, HORIZON);
        t.observe(addr(1), addr(1), -50, 100);
        t.observe(addr(2), addr(2), -50, 200); // stalest after refresh below
        t.observe(addr(3), addr(3), -50, 300);
        t.observe(addr(1), addr(1), -50, 400);

        assert!(t.observe(addr(4), addr(4), -50, 500));
        assert_eq!(t.len(), 3);
        assert!(t.lookup(&addr(2)).is_none(), "stalest entry evicted");
        assert!(t.lookup(&addr(1)).is_some());
        assert!(t.lookup(&addr(4)).is_some());
    }

    #[test]
    fn test_sweep_reclassifies_and_evicts() {
        let mut t = table();
        t.observe(addr(1), addr(1), -50, 0);
        t.observe(addr(2), addr(2), -50, ONLINE);
        t.observe(addr(3), addr(3), -50, HORIZON);

        // At t = HORIZON: entry 1 has aged exactly to the horizon and is
        // evicted; entry 2 is stale; entry 3 is fresh.
        let removed = t.sweep(HORIZON);
        assert_eq!(removed, 1);
        assert!(t.lookup(&addr(1)).is_none());
        assert_eq!(t.lookup(&addr(2)).unwrap().status, DeviceStatus::Stale);
        assert_eq!(t.lookup(&addr(3)).unwrap().status, DeviceStatus::Online);
    }

    #[test]
    fn test_online_window_boundary() {
        let mut t = table();
        t.observe(addr(1), addr(1), -50, 0);
        assert!(t.is_online(&addr(1), ONLINE - 1));
        assert!(!t.is_online(&addr(1), ONLINE));
    }

    #[test]
    fn test_status_from_age() {
        assert_eq!(
            DeviceStatus::from_age(0, ONLINE, HORIZON),
            DeviceStatus::Online
        );
        assert_eq!(
            DeviceStatus::from_age(ONLINE, ONLINE, HORIZON),
            DeviceStatus::Stale
        );
        assert_eq!(
            DeviceStatus::from_age(HORIZON, ONLINE, HORIZON),
            DeviceStatus::Offline
        );
    }

    #[test]
    fn test_set_battery() {
        let mut t = table();
        t.observe(addr(1), addr(1), -50, 0);
        t.set_battery(&addr(1), 3100);
        assert_eq!(t.lookup(&addr(1)).unwrap().battery_mv, Some(3100));
        // Unknown device is a no-op.
        t.set_battery(&addr(9), 3000);
        assert!(t.lookup(&addr(9)).is_none());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut t = table();
        t.observe(addr(1), addr(1), -50, 0);
        let snap = t.snapshot();
        t.observe(addr(2), addr(2), -50, 0);
        assert_eq!(snap.len(), 1);
        assert_eq!(t.len(), 2);
    }
}
