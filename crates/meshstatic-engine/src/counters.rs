//! Drop-kind enumeration and per-kind counters.
//!
//! Engine failures are not exceptions: every drop is classified,
//! counted, and (at most) logged at debug level. The counters are the
//! only externally visible trace of ingress errors.

/// Classified reasons a frame or submission was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropKind {
    /// The frame did not decode as a packet.
    MalformedFrame,
    /// Wrong network id or version, zero TTL, or an invalid source.
    InvalidHeader,
    /// The (src, packet_id) pair was seen within the dedup window.
    Duplicate,
    /// AEAD tag verification failed.
    AuthFailure,
    /// Encrypted frame arrived but this node holds no session keys.
    UnknownSession,
    /// The hop budget ran out before the destination.
    TtlExhausted,
    /// No routing entry for the destination.
    NoRoute,
    /// The routing table evicted a live entry to admit a newcomer.
    TableFull,
    /// The link driver applied back-pressure.
    LinkBusy,
    /// The link driver failed outright.
    LinkFailed,
    /// Submission payload exceeded the frame capacity.
    PayloadTooLarge,
    /// A `REQUIRE_ACK` submission was never acknowledged.
    DeliveryFailed,
}

impl DropKind {
    pub const ALL: [DropKind; 12] = [
        DropKind::MalformedFrame,
        DropKind::InvalidHeader,
        DropKind::Duplicate,
        DropKind::AuthFailure,
        DropKind::UnknownSession,
        DropKind::TtlExhausted,
        DropKind::NoRoute,
        DropKind::TableFull,
        DropKind::LinkBusy,
        DropKind::LinkFailed,
        DropKind::PayloadTooLarge,
        DropKind::DeliveryFailed,
    ];

    fn index(self) -> usize {
        match self {
            DropKind::MalformedFrame => 0,
            DropKind::InvalidHeader => 1,
            DropKind::Duplicate => 2,
            DropKind::AuthFailure => 3,
            DropKind::UnknownSession => 4,
            DropKind::TtlExhausted => 5,
            DropKind::NoRoute => 6,
            DropKind::TableFull => 7,
            DropKind::LinkBusy => 8,
            DropKind::LinkFailed => 9,
            DropKind::PayloadTooLarge => 10,
            DropKind::DeliveryFailed => 11,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            DropKind::MalformedFrame => "malformed_frame",
            DropKind::InvalidHeader => "invalid_header",
            DropKind::Duplicate => "duplicate",
            DropKind::AuthFailure => "auth_failure",
            DropKind::UnknownSession => "unknown_session",
            DropKind::TtlExhausted => "ttl_exhausted",
            DropKind::NoRoute => "no_route",
            DropKind::TableFull => "table_full",
            DropKind::LinkBusy => "link_busy",
            DropKind::LinkFailed => "link_failed",
            DropKind::PayloadTooLarge => "payload_too_large",
            DropKind::DeliveryFailed => "delivery_failed",
        }
    }
}

/// Monotonic traffic counters, copied out for the admin surface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Counters {
    pub rx: u64,
    pub tx: u64,
    drops: [u64; DropKind::ALL.len()],
}

impl Counters {
    pub fn record_rx(&mut self) {
        self.rx += 1;
    }

    pub fn record_tx(&mut self) {
        self.tx += 1;
    }

    pub fn record_drop(&mut self, kind: DropKind) {
        self.drops[kind.index()] += 1;
    }

    #[must_use]
    pub fn drops(&self, kind: DropKind) -> u64 {
        self.drops[kind.index()]
    }

    #[must_use]
    pub fn total_drops(&self) -> u64 {
        self.drops.iter().sum()
    }

    /// Iterate non-zero drop counters with their names.
    pub fn iter_drops(&self) -> impl Iterator<Item = (DropKind, u64)> + '_ {
        DropKind::ALL
            .iter()
            .map(|&k| (k, self.drops(k)))
            .filter(|&(_, n)| n > 0)
    }
}

/// What the engine did with an ingested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum IngestOutcome {
    /// Handled locally (destination was this node, or a broadcast whose
    /// re-emission was not possible).
    Delivered,
    /// Relayed toward its destination without local handling.
    Forwarded,
    /// A broadcast: handled locally and re-emitted.
    DeliveredAndForwarded,
    /// Dropped; the kind was counted.
    Dropped(DropKind),
}
