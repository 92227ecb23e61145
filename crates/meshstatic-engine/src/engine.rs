//! The packet engine: validation, deduplication, decryption, dispatch,
//! and forwarding.
//!
//! Processing is single-threaded and cooperative: one ingress at a
//! time, one egress at a time, with all mutation of the routing table,
//! dedup cache, and outbound-waiting set confined to the caller's
//! thread. Ingress failures never propagate to the link driver; they
//! are classified, counted, and at most logged at debug level.

use meshstatic_core::constants::{
    MsgType, NETWORK_ID, PACKET_SIZE, PAYLOAD_SIZE, PROTOCOL_VERSION, SEALED_PAYLOAD_SIZE,
    TAG_SIZE,
};
use meshstatic_core::packet::flags::PacketFlags;
use meshstatic_core::packet::wire::Packet;
use meshstatic_core::payload::{AckPayload, DeviceState, EmergencyEvent, GroupCommand, SensorData};
use meshstatic_core::types::Address;
use meshstatic_crypto::session::{MasterKey, SessionSchedule};
use meshstatic_crypto::{aead, packet_nonce};
use tracing::debug;

use crate::config::{EngineConfig, Role};
use crate::counters::{Counters, DropKind, IngestOutcome};
use crate::dedup::SeenCache;
use crate::error::{EngineError, SubmitError};
use crate::routing::{RouteEntry, RouteTable};
use crate::traits::{Advisory, Clock, EventSink, KeyStore, LinkDriver, LinkSendError, RandomSource};
use crate::waiters::{AckWaiters, Expiry};

/// Sensor advisory thresholds.
const ADVISORY_TEMPERATURE_C: f32 = 40.0;
const ADVISORY_BATTERY_MV: u16 = 3000;

/// The mesh protocol engine.
///
/// Owns every piece of mutable protocol state and is driven entirely by
/// [`ingest`](Self::ingest), [`submit`](Self::submit), and
/// [`tick`](Self::tick) calls from its collaborators.
pub struct MeshEngine<L, C, S> {
    config: EngineConfig,
    link: L,
    clock: C,
    sink: S,

    routes: RouteTable,
    seen: SeenCache,
    waiters: AckWaiters,
    counters: Counters,
    session: Option<SessionSchedule>,

    next_packet_id: u32,
    battery_mv: u16,
    started_at: u32,

    last_heartbeat: u32,
    last_discovery: u32,
    last_sweep: u32,
    last_dedup_purge: u32,
    last_session_check: u32,
}

impl<L: LinkDriver, C: Clock, S: EventSink> MeshEngine<L, C, S> {
    /// Construct the engine.
    ///
    /// Fails when the configuration violates an invariant or when no
    /// randomness can be obtained to seed the packet-id sequence; both
    /// are fatal per the protocol's failure policy.
    pub fn new(
        config: EngineConfig,
        link: L,
        clock: C,
        sink: S,
        keystore: Option<&dyn KeyStore>,
        rng: &mut dyn RandomSource,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let mut seed = [0u8; 4];
        rng.try_fill(&mut seed)
            .map_err(|_| EngineError::RandomUnavailable)?;
        let next_packet_id = u32::from_le_bytes(seed);

        let now = clock.now_ms();
        let session = keystore.map(|ks| {
            SessionSchedule::with_policy(
                MasterKey::new(ks.master_key()),
                ks.current_session(),
                now,
                config.session_lifetime_ms,
                config.session_overlap_ms,
            )
        });

        let routes = RouteTable::new(
            config.routing_capacity,
            config.online_window_ms,
            config.offline_horizon_ms,
        );
        let seen = SeenCache::new(config.dedup_capacity, config.dedup_window_ms);
        let waiters = AckWaiters::new(config.waiter_capacity, config.effective_ack_timeout_ms());

        Ok(Self {
            config,
            link,
            clock,
            sink,
            routes,
            seen,
            waiters,
            counters: Counters::default(),
            session,
            next_packet_id,
            battery_mv: 0,
            started_at: now,
            last_heartbeat: now,
            last_discovery: now,
            last_sweep: now,
            last_dedup_purge: now,
            last_session_check: now,
        })
    }

    // ---------------------------------------------------------------- //
    // Ingress
    // ---------------------------------------------------------------- //

    /// Process one frame delivered by the link driver.
    ///
    /// `last_hop` and `rssi` are the link-reported transmitter of this
    /// copy and its signal strength; `now` is the monotonic timestamp
    /// of reception.
    pub fn ingest(
        &mut self,
        frame: &[u8],
        last_hop: Address,
        rssi: i8,
        now: u32,
    ) -> IngestOutcome {
        self.counters.record_rx();

        let packet = match Packet::decode(frame) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, "undecodable frame");
                return self.dropped(DropKind::MalformedFrame);
            }
        };

        if packet.network_id != NETWORK_ID
            || packet.version != PROTOCOL_VERSION
            || packet.ttl == 0
            || packet.src.is_broadcast()
            || packet.src.is_zero()
        {
            return self.dropped(DropKind::InvalidHeader);
        }

        // Our own traffic echoed back by a re-broadcasting neighbour.
        if packet.src == self.config.self_addr {
            return self.dropped(DropKind::Duplicate);
        }

        // Emergencies bypass duplicate suppression entirely: every copy
        // is delivered and re-forwarded, bounded by TTL.
        let emergency = packet.msg_type == MsgType::EventBroadcast;
        if !emergency && self.seen.check_and_insert(packet.src, packet.packet_id, now) {
            return self.dropped(DropKind::Duplicate);
        }

        if self.routes.observe(packet.src, last_hop, rssi, now) {
            self.counters.record_drop(DropKind::TableFull);
            debug!(src = %packet.src, "routing table full, evicted stalest entry");
        }

        // Local dispatch sees plaintext; forwarding re-emits the
        // original (still encrypted) payload.
        let mut plain = packet.clone();
        if packet.flags.encrypted {
            if let Err(kind) = self.decrypt_in_place(&mut plain, now) {
                return self.dropped(kind);
            }
        }

        let for_me = packet.dst == self.config.self_addr;
        let broadcast = packet.dst.is_broadcast();

        let mut delivered = false;
        let mut deliver_err = None;
        if for_me || broadcast {
            match self.dispatch_local(&plain, now) {
                Ok(handled) => delivered = handled,
                Err(kind) => deliver_err = Some(kind),
            }
        }

        let mut forwarded = false;
        let mut forward_err = None;
        if !for_me {
            match self.forward(&packet) {
                Ok(()) => forwarded = true,
                Err(kind) => forward_err = Some(kind),
            }
        }

        if for_me && packet.flags.require_ack && !packet.msg_type.is_ack() {
            self.send_ack(&packet);
        }

        match (delivered, forwarded) {
            (true, true) => IngestOutcome::DeliveredAndForwarded,
            (true, false) => IngestOutcome::Delivered,
            (false, true) => IngestOutcome::Forwarded,
            (false, false) => match deliver_err.or(forward_err) {
                Some(kind) => IngestOutcome::Dropped(kind),
                None => IngestOutcome::Delivered,
            },
        }
    }

    fn decrypt_in_place(&mut self, packet: &mut Packet, now: u32) -> Result<(), DropKind> {
        let Some(session) = &self.session else {
            return Err(self.drop_kind(DropKind::UnknownSession));
        };

        let aad = packet.aad_bytes();
        let nonce = packet_nonce(packet.packet_id, &packet.src);
        let (body, tag_region) = packet.payload.split_at_mut(SEALED_PAYLOAD_SIZE);
        let tag: [u8; TAG_SIZE] = tag_region
            .try_into()
            .expect("tag region is exactly 16 bytes");

        let (current, previous) = session.candidates(now);
        if aead::open(current.key(), &nonce, &aad, body, &tag).is_ok() {
            return Ok(());
        }
        if let Some(prev) = previous {
            if aead::open(prev.key(), &nonce, &aad, body, &tag).is_ok() {
                return Ok(());
            }
        }
        // Silent beyond the counter: no data derived from the frame.
        Err(self.drop_kind(DropKind::AuthFailure))
    }

    /// Deliver a packet to the local handler for its type.
    ///
    /// `Ok(true)` means something was handled locally; `Ok(false)`
    /// means the packet legitimately terminated without local interest
    /// (e.g. a group command for a group this node is not in).
    fn dispatch_local(&mut self, packet: &Packet, now: u32) -> Result<bool, DropKind> {
        let src = packet.src;
        match packet.msg_type {
            MsgType::DataSensor => {
                let data = SensorData::decode(&packet.payload).map_err(|e| {
                    debug!(error = %e, "bad sensor payload");
                    self.drop_kind(DropKind::MalformedFrame)
                })?;
                self.routes.set_battery(&src, data.battery_mv);
                if data.temperature > ADVISORY_TEMPERATURE_C {
                    self.sink.on_advisory(
                        src,
                        Advisory::HighTemperature {
                            celsius: data.temperature,
                        },
                    );
                }
                if data.battery_mv < ADVISORY_BATTERY_MV {
                    self.sink.on_advisory(
                        src,
                        Advisory::LowBattery {
                            millivolts: data.battery_mv,
                        },
                    );
                }
                self.sink.on_sensor(src, data);
                Ok(true)
            }
            MsgType::DataActuator | MsgType::CmdSet | MsgType::CmdGet => {
                self.sink.on_command(src, &packet.payload);
                Ok(true)
            }
            MsgType::CmdGroup => {
                if packet.flags.local_process || self.config.is_group_member(packet.group_id) {
                    GroupCommand::decode(&packet.payload).map_err(|e| {
                        debug!(error = %e, "bad group command payload");
                        self.drop_kind(DropKind::MalformedFrame)
                    })?;
                    self.sink.on_command(src, &packet.payload);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            MsgType::EventBroadcast => {
                let event = EmergencyEvent::decode(&packet.payload).map_err(|e| {
                    debug!(error = %e, "bad emergency payload");
                    self.drop_kind(DropKind::MalformedFrame)
                })?;
                self.sink.on_event(src, event);
                Ok(true)
            }
            // Freshness was already recorded by the observe step.
            MsgType::Heartbeat | MsgType::RoutingUpdate => Ok(true),
            MsgType::Discovery => {
                self.send_state_update(src, now);
                Ok(true)
            }
            MsgType::DeviceStateUpdate => {
                let state = DeviceState::decode(&packet.payload).map_err(|e| {
                    debug!(error = %e, "bad device state payload");
                    self.drop_kind(DropKind::MalformedFrame)
                })?;
                self.routes.set_battery(&src, state.battery_mv);
                Ok(true)
            }
            MsgType::Ack => {
                let ack = AckPayload::decode(&packet.payload)
                    .map_err(|_| self.drop_kind(DropKind::MalformedFrame))?;
                if self.waiters.acknowledge(ack.acked_packet_id) {
                    debug!(packet_id = ack.acked_packet_id, "delivery acknowledged");
                }
                Ok(true)
            }
            MsgType::Nack => {
                let nack = AckPayload::decode(&packet.payload)
                    .map_err(|_| self.drop_kind(DropKind::MalformedFrame))?;
                if self.waiters.take(nack.acked_packet_id).is_some() {
                    self.counters.record_drop(DropKind::DeliveryFailed);
                    self.sink.on_delivery_failed(nack.acked_packet_id);
                }
                Ok(true)
            }
        }
    }

    /// Relay a packet one hop closer to its destination.
    fn forward(&mut self, packet: &Packet) -> Result<(), DropKind> {
        let mut out = packet.clone();
        out.ttl -= 1;
        if out.ttl == 0 {
            return Err(self.drop_kind(DropKind::TtlExhausted));
        }
        out.last_hop = self.config.self_addr;

        let next_hop = match self.route_to(&out.dst) {
            Some(hop) => hop,
            None => return Err(self.drop_kind(DropKind::NoRoute)),
        };
        self.transmit(next_hop, &out.encode())
    }

    // ---------------------------------------------------------------- //
    // Egress
    // ---------------------------------------------------------------- //

    /// Build, optionally encrypt, and transmit an application datagram.
    ///
    /// Returns the assigned packet id. With `require_ack` set, delivery
    /// status arrives later through the sink; everything else is
    /// fire-and-forget.
    pub fn submit(
        &mut self,
        dst: Address,
        msg_type: MsgType,
        flags: PacketFlags,
        group_id: u16,
        payload: &[u8],
    ) -> Result<u32, SubmitError> {
        let now = self.clock.now_ms();

        // Encryption happens only when requested and a session exists.
        let encrypt = flags.encrypted && self.session.is_some();
        let max = if encrypt {
            SEALED_PAYLOAD_SIZE
        } else {
            PAYLOAD_SIZE
        };
        if payload.len() > max {
            self.counters.record_drop(DropKind::PayloadTooLarge);
            return Err(SubmitError::PayloadTooLarge {
                max,
                actual: payload.len(),
            });
        }

        let mut flags = flags;
        flags.encrypted = encrypt;
        let mut body = [0u8; PAYLOAD_SIZE];
        body[..payload.len()].copy_from_slice(payload);

        let mut packet = self.build_packet(dst, msg_type, flags, group_id, body);
        if encrypt {
            let session = self.session.as_ref().expect("session presence checked");
            let nonce = packet_nonce(packet.packet_id, &packet.src);
            let aad = packet.aad_bytes();
            let (sealed, tag_region) = packet.payload.split_at_mut(SEALED_PAYLOAD_SIZE);
            let tag = aead::seal(session.current().key(), &nonce, &aad, sealed);
            tag_region.copy_from_slice(&tag);
        }

        let next_hop = match self.route_to(&packet.dst) {
            Some(hop) => hop,
            None => {
                self.drop_kind(DropKind::NoRoute);
                return Err(SubmitError::NoRoute);
            }
        };

        let frame = packet.encode();
        self.transmit(next_hop, &frame).map_err(|kind| match kind {
            DropKind::LinkBusy => SubmitError::LinkBusy,
            _ => SubmitError::LinkFailed,
        })?;

        if packet.flags.require_ack && !msg_type.is_ack() {
            if let Some(evicted) =
                self.waiters
                    .register(packet.packet_id, next_hop, frame, now, self.config.ack_retries)
            {
                // The evicted waiter can no longer be tracked.
                self.counters.record_drop(DropKind::DeliveryFailed);
                self.sink.on_delivery_failed(evicted.packet_id);
            }
        }

        Ok(packet.packet_id)
    }

    // ---------------------------------------------------------------- //
    // Timer loop
    // ---------------------------------------------------------------- //

    /// Run periodic duties: ACK expiry, heartbeat, discovery, routing
    /// sweep, dedup purge, session rotation.
    pub fn tick(&mut self, now: u32) {
        for expiry in self.waiters.expire(now) {
            match expiry {
                Expiry::Retransmit {
                    packet_id,
                    next_hop,
                    frame,
                } => {
                    debug!(packet_id, "retransmitting unacknowledged packet");
                    let _ = self.transmit(next_hop, &frame);
                }
                Expiry::Failed(packet_id) => {
                    self.counters.record_drop(DropKind::DeliveryFailed);
                    debug!(packet_id, "delivery failed after retries");
                    self.sink.on_delivery_failed(packet_id);
                }
            }
        }

        if now.wrapping_sub(self.last_heartbeat) >= self.config.heartbeat_interval_ms {
            self.last_heartbeat = now;
            self.send_broadcast(MsgType::Heartbeat);
        }
        if now.wrapping_sub(self.last_discovery) >= self.config.discovery_interval_ms {
            self.last_discovery = now;
            self.send_broadcast(MsgType::Discovery);
        }
        if now.wrapping_sub(self.last_sweep) >= self.config.sweep_interval_ms {
            self.last_sweep = now;
            let removed = self.routes.sweep(now);
            if removed > 0 {
                debug!(removed, "evicted stale routing entries");
            }
        }
        if now.wrapping_sub(self.last_dedup_purge) >= self.config.dedup_purge_interval_ms {
            self.last_dedup_purge = now;
            self.seen.purge(now);
        }
        if now.wrapping_sub(self.last_session_check) >= self.config.session_check_interval_ms {
            self.last_session_check = now;
            if let Some(session) = &mut self.session {
                if session.maybe_rotate(now) {
                    debug!(session_id = session.current().id(), "session key rotated");
                }
            }
        }
    }

    // ---------------------------------------------------------------- //
    // Admin surface
    // ---------------------------------------------------------------- //

    /// Read-only copy of the routing table.
    #[must_use]
    pub fn snapshot_routes(&self) -> Vec<RouteEntry> {
        self.routes.snapshot()
    }

    /// Copy of the traffic counters.
    #[must_use]
    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// Broadcast a discovery probe immediately (the admin "scan"
    /// action); also restarts the periodic discovery timer.
    pub fn request_discovery(&mut self) {
        self.last_discovery = self.clock.now_ms();
        self.send_broadcast(MsgType::Discovery);
    }

    /// Update the battery level reported in discovery replies.
    pub fn set_battery_mv(&mut self, battery_mv: u16) {
        self.battery_mv = battery_mv;
    }

    #[must_use]
    pub fn self_addr(&self) -> Address {
        self.config.self_addr
    }

    /// Number of submissions currently awaiting an ACK.
    #[must_use]
    pub fn pending_acks(&self) -> usize {
        self.waiters.len()
    }

    // ---------------------------------------------------------------- //
    // Internals
    // ---------------------------------------------------------------- //

    fn build_packet(
        &mut self,
        dst: Address,
        msg_type: MsgType,
        mut flags: PacketFlags,
        group_id: u16,
        payload: [u8; PAYLOAD_SIZE],
    ) -> Packet {
        if dst.is_broadcast() {
            flags.broadcast = true;
        }
        self.next_packet_id = self.next_packet_id.wrapping_add(1);
        Packet {
            network_id: NETWORK_ID,
            version: PROTOCOL_VERSION,
            ttl: self.config.default_ttl,
            packet_id: self.next_packet_id,
            src: self.config.self_addr,
            dst,
            last_hop: self.config.self_addr,
            msg_type,
            flags,
            group_id,
            payload,
        }
    }

    /// Next-hop selection: broadcast goes to broadcast, a destination
    /// whose parent is this node is sent to directly, anything else is
    /// handed to the destination's parent.
    fn route_to(&self, dst: &Address) -> Option<Address> {
        if dst.is_broadcast() {
            return Some(Address::BROADCAST);
        }
        self.routes.next_hop(&self.config.self_addr, dst)
    }

    fn transmit(&mut self, next_hop: Address, frame: &[u8; PACKET_SIZE]) -> Result<(), DropKind> {
        match self.link.send(next_hop, frame) {
            Ok(()) => {
                self.counters.record_tx();
                Ok(())
            }
            Err(LinkSendError::Busy) => Err(self.drop_kind(DropKind::LinkBusy)),
            Err(LinkSendError::Failed) => Err(self.drop_kind(DropKind::LinkFailed)),
        }
    }

    /// Unicast an unencrypted ACK back to the packet's originator.
    fn send_ack(&mut self, acked: &Packet) {
        let mut payload = [0u8; PAYLOAD_SIZE];
        AckPayload {
            acked_packet_id: acked.packet_id,
        }
        .encode_into(&mut payload);

        let ack = self.build_packet(acked.src, MsgType::Ack, PacketFlags::default(), 0, payload);
        match self.route_to(&ack.dst) {
            Some(next_hop) => {
                let _ = self.transmit(next_hop, &ack.encode());
            }
            None => {
                self.drop_kind(DropKind::NoRoute);
            }
        }
    }

    /// Unicast a self-description in reply to a discovery probe.
    fn send_state_update(&mut self, dst: Address, now: u32) {
        let mut payload = [0u8; PAYLOAD_SIZE];
        DeviceState {
            device_type: self.config.device_type,
            role: match self.config.role {
                Role::Node => 0,
                Role::Repeater => 1,
            },
            battery_mv: self.battery_mv,
            uptime_s: now.wrapping_sub(self.started_at) / 1000,
        }
        .encode_into(&mut payload);

        let reply =
            self.build_packet(dst, MsgType::DeviceStateUpdate, PacketFlags::default(), 0, payload);
        match self.route_to(&dst) {
            Some(next_hop) => {
                let _ = self.transmit(next_hop, &reply.encode());
            }
            None => {
                self.drop_kind(DropKind::NoRoute);
            }
        }
    }

    fn send_broadcast(&mut self, msg_type: MsgType) {
        let packet = self.build_packet(
            Address::BROADCAST,
            msg_type,
            PacketFlags::default(),
            0,
            [0u8; PAYLOAD_SIZE],
        );
        let _ = self.transmit(Address::BROADCAST, &packet.encode());
    }

    fn drop_kind(&mut self, kind: DropKind) -> DropKind {
        self.counters.record_drop(kind);
        debug!(kind = kind.name(), "drop");
        kind
    }

    fn dropped(&mut self, kind: DropKind) -> IngestOutcome {
        IngestOutcome::Dropped(self.drop_kind(kind))
    }
}
