//! # Endpoint Core
//!
//! Socket-free datagram dispatch: ban screening, connection-probe handling,
//! packet parsing, and handshake dispatch for one server instance.
//!
//! ## Processing Model
//! Single-threaded and push-based: one inbound datagram is fully processed
//! (including queuing any replies) before the next, so the registry and
//! peers need no locking. Replies are returned to the caller; sending them
//! is the transport's problem and is never transactional with the state
//! changes already applied here.

use crate::config::{EndpointConfig, PROBE_XOR_KEY};
use crate::core::packet::{packet_id, Packet};
use crate::error::reasons;
use crate::protocol::handshake::{self, HandshakeContext, Verdict};
use crate::protocol::session::{PeerState, Resolution, SessionRegistry};
use crate::transport::Outbound;
use crate::utils::Metrics;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{debug, warn};

/// One server instance: configuration, the session registry, and counters.
pub struct ServerCore {
    config: EndpointConfig,
    registry: SessionRegistry,
    metrics: Arc<Metrics>,
}

impl ServerCore {
    #[must_use]
    pub fn new(config: EndpointConfig) -> Self {
        let registry = SessionRegistry::new(config.server.max_players);
        Self {
            config,
            registry,
            metrics: Arc::new(Metrics::new()),
        }
    }

    #[must_use]
    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    #[must_use]
    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Process one inbound (already de-obfuscated) datagram to completion
    /// and return the datagrams to send in reply.
    ///
    /// Never fails: malformed input is dropped or answered with a ban, and
    /// no failure for one peer touches another peer's state.
    pub fn handle_datagram(&mut self, data: &[u8], from: SocketAddr) -> Vec<Outbound> {
        let mut out = Vec::new();
        self.metrics.datagram_received(data.len());

        // Banned addresses get the banned notice and nothing else.
        if self.registry.is_banned(from.ip()) {
            out.push(Outbound::new(from, vec![packet_id::CONNECTION_BANNED]));
            return out;
        }

        if data.first() == Some(&packet_id::OPEN_CONNECTION_REQUEST) {
            self.handle_probe(data, from, &mut out);
            return out;
        }

        let packet = match Packet::parse(data) {
            Ok(packet) => packet,
            Err(error) => {
                // Do not echo anything about the partial parse back into
                // the log beyond the datagram size.
                warn!(addr = %from, len = data.len(), %error, "dropping unparseable datagram");
                self.metrics.parse_failure();
                return out;
            }
        };

        let slot = match self.registry.resolve(from) {
            Resolution::Slot(slot) => slot,
            Resolution::Transient(_) => {
                debug!(addr = %from, "table full, dropping datagram from unknown sender");
                return out;
            }
        };

        let was_ingame = self
            .registry
            .peer(slot)
            .is_some_and(|p| p.state == PeerState::InGame);

        let ctx = HandshakeContext {
            port: self.config.server.port,
            world: &self.config.world,
            hostname: &self.config.server.hostname,
        };
        let Some(peer) = self.registry.peer_mut(slot) else {
            return out;
        };

        let verdict = if packet.id == packet_id::RPC {
            handshake::on_rpc(peer, packet, &ctx, &mut out)
        } else {
            handshake::on_packet(peer, &packet, &ctx, &mut out)
        };

        if !was_ingame
            && self
                .registry
                .peer(slot)
                .is_some_and(|p| p.state == PeerState::InGame)
        {
            self.metrics.join_completed();
        }

        self.apply_verdict(slot, verdict, &mut out);
        out
    }

    /// Kick the peer in `slot` with a graceful disconnection notice.
    pub fn kick(&mut self, slot: usize) -> Vec<Outbound> {
        let mut out = Vec::new();
        if let Some(peer) = self.registry.peer_mut(slot) {
            let verdict = handshake::kick(peer, &mut out);
            self.apply_verdict(slot, verdict, &mut out);
        }
        out
    }

    /// Queue a chat message to the peer in `slot`.
    pub fn send_chat(&mut self, slot: usize, color: u32, text: &str) -> Vec<Outbound> {
        let mut out = Vec::new();
        if let Some(peer) = self.registry.peer_mut(slot) {
            handshake::send_chat_message(peer, &mut out, color, text);
        }
        out
    }

    /// A raw connection probe: 3 bytes, the port XOR-masked in the trailer.
    fn handle_probe(&mut self, data: &[u8], from: SocketAddr, out: &mut Vec<Outbound>) {
        let valid = data.len() == 3
            && (u16::from_le_bytes([data[1], data[2]]) ^ PROBE_XOR_KEY) == self.config.server.port;

        if !valid {
            warn!(addr = %from, len = data.len(), "malformed connection probe");
            if let Some(slot) = self.registry.find(from.ip()) {
                self.registry.remove(slot);
            }
            self.ban_address(from, reasons::PROTOCOL_VIOLATION, out);
            return;
        }

        match self.registry.resolve(from) {
            Resolution::Slot(slot) => {
                let Some(peer) = self.registry.peer_mut(slot) else {
                    return;
                };
                let verdict = handshake::on_open_connection(peer, out);
                self.apply_verdict(slot, verdict, out);
            }
            Resolution::Transient(mut peer) => {
                // Told "no free connections" and dropped on the floor.
                let _ = handshake::on_open_connection(&mut peer, out);
            }
        }
    }

    fn apply_verdict(&mut self, slot: usize, verdict: Verdict, out: &mut Vec<Outbound>) {
        match verdict {
            Verdict::Continue => {}
            Verdict::Disconnect => {
                if let Some(peer) = self.registry.remove(slot) {
                    debug!(addr = %peer.addr, slot, "peer disconnected");
                }
            }
            Verdict::Ban(reason) => {
                if let Some(peer) = self.registry.remove(slot) {
                    self.ban_address(peer.addr, reason, out);
                }
            }
        }
    }

    fn ban_address(&mut self, addr: SocketAddr, reason: &str, out: &mut Vec<Outbound>) {
        warn!(addr = %addr, reason, "banning address");
        self.registry.add_ban(addr.ip(), reason);
        self.metrics.ban_issued();
        out.push(Outbound::new(addr, vec![packet_id::CONNECTION_BANNED]));
    }
}
