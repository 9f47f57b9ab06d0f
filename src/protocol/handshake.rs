//! # Connection Handshake
//!
//! Per-peer state machine driving the unconnected → connecting → connected
//! → in-game lifecycle, consuming parsed packets/RPCs and producing
//! outbound datagrams.
//!
//! **Per-Peer State, Verdicts Out**
//! Handshake functions mutate only the peer they are given and push replies
//! into an outbound queue; decisions that touch the registry (bans,
//! disconnects) are returned as a [`Verdict`] for the endpoint to apply.
//! This keeps borrows disjoint and makes every transition testable without
//! a socket.

use crate::config::{WorldConfig, ACCEPT_MAGIC, AUTH_KEY_IN, AUTH_KEY_OUT};
use crate::core::bitstream::BitStream;
use crate::core::packet::{packet_id, rpc_id, Packet, PacketHeader, RejectReason, Reliability};
use crate::error::reasons;
use crate::protocol::session::{Peer, PeerState};
use crate::protocol::world;
use crate::transport::Outbound;
use tracing::{debug, info, warn};

/// What the endpoint must do to the registry after a handshake step.
#[derive(Debug, PartialEq, Eq)]
pub enum Verdict {
    /// No registry change.
    Continue,
    /// Remove the peer; its slot becomes reusable.
    Disconnect,
    /// Record the address in the ban set with this reason, then remove.
    Ban(&'static str),
}

/// Read-only context shared by all handshake steps.
pub struct HandshakeContext<'a> {
    /// The server's listening port, echoed in the accept packet.
    pub port: u16,
    pub world: &'a WorldConfig,
    pub hostname: &'a str,
}

/// Send a raw (unframed) offline message, e.g. `[OPEN_CONNECTION_REPLY]`.
pub fn send_raw(peer: &Peer, out: &mut Vec<Outbound>, data: &[u8]) {
    out.push(Outbound::new(peer.addr, data.to_vec()));
}

/// Frame and queue a packet, consuming one message id.
pub fn send_packet(peer: &mut Peer, out: &mut Vec<Outbound>, header: PacketHeader, payload: &[u8]) {
    let header = PacketHeader {
        message_id: peer.take_message_id(),
        ..header
    };
    out.push(Outbound::new(peer.addr, header.build(payload)));
}

/// Frame and queue an RPC.
pub fn send_rpc(
    peer: &mut Peer,
    out: &mut Vec<Outbound>,
    rpc: u8,
    reliability: Reliability,
    data: Option<&[u8]>,
) {
    let body = crate::core::packet::rpc_body(rpc, data);
    send_packet(
        peer,
        out,
        PacketHeader::new(packet_id::RPC, reliability, 0),
        &body,
    );
}

/// Queue a chat message to the client.
pub fn send_chat_message(peer: &mut Peer, out: &mut Vec<Outbound>, color: u32, text: &str) {
    let mut data = BitStream::new();
    data.write_u32(color);
    data.write_u32(text.len() as u32);
    data.write_str(text);
    send_rpc(
        peer,
        out,
        rpc_id::CLIENT_MESSAGE,
        Reliability::RELIABLE,
        Some(data.as_bytes()),
    );
}

/// Graceful close: a reliable ordered disconnection notice, then removal.
pub fn kick(peer: &mut Peer, out: &mut Vec<Outbound>) -> Verdict {
    send_packet(
        peer,
        out,
        PacketHeader::new(
            packet_id::DISCONNECTION_NOTIFICATION,
            Reliability::RELIABLE_ORDERED,
            0,
        )
        .with_ordering(0, 0),
        &[],
    );
    Verdict::Disconnect
}

/// A structurally valid connection probe arrived for this peer.
///
/// Valid only while `Unconnected`: a probe from a connected peer is a
/// protocol violation. A transient (slot -1) peer is told the table is
/// full and discarded.
pub fn on_open_connection(peer: &mut Peer, out: &mut Vec<Outbound>) -> Verdict {
    if peer.state != PeerState::Unconnected {
        return Verdict::Ban(reasons::PROTOCOL_VIOLATION);
    }
    if peer.slot < 0 {
        send_raw(peer, out, &[packet_id::NO_FREE_INCOMING_CONNECTIONS]);
        return Verdict::Disconnect;
    }

    peer.state = PeerState::Connecting;
    send_raw(peer, out, &[packet_id::OPEN_CONNECTION_REPLY]);
    debug!(addr = %peer.addr, slot = peer.slot, "connection probe accepted");
    Verdict::Continue
}

/// Dispatch a parsed non-RPC packet.
pub fn on_packet(peer: &mut Peer, packet: &Packet, ctx: &HandshakeContext<'_>, out: &mut Vec<Outbound>) -> Verdict {
    peer.last_message_id = packet.message_id;

    match packet.id {
        packet_id::CONNECTION_REQUEST => {
            let mut reply = BitStream::new();
            reply.write_u8(AUTH_KEY_OUT.len() as u8);
            reply.write_str(AUTH_KEY_OUT);
            send_packet(
                peer,
                out,
                PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, 0),
                reply.as_bytes(),
            );
            Verdict::Continue
        }

        packet_id::AUTHKEY => {
            // Payload is a 1-byte length prefix followed by the token.
            let token = packet.payload.as_bytes().get(1..).unwrap_or_default();
            if token == AUTH_KEY_IN.as_bytes() {
                let mut reply = BitStream::new();
                reply.write_bytes(&[127, 0, 0, 1]);
                reply.write_u16(ctx.port);
                reply.write_u16(peer.slot as u16);
                reply.write_u32(ACCEPT_MAGIC);
                send_packet(
                    peer,
                    out,
                    PacketHeader::new(
                        packet_id::CONNECTION_REQUEST_ACCEPTED,
                        Reliability::RELIABLE,
                        0,
                    ),
                    reply.as_bytes(),
                );
                Verdict::Continue
            } else {
                warn!(addr = %peer.addr, "authkey mismatch");
                Verdict::Ban(reasons::BAD_AUTHKEY)
            }
        }

        other => {
            debug!(addr = %peer.addr, id = other, "ignoring unhandled packet id");
            Verdict::Continue
        }
    }
}

/// Dispatch a parsed RPC packet.
pub fn on_rpc(peer: &mut Peer, packet: Packet, ctx: &HandshakeContext<'_>, out: &mut Vec<Outbound>) -> Verdict {
    peer.last_message_id = packet.message_id;

    let Some(rpc) = packet.rpc else {
        return Verdict::Continue;
    };

    match rpc.id {
        rpc_id::CLIENT_JOIN => on_client_join(peer, packet.payload, ctx, out),
        other => {
            debug!(addr = %peer.addr, rpc = other, "ignoring unhandled rpc id");
            Verdict::Continue
        }
    }
}

/// `CLIENT_JOIN` payload: version, mod byte, nickname, client response,
/// auth blob. Validation failures reject and leave the peer connectable.
fn on_client_join(
    peer: &mut Peer,
    mut data: BitStream,
    ctx: &HandshakeContext<'_>,
    out: &mut Vec<Outbound>,
) -> Verdict {
    if peer.state != PeerState::Connecting && peer.state != PeerState::Connected {
        debug!(addr = %peer.addr, state = ?peer.state, "join rpc outside handshake, ignored");
        return Verdict::Continue;
    }

    let parsed = (|| -> crate::error::Result<(i32, u8, String)> {
        let version = data.read_i32()?;
        let client_mod = data.read_u8()?;
        let name_len = data.read_u8()? as usize;
        let name = data.read_str(name_len)?;
        let _response = data.read_u32()?;
        let auth_len = data.read_u8()? as usize;
        let _auth = data.read_bytes(auth_len)?;
        Ok((version, client_mod, name))
    })();

    let (version, client_mod, name) = match parsed {
        Ok(fields) => fields,
        Err(error) => {
            warn!(addr = %peer.addr, %error, "malformed join rpc dropped");
            return Verdict::Continue;
        }
    };

    if peer.slot < 0 {
        return reject(peer, out, RejectReason::BadPlayerId);
    }
    if !is_valid_nickname(&name) {
        debug!(addr = %peer.addr, name, "join rejected: bad nickname");
        return reject(peer, out, RejectReason::BadNickname);
    }

    peer.state = PeerState::Connected;
    peer.name = Some(name.clone());
    info!(
        addr = %peer.addr,
        slot = peer.slot,
        name,
        version,
        client_mod,
        "player joining"
    );

    init_game(peer, ctx, out);
    Verdict::Continue
}

/// World-initialization handoff: emit `INIT_GAME` and promote to in-game.
fn init_game(peer: &mut Peer, ctx: &HandshakeContext<'_>, out: &mut Vec<Outbound>) {
    let payload = world::build_init_payload(ctx.world, ctx.hostname, peer.slot as u16);
    send_rpc(
        peer,
        out,
        rpc_id::INIT_GAME,
        Reliability::RELIABLE,
        Some(&payload),
    );
    peer.state = PeerState::InGame;
}

/// Reject the join with a reason byte; no state change.
fn reject(peer: &mut Peer, out: &mut Vec<Outbound>, reason: RejectReason) -> Verdict {
    let mut data = BitStream::new();
    data.write_u8(reason as u8);
    send_rpc(
        peer,
        out,
        rpc_id::CONNECTION_REJECTED,
        Reliability::RELIABLE,
        Some(data.as_bytes()),
    );
    Verdict::Continue
}

/// `^\w+$`: ASCII word characters only, and at least one of them.
fn is_valid_nickname(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn nickname_rule_is_word_characters_only() {
        assert!(is_valid_nickname("abc"));
        assert!(is_valid_nickname("Player_1"));
        assert!(!is_valid_nickname("abc def"));
        assert!(!is_valid_nickname(""));
        assert!(!is_valid_nickname("nick!"));
        assert!(!is_valid_nickname("ünïcode"));
    }
}
