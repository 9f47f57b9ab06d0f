#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Codec + framer integration: whole datagrams built by the outbound path
//! and parsed back through [`Packet::parse`], including the compressed
//! length fields at their byte-boundary edges.

use rakgate::config::EndpointConfig;
use rakgate::core::bitstream::BitStream;
use rakgate::core::packet::{
    packet_id, rpc_body, rpc_id, OrderingInfo, Packet, PacketHeader, Reliability, SplitInfo,
};
use rakgate::endpoint::ServerCore;
use std::net::SocketAddr;

// ============================================================================
// HEADER FRAMING
// ============================================================================

#[test]
fn every_reliability_class_frames_and_parses() {
    let payload = [0x11u8, 0x22, 0x33, 0x44];
    for rel in [
        Reliability::UNRELIABLE,
        Reliability::UNRELIABLE_SEQUENCED,
        Reliability::RELIABLE,
        Reliability::RELIABLE_ORDERED,
        Reliability::RELIABLE_SEQUENCED,
    ] {
        let built = PacketHeader::new(packet_id::AUTHKEY, rel, 5).build(&payload);
        let packet = Packet::parse(&built).unwrap();

        assert_eq!(packet.reliability, rel, "reliability {}", rel.0);
        assert_eq!(packet.ordering.is_some(), rel.carries_ordering());
        assert_eq!(packet.payload_len, 4);
        assert_eq!(packet.id, packet_id::AUTHKEY);
        let mut body = packet.payload;
        assert_eq!(body.read_bytes(4).unwrap(), payload);
    }
}

#[test]
fn empty_reliable_packet_is_five_bytes() {
    // hasAcks(1) + messageId(16) + reliability(4) + split(1) = 22 bits,
    // compressed zero length = 6 bits, align to 32, id byte = 40 bits.
    let built = PacketHeader::new(packet_id::CONNECTION_REQUEST, Reliability::RELIABLE, 0).build(&[]);
    assert_eq!(built.len(), 5);

    let packet = Packet::parse(&built).unwrap();
    assert_eq!(packet.payload_len, 0);
    assert_eq!(packet.payload.remaining_bits(), 0);
}

#[test]
fn length_field_crosses_the_byte_boundary() {
    // 31 bytes = 248 bits fits one length byte; 32 bytes = 256 bits needs
    // both. Both sides of the edge must agree with the parser.
    for len in [31usize, 32, 255, 256] {
        let payload: Vec<u8> = (0..len).map(|i| i as u8).collect();
        let built = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, 0).build(&payload);
        let packet = Packet::parse(&built).unwrap();

        assert_eq!(packet.payload_len as usize, len, "payload of {len} bytes");
        let mut body = packet.payload;
        assert_eq!(body.read_bytes(len).unwrap(), payload);
    }
}

#[test]
fn large_payload_survives_framing() {
    let payload: Vec<u8> = (0..600u32).map(|i| (i * 7) as u8).collect();
    let built = PacketHeader::new(packet_id::AUTHKEY, Reliability::UNRELIABLE, 9).build(&payload);
    let packet = Packet::parse(&built).unwrap();

    assert_eq!(packet.payload_len, 600);
    let mut body = packet.payload;
    assert_eq!(body.read_bytes(600).unwrap(), payload);
}

#[test]
fn ordering_channel_uses_all_five_bits() {
    let built = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE_SEQUENCED, 0)
        .with_ordering(31, 0)
        .build(&[0xAB]);
    let packet = Packet::parse(&built).unwrap();

    assert_eq!(packet.ordering, Some(OrderingInfo { channel: 31, index: 0 }));
    let mut body = packet.payload;
    assert_eq!(body.read_u8().unwrap(), 0xAB);
}

#[test]
fn split_and_ordering_can_coexist() {
    let mut header = PacketHeader::new(packet_id::RPC, Reliability::RELIABLE_ORDERED, 3)
        .with_ordering(2, 0);
    header.split = Some(SplitInfo {
        id: 0,
        index: 0,
        count: 0,
    });
    let built = header.build(&rpc_body(rpc_id::CLIENT_MESSAGE, None));
    let packet = Packet::parse(&built).unwrap();

    assert!(packet.ordering.is_some());
    assert!(packet.split.is_some());
    assert_eq!(packet.rpc.unwrap().id, rpc_id::CLIENT_MESSAGE);
}

// ============================================================================
// RPC FRAMING
// ============================================================================

#[test]
fn rpc_data_length_is_declared_in_bytes() {
    let data = [0xDEu8, 0xAD, 0xBE, 0xEF, 0x00, 0x01];
    let built = PacketHeader::new(packet_id::RPC, Reliability::RELIABLE, 0)
        .build(&rpc_body(77, Some(&data)));
    let packet = Packet::parse(&built).unwrap();

    let rpc = packet.rpc.unwrap();
    assert_eq!(rpc.id, 77);
    assert_eq!(rpc.data_len, Some(6));
    let mut body = packet.payload;
    assert_eq!(body.read_bytes(6).unwrap(), data);
}

#[test]
fn rpc_body_carries_a_trailing_zero_byte() {
    let body = rpc_body(rpc_id::INIT_GAME, Some(&[0x55]));
    assert_eq!(*body.last().unwrap(), 0x00);

    // Bodyless RPCs are just the id.
    assert_eq!(rpc_body(rpc_id::CLIENT_MESSAGE, None), vec![rpc_id::CLIENT_MESSAGE]);
}

#[test]
fn chat_message_rpc_wire_layout() {
    let mut core = ServerCore::new(EndpointConfig::default());
    let addr: SocketAddr = SocketAddr::from(([10, 0, 0, 1], 50000));

    // Occupy slot 0 so send_chat has a target.
    let masked = (7777u16 ^ rakgate::config::PROBE_XOR_KEY).to_le_bytes();
    core.handle_datagram(
        &[packet_id::OPEN_CONNECTION_REQUEST, masked[0], masked[1]],
        addr,
    );

    let replies = core.send_chat(0, 0xFF00_FF00, "hi there");
    assert_eq!(replies.len(), 1);
    let packet = Packet::parse(&replies[0].data).unwrap();
    let rpc = packet.rpc.unwrap();
    assert_eq!(rpc.id, rpc_id::CLIENT_MESSAGE);
    assert_eq!(rpc.data_len, Some(16));

    // color(u32), length(u32), then the raw text bytes. The multi-byte
    // fields byte-swap on read-after-write.
    let mut body = packet.payload;
    assert_eq!(body.read_u32().unwrap(), 0x00FF_00FF);
    assert_eq!(body.read_u32().unwrap(), 8u32.swap_bytes());
    assert_eq!(body.read_str(8).unwrap(), "hi there");
}

// ============================================================================
// ECHO SEMANTICS
// ============================================================================

#[test]
fn message_id_echo_survives_a_full_parse_build_cycle() {
    // A client frames message id N; the server parses it, stores the raw
    // field, and writes it back. The client must see N again on the wire.
    for id in [0u16, 1, 0x00FF, 0x0100, 0xABCD, u16::MAX] {
        let inbound = PacketHeader::new(packet_id::CONNECTION_REQUEST, Reliability::RELIABLE, id)
            .build(&[]);
        let parsed = Packet::parse(&inbound).unwrap();

        let outbound = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, parsed.message_id)
            .build(&[]);
        let echoed = Packet::parse(&outbound).unwrap();

        let reread = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, echoed.message_id)
            .build(&[]);
        // Two swaps cancel: the third frame carries the original wire id.
        assert_eq!(&reread[..3], &inbound[..3], "message id {id:#06x}");
    }
}

#[test]
fn mixed_field_payload_round_trips_through_framing() {
    let mut payload = BitStream::new();
    payload.write_u8(42);
    payload.write_str("nick");
    payload.write_u16(0x1234);
    payload.write_f32(0.8);

    let built = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, 0)
        .build(payload.as_bytes());
    let packet = Packet::parse(&built).unwrap();

    let mut body = packet.payload;
    assert_eq!(body.read_u8().unwrap(), 42);
    assert_eq!(body.read_str(4).unwrap(), "nick");
    // Multi-byte integers byte-swap on read-after-write.
    assert_eq!(body.read_u16().unwrap(), 0x3412);
}
