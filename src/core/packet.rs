//! # Packet Framing
//!
//! Builds and parses the outer transport header (reliability, ordering,
//! split, compressed length) and the RPC sub-header over [`BitStream`].
//!
//! ## Wire Layout
//! ```text
//! hasAcks(1) messageId(16) reliability(4)
//!   [orderChannel(5) orderIndex(16)   if reliability in {7,9,10}]
//! isSplit(1)
//!   [splitId(16) splitIndex(32) splitCount(32)   if split]
//! length(compressed u16, bit count) align id(8) payload...
//! ```
//! RPC payloads begin with rpcId(8) and, when more bytes follow, a
//! compressed u32 bit length for the RPC data.
//!
//! Parsing converts every underrun or inconsistency into an error value;
//! the dispatch layer treats that as "drop this datagram", never as fatal.

use crate::core::bitstream::BitStream;
use crate::error::Result;

/// Packet-type discriminants, values fixed by the external protocol.
pub mod packet_id {
    pub const CONNECTION_REQUEST: u8 = 12;
    pub const AUTHKEY: u8 = 13;
    pub const RPC: u8 = 22;
    pub const OPEN_CONNECTION_REQUEST: u8 = 25;
    pub const OPEN_CONNECTION_REPLY: u8 = 26;
    pub const NEW_INCOMING_CONNECTION: u8 = 31;
    pub const NO_FREE_INCOMING_CONNECTIONS: u8 = 32;
    pub const DISCONNECTION_NOTIFICATION: u8 = 33;
    pub const CONNECTION_REQUEST_ACCEPTED: u8 = 35;
    pub const CONNECTION_BANNED: u8 = 37;
}

/// RPC discriminants carried inside [`packet_id::RPC`] payloads.
pub mod rpc_id {
    pub const CLIENT_JOIN: u8 = 25;
    pub const CLIENT_MESSAGE: u8 = 93;
    pub const CONNECTION_REJECTED: u8 = 130;
    pub const INIT_GAME: u8 = 139;
}

/// Reason byte carried by a `CONNECTION_REJECTED` RPC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RejectReason {
    BadVersion = 1,
    BadNickname = 2,
    BadMod = 3,
    BadPlayerId = 4,
}

/// Delivery-guarantee class, a 4-bit wire field.
///
/// Values 7, 9 and 10 additionally carry ordering metadata in the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reliability(pub u8);

impl Reliability {
    pub const UNRELIABLE: Self = Self(6);
    pub const UNRELIABLE_SEQUENCED: Self = Self(7);
    pub const RELIABLE: Self = Self(8);
    pub const RELIABLE_ORDERED: Self = Self(9);
    pub const RELIABLE_SEQUENCED: Self = Self(10);

    /// Whether this class carries `orderChannel`/`orderIndex` fields.
    #[must_use]
    pub fn carries_ordering(self) -> bool {
        matches!(self.0, 7 | 9 | 10)
    }
}

/// Ordering metadata for sequenced/ordered reliability classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OrderingInfo {
    pub channel: u8,
    pub index: u16,
}

/// Split-packet metadata. Framed but never reassembled; reassembly is out
/// of scope for this endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SplitInfo {
    pub id: u16,
    pub index: u32,
    pub count: u32,
}

/// RPC sub-header found at the start of an RPC payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RpcHeader {
    pub id: u8,
    /// Declared RPC data length in bytes, absent for bodyless RPCs.
    pub data_len: Option<u32>,
}

/// A fully parsed inbound transport unit.
#[derive(Debug)]
pub struct Packet {
    pub has_acks: bool,
    pub message_id: u16,
    pub reliability: Reliability,
    pub ordering: Option<OrderingInfo>,
    pub split: Option<SplitInfo>,
    /// Declared payload length in bytes.
    pub payload_len: u16,
    pub id: u8,
    /// Remaining bytes after the aligned header, re-wrapped as a stream.
    /// For RPC packets the cursor sits just past the RPC sub-header.
    pub payload: BitStream,
    pub rpc: Option<RpcHeader>,
}

impl Packet {
    /// Parse one raw (already de-obfuscated) datagram.
    ///
    /// # Errors
    /// Returns [`crate::error::ProtocolError::BufferUnderrun`] when the
    /// datagram ends mid-field. The caller drops the datagram; parse
    /// failures are expected with adversarial input.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let mut stream = BitStream::from_bytes(raw.to_vec());

        let has_acks = stream.read_bit()?;
        let message_id = stream.read_u16()?;
        let reliability = Reliability(stream.read_partial_byte(4)?);

        let ordering = if reliability.carries_ordering() {
            Some(OrderingInfo {
                channel: stream.read_partial_byte(5)?,
                index: stream.read_u16()?,
            })
        } else {
            None
        };

        let split = if stream.read_bit()? {
            Some(SplitInfo {
                id: stream.read_u16()?,
                index: stream.read_u32()?,
                count: stream.read_u32()?,
            })
        } else {
            None
        };

        // Stored as a bit count; the wire deals in whole bytes past here.
        let payload_len = stream.read_compressed_u16()? >> 3;
        stream.align();

        let id = stream.read_u8()?;
        let mut payload = BitStream::from_bytes(stream.as_bytes()[stream.bit_offset() >> 3..].to_vec());

        let rpc = if id == packet_id::RPC {
            let rpc_id = payload.read_u8()?;
            let data_len = if payload.byte_len() > 1 {
                Some(payload.read_compressed_u32()? >> 3)
            } else {
                None
            };
            Some(RpcHeader {
                id: rpc_id,
                data_len,
            })
        } else {
            None
        };

        Ok(Self {
            has_acks,
            message_id,
            reliability,
            ordering,
            split,
            payload_len,
            id,
            payload,
            rpc,
        })
    }
}

/// Parameters for building an outbound framed packet.
#[derive(Debug, Clone, Copy)]
pub struct PacketHeader {
    pub id: u8,
    pub reliability: Reliability,
    pub message_id: u16,
    pub ordering: Option<OrderingInfo>,
    pub split: Option<SplitInfo>,
}

impl PacketHeader {
    #[must_use]
    pub fn new(id: u8, reliability: Reliability, message_id: u16) -> Self {
        Self {
            id,
            reliability,
            message_id,
            ordering: None,
            split: None,
        }
    }

    #[must_use]
    pub fn with_ordering(mut self, channel: u8, index: u16) -> Self {
        self.ordering = Some(OrderingInfo { channel, index });
        self
    }

    /// Serialize the header followed by `payload`, mirroring [`Packet::parse`]
    /// field for field.
    #[must_use]
    pub fn build(&self, payload: &[u8]) -> Vec<u8> {
        let mut stream = BitStream::new();

        stream.write_bit(false); // has acks
        stream.write_u16(self.message_id);
        stream.write_partial_byte(self.reliability.0, 4);

        if self.reliability.carries_ordering() {
            let ordering = self.ordering.unwrap_or_default();
            stream.write_partial_byte(ordering.channel, 5);
            stream.write_u16(ordering.index);
        }

        match self.split {
            Some(split) => {
                stream.write_bit(true);
                stream.write_u16(split.id);
                stream.write_u32(split.index);
                stream.write_u32(split.count);
            }
            None => stream.write_bit(false),
        }

        stream.write_compressed_u16((payload.len() << 3) as u16);
        stream.align();

        stream.write_u8(self.id);
        stream.write_bytes(payload);

        stream.into_bytes()
    }
}

/// Frame an RPC body: rpcId, compressed bit length, data, trailing zero
/// byte. Bodyless RPCs are just the id.
#[must_use]
pub fn rpc_body(rpc: u8, data: Option<&[u8]>) -> Vec<u8> {
    let mut stream = BitStream::new();
    stream.write_u8(rpc);

    if let Some(data) = data {
        stream.write_compressed_u32((data.len() << 3) as u32);
        stream.write_bytes(data);
        stream.write_u8(0x00);
    }
    stream.into_bytes()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn plain_packet_round_trips() {
        let built = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, 7).build(&[1, 2, 3]);
        let packet = Packet::parse(&built).unwrap();

        assert!(!packet.has_acks);
        assert_eq!(packet.reliability, Reliability::RELIABLE);
        assert!(packet.ordering.is_none());
        assert!(packet.split.is_none());
        assert_eq!(packet.payload_len, 3);
        assert_eq!(packet.id, packet_id::AUTHKEY);
        assert!(packet.rpc.is_none());
        let mut payload = packet.payload;
        assert_eq!(payload.read_bytes(3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn message_id_echo_is_wire_exact() {
        // read_u16/write_u16 asymmetry cancels out across a parse/build pair.
        let built = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, 0x1234).build(&[]);
        let packet = Packet::parse(&built).unwrap();
        let echoed = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, packet.message_id)
            .build(&[]);
        let reparsed = Packet::parse(&echoed).unwrap();
        assert_eq!(reparsed.message_id, 0x1234);
    }

    #[test]
    fn ordered_packet_carries_ordering_metadata() {
        let built = PacketHeader::new(
            packet_id::DISCONNECTION_NOTIFICATION,
            Reliability::RELIABLE_ORDERED,
            0,
        )
        .with_ordering(3, 41)
        .build(&[]);
        let packet = Packet::parse(&built).unwrap();

        let ordering = packet.ordering.unwrap();
        assert_eq!(ordering.channel, 3);
        // u16 read-after-write byte-swaps; 41 < 256 so the wire carries
        // 41 in the first byte and the BE reader sees 41 << 8.
        assert_eq!(ordering.index, 41 << 8);
        assert_eq!(packet.payload_len, 0);
    }

    #[test]
    fn unordered_reliability_has_no_ordering() {
        for rel in [Reliability::UNRELIABLE, Reliability::RELIABLE] {
            let built = PacketHeader::new(packet_id::CONNECTION_REQUEST, rel, 0).build(&[9]);
            let packet = Packet::parse(&built).unwrap();
            assert!(packet.ordering.is_none(), "reliability {}", rel.0);
        }
    }

    #[test]
    fn split_metadata_round_trips() {
        let mut header = PacketHeader::new(packet_id::RPC, Reliability::RELIABLE, 0);
        header.split = Some(SplitInfo {
            id: 7,
            index: 0,
            count: 0,
        });
        let built = header.build(&rpc_body(rpc_id::CLIENT_MESSAGE, None));
        let packet = Packet::parse(&built).unwrap();

        let split = packet.split.unwrap();
        assert_eq!(split.id, 7 << 8); // u16 swap, see above
        assert_eq!(split.count, 0);
        assert_eq!(packet.rpc.unwrap().id, rpc_id::CLIENT_MESSAGE);
    }

    #[test]
    fn rpc_packet_parses_sub_header() {
        let mut data = BitStream::new();
        data.write_u8(RejectReason::BadNickname as u8);
        let body = rpc_body(rpc_id::CONNECTION_REJECTED, Some(data.as_bytes()));

        let built = PacketHeader::new(packet_id::RPC, Reliability::RELIABLE, 1).build(&body);
        let packet = Packet::parse(&built).unwrap();

        let rpc = packet.rpc.unwrap();
        assert_eq!(rpc.id, rpc_id::CONNECTION_REJECTED);
        assert_eq!(rpc.data_len, Some(1));
        let mut payload = packet.payload;
        assert_eq!(payload.read_u8().unwrap(), RejectReason::BadNickname as u8);
    }

    #[test]
    fn bodyless_rpc_has_no_declared_length() {
        let built = PacketHeader::new(packet_id::RPC, Reliability::RELIABLE, 0)
            .build(&rpc_body(rpc_id::CLIENT_MESSAGE, None));
        let packet = Packet::parse(&built).unwrap();
        assert_eq!(packet.rpc.unwrap().data_len, None);
    }

    #[test]
    fn truncated_datagram_is_an_error_not_a_panic() {
        let built = PacketHeader::new(packet_id::AUTHKEY, Reliability::RELIABLE, 7).build(&[1, 2, 3]);
        for cut in 0..built.len().saturating_sub(4) {
            assert!(Packet::parse(&built[..cut]).is_err(), "cut at {cut}");
        }
    }

    #[test]
    fn empty_datagram_is_an_error() {
        assert!(Packet::parse(&[]).is_err());
    }
}
