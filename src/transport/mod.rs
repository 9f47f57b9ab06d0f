//! # Transport Layer
//!
//! UDP socket plumbing and the collaborator seams around the core: the
//! datagram de-obfuscation transform and the outbound datagram type.
//!
//! The core never touches a socket; it consumes raw byte buffers and
//! produces [`Outbound`] datagrams for this layer to send.

pub mod udp;

use bytes::Bytes;
use std::net::SocketAddr;

/// One datagram queued for sending. Fire-and-forget: a send failure is
/// logged and never rolls back state already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub to: SocketAddr,
    pub data: Bytes,
}

impl Outbound {
    #[must_use]
    pub fn new(to: SocketAddr, data: impl Into<Bytes>) -> Self {
        Self {
            to,
            data: data.into(),
        }
    }
}

/// De-obfuscation transform applied to every inbound datagram that is not
/// a server-browser query.
///
/// The table-driven transform itself ships with the game client; this seam
/// lets an integration plug it in without the core depending on it.
pub trait Deobfuscate: Send + Sync {
    fn transform(&self, data: &[u8], local_port: u16, seed: u8) -> Vec<u8>;
}

/// Identity transform, for tests and for fronts that decode elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct Passthrough;

impl Deobfuscate for Passthrough {
    fn transform(&self, data: &[u8], _local_port: u16, _seed: u8) -> Vec<u8> {
        data.to_vec()
    }
}
