//! # Error Types
//!
//! Error handling for the endpoint core.
//!
//! This module defines all error variants that can occur while decoding and
//! dispatching datagrams, from bit-level buffer underruns to protocol
//! violations that lead to a ban.
//!
//! ## Propagation Policy
//! Parse-time errors never escape the framer as panics: `Packet::parse`
//! returns them as values and the endpoint decides drop/ban/reject per peer.
//! No error in processing one peer's datagram may affect another peer, and
//! nothing in this crate is fatal to the process.

use std::io;
use thiserror::Error;

/// Ban reason strings, shared between the handshake layer and the ban set.
pub mod reasons {
    /// Malformed connection probe, or a probe from an already-connected peer.
    pub const PROTOCOL_VIOLATION: &str = "protocol violation";
    /// AUTHKEY payload did not match the expected inbound token.
    pub const BAD_AUTHKEY: &str = "bad authkey";
}

/// Primary error type for all codec and endpoint operations.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read requested more bits than remain in the buffer. Recoverable:
    /// aborts only the current packet's parse.
    #[error("buffer underrun: needed {needed} bits, {available} available")]
    BufferUnderrun { needed: usize, available: usize },

    #[error("malformed header: {0}")]
    MalformedHeader(String),

    /// Peer behavior that warrants a ban rather than a reject.
    #[error("protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
