//! # rakgate
//!
//! A UDP game-server endpoint core speaking a RakNet-derived transport, as
//! used by a multiplayer game mod. The crate reproduces an externally-fixed
//! wire format bit for bit: variable-bit-width header fields, a compressed
//! integer encoding for lengths, split/reliability metadata, and the
//! connection handshake that takes a client from a raw probe to in-game.
//!
//! ## Layers
//! - [`core`]: the bit-level codec and packet/RPC framing
//! - [`protocol`]: the per-peer handshake state machine, session registry
//!   and world-init payload
//! - [`endpoint`]: socket-free datagram dispatch for one server instance
//! - [`transport`]: the tokio UDP loop and the de-obfuscation seam
//!
//! ## Posture Against Bad Input
//! Every parse failure is a value, not a panic; malformed peers are
//! dropped or banned, and no failure path is fatal to the process.
//!
//! ## Quick Start
//! ```no_run
//! use rakgate::config::EndpointConfig;
//!
//! #[tokio::main]
//! async fn main() -> rakgate::error::Result<()> {
//!     let config = EndpointConfig::default();
//!     rakgate::utils::logging::init(&config.logging);
//!     rakgate::transport::udp::serve(config).await
//! }
//! ```

#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod core;
pub mod endpoint;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::EndpointConfig;
pub use core::bitstream::BitStream;
pub use core::packet::{Packet, PacketHeader, Reliability};
pub use endpoint::ServerCore;
pub use error::{ProtocolError, Result};
pub use protocol::session::{Peer, PeerState, SessionRegistry};
pub use transport::Outbound;
