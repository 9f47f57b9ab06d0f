//! # Core Wire Components
//!
//! Bit-level codec and packet framing for the RakNet-derived transport.
//!
//! ## Components
//! - **BitStream**: bit-addressable buffer with compressed-integer support
//! - **Packet**: transport header + RPC sub-header framing
//!
//! The wire format is externally fixed and undocumented except by
//! implementation; everything here must reproduce it bit for bit.

pub mod bitstream;
pub mod packet;
