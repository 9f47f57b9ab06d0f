//! # Protocol Layer
//!
//! Per-peer handshake state machine, the session registry that owns peer
//! state, and the world-initialization payload.
//!
//! ## Lifecycle
//! ```text
//! probe -> OPEN_CONNECTION_REPLY -> CONNECTION_REQUEST -> AUTHKEY
//!       -> CONNECTION_REQUEST_ACCEPTED -> CLIENT_JOIN rpc -> INIT_GAME
//! ```
//! ending in the in-game state. Malformed peers are banned, never crashed
//! on.

pub mod handshake;
pub mod session;
pub mod world;
