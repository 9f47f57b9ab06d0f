//! # Session Registry
//!
//! Owns the set of active peers, keyed by network address, with
//! fixed-capacity slot assignment and the ban set.
//!
//! ## Invariants
//! - A given address occupies at most one slot at a time.
//! - Slot allocation is first-fit ascending; a reclaimed slot becomes the
//!   lowest-index empty slot again.
//! - Peers never outlive removal from the registry, and the registry is the
//!   only owner of peer state (single-threaded dispatch, no locking).

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};

/// Per-connection lifecycle state.
///
/// Only `disconnect` moves backward, by discarding the peer entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerState {
    Unconnected,
    Connecting,
    Connected,
    InGame,
}

/// One remote endpoint, owned by the [`SessionRegistry`].
#[derive(Debug)]
pub struct Peer {
    pub addr: SocketAddr,
    /// Assigned slot, echoed to the client as its player id. -1 while
    /// transient (no free slot).
    pub slot: i32,
    pub state: PeerState,
    /// Last inbound messageId, echoed on the next outbound framed packet.
    pub last_message_id: u16,
    /// Set once the join RPC is accepted.
    pub name: Option<String>,
}

impl Peer {
    fn new(addr: SocketAddr, slot: i32) -> Self {
        Self {
            addr,
            slot,
            state: PeerState::Unconnected,
            last_message_id: 0,
            name: None,
        }
    }

    /// Message id for the next framed send; advances the counter.
    pub fn take_message_id(&mut self) -> u16 {
        let id = self.last_message_id;
        self.last_message_id = id.wrapping_add(1);
        id
    }
}

/// Result of resolving a datagram source address.
#[derive(Debug)]
pub enum Resolution {
    /// The address maps to a stored peer at this slot.
    Slot(usize),
    /// The table is full; a throwaway peer exists only long enough to be
    /// told "no free connections" and is never stored.
    Transient(Peer),
}

/// Fixed-size slot table plus the ban set.
#[derive(Debug)]
pub struct SessionRegistry {
    slots: Vec<Option<Peer>>,
    bans: HashMap<IpAddr, String>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let mut slots = Vec::with_capacity(capacity);
        slots.resize_with(capacity, || None);
        Self {
            slots,
            bans: HashMap::new(),
        }
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of occupied slots.
    #[must_use]
    pub fn player_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// Slot of the peer already registered for this address, if any.
    #[must_use]
    pub fn find(&self, ip: IpAddr) -> Option<usize> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|p| p.addr.ip() == ip))
    }

    /// Return the existing peer for a known address, else allocate the
    /// first free slot. A full table yields a transient slot -1 peer.
    pub fn resolve(&mut self, addr: SocketAddr) -> Resolution {
        if let Some(slot) = self.find(addr.ip()) {
            return Resolution::Slot(slot);
        }
        match self.slots.iter().position(Option::is_none) {
            Some(slot) => {
                self.slots[slot] = Some(Peer::new(addr, slot as i32));
                Resolution::Slot(slot)
            }
            None => Resolution::Transient(Peer::new(addr, -1)),
        }
    }

    #[must_use]
    pub fn peer(&self, slot: usize) -> Option<&Peer> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn peer_mut(&mut self, slot: usize) -> Option<&mut Peer> {
        self.slots.get_mut(slot).and_then(Option::as_mut)
    }

    /// Clear a slot, making it available to the next first-fit allocation.
    pub fn remove(&mut self, slot: usize) -> Option<Peer> {
        self.slots.get_mut(slot).and_then(Option::take)
    }

    #[must_use]
    pub fn is_banned(&self, ip: IpAddr) -> bool {
        self.bans.contains_key(&ip)
    }

    #[must_use]
    pub fn ban_reason(&self, ip: IpAddr) -> Option<&str> {
        self.bans.get(&ip).map(String::as_str)
    }

    pub fn add_ban(&mut self, ip: IpAddr, reason: impl Into<String>) {
        self.bans.insert(ip, reason.into());
    }

    pub fn lift_ban(&mut self, ip: IpAddr) -> bool {
        self.bans.remove(&ip).is_some()
    }
}
