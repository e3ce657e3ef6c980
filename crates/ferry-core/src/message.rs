//! Message types for store-and-forward delivery
//!
//! A [`Message`] is the unit the routers move around. Each node carries
//! its own copy; per-node routing state (such as forwarding copies) is
//! kept by the routers keyed by [`MessageId`], never on the message.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::identity::PeerIdentity;
use crate::time::SimTime;

/// Unique identifier for a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

impl Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "M{}", self.0)
    }
}

/// A message carried through the network
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: PeerIdentity")]
pub struct Message<I: PeerIdentity> {
    /// Unique message identifier
    pub id: MessageId,
    /// Original sender
    pub source: I,
    /// Final destination
    pub destination: I,
    /// Size in bytes, used by buffers and transfer timing
    pub size: u64,
    /// When the message was created
    pub created_at: SimTime,
    /// Lifetime in seconds (None = never expires)
    pub ttl: Option<f64>,
    /// Number of hops this copy has travelled
    pub hop_count: u32,
}

impl<I: PeerIdentity> Message<I> {
    /// Create a new message
    pub fn new(id: MessageId, source: I, destination: I, size: u64, created_at: SimTime) -> Self {
        Self {
            id,
            source,
            destination,
            size,
            created_at,
            ttl: None,
            hop_count: 0,
        }
    }

    /// Set the lifetime in seconds
    pub fn with_ttl(mut self, ttl_secs: f64) -> Self {
        self.ttl = Some(ttl_secs);
        self
    }

    /// Age of the message at `now`, in seconds
    pub fn age(&self, now: SimTime) -> f64 {
        now.since(self.created_at)
    }

    /// Check if the message outlived its TTL at `now`
    pub fn is_expired(&self, now: SimTime) -> bool {
        self.ttl.is_some_and(|ttl| self.age(now) >= ttl)
    }

    /// The copy a receiving node stores after one more hop
    pub fn forwarded(&self) -> Self {
        let mut copy = self.clone();
        copy.hop_count += 1;
        copy
    }

    /// Check if `peer` is this message's final destination
    pub fn is_for(&self, peer: &I) -> bool {
        &self.destination == peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::HostId;

    fn make_message() -> Message<HostId> {
        Message::new(MessageId(1), HostId(0), HostId(9), 1_000, SimTime::from_secs(100.0))
    }

    #[test]
    fn test_message_without_ttl_never_expires() {
        let msg = make_message();
        assert!(!msg.is_expired(SimTime::from_secs(1e9)));
    }

    #[test]
    fn test_message_expiry() {
        let msg = make_message().with_ttl(60.0);
        assert!(!msg.is_expired(SimTime::from_secs(159.0)));
        assert!(msg.is_expired(SimTime::from_secs(160.0)));
    }

    #[test]
    fn test_forwarded_increments_hops() {
        let msg = make_message();
        let relayed = msg.forwarded().forwarded();
        assert_eq!(relayed.hop_count, 2);
        assert_eq!(relayed.id, msg.id);
        assert!(relayed.is_for(&HostId(9)));
    }
}
