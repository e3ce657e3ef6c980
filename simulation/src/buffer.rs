//! Per-node message buffer
//!
//! Messages are kept in the order they were received. When a new message
//! does not fit, the oldest messages are evicted until it does; the
//! message currently being sent is never evicted.

use rand::Rng;
use rand::seq::SliceRandom;

use ferry_core::{HostId, Message, MessageId, SimTime};

use crate::config::QueueMode;

/// Result of offering a message to a buffer
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// Stored, after evicting these messages
    Accepted { evicted: Vec<Message<HostId>> },
    /// Larger than what could be freed
    Rejected,
}

/// Bounded store of carried messages
#[derive(Debug, Clone)]
pub struct MessageBuffer {
    capacity: u64,
    used: u64,
    messages: Vec<Message<HostId>>,
}

impl MessageBuffer {
    /// Create an empty buffer of `capacity` bytes
    pub fn new(capacity: u64) -> Self {
        Self {
            capacity,
            used: 0,
            messages: Vec::new(),
        }
    }

    /// Store `msg`, evicting the oldest messages if needed
    ///
    /// `sending` names a message that must stay (it is on the wire).
    /// Nothing is evicted when the message cannot fit even after
    /// evicting every other message. A message already present is
    /// accepted without change.
    pub fn insert(&mut self, msg: Message<HostId>, sending: Option<MessageId>) -> Admission {
        if self.contains(&msg.id) {
            return Admission::Accepted { evicted: Vec::new() };
        }

        let pinned: u64 = self
            .messages
            .iter()
            .filter(|m| Some(m.id) == sending)
            .map(|m| m.size)
            .sum();
        if msg.size + pinned > self.capacity {
            return Admission::Rejected;
        }

        let mut evicted = Vec::new();
        while self.used + msg.size > self.capacity {
            let Some(index) = self.messages.iter().position(|m| Some(m.id) != sending) else {
                break;
            };
            let old = self.messages.remove(index);
            self.used -= old.size;
            evicted.push(old);
        }

        self.used += msg.size;
        self.messages.push(msg);
        Admission::Accepted { evicted }
    }

    /// Remove a message, returning it if it was present
    pub fn remove(&mut self, id: &MessageId) -> Option<Message<HostId>> {
        let index = self.messages.iter().position(|m| &m.id == id)?;
        let msg = self.messages.remove(index);
        self.used -= msg.size;
        Some(msg)
    }

    /// Remove every message whose TTL ran out at `now`, except `sending`
    pub fn drop_expired(&mut self, now: SimTime, sending: Option<MessageId>) -> Vec<Message<HostId>> {
        let (expired, kept): (Vec<_>, Vec<_>) = self
            .messages
            .drain(..)
            .partition(|m| m.is_expired(now) && Some(m.id) != sending);
        self.messages = kept;
        self.used -= expired.iter().map(|m| m.size).sum::<u64>();
        expired
    }

    /// Whether `id` is stored
    pub fn contains(&self, id: &MessageId) -> bool {
        self.messages.iter().any(|m| &m.id == id)
    }

    /// Look up a stored message
    pub fn get(&self, id: &MessageId) -> Option<&Message<HostId>> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Messages in the order the router should consider them
    pub fn ordered<R: Rng + ?Sized>(&self, mode: QueueMode, rng: &mut R) -> Vec<Message<HostId>> {
        let mut out = self.messages.clone();
        if mode == QueueMode::Random {
            out.shuffle(rng);
        }
        out
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Bytes in use
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Total capacity in bytes
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}
