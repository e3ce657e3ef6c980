//! Forwarding-copy bookkeeping
//!
//! Every message a node carries has a node-local count of forwarding
//! copies. A message created here starts with the configured number of
//! copies; a message received from the network always starts with one.
//! Each completed hand-off spends one copy, and only messages with more
//! than one copy left are sprayed to every contact.

use dashmap::DashMap;
use tracing::{debug, trace};

use ferry_core::{Message, MessageId, PeerIdentity};

use crate::error::CopyError;

/// Copy counts for the messages a node carries
#[derive(Debug)]
pub struct CopyManager {
    /// Copies left per carried message
    copies: DashMap<MessageId, u32>,
    /// Copies assigned to locally created messages
    initial_copies: u32,
}

impl CopyManager {
    /// Create a manager assigning `initial_copies` to new messages
    pub fn new(initial_copies: u32) -> Self {
        Self {
            copies: DashMap::new(),
            initial_copies: initial_copies.max(1),
        }
    }

    /// Copies assigned to locally created messages
    pub fn initial_copies(&self) -> u32 {
        self.initial_copies
    }

    /// Start tracking a message created on this node
    pub fn on_message_created<I: PeerIdentity>(&self, msg: &Message<I>) {
        self.copies.insert(msg.id, self.initial_copies);
        trace!(message = %msg.id, copies = self.initial_copies, "Copies assigned");
    }

    /// Start tracking a message received from another node
    ///
    /// `incoming` is the copy count the sender attached to the hand-off.
    /// Whatever it was, this node gets exactly one copy. A hand-off with no
    /// count at all was not produced by this strategy and is rejected.
    pub fn on_message_received(
        &self,
        id: MessageId,
        incoming: Option<u32>,
    ) -> Result<(), CopyError> {
        if incoming.is_none() {
            return Err(CopyError::MissingCopyCount {
                message: id.to_string(),
            });
        }
        self.copies.insert(id, 1);
        Ok(())
    }

    /// Spend one copy after a completed hand-off
    ///
    /// No-op if the message was evicted locally before the transfer
    /// finished. The count never drops below one.
    pub fn on_transfer_completed(&self, id: &MessageId) {
        match self.copies.get_mut(id) {
            Some(mut left) => {
                *left = left.saturating_sub(1).max(1);
                debug!(message = %id, copies_left = *left, "Copy spent");
            }
            None => {
                trace!(message = %id, "Transfer completed for evicted message");
            }
        }
    }

    /// Stop tracking a message that left the buffer
    pub fn on_message_dropped(&self, id: &MessageId) {
        self.copies.remove(id);
    }

    /// Copies left for `id`, `None` if not carried
    pub fn copies_left(&self, id: &MessageId) -> Option<u32> {
        self.copies.get(id).map(|c| *c)
    }

    /// Whether `id` may still be sprayed to every contact
    pub fn is_spray_eligible(&self, id: &MessageId) -> bool {
        self.copies_left(id).is_some_and(|c| c > 1)
    }

    /// The carried messages that still have copies to spray, in the given order
    pub fn eligible_for_spraying<'a, I: PeerIdentity>(
        &self,
        carried: &'a [Message<I>],
    ) -> Vec<&'a Message<I>> {
        carried
            .iter()
            .filter(|m| self.is_spray_eligible(&m.id))
            .collect()
    }

    /// Number of tracked messages
    pub fn tracked(&self) -> usize {
        self.copies.len()
    }
}
