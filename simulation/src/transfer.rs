//! Link-level transfers
//!
//! A node sends one message at a time. A transfer occupies both ends of
//! the link for `size / transmit_speed` seconds and is lost if the link
//! goes down first.

use tracing::trace;

use ferry_core::{HostId, MessageId, SimTime};
use ferry_dtn::{ForwardCandidate, MessageHandoff, TransferAttempt, TransferEngine};

use crate::node::SimNode;
use crate::topology::LinkTable;

/// A message on the wire
#[derive(Debug, Clone)]
pub struct Transfer {
    /// Sending node
    pub from: HostId,
    /// Receiving node
    pub to: HostId,
    /// What the receiver gets on completion
    pub handoff: MessageHandoff<HostId>,
    /// When the transfer started
    pub started_at: SimTime,
    /// When the last byte arrives
    pub completes_at: SimTime,
}

impl Transfer {
    /// Id of the message being sent
    pub fn message_id(&self) -> MessageId {
        self.handoff.message.id
    }

    /// Check if the transfer runs over the link between `a` and `b`
    pub fn uses_link(&self, a: HostId, b: HostId) -> bool {
        (self.from == a && self.to == b) || (self.from == b && self.to == a)
    }

    /// Check if the transfer has finished at `now`
    pub fn is_due(&self, now: SimTime) -> bool {
        self.completes_at <= now
    }
}

/// Transfer engine for one sending node during one tick
///
/// Only checks whether a transfer could start and remembers the first one
/// accepted; the host commits it after the router's tick returns.
pub struct LinkEngine<'a> {
    sender: &'a SimNode,
    nodes: &'a [SimNode],
    links: &'a LinkTable,
    started: Option<ForwardCandidate<HostId>>,
}

impl<'a> LinkEngine<'a> {
    /// Engine for `sender`, which must be one of `nodes`
    pub fn new(sender: &'a SimNode, nodes: &'a [SimNode], links: &'a LinkTable) -> Self {
        Self {
            sender,
            nodes,
            links,
            started: None,
        }
    }

    /// The accepted transfer, if any
    pub fn into_started(self) -> Option<ForwardCandidate<HostId>> {
        self.started
    }

    fn check(&self, candidate: &ForwardCandidate<HostId>) -> TransferAttempt {
        if self.started.is_some() || self.sender.is_transferring() {
            return TransferAttempt::Busy;
        }
        if !self.links.are_connected(self.sender.id, candidate.contact) {
            return TransferAttempt::Denied;
        }
        let Some(receiver) = self.nodes.get(candidate.contact.index() as usize) else {
            return TransferAttempt::Denied;
        };
        if receiver.is_transferring() {
            return TransferAttempt::Busy;
        }
        let Some(msg) = self.sender.buffer.get(&candidate.message) else {
            return TransferAttempt::Denied;
        };
        if receiver.has_message(&msg.id) || msg.size > receiver.buffer.capacity() {
            return TransferAttempt::Denied;
        }
        TransferAttempt::Started
    }
}

impl TransferEngine<HostId> for LinkEngine<'_> {
    fn can_start_transfer(&self) -> bool {
        !self.sender.buffer.is_empty()
    }

    fn is_transferring(&self) -> bool {
        self.sender.is_transferring()
    }

    fn try_transfer(&mut self, candidate: &ForwardCandidate<HostId>) -> TransferAttempt {
        let attempt = self.check(candidate);
        trace!(
            from = %self.sender.id,
            to = %candidate.contact,
            message = %candidate.message,
            ?attempt,
            "Link check"
        );
        if attempt == TransferAttempt::Started {
            self.started = Some(candidate.clone());
        }
        attempt
    }
}
