//! A simulated node: router, buffer, and transfer bookkeeping

use std::collections::HashSet;
use std::sync::Arc;

use ferry_core::{HostId, MessageId, SimClock};
use ferry_dtn::{DrincRouter, DrincSettings, DtnResult, PeerQuery, StrategyKind};

use crate::buffer::MessageBuffer;

/// State of one node in the simulation
#[derive(Debug)]
pub struct SimNode {
    /// Node identity
    pub id: HostId,
    /// The node's router
    pub router: DrincRouter<HostId>,
    /// Carried messages
    pub buffer: MessageBuffer,
    /// Messages that reached this node as their destination
    pub delivered: HashSet<MessageId>,
    /// Message currently being sent, if any
    pub outgoing: Option<MessageId>,
    /// Number of transfers currently arriving
    pub incoming: u32,
}

impl SimNode {
    /// Create a node with an empty buffer
    pub fn new(
        id: HostId,
        settings: DrincSettings,
        clock: Arc<dyn SimClock>,
        buffer_size: u64,
    ) -> DtnResult<Self> {
        Ok(Self {
            id,
            router: DrincRouter::new(id, settings, clock)?,
            buffer: MessageBuffer::new(buffer_size),
            delivered: HashSet::new(),
            outgoing: None,
            incoming: 0,
        })
    }

    /// Whether the node is sending or receiving
    pub fn is_transferring(&self) -> bool {
        self.outgoing.is_some() || self.incoming > 0
    }

    /// Whether the node holds `id` or already received it as destination
    pub fn has_message(&self, id: &MessageId) -> bool {
        self.buffer.contains(id) || self.delivered.contains(id)
    }
}

impl PeerQuery<HostId> for SimNode {
    fn peer_id(&self) -> &HostId {
        &self.id
    }

    fn strategy(&self) -> StrategyKind {
        self.router.strategy()
    }

    fn predictability_for(&self, destination: &HostId) -> f64 {
        self.router.predictability_for(destination)
    }

    fn all_predictabilities(&self) -> Vec<(HostId, f64)> {
        self.router.all_predictabilities()
    }

    fn is_transferring(&self) -> bool {
        SimNode::is_transferring(self)
    }

    fn has_message(&self, id: &MessageId) -> bool {
        SimNode::has_message(self, id)
    }
}
