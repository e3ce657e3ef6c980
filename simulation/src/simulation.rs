//! Simulation engine for Ferry
//!
//! Implements a fixed-step discrete-time simulation. Each step, in order:
//! 1. Finish transfers whose last byte has arrived
//! 2. Apply contact events that are due
//! 3. Create scheduled messages
//! 4. Drop messages whose TTL ran out
//! 5. Let every idle node's router pick a transfer
//! 6. Advance the shared clock by one update interval

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use tracing::{debug, info, info_span, trace, warn};
use uuid::Uuid;

use ferry_core::{
    ContactEvent, HostId, LinkState, ManualClock, Message, MessageId, SimClock, SimTime,
};
use ferry_dtn::{DrincSettings, ForwardCandidate, PeerQuery, RoutingInfo};
use ferry_logging::NodeContextGuard;

use crate::buffer::Admission;
use crate::config::{MessageEvent, RunConfig, SimSettings};
use crate::error::{SimError, SimResult};
use crate::node::SimNode;
use crate::topology::LinkTable;
use crate::trace::generate_contacts;
use crate::transfer::{LinkEngine, Transfer};

/// Simulation statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SimStats {
    /// Messages created at their source
    pub created: u64,
    /// Transfers started
    pub started: u64,
    /// Transfers completed
    pub relayed: u64,
    /// Transfers lost to a link going down
    pub aborted: u64,
    /// Messages evicted from or refused by a full buffer
    pub dropped: u64,
    /// Messages removed because their TTL ran out
    pub expired: u64,
    /// Messages that reached their destination (first copy only)
    pub delivered: u64,
    /// Contact-up events applied
    pub contacts: u64,
    /// Sum of delivery latencies in seconds
    pub total_latency: f64,
    /// Sum of hop counts of delivered copies
    pub total_hops: u64,
}

impl SimStats {
    /// Delivered / created
    pub fn delivery_prob(&self) -> f64 {
        if self.created == 0 {
            0.0
        } else {
            self.delivered as f64 / self.created as f64
        }
    }

    /// Extra transfers per delivered message
    pub fn overhead_ratio(&self) -> Option<f64> {
        (self.delivered > 0)
            .then(|| (self.relayed as f64 - self.delivered as f64) / self.delivered as f64)
    }

    /// Mean seconds from creation to delivery
    pub fn avg_latency(&self) -> Option<f64> {
        (self.delivered > 0).then(|| self.total_latency / self.delivered as f64)
    }

    /// Mean hop count of delivered messages
    pub fn avg_hops(&self) -> Option<f64> {
        (self.delivered > 0).then(|| self.total_hops as f64 / self.delivered as f64)
    }

    /// Counters plus derived metrics, for machine-readable output
    pub fn report(&self) -> StatsReport {
        StatsReport {
            counters: self.clone(),
            delivery_prob: self.delivery_prob(),
            overhead_ratio: self.overhead_ratio(),
            avg_latency: self.avg_latency(),
            avg_hops: self.avg_hops(),
        }
    }
}

impl fmt::Display for SimStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn opt(value: Option<f64>) -> String {
            value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
        }

        writeln!(f, "created: {}", self.created)?;
        writeln!(f, "started: {}", self.started)?;
        writeln!(f, "relayed: {}", self.relayed)?;
        writeln!(f, "aborted: {}", self.aborted)?;
        writeln!(f, "dropped: {}", self.dropped)?;
        writeln!(f, "expired: {}", self.expired)?;
        writeln!(f, "delivered: {}", self.delivered)?;
        writeln!(f, "contacts: {}", self.contacts)?;
        writeln!(f, "delivery_prob: {:.4}", self.delivery_prob())?;
        writeln!(f, "overhead_ratio: {}", opt(self.overhead_ratio()))?;
        writeln!(f, "latency_avg: {}", opt(self.avg_latency()))?;
        write!(f, "hopcount_avg: {}", opt(self.avg_hops()))
    }
}

/// Serializable statistics with derived metrics
#[derive(Debug, Clone, Serialize)]
pub struct StatsReport {
    #[serde(flatten)]
    pub counters: SimStats,
    pub delivery_prob: f64,
    pub overhead_ratio: Option<f64>,
    pub avg_latency: Option<f64>,
    pub avg_hops: Option<f64>,
}

/// The simulation state
#[derive(Debug)]
pub struct Simulation {
    clock: Arc<ManualClock>,
    settings: SimSettings,
    nodes: Vec<SimNode>,
    links: LinkTable,
    /// Contact events not yet applied, in time order
    contacts: VecDeque<ContactEvent<HostId>>,
    /// Messages not yet created, in time order
    pending: VecDeque<MessageEvent>,
    transfers: Vec<Transfer>,
    stats: SimStats,
    rng: StdRng,
    next_message_id: u64,
    run_id: Uuid,
}

impl Simulation {
    /// Create a simulation driven by `contacts`
    pub fn new(config: RunConfig, mut contacts: Vec<ContactEvent<HostId>>) -> SimResult<Self> {
        let RunConfig {
            drinc, simulation, ..
        } = config;
        simulation.validate()?;

        let clock = Arc::new(ManualClock::new());
        let nodes = build_nodes(&drinc, &simulation, clock.clone())?;

        for event in &contacts {
            check_node(&simulation, event.a)?;
            check_node(&simulation, event.b)?;
        }
        contacts.sort_by(|x, y| x.time.as_secs().total_cmp(&y.time.as_secs()));

        let mut rng = StdRng::seed_from_u64(simulation.seed);
        let mut pending = simulation.messages.clone();
        for event in &pending {
            check_node(&simulation, event.from)?;
            check_node(&simulation, event.to)?;
        }
        pending.extend(generated_messages(&simulation, &mut rng));
        pending.sort_by(|x, y| x.time.total_cmp(&y.time));

        let run_id = Uuid::new_v4();
        info!(
            %run_id,
            nodes = simulation.nodes,
            contacts = contacts.len(),
            messages = pending.len(),
            "Simulation created"
        );

        Ok(Self {
            clock,
            settings: simulation,
            nodes,
            links: LinkTable::new(),
            contacts: contacts.into(),
            pending: pending.into(),
            transfers: Vec::new(),
            stats: SimStats::default(),
            rng,
            next_message_id: 0,
            run_id,
        })
    }

    /// Create a simulation over synthetic contacts from the run's settings
    pub fn with_generated_contacts(config: RunConfig) -> SimResult<Self> {
        let settings = &config.simulation;
        let contacts = generate_contacts(
            settings.nodes,
            settings.end_time,
            &settings.contact_generation,
            settings.seed,
        );
        Self::new(config, contacts)
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// Host settings of this run
    pub fn settings(&self) -> &SimSettings {
        &self.settings
    }

    /// Statistics so far
    pub fn stats(&self) -> &SimStats {
        &self.stats
    }

    /// Id tagging every log line of this run
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// All nodes, indexed by `HostId::index`
    pub fn nodes(&self) -> &[SimNode] {
        &self.nodes
    }

    /// A single node
    pub fn node(&self, id: HostId) -> Option<&SimNode> {
        self.nodes.get(id.index() as usize)
    }

    /// Links currently up
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    /// Transfers currently on the wire
    pub fn transfers(&self) -> &[Transfer] {
        &self.transfers
    }

    /// Routing diagnostics of one node
    pub fn routing_info(&self, id: HostId) -> Option<RoutingInfo> {
        self.node(id).map(|node| node.router.routing_info())
    }

    /// Run a single simulation step at the current time
    pub fn step(&mut self) -> SimResult<()> {
        let now = self.now();
        trace!("=== Step at {} ===", now);

        // 1. Finish transfers
        self.complete_transfers(now)?;

        // 2. Links up and down
        self.apply_contacts(now)?;

        // 3. New messages
        self.create_messages(now);

        // 4. TTL
        self.drop_expired(now);

        // 5. Routing decisions
        for index in 0..self.nodes.len() {
            if let Some(candidate) = self.plan_node(index) {
                self.start_transfer(index, candidate, now);
            }
        }

        // 6. Advance
        self.clock.advance(self.settings.update_interval);
        Ok(())
    }

    /// Run until `time` is reached
    pub fn run_until(&mut self, time: f64) -> SimResult<()> {
        while self.now().as_secs() < time {
            self.step()?;
        }
        Ok(())
    }

    /// Run to the configured end time
    pub fn run(&mut self) -> SimResult<&SimStats> {
        let _span = info_span!("simulation", run_id = %self.run_id).entered();
        self.run_until(self.settings.end_time)?;

        info!(
            end = %self.now(),
            created = self.stats.created,
            delivered = self.stats.delivered,
            relayed = self.stats.relayed,
            delivery_prob = self.stats.delivery_prob(),
            "Simulation complete"
        );
        for node in &self.nodes {
            let _ctx = NodeContextGuard::with_instance_id(&node.id, self.run_id);
            node.router.log_summary();
        }
        Ok(&self.stats)
    }

    fn complete_transfers(&mut self, now: SimTime) -> SimResult<()> {
        let (due, running): (Vec<_>, Vec<_>) =
            self.transfers.drain(..).partition(|t| t.is_due(now));
        self.transfers = running;

        for transfer in due {
            self.finish_transfer(transfer, now)?;
        }
        Ok(())
    }

    fn finish_transfer(&mut self, transfer: Transfer, now: SimTime) -> SimResult<()> {
        let id = transfer.message_id();
        let (from, to) = (slot(transfer.from), slot(transfer.to));
        self.nodes[from].outgoing = None;
        self.nodes[to].incoming = self.nodes[to].incoming.saturating_sub(1);
        self.stats.relayed += 1;

        let receiver = &mut self.nodes[to];
        let msg = {
            let _ctx = NodeContextGuard::with_instance_id(&receiver.id, self.run_id);
            receiver
                .router
                .on_message_received(transfer.handoff, &transfer.from)?
        };

        let delivered = msg.is_for(&receiver.id);
        if delivered {
            if receiver.delivered.insert(id) {
                self.stats.delivered += 1;
                self.stats.total_latency += msg.age(now);
                self.stats.total_hops += u64::from(msg.hop_count);
                info!(
                    message = %id,
                    destination = %receiver.id,
                    latency = msg.age(now),
                    hops = msg.hop_count,
                    "Message delivered"
                );
            }
            receiver.router.on_message_dropped(&id);
        } else {
            let admission = receiver.buffer.insert(msg, receiver.outgoing);
            handle_admission(receiver, id, admission, &mut self.stats);
        }

        let sender = &mut self.nodes[from];
        sender.router.on_transfer_completed(&id);
        if delivered && sender.buffer.remove(&id).is_some() {
            sender.router.on_message_dropped(&id);
        }
        trace!(
            message = %id,
            from = %transfer.from,
            to = %transfer.to,
            delivered,
            "Transfer completed"
        );
        Ok(())
    }

    fn apply_contacts(&mut self, now: SimTime) -> SimResult<()> {
        while self.contacts.front().is_some_and(|e| e.time <= now) {
            let Some(event) = self.contacts.pop_front() else {
                break;
            };
            match event.state {
                LinkState::Up => self.link_up(event.a, event.b)?,
                LinkState::Down => self.link_down(event.a, event.b),
            }
        }
        Ok(())
    }

    fn link_up(&mut self, a: HostId, b: HostId) -> SimResult<()> {
        if !self.links.connect(a, b) {
            trace!(%a, %b, "Link already up");
            return Ok(());
        }
        self.stats.contacts += 1;
        debug!(%a, %b, "Link up");

        let (node_a, node_b) = (&self.nodes[slot(a)], &self.nodes[slot(b)]);
        for (local, peer) in [(node_a, node_b), (node_b, node_a)] {
            let _ctx = NodeContextGuard::with_instance_id(&local.id, self.run_id);
            local.router.on_contact_up(peer as &dyn PeerQuery<HostId>)?;
        }
        Ok(())
    }

    fn link_down(&mut self, a: HostId, b: HostId) {
        if !self.links.disconnect(a, b) {
            trace!(%a, %b, "Link already down");
            return;
        }
        debug!(%a, %b, "Link down");
        self.nodes[slot(a)].router.on_contact_down(&b);
        self.nodes[slot(b)].router.on_contact_down(&a);

        let (aborted, kept): (Vec<_>, Vec<_>) =
            self.transfers.drain(..).partition(|t| t.uses_link(a, b));
        self.transfers = kept;

        for transfer in aborted {
            self.nodes[slot(transfer.from)].outgoing = None;
            let receiver = &mut self.nodes[slot(transfer.to)];
            receiver.incoming = receiver.incoming.saturating_sub(1);
            self.stats.aborted += 1;
            debug!(
                message = %transfer.message_id(),
                from = %transfer.from,
                to = %transfer.to,
                "Transfer aborted"
            );
        }
    }

    fn create_messages(&mut self, now: SimTime) {
        while self.pending.front().is_some_and(|m| m.time <= now.as_secs()) {
            let Some(event) = self.pending.pop_front() else {
                break;
            };
            if event.from == event.to {
                debug!(node = %event.from, "Skipping message to self");
                continue;
            }

            let id = MessageId(self.next_message_id);
            self.next_message_id += 1;
            let mut msg = Message::new(id, event.from, event.to, event.size, now);
            if let Some(ttl) = self.settings.msg_ttl {
                msg = msg.with_ttl(ttl);
            }

            let node = &mut self.nodes[slot(event.from)];
            let _ctx = NodeContextGuard::with_instance_id(&node.id, self.run_id);
            node.router.on_message_created(&msg);
            let admission = node.buffer.insert(msg, node.outgoing);
            handle_admission(node, id, admission, &mut self.stats);
            self.stats.created += 1;
        }
    }

    fn drop_expired(&mut self, now: SimTime) {
        for node in &mut self.nodes {
            for msg in node.buffer.drop_expired(now, node.outgoing) {
                node.router.on_message_dropped(&msg.id);
                self.stats.expired += 1;
                trace!(node = %node.id, message = %msg.id, "Message expired");
            }
        }
    }

    /// Ask one node's router for a transfer
    fn plan_node(&mut self, index: usize) -> Option<ForwardCandidate<HostId>> {
        let node = &self.nodes[index];
        if node.buffer.is_empty() || node.is_transferring() {
            return None;
        }
        let neighbors = self.links.neighbors(node.id);
        if neighbors.is_empty() {
            return None;
        }

        let carried = node.buffer.ordered(self.settings.queue_mode, &mut self.rng);
        let contacts: Vec<&dyn PeerQuery<HostId>> = neighbors
            .iter()
            .map(|id| &self.nodes[slot(*id)] as &dyn PeerQuery<HostId>)
            .collect();

        let _ctx = NodeContextGuard::with_instance_id(&node.id, self.run_id);
        let mut engine = LinkEngine::new(node, &self.nodes, &self.links);
        node.router.update(&carried, &contacts, &mut engine);
        engine.into_started()
    }

    fn start_transfer(&mut self, index: usize, candidate: ForwardCandidate<HostId>, now: SimTime) {
        let sender = &self.nodes[index];
        let Some(msg) = sender.buffer.get(&candidate.message) else {
            return;
        };
        let duration = msg.size as f64 / self.settings.transmit_speed;
        let transfer = Transfer {
            from: sender.id,
            to: candidate.contact,
            handoff: sender.router.prepare_handoff(msg),
            started_at: now,
            completes_at: now + duration,
        };
        debug!(
            message = %candidate.message,
            from = %transfer.from,
            to = %transfer.to,
            kind = ?candidate.kind,
            duration,
            "Transfer started"
        );

        self.nodes[index].outgoing = Some(candidate.message);
        self.nodes[slot(candidate.contact)].incoming += 1;
        self.transfers.push(transfer);
        self.stats.started += 1;
    }
}

/// Index of a node in the node table
fn slot(id: HostId) -> usize {
    id.index() as usize
}

fn check_node(settings: &SimSettings, id: HostId) -> SimResult<()> {
    if id.index() < settings.nodes {
        Ok(())
    } else {
        Err(SimError::UnknownNode(id))
    }
}

fn build_nodes(
    drinc: &DrincSettings,
    settings: &SimSettings,
    clock: Arc<ManualClock>,
) -> SimResult<Vec<SimNode>> {
    let clock: Arc<dyn SimClock> = clock;
    HostId::range(settings.nodes)
        .into_iter()
        .map(|id| {
            SimNode::new(id, drinc.clone(), clock.clone(), settings.buffer_size)
                .map_err(SimError::from)
        })
        .collect()
}

/// Messages from the periodic generator, between distinct random nodes
fn generated_messages(settings: &SimSettings, rng: &mut StdRng) -> Vec<MessageEvent> {
    let Some(generation) = &settings.message_generation else {
        return Vec::new();
    };
    let end = generation
        .end
        .map_or(settings.end_time, |end| end.min(settings.end_time));

    let mut out = Vec::new();
    let mut time = generation.start;
    while time < end {
        let from = rng.random_range(0..settings.nodes);
        let mut to = rng.random_range(0..settings.nodes - 1);
        if to >= from {
            to += 1;
        }
        out.push(MessageEvent {
            time,
            from: HostId(from),
            to: HostId(to),
            size: rng.random_range(generation.size_min..=generation.size_max),
        });
        time += generation.interval;
    }
    out
}

/// Account for a buffer admission on `node`
fn handle_admission(node: &mut SimNode, id: MessageId, admission: Admission, stats: &mut SimStats) {
    match admission {
        Admission::Accepted { evicted } => {
            for old in evicted {
                node.router.on_message_dropped(&old.id);
                stats.dropped += 1;
                warn!(node = %node.id, message = %old.id, "Buffer full, message evicted");
            }
        }
        Admission::Rejected => {
            node.router.on_message_dropped(&id);
            stats.dropped += 1;
            warn!(node = %node.id, message = %id, "Message larger than buffer, dropped");
        }
    }
}
