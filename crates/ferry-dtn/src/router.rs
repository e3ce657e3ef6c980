//! DRINC router
//!
//! [`DrincRouter`] is the per-node entry point. It owns the node's
//! predictability store and copy counts, reads simulated time from the
//! shared clock, and reacts to the host's contact and message events.
//!
//! Contact-up runs the direct encounter update for the met peer and then
//! the transitive update through it. Scheduling ticks run the forwarding
//! state machine in [`crate::forwarding`].

use std::fmt::{self, Display};
use std::sync::Arc;

use tracing::{debug, info, instrument, trace};

use ferry_core::{Message, MessageId, PeerIdentity, SimClock, SimTime};

use crate::config::DrincSettings;
use crate::copies::CopyManager;
use crate::encounter::EncounterModel;
use crate::error::DtnResult;
use crate::forwarding::{TickContext, TickReport, TransferEngine, run_tick};
use crate::peer::{PeerQuery, StrategyKind, ensure_compatible};
use crate::predictability::PredictabilityStore;
use crate::transitive::propagate_via;

/// A message as it crosses the link, with the sender's copy count
#[derive(Debug, Clone)]
pub struct MessageHandoff<I: PeerIdentity> {
    /// The receiver's copy of the message
    pub message: Message<I>,
    /// Copies the sender held when the transfer started
    pub copies: Option<u32>,
}

/// What a contact-up event changed
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EncounterOutcome {
    /// New direct predictability for the met peer
    pub predictability: f64,
    /// Number of third-party estimates raised transitively
    pub transitive_raised: usize,
}

/// Diagnostic tree describing a router's state
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingInfo {
    /// Line describing this node of the tree
    pub text: String,
    /// Nested entries
    pub children: Vec<RoutingInfo>,
}

impl RoutingInfo {
    fn leaf(text: String) -> Self {
        Self {
            text,
            children: Vec::new(),
        }
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        writeln!(f, "{:indent$}{}", "", self.text, indent = depth * 2)?;
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl Display for RoutingInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// Per-node probabilistic copy-limited router
pub struct DrincRouter<I: PeerIdentity> {
    local_id: I,
    settings: DrincSettings,
    clock: Arc<dyn SimClock>,
    store: PredictabilityStore<I>,
    encounter: EncounterModel,
    copies: CopyManager,
}

impl<I: PeerIdentity> DrincRouter<I> {
    /// Create a router for `local_id`
    ///
    /// Fails if the settings are out of range.
    pub fn new(local_id: I, settings: DrincSettings, clock: Arc<dyn SimClock>) -> DtnResult<Self> {
        settings.validate()?;
        Ok(Self {
            store: PredictabilityStore::new(settings.seconds_in_time_unit, settings.aging),
            encounter: EncounterModel::from_settings(&settings),
            copies: CopyManager::new(settings.nrof_copies),
            local_id,
            settings,
            clock,
        })
    }

    /// Get the local node's identity
    pub fn local_id(&self) -> &I {
        &self.local_id
    }

    /// Router settings
    pub fn settings(&self) -> &DrincSettings {
        &self.settings
    }

    /// Strategy identifier other nodes see
    pub fn strategy(&self) -> StrategyKind {
        StrategyKind::Drinc
    }

    /// Current simulated time
    pub fn now(&self) -> SimTime {
        self.clock.now()
    }

    /// The node's predictability table
    pub fn store(&self) -> &PredictabilityStore<I> {
        &self.store
    }

    /// The node's copy counts
    pub fn copies(&self) -> &CopyManager {
        &self.copies
    }

    /// A link to `peer` came up
    ///
    /// Updates the direct predictability for the peer, then relaxes the
    /// estimates for everything the peer knows about. Returns `None` for an
    /// encounter with ourselves. A peer running another strategy is
    /// rejected before any state changes.
    #[instrument(skip_all, fields(local = %self.local_id.short_id(), peer = %peer.peer_id().short_id()))]
    pub fn on_contact_up(&self, peer: &dyn PeerQuery<I>) -> DtnResult<Option<EncounterOutcome>> {
        ensure_compatible(peer)?;

        let peer_id = peer.peer_id();
        if peer_id == &self.local_id {
            trace!("Ignoring encounter with self");
            return Ok(None);
        }

        let now = self.now();
        let predictability = self.encounter.update_direct(&self.store, peer_id, now);
        let remote = peer.all_predictabilities();
        let transitive_raised = propagate_via(&self.store, &self.local_id, peer_id, &remote, now);

        debug!(predictability, transitive_raised, "Contact up");
        Ok(Some(EncounterOutcome {
            predictability,
            transitive_raised,
        }))
    }

    /// A link to `peer` went down
    ///
    /// Predictabilities only change on contact-up.
    pub fn on_contact_down(&self, peer: &I) {
        trace!(
            local = %self.local_id.short_id(),
            peer = %peer.short_id(),
            "Contact down"
        );
    }

    /// A message was created on this node
    pub fn on_message_created(&self, msg: &Message<I>) {
        self.copies.on_message_created(msg);
        debug!(
            local = %self.local_id.short_id(),
            message = %msg.id,
            destination = %msg.destination.short_id(),
            copies = self.copies.initial_copies(),
            "Message created"
        );
    }

    /// Snapshot a carried message for sending
    pub fn prepare_handoff(&self, msg: &Message<I>) -> MessageHandoff<I> {
        MessageHandoff {
            message: msg.forwarded(),
            copies: self.copies.copies_left(&msg.id),
        }
    }

    /// A message arrived from `from`
    ///
    /// The receiver always starts with one copy. A hand-off without a copy
    /// count is a protocol violation and nothing is stored.
    pub fn on_message_received(&self, handoff: MessageHandoff<I>, from: &I) -> DtnResult<Message<I>> {
        let MessageHandoff { message, copies } = handoff;
        self.copies.on_message_received(message.id, copies)?;
        trace!(
            local = %self.local_id.short_id(),
            from = %from.short_id(),
            message = %message.id,
            hops = message.hop_count,
            "Message received"
        );
        Ok(message)
    }

    /// A transfer this node sent finished
    pub fn on_transfer_completed(&self, id: &MessageId) {
        self.copies.on_transfer_completed(id);
    }

    /// A message left this node's buffer
    pub fn on_message_dropped(&self, id: &MessageId) {
        self.copies.on_message_dropped(id);
    }

    /// Copies left for a carried message
    pub fn copies_left(&self, id: &MessageId) -> Option<u32> {
        self.copies.copies_left(id)
    }

    /// Run one scheduling tick
    ///
    /// `carried` must be in the buffer's queue order.
    pub fn update<E: TransferEngine<I>>(
        &self,
        carried: &[Message<I>],
        contacts: &[&dyn PeerQuery<I>],
        engine: &mut E,
    ) -> TickReport<I> {
        let ctx = TickContext {
            store: &self.store,
            copies: &self.copies,
            now: self.now(),
            carried,
            contacts,
        };
        let report = run_tick(&ctx, engine);
        if report.started_any() {
            trace!(
                local = %self.local_id.short_id(),
                phase = ?report.phase,
                started = report.started.len(),
                "Tick started transfers"
            );
        }
        report
    }

    /// This node's predictability for `destination`, aged to now
    pub fn predictability_for(&self, destination: &I) -> f64 {
        self.store.predictability(destination, self.now())
    }

    /// This node's whole table, aged to now
    pub fn all_predictabilities(&self) -> Vec<(I, f64)> {
        self.store.all_predictabilities(self.now())
    }

    /// Diagnostic listing of every known predictability
    ///
    /// Entries are ordered by predictability, highest first.
    pub fn routing_info(&self) -> RoutingInfo {
        let mut preds = self.all_predictabilities();
        preds.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.to_string().cmp(&b.0.to_string()))
        });

        RoutingInfo {
            text: format!("{} delivery prediction(s)", preds.len()),
            children: preds
                .into_iter()
                .map(|(peer, p)| RoutingInfo::leaf(format!("{} : {:.6}", peer, p)))
                .collect(),
        }
    }

    /// Log a one-line summary of the router's state
    pub fn log_summary(&self) {
        info!(
            local = %self.local_id.short_id(),
            known_peers = self.store.known_peers(),
            carried = self.copies.tracked(),
            "Router state"
        );
    }
}

impl<I: PeerIdentity> fmt::Debug for DrincRouter<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrincRouter")
            .field("local_id", &self.local_id)
            .field("settings", &self.settings)
            .field("now", &self.now())
            .field("known_peers", &self.store.known_peers())
            .field("tracked_messages", &self.copies.tracked())
            .finish()
    }
}
