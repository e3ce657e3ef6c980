//! Forwarding decisions
//!
//! Each scheduling tick walks a small state machine:
//!
//! 1. **Idle**: nothing happens if a transfer is running or none can start.
//! 2. **CheckDirectDelivery**: offer messages to contacts that are their
//!    final destination. If one starts, the tick ends here.
//! 3. **SprayEligible**: messages with more than one copy left are offered
//!    to every contact, in the buffer's queue order.
//! 4. **OpportunisticRelay**: every other message is offered to contacts
//!    whose predictability for its destination is at least ours
//!    (GRTRMax), best contact first.
//!
//! Messages still holding spare copies never enter the relay phase; they
//! only leave through direct delivery or spraying. A tick's relay offers
//! are therefore limited to messages down to their last copy.
//!
//! The host's transfer engine decides whether each offer actually starts.

use std::cmp::Ordering;

use tracing::{trace, warn};

use ferry_core::{Message, MessageId, PeerIdentity, SimTime};

use crate::copies::CopyManager;
use crate::peer::{PeerQuery, ensure_compatible};
use crate::predictability::PredictabilityStore;

/// Why a candidate was generated
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CandidateKind {
    /// The contact is the message's destination
    Direct,
    /// The message still has copies to spray
    Spray,
    /// The contact reported at least our predictability for the destination
    Relay { score: f64 },
}

/// A proposed (message, contact) transfer
#[derive(Debug, Clone, PartialEq)]
pub struct ForwardCandidate<I: PeerIdentity> {
    /// Message to send
    pub message: MessageId,
    /// Final destination of the message
    pub destination: I,
    /// Contact to send it to
    pub contact: I,
    /// Why it was proposed
    pub kind: CandidateKind,
}

impl<I: PeerIdentity> ForwardCandidate<I> {
    fn new(msg: &Message<I>, contact: &I, kind: CandidateKind) -> Self {
        Self {
            message: msg.id,
            destination: msg.destination.clone(),
            contact: contact.clone(),
            kind,
        }
    }

    /// Contact-side predictability for relay candidates
    pub fn score(&self) -> Option<f64> {
        match self.kind {
            CandidateKind::Relay { score } => Some(score),
            _ => None,
        }
    }
}

/// Outcome of offering one candidate to the transfer engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferAttempt {
    /// The transfer started
    Started,
    /// This node or the contact cannot take another transfer right now
    Busy,
    /// The contact refused the message or is gone
    Denied,
}

/// Host-side executor of transfers
pub trait TransferEngine<I: PeerIdentity> {
    /// Whether this node could start a transfer at all
    fn can_start_transfer(&self) -> bool;

    /// Whether this node is already sending
    fn is_transferring(&self) -> bool;

    /// Try to start the transfer described by `candidate`
    fn try_transfer(&mut self, candidate: &ForwardCandidate<I>) -> TransferAttempt;
}

/// State of the per-tick forwarding state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickPhase {
    Idle,
    CheckDirectDelivery,
    SprayEligible,
    OpportunisticRelay,
}

/// What a tick did
#[derive(Debug, Clone)]
pub struct TickReport<I: PeerIdentity> {
    /// Last phase the tick reached
    pub phase: TickPhase,
    /// Transfers that started, in order
    pub started: Vec<ForwardCandidate<I>>,
    /// Number of relay candidates generated
    pub relay_candidates: usize,
}

impl<I: PeerIdentity> TickReport<I> {
    fn new(phase: TickPhase) -> Self {
        Self {
            phase,
            started: Vec::new(),
            relay_candidates: 0,
        }
    }

    /// Whether any transfer started this tick
    pub fn started_any(&self) -> bool {
        !self.started.is_empty()
    }
}

/// Inputs of one scheduling tick
pub struct TickContext<'a, I: PeerIdentity> {
    /// This node's predictability table
    pub store: &'a PredictabilityStore<I>,
    /// This node's copy counts
    pub copies: &'a CopyManager,
    /// Current simulated time
    pub now: SimTime,
    /// Carried messages, in the buffer's queue order
    pub carried: &'a [Message<I>],
    /// Peers currently in contact
    pub contacts: &'a [&'a dyn PeerQuery<I>],
}

/// Offer candidates in order until one starts
fn try_in_order<I, E>(
    candidates: impl IntoIterator<Item = ForwardCandidate<I>>,
    engine: &mut E,
) -> Option<ForwardCandidate<I>>
where
    I: PeerIdentity,
    E: TransferEngine<I>,
{
    for candidate in candidates {
        let attempt = engine.try_transfer(&candidate);
        trace!(
            message = %candidate.message,
            contact = %candidate.contact.short_id(),
            ?attempt,
            "Transfer offered"
        );
        if attempt == TransferAttempt::Started {
            return Some(candidate);
        }
    }
    None
}

/// Messages whose destination is a current contact
pub fn direct_candidates<I: PeerIdentity>(
    carried: &[Message<I>],
    contacts: &[&dyn PeerQuery<I>],
) -> Vec<ForwardCandidate<I>> {
    contacts
        .iter()
        .flat_map(|contact| {
            carried
                .iter()
                .filter(move |m| m.is_for(contact.peer_id()))
                .map(move |m| ForwardCandidate::new(m, contact.peer_id(), CandidateKind::Direct))
        })
        .collect()
}

/// Messages with spare copies, offered to every contact
pub fn spray_candidates<I: PeerIdentity>(
    eligible: &[&Message<I>],
    contacts: &[&dyn PeerQuery<I>],
) -> Vec<ForwardCandidate<I>> {
    contacts
        .iter()
        .flat_map(|contact| {
            eligible
                .iter()
                .map(move |m| ForwardCandidate::new(m, contact.peer_id(), CandidateKind::Spray))
        })
        .collect()
}

/// Relay candidates ranked by the contact's predictability, best first
///
/// A contact qualifies for a message when its predictability for the
/// destination is greater than or equal to ours. Contacts that are busy,
/// already hold the message, or run another strategy are skipped. The
/// sort is stable, so candidates with equal scores keep generation order
/// (contact order, then message order); that order is not otherwise
/// meaningful.
pub fn relay_candidates<I: PeerIdentity>(
    store: &PredictabilityStore<I>,
    now: SimTime,
    messages: &[&Message<I>],
    contacts: &[&dyn PeerQuery<I>],
) -> Vec<ForwardCandidate<I>> {
    let mut candidates = Vec::new();

    for contact in contacts {
        if let Err(e) = ensure_compatible(*contact) {
            warn!(error = %e, "Skipping contact for relay");
            continue;
        }
        if contact.is_transferring() {
            trace!(contact = %contact.peer_id().short_id(), "Contact busy");
            continue;
        }

        for msg in messages {
            if contact.has_message(&msg.id) {
                continue;
            }
            let theirs = contact.predictability_for(&msg.destination);
            let ours = store.predictability(&msg.destination, now);
            if theirs >= ours {
                candidates.push(ForwardCandidate::new(
                    msg,
                    contact.peer_id(),
                    CandidateKind::Relay { score: theirs },
                ));
            }
        }
    }

    candidates.sort_by(|a, b| {
        let pa = a.score().unwrap_or(0.0);
        let pb = b.score().unwrap_or(0.0);
        pb.partial_cmp(&pa).unwrap_or(Ordering::Equal)
    });
    candidates
}

/// Run one scheduling tick against the host's transfer engine
pub fn run_tick<I, E>(ctx: &TickContext<'_, I>, engine: &mut E) -> TickReport<I>
where
    I: PeerIdentity,
    E: TransferEngine<I>,
{
    if !engine.can_start_transfer() || engine.is_transferring() {
        return TickReport::new(TickPhase::Idle);
    }

    let mut report = TickReport::new(TickPhase::CheckDirectDelivery);
    if let Some(started) = try_in_order(direct_candidates(ctx.carried, ctx.contacts), engine) {
        report.started.push(started);
        return report;
    }

    report.phase = TickPhase::SprayEligible;
    let eligible = ctx.copies.eligible_for_spraying(ctx.carried);
    if !eligible.is_empty()
        && let Some(started) = try_in_order(spray_candidates(&eligible, ctx.contacts), engine)
    {
        report.started.push(started);
    }

    report.phase = TickPhase::OpportunisticRelay;
    let others: Vec<&Message<I>> = ctx
        .carried
        .iter()
        .filter(|m| !ctx.copies.is_spray_eligible(&m.id))
        .collect();
    let ranked = relay_candidates(ctx.store, ctx.now, &others, ctx.contacts);
    report.relay_candidates = ranked.len();

    if let Some(started) = try_in_order(ranked, engine) {
        report.started.push(started);
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgingModel;
    use crate::peer::testing::StubPeer;
    use ferry_core::HostId;

    const DEST: HostId = HostId(9);

    fn make_message(id: u64, dest: HostId) -> Message<HostId> {
        Message::new(MessageId(id), HostId(0), dest, 100, SimTime::ZERO)
    }

    fn own_store(p_dest: f64) -> PredictabilityStore<HostId> {
        let store = PredictabilityStore::new(30, AgingModel::Exponent);
        store.set_predictability(&DEST, p_dest);
        store
    }

    /// Engine that accepts offers according to a predicate and records them
    struct RecordingEngine {
        busy: bool,
        accept: fn(&ForwardCandidate<HostId>) -> bool,
        offered: Vec<ForwardCandidate<HostId>>,
    }

    impl RecordingEngine {
        fn accepting(accept: fn(&ForwardCandidate<HostId>) -> bool) -> Self {
            Self {
                busy: false,
                accept,
                offered: Vec::new(),
            }
        }
    }

    impl TransferEngine<HostId> for RecordingEngine {
        fn can_start_transfer(&self) -> bool {
            true
        }

        fn is_transferring(&self) -> bool {
            self.busy
        }

        fn try_transfer(&mut self, candidate: &ForwardCandidate<HostId>) -> TransferAttempt {
            self.offered.push(candidate.clone());
            if (self.accept)(candidate) {
                TransferAttempt::Started
            } else {
                TransferAttempt::Denied
            }
        }
    }

    #[test]
    fn test_relay_ranked_by_contact_predictability() {
        let store = own_store(0.5);
        let p1 = StubPeer::new(HostId(1)).with_prediction(DEST, 0.6);
        let p2 = StubPeer::new(HostId(2)).with_prediction(DEST, 0.8);
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&p1, &p2];
        let msg = make_message(1, DEST);

        let ranked = relay_candidates(&store, SimTime::ZERO, &[&msg], &contacts);

        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].contact, HostId(2));
        assert_eq!(ranked[0].score(), Some(0.8));
        assert_eq!(ranked[1].contact, HostId(1));
        assert_eq!(ranked[1].score(), Some(0.6));
    }

    #[test]
    fn test_relay_includes_ties_excludes_worse() {
        let store = own_store(0.5);
        let equal = StubPeer::new(HostId(1)).with_prediction(DEST, 0.5);
        let worse = StubPeer::new(HostId(2)).with_prediction(DEST, 0.49);
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&equal, &worse];
        let msg = make_message(1, DEST);

        let ranked = relay_candidates(&store, SimTime::ZERO, &[&msg], &contacts);

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].contact, HostId(1));
    }

    #[test]
    fn test_transferring_contact_yields_no_candidates() {
        let store = own_store(0.0);
        let busy = StubPeer::new(HostId(1))
            .with_prediction(DEST, 1.0)
            .transferring();
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&busy];
        let messages = [make_message(1, DEST), make_message(2, DEST)];
        let refs: Vec<&Message<HostId>> = messages.iter().collect();

        assert!(relay_candidates(&store, SimTime::ZERO, &refs, &contacts).is_empty());
    }

    #[test]
    fn test_contact_holding_message_skipped() {
        let store = own_store(0.0);
        let holder = StubPeer::new(HostId(1))
            .with_prediction(DEST, 0.9)
            .with_message(MessageId(1));
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&holder];
        let m1 = make_message(1, DEST);
        let m2 = make_message(2, DEST);

        let ranked = relay_candidates(&store, SimTime::ZERO, &[&m1, &m2], &contacts);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].message, MessageId(2));
    }

    #[test]
    fn test_incompatible_contact_skipped() {
        let store = own_store(0.0);
        let foreign = StubPeer::new(HostId(1))
            .with_prediction(DEST, 0.9)
            .foreign("epidemic");
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&foreign];
        let msg = make_message(1, DEST);

        assert!(relay_candidates(&store, SimTime::ZERO, &[&msg], &contacts).is_empty());
    }

    #[test]
    fn test_equal_scores_keep_generation_order() {
        // Order among equal scores is implementation-defined; this pins the
        // current stable behaviour so changes are noticed.
        let store = own_store(0.1);
        let p1 = StubPeer::new(HostId(1)).with_prediction(DEST, 0.7);
        let p2 = StubPeer::new(HostId(2)).with_prediction(DEST, 0.7);
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&p1, &p2];
        let m1 = make_message(1, DEST);
        let m2 = make_message(2, DEST);

        let ranked = relay_candidates(&store, SimTime::ZERO, &[&m1, &m2], &contacts);
        let order: Vec<(HostId, MessageId)> =
            ranked.iter().map(|c| (c.contact, c.message)).collect();
        assert_eq!(
            order,
            vec![
                (HostId(1), MessageId(1)),
                (HostId(1), MessageId(2)),
                (HostId(2), MessageId(1)),
                (HostId(2), MessageId(2)),
            ]
        );
    }

    #[test]
    fn test_busy_node_stays_idle() {
        let store = own_store(0.0);
        let copies = CopyManager::new(4);
        let carried = vec![make_message(1, HostId(1))];
        let peer = StubPeer::new(HostId(1));
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&peer];
        let mut engine = RecordingEngine::accepting(|_| true);
        engine.busy = true;

        let ctx = TickContext {
            store: &store,
            copies: &copies,
            now: SimTime::ZERO,
            carried: &carried,
            contacts: &contacts,
        };
        let report = run_tick(&ctx, &mut engine);

        assert_eq!(report.phase, TickPhase::Idle);
        assert!(engine.offered.is_empty());
    }

    #[test]
    fn test_direct_delivery_ends_tick() {
        let store = own_store(0.0);
        let copies = CopyManager::new(4);
        let carried = vec![make_message(1, HostId(1)), make_message(2, DEST)];
        for m in &carried {
            copies.on_message_created(m);
        }
        let peer = StubPeer::new(HostId(1)).with_prediction(DEST, 0.9);
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&peer];
        let mut engine = RecordingEngine::accepting(|_| true);

        let ctx = TickContext {
            store: &store,
            copies: &copies,
            now: SimTime::ZERO,
            carried: &carried,
            contacts: &contacts,
        };
        let report = run_tick(&ctx, &mut engine);

        assert_eq!(report.phase, TickPhase::CheckDirectDelivery);
        assert_eq!(report.started.len(), 1);
        assert_eq!(report.started[0].kind, CandidateKind::Direct);
        assert_eq!(engine.offered.len(), 1);
    }

    #[test]
    fn test_spray_then_relay() {
        let store = own_store(0.2);
        let copies = CopyManager::new(4);
        let sprayable = make_message(1, DEST);
        let single = make_message(2, DEST);
        copies.on_message_created(&sprayable);
        copies.on_message_received(single.id, Some(4)).unwrap();
        let carried = vec![sprayable, single];

        let peer = StubPeer::new(HostId(1)).with_prediction(DEST, 0.3);
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&peer];
        let mut engine = RecordingEngine::accepting(|_| true);

        let ctx = TickContext {
            store: &store,
            copies: &copies,
            now: SimTime::ZERO,
            carried: &carried,
            contacts: &contacts,
        };
        let report = run_tick(&ctx, &mut engine);

        assert_eq!(report.phase, TickPhase::OpportunisticRelay);
        assert_eq!(report.relay_candidates, 1);
        let kinds: Vec<(MessageId, CandidateKind)> =
            report.started.iter().map(|c| (c.message, c.kind)).collect();
        assert_eq!(
            kinds,
            vec![
                (MessageId(1), CandidateKind::Spray),
                (MessageId(2), CandidateKind::Relay { score: 0.3 }),
            ]
        );
    }

    #[test]
    fn test_relay_tries_next_candidate_on_denial() {
        let store = own_store(0.1);
        let copies = CopyManager::new(1);
        let msg = make_message(1, DEST);
        copies.on_message_created(&msg);
        let carried = vec![msg];

        let best = StubPeer::new(HostId(1)).with_prediction(DEST, 0.9);
        let next = StubPeer::new(HostId(2)).with_prediction(DEST, 0.5);
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&next, &best];
        let mut engine = RecordingEngine::accepting(|c| c.contact == HostId(2));

        let ctx = TickContext {
            store: &store,
            copies: &copies,
            now: SimTime::ZERO,
            carried: &carried,
            contacts: &contacts,
        };
        let report = run_tick(&ctx, &mut engine);

        let offered: Vec<HostId> = engine.offered.iter().map(|c| c.contact).collect();
        assert_eq!(offered, vec![HostId(1), HostId(2)]);
        assert_eq!(report.started.len(), 1);
        assert_eq!(report.started[0].contact, HostId(2));
    }

    #[test]
    fn test_empty_candidates_is_not_an_error() {
        let store = own_store(0.9);
        let copies = CopyManager::new(1);
        let msg = make_message(1, DEST);
        copies.on_message_created(&msg);
        let carried = vec![msg];
        let peer = StubPeer::new(HostId(1)).with_prediction(DEST, 0.1);
        let contacts: Vec<&dyn PeerQuery<HostId>> = vec![&peer];
        let mut engine = RecordingEngine::accepting(|_| true);

        let ctx = TickContext {
            store: &store,
            copies: &copies,
            now: SimTime::ZERO,
            carried: &carried,
            contacts: &contacts,
        };
        let report = run_tick(&ctx, &mut engine);

        assert!(!report.started_any());
        assert_eq!(report.relay_candidates, 0);
        assert!(engine.offered.is_empty());
    }
}
