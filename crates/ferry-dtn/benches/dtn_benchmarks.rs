//! DTN routing performance benchmarks
//!
//! Benchmarks for the per-contact and per-tick hot paths:
//! - Predictability aging and lookup
//! - Direct and transitive updates
//! - Relay candidate ranking
//! - Copy bookkeeping
//!
//! Run with: cargo bench -p ferry-dtn

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::collections::HashMap;

use ferry_core::{HostId, Message, MessageId, SimTime};
use ferry_dtn::{
    AgingModel, CopyManager, EncounterModel, PeerQuery, PredictabilityStore, StrategyKind,
    propagate_via, relay_candidates,
};

// ============================================================================
// Bench Peer
// ============================================================================

struct BenchPeer {
    id: HostId,
    predictions: HashMap<HostId, f64>,
}

impl BenchPeer {
    fn new(id: u32, destinations: u32) -> Self {
        let predictions = (0..destinations)
            .map(|d| (HostId(1000 + d), ((id + d) % 10) as f64 / 10.0))
            .collect();
        Self {
            id: HostId(id),
            predictions,
        }
    }
}

impl PeerQuery<HostId> for BenchPeer {
    fn peer_id(&self) -> &HostId {
        &self.id
    }

    fn strategy(&self) -> StrategyKind {
        StrategyKind::Drinc
    }

    fn predictability_for(&self, destination: &HostId) -> f64 {
        self.predictions.get(destination).copied().unwrap_or(0.0)
    }

    fn all_predictabilities(&self) -> Vec<(HostId, f64)> {
        self.predictions.iter().map(|(k, v)| (*k, *v)).collect()
    }

    fn is_transferring(&self) -> bool {
        false
    }

    fn has_message(&self, _id: &MessageId) -> bool {
        false
    }
}

fn t(secs: f64) -> SimTime {
    SimTime::from_secs(secs)
}

/// Store that has met `peers` nodes once each at time zero
fn populated_store(peers: u32) -> PredictabilityStore<HostId> {
    let store = PredictabilityStore::new(30, AgingModel::Exponent);
    let model = EncounterModel::default();
    for id in 1..=peers {
        model.update_direct(&store, &HostId(id), SimTime::ZERO);
    }
    store
}

// ============================================================================
// Predictability Benchmarks
// ============================================================================

fn bench_predictability(c: &mut Criterion) {
    let mut group = c.benchmark_group("predictability");

    group.bench_function("lookup_no_aging", |b| {
        let store = populated_store(100);
        b.iter(|| store.predictability(black_box(&HostId(50)), SimTime::ZERO))
    });

    group.bench_function("age_all_100_peers", |b| {
        let store = populated_store(100);
        let mut now = 0.0;
        b.iter(|| {
            now += 1.0;
            store.age_all(black_box(t(now)))
        })
    });

    group.bench_function("direct_update", |b| {
        let store = populated_store(10);
        let model = EncounterModel::default();
        let mut now = 0.0;
        b.iter(|| {
            now += 60.0;
            model.update_direct(&store, black_box(&HostId(3)), t(now))
        })
    });

    group.bench_function("transitive_50_destinations", |b| {
        let store = populated_store(1);
        let peer = BenchPeer::new(1, 50);
        let remote = peer.all_predictabilities();
        b.iter(|| {
            propagate_via(
                &store,
                &HostId(0),
                &HostId(1),
                black_box(&remote),
                SimTime::ZERO,
            )
        })
    });

    group.finish();
}

// ============================================================================
// Forwarding Benchmarks
// ============================================================================

fn bench_forwarding(c: &mut Criterion) {
    let mut group = c.benchmark_group("forwarding");

    let store = populated_store(0);
    let peers: Vec<BenchPeer> = (1..=25).map(|id| BenchPeer::new(id, 20)).collect();
    let contacts: Vec<&dyn PeerQuery<HostId>> =
        peers.iter().map(|p| p as &dyn PeerQuery<HostId>).collect();
    let messages: Vec<Message<HostId>> = (0..40)
        .map(|i| {
            let dest = HostId(1000 + (i % 20) as u32);
            Message::new(MessageId(i), HostId(0), dest, 1_000, SimTime::ZERO)
        })
        .collect();
    let refs: Vec<&Message<HostId>> = messages.iter().collect();

    group.bench_function("rank_25_contacts_40_messages", |b| {
        b.iter(|| relay_candidates(&store, SimTime::ZERO, black_box(&refs), black_box(&contacts)))
    });

    group.bench_function("copy_bookkeeping", |b| {
        let copies = CopyManager::new(6);
        b.iter(|| {
            for msg in &messages {
                copies.on_message_created(msg);
                copies.on_transfer_completed(&msg.id);
            }
            copies.eligible_for_spraying(black_box(&messages)).len()
        })
    });

    group.finish();
}

criterion_group!(benches, bench_predictability, bench_forwarding);
criterion_main!(benches);
