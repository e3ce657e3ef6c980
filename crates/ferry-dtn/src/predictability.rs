//! Delivery predictability store
//!
//! Each node keeps one [`PeerRecord`] per peer it has ever heard of: a
//! delivery predictability in `[0, 1]` and the time of the last direct
//! encounter. Records are created lazily and never removed.
//!
//! Aging is pull-based: every read first ages the whole table up to the
//! requested simulated time, so no timer is needed to keep the values
//! consistent with the global clock.

use std::collections::HashMap;

use parking_lot::RwLock;

use ferry_core::{PeerIdentity, SimTime};

use crate::config::AgingModel;

/// Stored state for one peer
#[derive(Debug, Clone, PartialEq)]
pub struct PeerRecord<I: PeerIdentity> {
    /// The peer this record describes
    pub peer: I,
    /// Delivery predictability in `[0, 1]`
    pub predictability: f64,
    /// Last direct encounter, `None` if only known transitively
    pub last_encounter: Option<SimTime>,
}

#[derive(Debug)]
struct StoreInner<I: PeerIdentity> {
    records: HashMap<I, PeerRecord<I>>,
    last_age_update: SimTime,
}

/// Per-node table of delivery predictabilities
///
/// Shared references are enough to read and age the table, which is how
/// peers query it during contacts. Only the owning router mutates values.
#[derive(Debug)]
pub struct PredictabilityStore<I: PeerIdentity> {
    inner: RwLock<StoreInner<I>>,
    seconds_in_time_unit: f64,
    aging: AgingModel,
}

impl<I: PeerIdentity> PredictabilityStore<I> {
    /// Create an empty store
    pub fn new(seconds_in_time_unit: u32, aging: AgingModel) -> Self {
        Self {
            inner: RwLock::new(StoreInner {
                records: HashMap::new(),
                last_age_update: SimTime::ZERO,
            }),
            seconds_in_time_unit: f64::from(seconds_in_time_unit.max(1)),
            aging,
        }
    }

    /// Age every record up to `now`
    ///
    /// Raises each value by the number of time units elapsed since the
    /// previous aging pass. Calling it again at the same timestamp, or with
    /// an earlier one, changes nothing.
    pub fn age_all(&self, now: SimTime) {
        let mut inner = self.inner.write();
        let elapsed_units = (now - inner.last_age_update) / self.seconds_in_time_unit;

        if elapsed_units <= 0.0 {
            return;
        }

        for record in inner.records.values_mut() {
            record.predictability = self.aging.apply(record.predictability, elapsed_units);
        }
        inner.last_age_update = now;
    }

    /// Predictability for `peer` at `now`, 0.0 if unknown
    pub fn predictability(&self, peer: &I, now: SimTime) -> f64 {
        self.age_all(now);
        self.inner
            .read()
            .records
            .get(peer)
            .map(|r| r.predictability)
            .unwrap_or(0.0)
    }

    /// Last direct encounter with `peer`, `None` if never met
    pub fn last_encounter(&self, peer: &I) -> Option<SimTime> {
        self.inner
            .read()
            .records
            .get(peer)
            .and_then(|r| r.last_encounter)
    }

    /// Last direct encounter with `peer`, [`SimTime::ZERO`] if never met
    pub fn last_encounter_time(&self, peer: &I) -> SimTime {
        self.last_encounter(peer).unwrap_or(SimTime::ZERO)
    }

    /// Snapshot of every known predictability, aged to `now`
    pub fn all_predictabilities(&self, now: SimTime) -> Vec<(I, f64)> {
        self.age_all(now);
        self.inner
            .read()
            .records
            .values()
            .map(|r| (r.peer.clone(), r.predictability))
            .collect()
    }

    /// Snapshot of every record, aged to `now`
    pub fn records(&self, now: SimTime) -> Vec<PeerRecord<I>> {
        self.age_all(now);
        self.inner.read().records.values().cloned().collect()
    }

    /// Overwrite the predictability for `peer`, clamped into `[0, 1]`
    pub(crate) fn set_predictability(&self, peer: &I, value: f64) {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        let mut inner = self.inner.write();
        inner
            .records
            .entry(peer.clone())
            .and_modify(|r| r.predictability = value)
            .or_insert_with(|| PeerRecord {
                peer: peer.clone(),
                predictability: value,
                last_encounter: None,
            });
    }

    /// Record a direct encounter with `peer` at `time`
    pub(crate) fn set_last_encounter(&self, peer: &I, time: SimTime) {
        let mut inner = self.inner.write();
        inner
            .records
            .entry(peer.clone())
            .and_modify(|r| r.last_encounter = Some(time))
            .or_insert_with(|| PeerRecord {
                peer: peer.clone(),
                predictability: 0.0,
                last_encounter: Some(time),
            });
    }

    /// Time of the most recent aging pass
    pub fn last_age_update(&self) -> SimTime {
        self.inner.read().last_age_update
    }

    /// Number of peers with a record
    pub fn known_peers(&self) -> usize {
        self.inner.read().records.len()
    }
}
