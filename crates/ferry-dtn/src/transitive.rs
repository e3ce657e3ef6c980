//! Transitive predictability updates
//!
//! If A meets B often and B meets C often, A is a reasonable carrier for
//! messages to C. After the direct update for B, A pulls B's table and
//! relaxes its own estimates:
//!
//! ```text
//! P(a,c) = max(P(a,c), P(a,b) * P(b,c))
//! ```
//!
//! The raw product carries no scaling constant, so longer relay chains
//! decay on their own. Estimates are only ever raised here.

use tracing::{debug, trace};

use ferry_core::{PeerIdentity, SimTime};

use crate::predictability::PredictabilityStore;

/// Relax `store` through the intermediary `via`
///
/// `remote` is `via`'s own table as reported by the peer. Entries for
/// `local_id` are skipped. Returns the number of estimates raised.
pub fn propagate_via<I: PeerIdentity>(
    store: &PredictabilityStore<I>,
    local_id: &I,
    via: &I,
    remote: &[(I, f64)],
    now: SimTime,
) -> usize {
    let p_ab = store.predictability(via, now);
    let mut raised = 0;

    for (destination, p_bc) in remote {
        if destination == local_id {
            continue;
        }

        let p_old = store.predictability(destination, now);
        let p_new = p_ab * p_bc;

        if p_new > p_old {
            store.set_predictability(destination, p_new);
            raised += 1;
            trace!(
                via = %via.short_id(),
                destination = %destination.short_id(),
                p_old,
                p_new,
                "Transitive predictability raised"
            );
        }
    }

    debug!(
        via = %via.short_id(),
        offered = remote.len(),
        raised,
        "Transitive update complete"
    );
    raised
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AgingModel;
    use ferry_core::HostId;

    const EPS: f64 = 1e-12;

    fn store_with(entries: &[(u32, f64)]) -> PredictabilityStore<HostId> {
        let store = PredictabilityStore::new(30, AgingModel::Exponent);
        for (id, p) in entries {
            store.set_predictability(&HostId(*id), *p);
        }
        store
    }

    #[test]
    fn test_transitive_product_applied() {
        let a = HostId(0);
        let b = HostId(1);
        let c = HostId(2);
        let store = store_with(&[(1, 0.8)]);

        let raised = propagate_via(&store, &a, &b, &[(c, 0.5)], SimTime::ZERO);

        assert_eq!(raised, 1);
        assert!((store.predictability(&c, SimTime::ZERO) - 0.4).abs() < EPS);
        // Transitive knowledge is not an encounter
        assert_eq!(store.last_encounter(&c), None);
    }

    #[test]
    fn test_transitive_never_lowers() {
        let a = HostId(0);
        let b = HostId(1);
        let c = HostId(2);
        let store = store_with(&[(1, 0.5), (2, 0.7)]);

        let raised = propagate_via(&store, &a, &b, &[(c, 0.9)], SimTime::ZERO);

        assert_eq!(raised, 0);
        assert_eq!(store.predictability(&c, SimTime::ZERO), 0.7);
    }

    #[test]
    fn test_equal_product_is_not_applied() {
        let a = HostId(0);
        let b = HostId(1);
        let c = HostId(2);
        let store = store_with(&[(1, 0.5), (2, 0.25)]);

        assert_eq!(propagate_via(&store, &a, &b, &[(c, 0.5)], SimTime::ZERO), 0);
    }

    #[test]
    fn test_self_entry_skipped() {
        let a = HostId(0);
        let b = HostId(1);
        let store = store_with(&[(1, 0.9)]);

        propagate_via(&store, &a, &b, &[(a, 0.9)], SimTime::ZERO);
        assert_eq!(store.known_peers(), 1);
        assert_eq!(store.predictability(&a, SimTime::ZERO), 0.0);
    }

    #[test]
    fn test_unknown_intermediary_adds_nothing() {
        let store = store_with(&[]);
        let raised = propagate_via(
            &store,
            &HostId(0),
            &HostId(1),
            &[(HostId(2), 1.0)],
            SimTime::ZERO,
        );
        assert_eq!(raised, 0);
        assert_eq!(store.known_peers(), 0);
    }
}
