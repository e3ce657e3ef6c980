//! Read-only view of a peer during a contact
//!
//! Routers never hold a peer's state mutably. During a contact they query
//! it through [`PeerQuery`], implemented by the host for every node
//! whatever routing strategy it runs. The host must dispatch node events
//! one at a time, so a query never observes a peer mid-update.

use std::fmt::Display;

use ferry_core::{MessageId, PeerIdentity, RoutingError};

/// Routing strategy a node runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Probabilistic copy-limited routing (this crate)
    Drinc,
    /// Any other strategy, by name
    Foreign(&'static str),
}

impl Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StrategyKind::Drinc => write!(f, "drinc"),
            StrategyKind::Foreign(name) => write!(f, "{}", name),
        }
    }
}

/// Capability interface for querying a peer's routing state
pub trait PeerQuery<I: PeerIdentity> {
    /// Identity of the peer
    fn peer_id(&self) -> &I;

    /// Strategy the peer's router runs
    fn strategy(&self) -> StrategyKind;

    /// The peer's delivery predictability for `destination`
    ///
    /// Ages the peer's table as a side effect.
    fn predictability_for(&self, destination: &I) -> f64;

    /// The peer's whole predictability table
    ///
    /// Ages the peer's table as a side effect.
    fn all_predictabilities(&self) -> Vec<(I, f64)>;

    /// Whether the peer is in the middle of a transfer
    fn is_transferring(&self) -> bool;

    /// Whether the peer already holds a copy of `id`
    fn has_message(&self, id: &MessageId) -> bool;
}

/// Check that `peer` runs a strategy whose state can be compared with ours
pub fn ensure_compatible<I: PeerIdentity>(peer: &dyn PeerQuery<I>) -> Result<(), RoutingError> {
    match peer.strategy() {
        StrategyKind::Drinc => Ok(()),
        found => Err(RoutingError::IncompatiblePeer {
            peer: peer.peer_id().short_id(),
            expected: StrategyKind::Drinc.to_string(),
            found: found.to_string(),
        }),
    }
}
