//! Contact events
//!
//! The host's contact scheduler reports links going up and down between
//! pairs of nodes. Routers react only to links going up.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::identity::PeerIdentity;
use crate::time::SimTime;

/// Whether a link came up or went down
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    Up,
    Down,
}

impl Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LinkState::Up => write!(f, "up"),
            LinkState::Down => write!(f, "down"),
        }
    }
}

/// A link between two nodes changed state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "I: PeerIdentity")]
pub struct ContactEvent<I: PeerIdentity> {
    /// When the change happens
    pub time: SimTime,
    /// First endpoint
    pub a: I,
    /// Second endpoint
    pub b: I,
    /// New link state
    pub state: LinkState,
}

impl<I: PeerIdentity> ContactEvent<I> {
    /// A link coming up
    pub fn up(time: SimTime, a: I, b: I) -> Self {
        Self {
            time,
            a,
            b,
            state: LinkState::Up,
        }
    }

    /// A link going down
    pub fn down(time: SimTime, a: I, b: I) -> Self {
        Self {
            time,
            a,
            b,
            state: LinkState::Down,
        }
    }

    /// Whether the event involves `peer`
    pub fn involves(&self, peer: &I) -> bool {
        &self.a == peer || &self.b == peer
    }

    /// The endpoint opposite to `peer`, if `peer` is an endpoint
    pub fn other(&self, peer: &I) -> Option<&I> {
        if &self.a == peer {
            Some(&self.b)
        } else if &self.b == peer {
            Some(&self.a)
        } else {
            None
        }
    }
}
