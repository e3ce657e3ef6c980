//! Peer identity abstractions
//!
//! This module provides the [`PeerIdentity`] trait that abstracts over
//! different identity implementations. The simulation host uses
//! [`HostId`], a plain numeric node index.

use std::fmt::{Debug, Display};
use std::hash::Hash;
use std::str::FromStr;

use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::error::IdentityError;

/// Trait for peer identity abstraction
///
/// Routing state is keyed by this trait so the same router works with
/// simulated hosts and any other identity scheme a host may bring.
pub trait PeerIdentity:
    Clone + Eq + Hash + Send + Sync + Debug + Display + Serialize + DeserializeOwned + 'static
{
    /// Get a short display form (for logging)
    fn short_id(&self) -> String {
        format!("{}", self)
    }
}

/// Numeric identity of a simulated host
///
/// Displayed as `n<index>`, which is also the form accepted in contact
/// trace files (a bare index is accepted too).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostId(pub u32);

impl HostId {
    /// Create a new host identity
    pub fn new(index: u32) -> Self {
        Self(index)
    }

    /// Generate identities `n0..n{count-1}`
    pub fn range(count: u32) -> Vec<Self> {
        (0..count).map(Self).collect()
    }

    /// Get the underlying index
    pub fn index(&self) -> u32 {
        self.0
    }
}

impl Display for HostId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "n{}", self.0)
    }
}

impl FromStr for HostId {
    type Err = IdentityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches(|c: char| c.is_ascii_alphabetic());
        digits
            .parse::<u32>()
            .map(Self)
            .map_err(|_| IdentityError::InvalidFormat(format!("Invalid host identity: {}", s)))
    }
}

impl PeerIdentity for HostId {
    fn short_id(&self) -> String {
        self.to_string()
    }
}
