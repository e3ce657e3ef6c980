//! # Ferry Core
//!
//! Core traits, types, and errors shared by the Ferry routing crates.
//!
//! This crate provides the foundational abstractions that let the routing
//! logic run against any host that can supply simulated time, contact
//! events, and messages.
//!
//! ## Key Traits
//!
//! - [`PeerIdentity`]: Abstraction over node identification
//! - [`SimClock`]: Simulated time source shared by every node of a run
//!
//! ## Key Types
//!
//! - [`HostId`]: Numeric node identity used by the simulation host
//! - [`SimTime`]: Simulated timestamp in seconds
//! - [`Message`]: A message carried through the network
//! - [`ContactEvent`]: A link between two nodes going up or down

pub mod error;
pub mod event;
pub mod identity;
pub mod message;
pub mod time;

// Re-export main types
pub use error::*;
pub use event::*;
pub use identity::*;
pub use message::*;
pub use time::*;
