//! # Ferry Simulation
//!
//! A contact-trace driven host for the Ferry DTN router.
//!
//! ## Overview
//!
//! Every node of a run gets its own [`DrincRouter`](ferry_dtn::DrincRouter),
//! a byte-bounded message buffer, and a view of the links that are
//! currently up. The host owns the shared simulated clock and feeds each
//! router its contact, message, and transfer events one at a time.
//!
//! - **Contacts** come from a trace file in the ONE connection format or
//!   from a seeded generator
//! - **Messages** are scheduled explicitly or generated at a fixed interval
//! - **Transfers** take `size / transmit_speed` seconds and are lost when
//!   the link goes down
//!
//! ## Architecture
//!
//! - **Config** (`config.rs`): TOML run documents (`[DRINC]`, `[simulation]`, `[logging]`)
//! - **Trace** (`trace.rs`): Contact trace parsing and generation
//! - **Buffer** (`buffer.rs`): Per-node message storage with oldest-first eviction
//! - **Topology** (`topology.rs`): Links currently up
//! - **Transfer** (`transfer.rs`): The link-level transfer engine
//! - **Simulation** (`simulation.rs`): Fixed-step simulation engine and statistics
//! - **Scenarios** (`scenarios.rs`): Pre-built scripted runs
//!
//! ## Example
//!
//! ```rust,ignore
//! use ferry_simulation::*;
//!
//! let config = RunConfig::load(Path::new("run.toml"))?;
//! let contacts = load_contacts(Path::new("contacts.txt"))?;
//!
//! let mut sim = Simulation::new(config, contacts)?;
//! let stats = sim.run()?;
//! println!("{}", stats);
//! ```

pub mod buffer;
pub mod config;
pub mod error;
pub mod node;
pub mod scenarios;
pub mod simulation;
pub mod topology;
pub mod trace;
pub mod transfer;

// Re-export main types
pub use buffer::{Admission, MessageBuffer};
pub use config::{
    LOG_NAMESPACE, MessageEvent, MessageGeneration, QueueMode, RunConfig, SIM_NAMESPACE,
    SimSettings,
};
pub use error::{SimError, SimResult};
pub use node::SimNode;
pub use simulation::{SimStats, Simulation, StatsReport};
pub use topology::LinkTable;
pub use trace::{
    ContactGeneration, format_contacts, generate_contacts, load_contacts, parse_contacts,
};
pub use transfer::{LinkEngine, Transfer};

// Re-export core types for hosts embedding the simulation
pub use ferry_core::{ContactEvent, HostId, LinkState, SimTime};
