//! # Ferry DTN
//!
//! Probabilistic, copy-limited routing for delay-tolerant networks.
//!
//! Nodes meet opportunistically. Each node estimates how likely every other
//! node is to deliver a message to a destination (its *delivery
//! predictability*) and uses those estimates together with a small budget
//! of forwarding copies per message to decide what to hand to whom.
//!
//! ## Features
//!
//! - **Encounter-interval updates**: short gaps between encounters raise
//!   confidence, long gaps erode it.
//!
//! - **Transitive learning**: meeting a well-connected peer raises the
//!   estimates for everything that peer knows about.
//!
//! - **Lazy aging**: values decay against simulated time on every read,
//!   without timers.
//!
//! - **Copy-limited spraying**: a new message is sprayed to every contact
//!   until its copies run out, then only relayed to better-placed peers
//!   (GRTRMax).
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use ferry_core::{HostId, ManualClock};
//! use ferry_dtn::{DrincRouter, DrincSettings};
//!
//! let clock = Arc::new(ManualClock::new());
//! let settings = DrincSettings::from_toml_str(document)?;
//! let router = DrincRouter::new(HostId(0), settings, clock.clone())?;
//!
//! // On every contact-up event
//! router.on_contact_up(&peer_view)?;
//!
//! // On every scheduling tick
//! let report = router.update(&carried, &contacts, &mut engine);
//! ```
//!
//! ## Architecture
//!
//! - [`predictability`]: Per-node predictability table with lazy aging
//! - [`encounter`]: Direct update on contact-up
//! - [`transitive`]: Transitive update through the met peer
//! - [`copies`]: Per-message forwarding-copy counts
//! - [`forwarding`]: Per-tick forwarding state machine
//! - [`peer`]: Read-only peer query capability
//! - [`router`]: The router composing all of the above
//! - [`config`]: `[DRINC]` settings
//! - [`error`]: DTN-specific error types

pub mod config;
pub mod copies;
pub mod encounter;
pub mod error;
pub mod forwarding;
pub mod peer;
pub mod predictability;
pub mod router;
pub mod transitive;

// Re-export main types
pub use config::{AgingModel, DrincSettings, AGING_BASE, I_TYP, NAMESPACE, P_ENC_MAX};
pub use copies::CopyManager;
pub use encounter::EncounterModel;
pub use error::{CopyError, DtnError, DtnResult};
pub use forwarding::{
    CandidateKind, ForwardCandidate, TickContext, TickPhase, TickReport, TransferAttempt,
    TransferEngine, relay_candidates, run_tick,
};
pub use peer::{PeerQuery, StrategyKind, ensure_compatible};
pub use predictability::{PeerRecord, PredictabilityStore};
pub use router::{DrincRouter, EncounterOutcome, MessageHandoff, RoutingInfo};
pub use transitive::propagate_via;
