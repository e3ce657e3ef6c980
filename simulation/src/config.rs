//! Run configuration
//!
//! A run is described by one TOML document:
//!
//! ```toml
//! [DRINC]
//! secondsInTimeUnit = 30
//! nrofCopies = 6
//!
//! [simulation]
//! nodes = 20
//! end_time = 43200.0
//! buffer_size = 5000000
//! queue_mode = "random"
//! msg_ttl = 18000.0
//!
//! [simulation.message_generation]
//! interval = 30.0
//! size_min = 50000
//! size_max = 500000
//!
//! [[simulation.messages]]
//! time = 10.0
//! from = 0
//! to = 5
//! size = 1000
//!
//! [logging]
//! default_level = "info"
//! ```
//!
//! Only `[DRINC]` is required; the other sections fall back to defaults.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use ferry_core::{ConfigError, HostId};
use ferry_dtn::DrincSettings;
use ferry_logging::LogConfig;

use crate::trace::ContactGeneration;

/// Settings namespace of the simulation host
pub const SIM_NAMESPACE: &str = "simulation";

/// Settings namespace of the logging setup
pub const LOG_NAMESPACE: &str = "logging";

/// Order in which a node's buffer hands messages to the router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum QueueMode {
    /// Oldest received first
    #[default]
    Fifo,
    /// Shuffled on every tick
    Random,
}

/// Periodic message creation between random node pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageGeneration {
    /// Seconds between two created messages
    pub interval: f64,
    /// Smallest message size in bytes
    pub size_min: u64,
    /// Largest message size in bytes
    pub size_max: u64,
    /// First creation time
    pub start: f64,
    /// No messages are created after this time (None = end of run)
    pub end: Option<f64>,
}

impl Default for MessageGeneration {
    fn default() -> Self {
        Self {
            interval: 30.0,
            size_min: 50_000,
            size_max: 500_000,
            start: 0.0,
            end: None,
        }
    }
}

/// A single explicitly scheduled message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageEvent {
    /// Creation time in seconds
    pub time: f64,
    /// Source node
    pub from: HostId,
    /// Destination node
    pub to: HostId,
    /// Size in bytes
    pub size: u64,
}

/// Simulation host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SimSettings {
    /// Number of nodes, identified `n0..n{nodes-1}`
    pub nodes: u32,
    /// Simulated seconds to run
    pub end_time: f64,
    /// Seconds between two scheduling ticks
    pub update_interval: f64,
    /// Buffer capacity per node in bytes
    pub buffer_size: u64,
    /// Link speed in bytes per second
    pub transmit_speed: f64,
    /// Order messages are offered to the router
    pub queue_mode: QueueMode,
    /// Message lifetime in seconds (None = never expires)
    pub msg_ttl: Option<f64>,
    /// Seed for every random choice in the run
    pub seed: u64,
    /// Periodic message creation
    pub message_generation: Option<MessageGeneration>,
    /// Explicitly scheduled messages
    pub messages: Vec<MessageEvent>,
    /// Synthetic contacts used when no trace file is given
    pub contact_generation: ContactGeneration,
}

impl Default for SimSettings {
    fn default() -> Self {
        Self {
            nodes: 10,
            end_time: 43_200.0,
            update_interval: 1.0,
            buffer_size: 5_000_000,
            transmit_speed: 250_000.0,
            queue_mode: QueueMode::Fifo,
            msg_ttl: None,
            seed: 1,
            message_generation: None,
            messages: Vec::new(),
            contact_generation: ContactGeneration::default(),
        }
    }
}

impl SimSettings {
    /// Small, fast settings for scripted scenarios
    pub fn scripted(nodes: u32, end_time: f64) -> Self {
        Self {
            nodes,
            end_time,
            ..Default::default()
        }
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.nodes < 2 {
            return Err(ConfigError::invalid(SIM_NAMESPACE, "nodes", "need at least 2 nodes"));
        }
        if !(self.end_time.is_finite() && self.end_time > 0.0) {
            return Err(ConfigError::invalid(SIM_NAMESPACE, "end_time", "must be positive"));
        }
        if !(self.update_interval.is_finite() && self.update_interval > 0.0) {
            return Err(ConfigError::invalid(
                SIM_NAMESPACE,
                "update_interval",
                "must be positive",
            ));
        }
        if !(self.transmit_speed.is_finite() && self.transmit_speed > 0.0) {
            return Err(ConfigError::invalid(
                SIM_NAMESPACE,
                "transmit_speed",
                "must be positive",
            ));
        }
        if let Some(ttl) = self.msg_ttl
            && !(ttl > 0.0)
        {
            return Err(ConfigError::invalid(SIM_NAMESPACE, "msg_ttl", "must be positive"));
        }
        if let Some(generation) = &self.message_generation {
            if !(generation.interval > 0.0) {
                return Err(ConfigError::invalid(
                    SIM_NAMESPACE,
                    "message_generation.interval",
                    "must be positive",
                ));
            }
            if generation.size_min > generation.size_max {
                return Err(ConfigError::invalid(
                    SIM_NAMESPACE,
                    "message_generation.size_min",
                    format!(
                        "{} is larger than size_max {}",
                        generation.size_min, generation.size_max
                    ),
                ));
            }
        }
        self.contact_generation.validate()?;
        Ok(())
    }
}

/// Everything a run needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Router settings (`[DRINC]`)
    pub drinc: DrincSettings,
    /// Host settings (`[simulation]`)
    pub simulation: SimSettings,
    /// Logging setup (`[logging]`)
    pub logging: LogConfig,
}

impl RunConfig {
    /// Build a config from already validated parts
    pub fn new(drinc: DrincSettings, simulation: SimSettings) -> Self {
        Self {
            drinc,
            simulation,
            logging: LogConfig::default(),
        }
    }

    /// Parse a run document
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = document
            .parse()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;

        let drinc = DrincSettings::from_table(&table)?;
        let simulation: SimSettings = section(&table, SIM_NAMESPACE)?;
        let logging: LogConfig = section(&table, LOG_NAMESPACE)?;
        simulation.validate()?;

        Ok(Self {
            drinc,
            simulation,
            logging,
        })
    }

    /// Read and parse a run document from disk
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let document = fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&document)
    }
}

/// Deserialize an optional section, defaulting when absent
fn section<T>(table: &toml::Table, name: &str) -> Result<T, ConfigError>
where
    T: Default + for<'de> Deserialize<'de>,
{
    match table.get(name) {
        Some(value) => value
            .clone()
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(format!("[{}] {}", name, e))),
        None => Ok(T::default()),
    }
}
