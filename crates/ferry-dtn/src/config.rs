//! Router settings
//!
//! Settings live under the `[DRINC]` namespace of the run's TOML document
//! and keep their original camelCase keys:
//!
//! ```toml
//! [DRINC]
//! secondsInTimeUnit = 30
//! nrofCopies = 6
//! # optional
//! pEncMax = 0.9
//! typicalInterval = 7200.0
//! aging = { model = "gamma", base = 0.999885791 }
//! ```
//!
//! `secondsInTimeUnit` and `nrofCopies` are required; a run without them
//! fails at startup.

use serde::{Deserialize, Serialize};

use ferry_core::ConfigError;

/// Settings namespace of the router
pub const NAMESPACE: &str = "DRINC";

/// Key of the aging unit size setting
pub const SECONDS_IN_UNIT_S: &str = "secondsInTimeUnit";

/// Key of the initial copy count setting
pub const NROF_COPIES_S: &str = "nrofCopies";

/// Predictability assigned on a first encounter
pub const P_ENC_MAX: f64 = 0.9;

/// Typical interconnection time in seconds
pub const I_TYP: f64 = 7200.0;

/// Base of the multiplicative aging model
pub const AGING_BASE: f64 = 0.999885791;

/// How stored predictabilities decay between reads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "model", rename_all = "lowercase")]
pub enum AgingModel {
    /// `P = P ^ k` for `k` elapsed time units
    #[default]
    Exponent,
    /// `P = P * base ^ k` for `k` elapsed time units
    Gamma { base: f64 },
}

impl AgingModel {
    /// Classic multiplicative decay with [`AGING_BASE`]
    pub fn gamma() -> Self {
        AgingModel::Gamma { base: AGING_BASE }
    }

    /// Age a single value by `units` time units
    pub fn apply(&self, value: f64, units: f64) -> f64 {
        let aged = match self {
            AgingModel::Exponent => value.powf(units),
            AgingModel::Gamma { base } => value * base.powf(units),
        };
        aged.clamp(0.0, 1.0)
    }
}

/// Router settings
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DrincSettings {
    /// Seconds in one aging time unit
    pub seconds_in_time_unit: u32,
    /// Forwarding copies assigned to a newly created message
    pub nrof_copies: u32,
    /// Predictability assigned on a first encounter
    pub p_enc_max: f64,
    /// Typical interconnection time in seconds
    pub typical_interval: f64,
    /// Aging model
    pub aging: AgingModel,
}

/// Settings as they appear in the document, before required keys are checked
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct RawDrincSettings {
    seconds_in_time_unit: Option<u32>,
    nrof_copies: Option<u32>,
    p_enc_max: Option<f64>,
    typical_interval: Option<f64>,
    aging: Option<AgingModel>,
}

impl DrincSettings {
    /// Create settings with the two required values and defaults elsewhere
    pub fn new(seconds_in_time_unit: u32, nrof_copies: u32) -> Self {
        Self {
            seconds_in_time_unit,
            nrof_copies,
            p_enc_max: P_ENC_MAX,
            typical_interval: I_TYP,
            aging: AgingModel::default(),
        }
    }

    /// Use a different aging model
    pub fn with_aging(mut self, aging: AgingModel) -> Self {
        self.aging = aging;
        self
    }

    /// Parse the `[DRINC]` namespace out of a TOML document
    pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
        let table: toml::Table = document
            .parse()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;
        Self::from_table(&table)
    }

    /// Read the `[DRINC]` namespace out of an already parsed document
    pub fn from_table(table: &toml::Table) -> Result<Self, ConfigError> {
        let section = table
            .get(NAMESPACE)
            .cloned()
            .ok_or_else(|| ConfigError::missing(NAMESPACE, SECONDS_IN_UNIT_S))?;

        let raw: RawDrincSettings = section
            .try_into()
            .map_err(|e: toml::de::Error| ConfigError::Parse(e.to_string()))?;

        let settings = Self {
            seconds_in_time_unit: raw
                .seconds_in_time_unit
                .ok_or_else(|| ConfigError::missing(NAMESPACE, SECONDS_IN_UNIT_S))?,
            nrof_copies: raw
                .nrof_copies
                .ok_or_else(|| ConfigError::missing(NAMESPACE, NROF_COPIES_S))?,
            p_enc_max: raw.p_enc_max.unwrap_or(P_ENC_MAX),
            typical_interval: raw.typical_interval.unwrap_or(I_TYP),
            aging: raw.aging.unwrap_or_default(),
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seconds_in_time_unit == 0 {
            return Err(ConfigError::invalid(
                NAMESPACE,
                SECONDS_IN_UNIT_S,
                "must be at least 1",
            ));
        }
        if self.nrof_copies == 0 {
            return Err(ConfigError::invalid(
                NAMESPACE,
                NROF_COPIES_S,
                "must be at least 1",
            ));
        }
        if !(self.p_enc_max > 0.0 && self.p_enc_max <= 1.0) {
            return Err(ConfigError::invalid(
                NAMESPACE,
                "pEncMax",
                format!("{} is outside (0, 1]", self.p_enc_max),
            ));
        }
        if !(self.typical_interval.is_finite() && self.typical_interval > 0.0) {
            return Err(ConfigError::invalid(
                NAMESPACE,
                "typicalInterval",
                "must be a positive number of seconds",
            ));
        }
        if let AgingModel::Gamma { base } = self.aging
            && !(0.0..=1.0).contains(&base)
        {
            return Err(ConfigError::invalid(
                NAMESPACE,
                "aging.base",
                format!("{} is outside [0, 1]", base),
            ));
        }
        Ok(())
    }
}
