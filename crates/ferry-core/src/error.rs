//! Error types for Ferry

use thiserror::Error;

/// Top-level error type for Ferry
#[derive(Debug, Error)]
pub enum FerryError {
    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Errors related to peer identity
#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid identity format: {0}")]
    InvalidFormat(String),
}

/// Errors related to routing
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The peer runs a routing strategy this router cannot exchange state with
    #[error("Peer {peer} runs incompatible routing strategy {found} (expected {expected})")]
    IncompatiblePeer {
        peer: String,
        expected: String,
        found: String,
    },
}

/// Errors raised while loading or validating settings
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is absent
    #[error("Missing required setting {namespace}.{key}")]
    MissingSetting { namespace: String, key: String },

    /// A setting is present but out of range
    #[error("Invalid setting {namespace}.{key}: {reason}")]
    InvalidSetting {
        namespace: String,
        key: String,
        reason: String,
    },

    /// The settings document could not be parsed
    #[error("Failed to parse settings: {0}")]
    Parse(String),

    #[error("Settings I/O error: {0}")]
    Io(String),
}

impl ConfigError {
    /// Shorthand for [`ConfigError::MissingSetting`]
    pub fn missing(namespace: &str, key: &str) -> Self {
        ConfigError::MissingSetting {
            namespace: namespace.to_string(),
            key: key.to_string(),
        }
    }

    /// Shorthand for [`ConfigError::InvalidSetting`]
    pub fn invalid(namespace: &str, key: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidSetting {
            namespace: namespace.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_setting_message() {
        let err = ConfigError::missing("DRINC", "nrofCopies");
        assert_eq!(err.to_string(), "Missing required setting DRINC.nrofCopies");
    }

    #[test]
    fn test_incompatible_peer_message() {
        let err = RoutingError::IncompatiblePeer {
            peer: "n4".into(),
            expected: "drinc".into(),
            found: "epidemic".into(),
        };
        assert_eq!(
            err.to_string(),
            "Peer n4 runs incompatible routing strategy epidemic (expected drinc)"
        );
    }

    #[test]
    fn test_errors_convert_to_top_level() {
        let err: FerryError = ConfigError::missing("DRINC", "nrofCopies").into();
        assert!(matches!(err, FerryError::Config(_)));

        let err: FerryError = IdentityError::InvalidFormat("x".into()).into();
        assert!(err.to_string().starts_with("Identity error"));
    }
}
