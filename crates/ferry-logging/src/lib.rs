//! Structured JSONL logging for Ferry
//!
//! Simulations run many nodes in one process, so log lines need to say
//! which node produced them. This crate sets up a `tracing` subscriber
//! with per-node context and JSON lines output.
//!
//! # Features
//!
//! - **JSONL Output**: Structured JSON lines format for analysis (default)
//! - **Node Context Injection**: Tag spans with the node handling an event
//! - **File Output**: Single-file or daily/hourly rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use ferry_logging::{FerrySubscriberBuilder, LogConfig};
//!
//! // JSONL to console
//! let _guard = FerrySubscriberBuilder::new().init()?;
//!
//! // Development mode with pretty human-readable output
//! let _guard = FerrySubscriberBuilder::new()
//!     .with_config(LogConfig::development())
//!     .init()?;
//! ```
//!
//! Keep the returned guard alive until exit so buffered file output is
//! flushed.
//!
//! # Node Context
//!
//! ```ignore
//! use ferry_logging::NodeContextGuard;
//! use ferry_core::HostId;
//!
//! let _guard = NodeContextGuard::new(&HostId(3));
//! let _span = tracing::info_span!("tick").entered();
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{NodeContextData, NodeContextGuard};
pub use layers::{NodeContextExtension, NodeContextLayer, jsonl_layer};
pub use tracing_appender::non_blocking::WorkerGuard;

use std::fs::{self, File};
use std::io;

use thiserror::Error;
use tracing_appender::non_blocking::NonBlocking;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Errors raised while installing the subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The log directory or file could not be created
    #[error("Failed to open log output: {0}")]
    Io(#[from] io::Error),

    /// The rolling appender rejected its settings
    #[error("Failed to create rolling appender: {0}")]
    Appender(String),

    /// A global subscriber is already installed
    #[error("Subscriber already initialized: {0}")]
    AlreadyInitialized(String),
}

/// Open the non-blocking writer for file output
///
/// `Never` truncates a single `<prefix>.log`; the other strategies append
/// to rolling `<prefix>.<date>.log` files.
fn create_file_writer(file_config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LoggingError> {
    fs::create_dir_all(&file_config.directory)?;

    let rotation = match file_config.rotation {
        RotationStrategy::Never => {
            let path = file_config
                .directory
                .join(format!("{}.log", file_config.prefix));
            let file = File::create(path)?;
            return Ok(tracing_appender::non_blocking(file));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };

    let mut builder = RollingFileAppender::builder()
        .rotation(rotation)
        .filename_prefix(file_config.prefix.as_str())
        .filename_suffix("log");
    if let Some(max) = file_config.max_files {
        builder = builder.max_log_files(max);
    }
    let appender = builder
        .build(&file_config.directory)
        .map_err(|e| LoggingError::Appender(e.to_string()))?;
    Ok(tracing_appender::non_blocking(appender))
}

/// Builder for configuring and initializing the Ferry logging subscriber
///
/// By default, console output uses JSONL format. Use
/// [`LogConfig::development()`] for human-readable output.
pub struct FerrySubscriberBuilder {
    config: LogConfig,
}

impl FerrySubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration that will be installed
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// Returns the file writer's guard when file output is enabled; it must
    /// stay alive for the rest of the program. `RUST_LOG` overrides the
    /// configured level.
    pub fn init(self) -> Result<Option<WorkerGuard>, LoggingError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let console = &self.config.console;
        let pretty_console = (console.enabled && console.pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_ansi(console.ansi)
                .with_target(true)
        });
        let json_console = (console.enabled && !console.pretty)
            .then(|| jsonl_layer(&self.config.jsonl, io::stdout));

        let (file_layer, guard) = match &self.config.file {
            Some(file_config) => {
                let (writer, guard) = create_file_writer(file_config)?;
                (Some(jsonl_layer(&self.config.jsonl, writer)), Some(guard))
            }
            None => (None, None),
        };

        Registry::default()
            .with(env_filter)
            .with(NodeContextLayer::new())
            .with(pretty_console)
            .with(json_console)
            .with(file_layer)
            .try_init()
            .map_err(|e| LoggingError::AlreadyInitialized(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for FerrySubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Initialize logging with default settings (JSONL to console)
///
/// Does nothing if a subscriber is already installed.
pub fn init_default() {
    let _ = FerrySubscriberBuilder::new().init();
}

/// Initialize logging for development (verbose, pretty console output)
pub fn init_development() {
    let _ = FerrySubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init();
}

/// Initialize logging for testing (minimal output)
pub fn init_testing() {
    let _ = FerrySubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}
