use clap::Parser;
use eeg_core::{EegError, IngestMode, DEFAULT_BLOCK_SIZE};
use eeg_processing::{AnalysisConfig, DEFAULT_SAMPLE_RATE};
use eeg_simulation::MentalState;
use std::net::SocketAddr;

/// Database URL that selects the in-memory store instead of MySQL
pub const MEMORY_DATABASE_URL: &str = "memory:";

/// Server configuration from command-line flags and environment variables.
///
/// Fixed at process start; nothing here changes at runtime.
#[derive(Debug, Clone, Parser)]
#[command(name = "eeg-server", version, about = "Streams EEG samples into per-block band powers")]
pub struct ServerConfig {
    /// Serial device the EEG front end is attached to
    #[arg(long, env = "EEG_SERIAL_PORT", default_value = "/dev/ttyUSB0")]
    pub serial_port: String,

    /// Serial line speed
    #[arg(long, env = "EEG_BAUD_RATE", default_value_t = 115_200)]
    pub baud_rate: u32,

    /// Nominal sampling rate of the device in Hz
    #[arg(long, env = "EEG_SAMPLE_RATE", default_value_t = DEFAULT_SAMPLE_RATE)]
    pub sample_rate: u32,

    /// Samples per analysis block
    #[arg(long, env = "EEG_BLOCK_SIZE", default_value_t = DEFAULT_BLOCK_SIZE)]
    pub block_size: usize,

    /// MySQL connection URL, or `memory:` for a non-durable in-process store
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: String,

    /// Maximum pooled database connections
    #[arg(long, env = "EEG_DB_MAX_CONNECTIONS", default_value_t = 10)]
    pub max_db_connections: u32,

    /// HTTP/WebSocket listen address
    #[arg(long, env = "EEG_BIND_ADDR", default_value = "0.0.0.0:3000")]
    pub bind_addr: String,

    /// What each device line carries: `samples` or `bands`
    #[arg(long = "mode", env = "EEG_INGEST_MODE", default_value = "samples")]
    pub ingest_mode: IngestMode,

    /// Generate a synthetic signal instead of opening the serial port
    #[arg(long, env = "EEG_SIMULATE")]
    pub simulate: bool,

    /// Rhythm mix of the simulated signal
    #[arg(long, env = "EEG_SIM_STATE", default_value = "relaxed")]
    pub sim_state: MentalState,

    /// Live events buffered per subscriber before it starts losing them
    #[arg(long, env = "EEG_EVENT_CAPACITY", default_value_t = 256)]
    pub event_capacity: usize,

    /// Parsed samples buffered between the source and the pipeline
    #[arg(long, env = "EEG_LINE_BUFFER", default_value_t = 4096)]
    pub line_buffer: usize,
}

impl ServerConfig {
    /// Load `.env`, parse flags and validate
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis()?;

        if self.baud_rate == 0 {
            return Err(ConfigError::InvalidValue("baud rate must be positive".to_string()));
        }

        if !self.simulate && self.serial_port.trim().is_empty() {
            return Err(ConfigError::InvalidValue("serial port must not be empty".to_string()));
        }

        if self.database_url.trim().is_empty() {
            return Err(ConfigError::MissingValue("DATABASE_URL".to_string()));
        }

        if self.max_db_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database pool needs at least one connection".to_string(),
            ));
        }

        if self.event_capacity == 0 || self.line_buffer == 0 {
            return Err(ConfigError::InvalidValue(
                "event capacity and line buffer must be positive".to_string(),
            ));
        }

        self.bind_address()?;
        Ok(())
    }

    /// Validated analysis parameters
    pub fn analysis(&self) -> Result<AnalysisConfig, ConfigError> {
        Ok(AnalysisConfig::new(self.sample_rate, self.block_size)?)
    }

    /// Parsed listen address
    pub fn bind_address(&self) -> Result<SocketAddr, ConfigError> {
        self.bind_addr
            .parse()
            .map_err(|_| ConfigError::InvalidBindAddr(self.bind_addr.clone()))
    }

    /// Whether records go to the in-memory store
    pub fn uses_memory_store(&self) -> bool {
        self.database_url.trim() == MEMORY_DATABASE_URL
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid bind address: {0}")]
    InvalidBindAddr(String),
    #[error("Missing required setting: {0}")]
    MissingValue(String),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
    #[error("Invalid analysis configuration: {0}")]
    Analysis(#[from] EegError),
}
