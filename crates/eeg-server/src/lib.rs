//! EEG ingestion server
//!
//! Reads integer samples (or device-computed band powers) line by line,
//! frames samples into fixed-size blocks, derives per-band spectral power
//! for each block, stores every block with its powers and pushes each
//! stored result to live WebSocket subscribers. Blocks formed while a
//! recording session is active are tagged with it.

pub mod broadcast;
pub mod config;
pub mod coordinator;
pub mod http;
pub mod session;
pub mod source;
pub mod stats;
pub mod storage;
pub mod websocket;

pub use broadcast::{BroadcastHub, BroadcastMessage};
pub use config::{ConfigError, ServerConfig};
pub use coordinator::{BlockOutcome, PipelineCoordinator, PipelineSummary};
pub use http::{router, AppState};
pub use session::ActiveSession;
pub use source::{LineParser, SourceError, SourceItem};
pub use stats::{PipelineStats, StatsSnapshot};
