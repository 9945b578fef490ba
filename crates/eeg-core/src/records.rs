//! Persisted records, live events and ingestion modes

use crate::bands::BandPowers;
use crate::block::Sample;
use crate::error::EegError;
use crate::session::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the storage engine to a raw block
pub type RawBlockId = i64;

/// Event name for band powers derived from a raw block
pub const BAND_UPDATE_EVENT: &str = "band_update";

/// Event name for band powers reported directly by the device
pub const DEVICE_BAND_UPDATE_EVENT: &str = "device_band_update";

/// What the device sends on each line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestMode {
    /// One integer sample per line; band powers are computed here
    #[default]
    Samples,
    /// One JSON object per line carrying pre-computed band powers
    Bands,
}

impl IngestMode {
    pub const fn as_str(self) -> &'static str {
        match self {
            IngestMode::Samples => "samples",
            IngestMode::Bands => "bands",
        }
    }
}

impl fmt::Display for IngestMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IngestMode {
    type Err = EegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "samples" | "raw" => Ok(IngestMode::Samples),
            "bands" | "json" => Ok(IngestMode::Bands),
            other => Err(EegError::UnknownIngestMode { name: other.to_string() }),
        }
    }
}

/// Stored raw block together with the sampling rate it was recorded at
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBlockRecord {
    pub id: RawBlockId,
    pub sample_rate: u32,
    pub samples: Vec<Sample>,
    /// Recording session active when the block was formed
    pub session_id: Option<SessionId>,
    pub created_at: DateTime<Utc>,
}

/// Stored band powers.
///
/// Rows derived from a raw block carry its id; rows reported directly by
/// the device in bands mode have none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandPowerRecord {
    pub id: i64,
    pub raw_block_id: Option<RawBlockId>,
    #[serde(flatten)]
    pub powers: BandPowers,
    pub created_at: DateTime<Utc>,
}

/// Live update published once a block has been persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastEvent {
    pub raw_block_id: RawBlockId,
    pub band_powers: BandPowers,
    pub timestamp: DateTime<Utc>,
}

impl BroadcastEvent {
    /// Stamp a freshly persisted block with the current time
    pub fn now(raw_block_id: RawBlockId, band_powers: BandPowers) -> Self {
        Self {
            raw_block_id,
            band_powers,
            timestamp: Utc::now(),
        }
    }
}

/// Live update for band powers received in bands mode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceBandEvent {
    pub record_id: i64,
    pub band_powers: BandPowers,
    pub timestamp: DateTime<Utc>,
}

impl DeviceBandEvent {
    pub fn now(record_id: i64, band_powers: BandPowers) -> Self {
        Self {
            record_id,
            band_powers,
            timestamp: Utc::now(),
        }
    }
}
