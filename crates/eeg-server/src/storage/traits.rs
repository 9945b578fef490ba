use async_trait::async_trait;
use eeg_core::{
    BandPowerRecord, BandPowers, IngestMode, RawBlockId, RawBlockRecord, Sample, SessionId,
    SessionRecord, SessionRequest,
};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by a storage backend
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Storage returned an out-of-range id: {0}")]
    InvalidId(u64),

    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Destination for analyzed blocks and device-reported band powers
#[async_trait]
pub trait PersistenceSink: Send + Sync {
    /// Store a raw block and the band powers derived from it as one unit.
    ///
    /// Either both rows exist afterwards or neither does. Returns the id of
    /// the new raw block.
    async fn persist_block(
        &self,
        sample_rate: u32,
        samples: &[Sample],
        powers: &BandPowers,
        session: Option<SessionId>,
    ) -> StorageResult<RawBlockId>;

    /// Store band powers reported directly by the device
    async fn persist_device_bands(
        &self,
        powers: &BandPowers,
        session: Option<SessionId>,
    ) -> StorageResult<i64>;
}

/// Read access to stored records
#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// All band power records for `mode`, newest first
    async fn band_history(&self, mode: IngestMode) -> StorageResult<Vec<BandPowerRecord>>;

    /// Most recent band power record for `mode`
    async fn latest_band_powers(&self, mode: IngestMode) -> StorageResult<Option<BandPowerRecord>>;

    /// A stored raw block by id
    async fn raw_block(&self, id: RawBlockId) -> StorageResult<Option<RawBlockRecord>>;
}

/// Recording sessions and the records captured during them
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session stamped with the current time
    async fn create_session(&self, request: &SessionRequest) -> StorageResult<SessionRecord>;

    /// All sessions, newest first
    async fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>>;

    /// Session by display name; the newest one if several share it
    async fn session_by_name(&self, name: &str) -> StorageResult<Option<SessionRecord>>;

    /// Band power records captured during a session in `mode`, oldest first
    async fn session_records(
        &self,
        id: SessionId,
        mode: IngestMode,
    ) -> StorageResult<Vec<BandPowerRecord>>;
}
