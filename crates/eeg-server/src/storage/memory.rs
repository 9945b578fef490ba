use crate::storage::traits::{
    HistoryStore, PersistenceSink, SessionStore, StorageError, StorageResult,
};
use async_trait::async_trait;
use chrono::Utc;
use eeg_core::{
    BandPowerRecord, BandPowers, IngestMode, RawBlockId, RawBlockRecord, Sample, SessionId,
    SessionRecord, SessionRequest,
};
use parking_lot::Mutex;
use std::time::Duration;

type FailurePredicate = Box<dyn Fn(&[Sample]) -> bool + Send + Sync>;

#[derive(Default)]
struct MemoryState {
    raw_blocks: Vec<RawBlockRecord>,
    band_powers: Vec<BandPowerRecord>,
    device_bands: Vec<(Option<SessionId>, BandPowerRecord)>,
    sessions: Vec<SessionRecord>,
}

/// In-process record store.
///
/// Nothing survives a restart. Used by `--database-url memory:` and by tests,
/// which can make it reject chosen blocks or answer slowly.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_when: Option<FailurePredicate>,
    latency: Option<Duration>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every block whose samples satisfy `predicate`
    pub fn failing_when<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&[Sample]) -> bool + Send + Sync + 'static,
    {
        self.fail_when = Some(Box::new(predicate));
        self
    }

    /// Delay every write by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn raw_blocks(&self) -> Vec<RawBlockRecord> {
        self.state.lock().raw_blocks.clone()
    }

    pub fn band_powers(&self) -> Vec<BandPowerRecord> {
        self.state.lock().band_powers.clone()
    }

    pub fn device_bands(&self) -> Vec<BandPowerRecord> {
        self.state
            .lock()
            .device_bands
            .iter()
            .map(|(_, record)| record.clone())
            .collect()
    }

    async fn simulate_latency(&self) {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
    }
}

impl MemoryState {
    /// Records for `mode` in insertion order, which is oldest first
    fn records(&self, mode: IngestMode) -> Vec<BandPowerRecord> {
        match mode {
            IngestMode::Samples => self.band_powers.clone(),
            IngestMode::Bands => self.device_bands.iter().map(|(_, r)| r.clone()).collect(),
        }
    }

    fn block_session(&self, raw_block_id: Option<RawBlockId>) -> Option<SessionId> {
        let id = raw_block_id?;
        self.raw_blocks
            .iter()
            .find(|block| block.id == id)
            .and_then(|block| block.session_id)
    }
}

#[async_trait]
impl PersistenceSink for MemoryStore {
    async fn persist_block(
        &self,
        sample_rate: u32,
        samples: &[Sample],
        powers: &BandPowers,
        session: Option<SessionId>,
    ) -> StorageResult<RawBlockId> {
        self.simulate_latency().await;

        if self.fail_when.as_ref().is_some_and(|fail| fail(samples)) {
            return Err(StorageError::Unavailable("write rejected".to_string()));
        }

        let mut state = self.state.lock();
        let created_at = Utc::now();
        let raw_block_id = state.raw_blocks.len() as RawBlockId + 1;
        let band_id = state.band_powers.len() as i64 + 1;

        state.raw_blocks.push(RawBlockRecord {
            id: raw_block_id,
            sample_rate,
            samples: samples.to_vec(),
            session_id: session,
            created_at,
        });
        state.band_powers.push(BandPowerRecord {
            id: band_id,
            raw_block_id: Some(raw_block_id),
            powers: *powers,
            created_at,
        });

        Ok(raw_block_id)
    }

    async fn persist_device_bands(
        &self,
        powers: &BandPowers,
        session: Option<SessionId>,
    ) -> StorageResult<i64> {
        self.simulate_latency().await;

        let mut state = self.state.lock();
        let id = state.device_bands.len() as i64 + 1;
        state.device_bands.push((
            session,
            BandPowerRecord {
                id,
                raw_block_id: None,
                powers: *powers,
                created_at: Utc::now(),
            },
        ));

        Ok(id)
    }
}

#[async_trait]
impl HistoryStore for MemoryStore {
    async fn band_history(&self, mode: IngestMode) -> StorageResult<Vec<BandPowerRecord>> {
        let mut records = self.state.lock().records(mode);
        records.reverse();
        Ok(records)
    }

    async fn latest_band_powers(&self, mode: IngestMode) -> StorageResult<Option<BandPowerRecord>> {
        Ok(self.state.lock().records(mode).pop())
    }

    async fn raw_block(&self, id: RawBlockId) -> StorageResult<Option<RawBlockRecord>> {
        Ok(self
            .state
            .lock()
            .raw_blocks
            .iter()
            .find(|block| block.id == id)
            .cloned())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(&self, request: &SessionRequest) -> StorageResult<SessionRecord> {
        let started_at = Utc::now();
        let mut state = self.state.lock();

        let record = SessionRecord {
            id: state.sessions.len() as SessionId + 1,
            name: request.session_name(started_at),
            first_name: request.first_name.clone(),
            last_name: request.last_name.clone(),
            activity: request.activity.clone(),
            started_at,
        };
        state.sessions.push(record.clone());

        Ok(record)
    }

    async fn list_sessions(&self) -> StorageResult<Vec<SessionRecord>> {
        Ok(self.state.lock().sessions.iter().rev().cloned().collect())
    }

    async fn session_by_name(&self, name: &str) -> StorageResult<Option<SessionRecord>> {
        Ok(self
            .state
            .lock()
            .sessions
            .iter()
            .rev()
            .find(|session| session.name == name)
            .cloned())
    }

    async fn session_records(
        &self,
        id: SessionId,
        mode: IngestMode,
    ) -> StorageResult<Vec<BandPowerRecord>> {
        let state = self.state.lock();
        let records = match mode {
            IngestMode::Samples => state
                .band_powers
                .iter()
                .filter(|record| state.block_session(record.raw_block_id) == Some(id))
                .cloned()
                .collect(),
            IngestMode::Bands => state
                .device_bands
                .iter()
                .filter(|(session, _)| *session == Some(id))
                .map(|(_, record)| record.clone())
                .collect(),
        };
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn powers(alpha: f64) -> BandPowers {
        BandPowers { alpha, ..Default::default() }
    }

    #[tokio::test]
    async fn test_block_and_powers_stored_together() {
        let store = MemoryStore::new();

        let first = store.persist_block(256, &[1, 2, 3], &powers(1.0), None).await.unwrap();
        let second = store.persist_block(256, &[4, 5, 6], &powers(2.0), None).await.unwrap();
        assert_eq!((first, second), (1, 2));

        let history = store.band_history(IngestMode::Samples).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].raw_block_id, Some(second));
        assert_eq!(history[0].powers.alpha, 2.0);

        let block = store.raw_block(first).await.unwrap().unwrap();
        assert_eq!(block.samples, vec![1, 2, 3]);
        assert_eq!(block.sample_rate, 256);
        assert!(store.raw_block(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_failed_write_stores_nothing() {
        let store = MemoryStore::new().failing_when(|samples| samples.first() == Some(&7));

        assert!(store.persist_block(256, &[7, 8], &powers(1.0), None).await.is_err());
        assert!(store.raw_blocks().is_empty());
        assert!(store.band_powers().is_empty());

        assert!(store.persist_block(256, &[8, 7], &powers(1.0), None).await.is_ok());
        assert_eq!(store.raw_blocks().len(), 1);
    }

    #[tokio::test]
    async fn test_modes_use_separate_records() {
        let store = MemoryStore::new();
        assert!(store.latest_band_powers(IngestMode::Bands).await.unwrap().is_none());

        store.persist_device_bands(&powers(3.0), None).await.unwrap();
        store.persist_device_bands(&powers(4.0), None).await.unwrap();

        let latest = store.latest_band_powers(IngestMode::Bands).await.unwrap().unwrap();
        assert_eq!(latest.id, 2);
        assert_eq!(latest.raw_block_id, None);
        assert!(store.band_history(IngestMode::Samples).await.unwrap().is_empty());
    }

    fn request(first_name: &str) -> SessionRequest {
        SessionRequest {
            first_name: first_name.to_string(),
            last_name: "Rivera".to_string(),
            activity: "reading".to_string(),
        }
    }

    #[tokio::test]
    async fn test_sessions_listed_newest_first() {
        let store = MemoryStore::new();
        let first = store.create_session(&request("Ana")).await.unwrap();
        let second = store.create_session(&request("Luis")).await.unwrap();

        let sessions = store.list_sessions().await.unwrap();
        let ids: Vec<_> = sessions.iter().map(|session| session.id).collect();
        assert_eq!(ids, vec![second.id, first.id]);
        assert!(second.name.starts_with("session_Luis_Rivera_reading_"));

        let found = store.session_by_name(&first.name).await.unwrap().unwrap();
        assert_eq!(found.first_name, "Ana");
        assert!(store.session_by_name("session_nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_records_only_include_tagged_rows() {
        let store = MemoryStore::new();
        let session = store.create_session(&request("Ana")).await.unwrap();

        store.persist_block(256, &[1], &powers(1.0), None).await.unwrap();
        store.persist_block(256, &[2], &powers(2.0), Some(session.id)).await.unwrap();
        store.persist_block(256, &[3], &powers(3.0), Some(session.id)).await.unwrap();
        store.persist_device_bands(&powers(4.0), Some(session.id)).await.unwrap();
        store.persist_device_bands(&powers(5.0), None).await.unwrap();

        let samples = store.session_records(session.id, IngestMode::Samples).await.unwrap();
        let alphas: Vec<_> = samples.iter().map(|record| record.powers.alpha).collect();
        assert_eq!(alphas, vec![2.0, 3.0]);

        let bands = store.session_records(session.id, IngestMode::Bands).await.unwrap();
        assert_eq!(bands.len(), 1);
        assert_eq!(bands[0].powers.alpha, 4.0);

        let block = store.raw_block(2).await.unwrap().unwrap();
        assert_eq!(block.session_id, Some(session.id));
    }
}
