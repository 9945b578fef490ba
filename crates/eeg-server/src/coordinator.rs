//! Pipeline coordinator: frames samples into blocks and runs each block
//! through analysis, persistence and broadcast on its own task.

use eeg_core::{
    BandPowers, Block, BlockAccumulator, BroadcastEvent, DeviceBandEvent, EegResult, RawBlockId,
    SessionId, BAND_UPDATE_EVENT, DEVICE_BAND_UPDATE_EVENT,
};
use eeg_processing::{AnalysisConfig, BlockAnalyzer};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

use crate::broadcast::BroadcastHub;
use crate::session::ActiveSession;
use crate::source::SourceItem;
use crate::stats::PipelineStats;
use crate::storage::PersistenceSink;

/// What happened to one block or device reading
#[derive(Debug, Clone, PartialEq)]
pub enum BlockOutcome {
    /// Persisted and announced to `subscribers` listeners
    Published { record_id: i64, subscribers: usize },
    /// Persisted, but the event could not be encoded
    Unannounced { record_id: i64 },
    /// Persistence failed; nothing was stored or announced
    Dropped,
}

/// Totals reported when the pipeline stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    pub blocks_formed: u64,
    pub published: u64,
    /// Stored but never announced
    pub unannounced: u64,
    pub dropped: u64,
    pub pending_samples: usize,
}

/// Shared by every block task
struct BlockContext {
    analyzer: Arc<dyn BlockAnalyzer>,
    sink: Arc<dyn PersistenceSink>,
    hub: BroadcastHub,
    stats: Arc<PipelineStats>,
    sessions: Arc<ActiveSession>,
    sample_rate: u32,
}

/// Owns the accumulator and the set of in-flight block tasks
pub struct PipelineCoordinator {
    accumulator: BlockAccumulator,
    context: Arc<BlockContext>,
    tasks: JoinSet<BlockOutcome>,
    next_sequence: u64,
    summary: PipelineSummary,
}

impl PipelineCoordinator {
    pub fn new(
        config: AnalysisConfig,
        analyzer: Arc<dyn BlockAnalyzer>,
        sink: Arc<dyn PersistenceSink>,
        hub: BroadcastHub,
        stats: Arc<PipelineStats>,
        sessions: Arc<ActiveSession>,
    ) -> EegResult<Self> {
        config.validate()?;

        Ok(Self {
            accumulator: BlockAccumulator::new(config.block_size)?,
            context: Arc::new(BlockContext {
                analyzer,
                sink,
                hub,
                stats,
                sessions,
                sample_rate: config.sample_rate,
            }),
            tasks: JoinSet::new(),
            next_sequence: 0,
            summary: PipelineSummary::default(),
        })
    }

    /// Consume items until every sender is gone, then wait for in-flight blocks
    pub async fn run(mut self, mut receiver: mpsc::Receiver<SourceItem>) -> PipelineSummary {
        info!(
            "Pipeline started - analyzer: {}, block size: {}, sample rate: {}Hz",
            self.context.analyzer.name(),
            self.accumulator.block_size(),
            self.context.sample_rate
        );

        while let Some(item) = receiver.recv().await {
            self.handle_item(item);
            self.reap_finished();
        }

        info!("Sample source closed, draining {} in-flight blocks", self.tasks.len());
        self.drain().await
    }

    /// Route one source item. Must be called within a Tokio runtime.
    ///
    /// Records are tagged with the session active when they are formed, not
    /// when they are stored.
    pub fn handle_item(&mut self, item: SourceItem) {
        match item {
            SourceItem::Sample(sample) => {
                if let Some(block) = self.accumulator.accept(sample) {
                    self.dispatch_block(block);
                }
            }
            SourceItem::Bands(powers) => {
                let context = self.context.clone();
                let session = context.sessions.current_id();
                self.tasks.spawn(process_device_bands(context, powers, session));
            }
        }
    }

    fn dispatch_block(&mut self, block: Block) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.summary.blocks_formed += 1;
        self.context.stats.record_block_formed();

        let context = self.context.clone();
        let session = context.sessions.current_id();
        debug!("Block {} formed ({} samples, session {:?})", sequence, block.len(), session);
        self.tasks.spawn(process_block(context, sequence, block, session));
    }

    /// Collect results of tasks that have already finished
    fn reap_finished(&mut self) {
        while let Some(result) = self.tasks.try_join_next() {
            self.record(result);
        }
    }

    /// Wait for every in-flight task and return the totals
    pub async fn drain(&mut self) -> PipelineSummary {
        while let Some(result) = self.tasks.join_next().await {
            self.record(result);
        }

        self.summary.pending_samples = self.accumulator.pending();
        if self.summary.pending_samples > 0 {
            info!(
                "Discarding {} samples that did not fill a block",
                self.summary.pending_samples
            );
            debug!("Discarded samples: {:?}", self.accumulator.pending_samples());
        }
        self.summary
    }

    fn record(&mut self, result: Result<BlockOutcome, tokio::task::JoinError>) {
        match result {
            Ok(BlockOutcome::Published { .. }) => self.summary.published += 1,
            Ok(BlockOutcome::Unannounced { .. }) => self.summary.unannounced += 1,
            Ok(BlockOutcome::Dropped) => self.summary.dropped += 1,
            Err(e) => {
                self.summary.dropped += 1;
                error!("Block task failed: {}", e);
            }
        }
    }
}

async fn process_block(
    context: Arc<BlockContext>,
    sequence: u64,
    block: Block,
    session: Option<SessionId>,
) -> BlockOutcome {
    let (powers, metrics) = context
        .analyzer
        .analyze_timed(&block, f64::from(context.sample_rate));
    debug!(
        "Block {} analyzed in {}us: {:?}",
        sequence, metrics.processing_time_us, powers
    );

    let raw_block_id: RawBlockId = match context
        .sink
        .persist_block(context.sample_rate, block.samples(), &powers, session)
        .await
    {
        Ok(id) => id,
        Err(e) => {
            context.stats.record_block_failed();
            error!(
                block = sequence,
                sample_rate = context.sample_rate,
                samples = ?block.samples(),
                "Failed to persist block, dropping it: {}",
                e
            );
            return BlockOutcome::Dropped;
        }
    };
    context.stats.record_block_persisted();
    info!("Block {} stored as raw block {}: {:?}", sequence, raw_block_id, powers);

    let event = BroadcastEvent::now(raw_block_id, powers);
    announce(&context, BAND_UPDATE_EVENT, &event, raw_block_id)
}

async fn process_device_bands(
    context: Arc<BlockContext>,
    powers: BandPowers,
    session: Option<SessionId>,
) -> BlockOutcome {
    let record_id = match context.sink.persist_device_bands(&powers, session).await {
        Ok(id) => id,
        Err(e) => {
            context.stats.record_block_failed();
            error!(band_powers = ?powers, "Failed to persist device band powers: {}", e);
            return BlockOutcome::Dropped;
        }
    };
    context.stats.record_block_persisted();
    info!("Device band powers stored as record {}: {:?}", record_id, powers);

    let event = DeviceBandEvent::now(record_id, powers);
    announce(&context, DEVICE_BAND_UPDATE_EVENT, &event, record_id)
}

fn announce<T: serde::Serialize>(
    context: &BlockContext,
    event_name: &str,
    event: &T,
    record_id: i64,
) -> BlockOutcome {
    match context.hub.publish(event_name, event) {
        Ok(subscribers) => {
            context.stats.record_event_published();
            debug!("Record {} announced to {} subscribers", record_id, subscribers);
            BlockOutcome::Published { record_id, subscribers }
        }
        Err(e) => {
            context.stats.record_event_unannounced();
            error!("Record {} stored but not announced: {}", record_id, e);
            BlockOutcome::Unannounced { record_id }
        }
    }
}
