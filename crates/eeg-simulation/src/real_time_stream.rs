//! Real-time line stream emulating a serial EEG device

use crate::eeg_simulator::{EegSimulator, SimulatorConfig};
use eeg_core::{EegResult, IngestMode};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{debug, info};

/// Configuration for real-time streaming
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// EEG simulation configuration
    pub simulator: SimulatorConfig,
    /// What each emitted line carries
    pub mode: IngestMode,
    /// Chunk duration in seconds (e.g., 0.1 for 100ms chunks)
    pub chunk_duration: f64,
    /// Seconds between band lines in bands mode
    pub band_interval: f64,
    /// Capacity of the outgoing line channel
    pub buffer_size: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            simulator: SimulatorConfig::default(),
            mode: IngestMode::Samples,
            chunk_duration: 0.1,
            band_interval: 1.0,
            buffer_size: 1024,
        }
    }
}

/// Emits simulated device lines at the configured sampling rate
pub struct SimulatedLineStream {
    config: StreamConfig,
    simulator: EegSimulator,
}

impl SimulatedLineStream {
    /// Create new simulated stream
    pub fn new(config: StreamConfig) -> EegResult<Self> {
        let simulator = EegSimulator::new(config.simulator.clone())?;
        Ok(Self { config, simulator })
    }

    /// Produce lines until the receiver goes away
    pub async fn run(mut self, sender: mpsc::Sender<String>) {
        let period = match self.config.mode {
            IngestMode::Samples => self.config.chunk_duration,
            IngestMode::Bands => self.config.band_interval,
        };
        let mut ticker = interval(Duration::from_secs_f64(period.max(0.001)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let sample_rate = f64::from(self.config.simulator.sample_rate);
        let mut owed = 0.0_f64;
        let mut lines_sent: u64 = 0;

        let state = self.config.simulator.state;
        info!(
            "Simulated EEG stream started - mode: {}, state: {} ({}), rate: {}Hz",
            self.config.mode,
            state.description(),
            state.dominant_band().map_or("none", |band| band.name()),
            self.config.simulator.sample_rate
        );

        loop {
            ticker.tick().await;

            let lines = match self.config.mode {
                IngestMode::Samples => {
                    // Carry fractional samples so the long-run rate is exact
                    owed += sample_rate * period;
                    let count = owed.floor() as usize;
                    owed -= count as f64;

                    self.simulator.generate(count)
                        .into_iter()
                        .map(|s| s.to_string())
                        .collect::<Vec<_>>()
                }
                IngestMode::Bands => {
                    let powers = self.simulator.band_powers();
                    match serde_json::to_string(&powers) {
                        Ok(line) => vec![line],
                        Err(e) => {
                            debug!("Failed to encode simulated band line: {}", e);
                            Vec::new()
                        }
                    }
                }
            };

            for line in lines {
                if sender.send(line).await.is_err() {
                    info!("Simulated EEG stream stopped after {} lines", lines_sent);
                    return;
                }
                lines_sent += 1;
            }
        }
    }
}

/// Helper function to create and start a stream in the background
pub fn start_simulated_stream(
    config: StreamConfig,
) -> EegResult<(mpsc::Receiver<String>, JoinHandle<()>)> {
    let (sender, receiver) = mpsc::channel(config.buffer_size.max(1));
    let stream = SimulatedLineStream::new(config)?;

    let handle = tokio::spawn(stream.run(sender));
    Ok((receiver, handle))
}
