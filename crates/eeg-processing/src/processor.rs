//! Block analyzer trait and timing metrics

use eeg_core::{BandPowers, Block};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Turns one complete block into band powers.
///
/// Implementations must be pure: the same block and sample rate always give
/// the same result, so blocks can be analyzed in parallel.
pub trait BlockAnalyzer: Send + Sync {
    /// Derive band powers for `block` sampled at `sample_rate` Hz
    fn analyze(&self, block: &Block, sample_rate: f64) -> BandPowers;

    /// Get analyzer name/identifier
    fn name(&self) -> &str;

    /// Analyze and record how long it took
    fn analyze_timed(&self, block: &Block, sample_rate: f64) -> (BandPowers, AnalysisMetrics) {
        let timer = AnalysisMetrics::start_timing();
        let powers = self.analyze(block, sample_rate);
        (powers, timer.finish(block.len()))
    }
}

/// Performance metrics for one analysis
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetrics {
    /// Actual processing time in microseconds
    pub processing_time_us: u64,
    /// Number of samples analyzed
    pub samples: usize,
}

impl AnalysisMetrics {
    /// Start timing an analysis
    pub fn start_timing() -> AnalysisTimer {
        AnalysisTimer {
            start_time: Instant::now(),
        }
    }
}

/// Helper for timing analyses
pub struct AnalysisTimer {
    start_time: Instant,
}

impl AnalysisTimer {
    /// Finish timing and return metrics
    pub fn finish(self, samples: usize) -> AnalysisMetrics {
        AnalysisMetrics {
            processing_time_us: self.start_time.elapsed().as_micros() as u64,
            samples,
        }
    }
}
