//! Configuration for block framing and spectral analysis

use eeg_core::{Band, EegError, EegResult, DEFAULT_BLOCK_SIZE, MIN_BLOCK_SIZE};
use serde::{Deserialize, Serialize};

/// Default device sampling rate in Hz
pub const DEFAULT_SAMPLE_RATE: u32 = 256;

/// Highest sampling rate accepted from a device
pub const MAX_SAMPLE_RATE: u32 = 100_000;

/// Sampling rate and block length, fixed for the lifetime of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Nominal samples per second of the source stream
    pub sample_rate: u32,
    /// Samples per analysis block
    pub block_size: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            block_size: DEFAULT_BLOCK_SIZE,
        }
    }
}

impl AnalysisConfig {
    /// Create and validate a configuration
    pub fn new(sample_rate: u32, block_size: usize) -> EegResult<Self> {
        let config = Self { sample_rate, block_size };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> EegResult<()> {
        if self.sample_rate == 0 || self.sample_rate > MAX_SAMPLE_RATE {
            return Err(EegError::InvalidSamplingRate {
                rate: f64::from(self.sample_rate),
                valid_range: "1-100000Hz",
            });
        }

        if self.block_size < MIN_BLOCK_SIZE {
            return Err(EegError::InvalidBlockSize {
                size: self.block_size,
                min: MIN_BLOCK_SIZE,
            });
        }

        Ok(())
    }

    /// Non-fatal observations about this configuration, for logging at startup
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !self.block_size.is_power_of_two() {
            warnings.push(format!(
                "block size {} is not a power of two; the FFT will be slower",
                self.block_size
            ));
        }

        if self.nyquist() < Band::Gamma.high_freq() {
            warnings.push(format!(
                "Nyquist frequency {:.1}Hz is below the gamma band edge of {:.0}Hz",
                self.nyquist(),
                Band::Gamma.high_freq()
            ));
        }

        if self.frequency_resolution() >= Band::Delta.bandwidth() {
            warnings.push(format!(
                "frequency resolution {:.2}Hz is too coarse to resolve the delta band",
                self.frequency_resolution()
            ));
        }

        warnings
    }

    /// Sample rate as used by the analyzer
    pub fn sample_rate_hz(&self) -> f64 {
        f64::from(self.sample_rate)
    }

    /// Width of one FFT bin in Hz
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate_hz() / self.block_size as f64
    }

    /// Highest representable frequency in Hz
    pub fn nyquist(&self) -> f64 {
        self.sample_rate_hz() / 2.0
    }

    /// Seconds of signal covered by one block
    pub fn block_duration_secs(&self) -> f64 {
        self.block_size as f64 / self.sample_rate_hz()
    }
}
