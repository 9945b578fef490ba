//! EEG signal simulator producing ADC-style integer samples

use crate::signal_patterns::{MentalState, Rhythm};
use eeg_core::{config_error, BandPowers, EegError, EegResult, Sample};
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Configuration for EEG simulation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulatorConfig {
    /// Sampling rate in Hz
    pub sample_rate: u32,
    /// Rhythm mixture to generate
    pub state: MentalState,
    /// Gaussian noise standard deviation in ADC counts
    pub noise_std: f64,
    /// ADC reading for 0 V (mid-scale of a 10-bit converter)
    pub adc_midpoint: Sample,
    /// Largest ADC reading
    pub adc_max: Sample,
    /// Power line interference (50/60Hz)
    pub powerline_freq: Option<f64>,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 256,
            state: MentalState::default(),
            noise_std: 8.0,
            adc_midpoint: 512,
            adc_max: 1023,
            powerline_freq: Some(50.0),
            seed: None,
        }
    }
}

impl SimulatorConfig {
    /// Validate configuration
    pub fn validate(&self) -> EegResult<()> {
        if self.sample_rate == 0 {
            return Err(EegError::InvalidSamplingRate {
                rate: 0.0,
                valid_range: "> 0Hz",
            });
        }
        if !self.noise_std.is_finite() || self.noise_std < 0.0 {
            return Err(config_error!("noise standard deviation must be finite and non-negative"));
        }
        if self.adc_max <= 0 || self.adc_midpoint < 0 || self.adc_midpoint > self.adc_max {
            return Err(config_error!("ADC midpoint must lie within 0..=adc_max"));
        }
        Ok(())
    }
}

/// EEG signal simulator
pub struct EegSimulator {
    config: SimulatorConfig,
    rhythms: Vec<Rhythm>,
    rng: rand::rngs::StdRng,
    normal_dist: Normal<f64>,
    sample_index: u64,
}

impl EegSimulator {
    /// Create new EEG simulator with configuration
    pub fn new(config: SimulatorConfig) -> EegResult<Self> {
        config.validate()?;

        let rng = match config.seed {
            Some(seed) => rand::rngs::StdRng::seed_from_u64(seed),
            None => rand::rngs::StdRng::from_entropy(),
        };
        let normal_dist = Normal::new(0.0, config.noise_std)
            .map_err(|_| config_error!("invalid noise distribution"))?;

        Ok(EegSimulator {
            rhythms: config.state.rhythms(),
            config,
            rng,
            normal_dist,
            sample_index: 0,
        })
    }

    /// Generate the next sample, clamped to the ADC range
    pub fn next_sample(&mut self) -> Sample {
        let time = self.sample_index as f64 / f64::from(self.config.sample_rate);
        self.sample_index += 1;

        let mut value: f64 = self.rhythms.iter().map(|r| r.value_at(time)).sum();

        // Gaussian noise
        value += self.normal_dist.sample(&mut self.rng);

        if let Some(powerline_freq) = self.config.powerline_freq {
            value += 4.0 * (2.0 * PI * powerline_freq * time).sin();
        }

        let reading = (f64::from(self.config.adc_midpoint) + value).round();
        reading.clamp(0.0, f64::from(self.config.adc_max)) as Sample
    }

    /// Generate `count` consecutive samples
    pub fn generate(&mut self, count: usize) -> Vec<Sample> {
        (0..count).map(|_| self.next_sample()).collect()
    }

    /// Band powers a device would report for one second of this signal.
    ///
    /// Each rhythm contributes the power of an exact-bin sinusoid over a
    /// one-second block, jittered by ±20%.
    pub fn band_powers(&mut self) -> BandPowers {
        let n = f64::from(self.config.sample_rate);
        let mut powers = BandPowers::default();

        for rhythm in &self.rhythms {
            if let Some(band) = rhythm.band() {
                let jitter = self.rng.gen_range(0.8..1.2);
                *powers.get_mut(band) += (rhythm.amplitude * n / 2.0).powi(2) * jitter;
            }
        }

        // White noise spreads n * sigma^2 per bin
        let noise_per_bin = n * self.config.noise_std.powi(2);
        for band in eeg_core::Band::ALL {
            *powers.get_mut(band) += noise_per_bin * band.bandwidth();
        }

        powers
    }
}
