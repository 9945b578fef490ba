//! Spectral band-power analysis

use crate::processor::BlockAnalyzer;
use eeg_core::{Band, BandPowers, Block, EegError, EegResult, Sample, MIN_BLOCK_SIZE};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// One bin of the non-redundant half of the spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectralBin {
    pub frequency: f64,
    pub power: f64,
}

/// FFT-based analyzer summing squared magnitudes into the five bands.
///
/// The forward FFT is planned once for the configured block size and shared
/// by every analysis, so one analyzer can serve concurrent block tasks.
pub struct SpectralAnalyzer {
    block_size: usize,
    fft: Arc<dyn Fft<f64>>,
}

impl SpectralAnalyzer {
    /// Create an analyzer planned for blocks of `block_size` samples
    pub fn new(block_size: usize) -> EegResult<Self> {
        if block_size < MIN_BLOCK_SIZE {
            return Err(EegError::InvalidBlockSize {
                size: block_size,
                min: MIN_BLOCK_SIZE,
            });
        }

        let mut planner = FftPlanner::new();
        Ok(SpectralAnalyzer {
            block_size,
            fft: planner.plan_fft_forward(block_size),
        })
    }

    /// Block size the FFT was planned for
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Power spectrum of the de-meaned samples, bins `0..N/2`
    pub fn power_spectrum(&self, samples: &[Sample], sample_rate: f64) -> Vec<SpectralBin> {
        if samples.len() == self.block_size {
            spectrum_with(self.fft.as_ref(), samples, sample_rate)
        } else {
            // Off-size blocks get their own plan
            power_spectrum(samples, sample_rate)
        }
    }

    /// Band powers for raw samples
    pub fn band_powers(&self, samples: &[Sample], sample_rate: f64) -> BandPowers {
        accumulate_bands(&self.power_spectrum(samples, sample_rate))
    }
}

impl BlockAnalyzer for SpectralAnalyzer {
    fn analyze(&self, block: &Block, sample_rate: f64) -> BandPowers {
        self.band_powers(block.samples(), sample_rate)
    }

    fn name(&self) -> &str {
        "Spectral Band Analyzer"
    }
}

/// Power spectrum with a freshly planned FFT
pub fn power_spectrum(samples: &[Sample], sample_rate: f64) -> Vec<SpectralBin> {
    if samples.is_empty() {
        return Vec::new();
    }

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(samples.len());
    spectrum_with(fft.as_ref(), samples, sample_rate)
}

/// Band powers for raw samples with a freshly planned FFT
pub fn band_powers(samples: &[Sample], sample_rate: f64) -> BandPowers {
    accumulate_bands(&power_spectrum(samples, sample_rate))
}

fn spectrum_with(fft: &dyn Fft<f64>, samples: &[Sample], sample_rate: f64) -> Vec<SpectralBin> {
    let n = samples.len();
    if n == 0 {
        return Vec::new();
    }

    // DC removal
    let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = samples.iter()
        .map(|&s| Complex::new(f64::from(s) - mean, 0.0))
        .collect();

    fft.process(&mut buffer);

    // Only the non-redundant half of a real-valued input.
    // Multiply before dividing so bins on a band edge land exactly on it.
    buffer[..n / 2]
        .iter()
        .enumerate()
        .map(|(k, c)| SpectralBin {
            frequency: k as f64 * sample_rate / n as f64,
            power: c.norm_sqr(),
        })
        .collect()
}

fn accumulate_bands(spectrum: &[SpectralBin]) -> BandPowers {
    let mut powers = BandPowers::default();
    for bin in spectrum {
        if let Some(band) = Band::for_frequency(bin.frequency) {
            *powers.get_mut(band) += bin.power;
        }
    }
    powers
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine_block(frequency: f64, sample_rate: f64, len: usize, amplitude: f64) -> Block {
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / sample_rate;
                (512.0 + amplitude * (2.0 * PI * frequency * t).sin()).round() as Sample
            })
            .collect();
        Block::new(samples, len).unwrap()
    }

    #[test]
    fn test_alpha_sinusoid_dominates() {
        let analyzer = SpectralAnalyzer::new(256).unwrap();
        let block = sine_block(10.0, 256.0, 256, 300.0);

        let powers = analyzer.analyze(&block, 256.0);

        for band in [Band::Delta, Band::Theta, Band::Beta, Band::Gamma] {
            assert!(
                powers.alpha > 10.0 * powers.get(band),
                "alpha {} should dwarf {} {}", powers.alpha, band, powers.get(band)
            );
        }
        assert_eq!(powers.dominant(), Some(Band::Alpha));
    }

    #[test]
    fn test_each_band_captures_its_tone() {
        let analyzer = SpectralAnalyzer::new(256).unwrap();
        let tones = [
            (2.0, Band::Delta),
            (6.0, Band::Theta),
            (10.0, Band::Alpha),
            (20.0, Band::Beta),
            (45.0, Band::Gamma),
        ];

        for (frequency, band) in tones {
            let powers = analyzer.analyze(&sine_block(frequency, 256.0, 256, 200.0), 256.0);
            assert_eq!(powers.dominant(), Some(band), "{} Hz tone", frequency);
        }
    }

    #[test]
    fn test_constant_block_has_no_power() {
        let analyzer = SpectralAnalyzer::new(256).unwrap();
        let block = Block::new(vec![731; 256], 256).unwrap();

        let powers = analyzer.analyze(&block, 256.0);
        for (_, power) in powers.iter() {
            assert!(power.abs() < 1e-9);
        }
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let analyzer = SpectralAnalyzer::new(256).unwrap();
        let samples: Vec<Sample> = (0..256).map(|i| (i * 7919 % 1024) - 512).collect();
        let block = Block::new(samples, 256).unwrap();

        let first = analyzer.analyze(&block, 256.0);
        let second = analyzer.analyze(&block, 256.0);
        for band in Band::ALL {
            assert_eq!(first.get(band).to_bits(), second.get(band).to_bits());
        }

        // Shared plan and a fresh plan agree
        let fresh = band_powers(block.samples(), 256.0);
        for band in Band::ALL {
            assert_eq!(first.get(band).to_bits(), fresh.get(band).to_bits());
        }
    }

    #[test]
    fn test_powers_never_negative() {
        let analyzer = SpectralAnalyzer::new(64).unwrap();
        let patterns: [Vec<Sample>; 3] = [
            (0..64).map(|i| if i % 2 == 0 { 1023 } else { 0 }).collect(),
            (0..64).map(|i| -(i * i)).collect(),
            (0..64).map(|i| i32::from(i % 5 == 0) * 400).collect(),
        ];

        for samples in patterns {
            let block = Block::new(samples, 64).unwrap();
            let powers = analyzer.analyze(&block, 256.0);
            assert!(powers.validate().is_ok());
        }
    }

    #[test]
    fn test_frequencies_above_gamma_are_discarded() {
        // 110 Hz lands on an exact bin at 512 Hz / 512 samples
        let analyzer = SpectralAnalyzer::new(512).unwrap();
        let amplitude = 1000.0;
        let block = sine_block(110.0, 512.0, 512, amplitude);

        let powers = analyzer.analyze(&block, 512.0);
        let tone_power = (amplitude * 512.0 / 2.0).powi(2);
        assert!(powers.total() < tone_power * 1e-4);
    }

    #[test]
    fn test_spectrum_covers_half_the_bins() {
        let spectrum = power_spectrum(&[1, 5, 2, 8, 3, 9, 4, 7], 8.0);
        assert_eq!(spectrum.len(), 4);
        assert_eq!(spectrum[0].frequency, 0.0);
        assert_eq!(spectrum[3].frequency, 3.0);
        // Mean removed, so the DC bin is empty
        assert!(spectrum[0].power < 1e-9);
    }

    #[test]
    fn test_non_power_of_two_block() {
        let analyzer = SpectralAnalyzer::new(250).unwrap();
        let block = sine_block(10.0, 250.0, 250, 200.0);

        let powers = analyzer.analyze(&block, 250.0);
        assert_eq!(powers.dominant(), Some(Band::Alpha));
    }

    #[test]
    fn test_off_size_block_uses_own_plan() {
        let analyzer = SpectralAnalyzer::new(256).unwrap();
        let block = sine_block(20.0, 128.0, 128, 200.0);

        let powers = analyzer.analyze(&block, 128.0);
        assert_eq!(powers.dominant(), Some(Band::Beta));
    }

    #[test]
    fn test_bin_on_lower_band_edge_counts_for_upper_band() {
        // 8 Hz is exactly bin 49 of 784 at 128 Hz
        let analyzer = SpectralAnalyzer::new(784).unwrap();
        let block = sine_block(8.0, 128.0, 784, 100.0);

        let spectrum = analyzer.power_spectrum(block.samples(), 128.0);
        assert_eq!(spectrum[49].frequency, 8.0);

        let powers = analyzer.analyze(&block, 128.0);
        assert_eq!(powers.dominant(), Some(Band::Alpha));
        assert!(powers.theta < 1e-3 * powers.alpha);
    }

    #[test]
    fn test_bin_on_gamma_upper_edge_is_discarded() {
        // 100 Hz is exactly bin 194 of 485 at 250 Hz
        let analyzer = SpectralAnalyzer::new(485).unwrap();
        let block = sine_block(100.0, 250.0, 485, 100.0);

        let spectrum = analyzer.power_spectrum(block.samples(), 250.0);
        assert_eq!(spectrum[194].frequency, 100.0);

        let powers = analyzer.analyze(&block, 250.0);
        assert!(
            powers.total() < 1e-3 * spectrum[194].power,
            "100 Hz leaked into the bands: {:?}", powers
        );
    }

    #[test]
    fn test_invalid_block_size() {
        assert!(SpectralAnalyzer::new(0).is_err());
        assert!(SpectralAnalyzer::new(1).is_err());
    }
}
