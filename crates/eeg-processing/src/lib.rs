//! EEG-Processing: Spectral analysis of sample blocks
//!
//! FFT-based band-power extraction over fixed-size blocks.

pub mod spectral;
pub mod processor;
pub mod config;

pub use spectral::{SpectralAnalyzer, SpectralBin, band_powers, power_spectrum};
pub use processor::{BlockAnalyzer, AnalysisMetrics, AnalysisTimer};
pub use config::{AnalysisConfig, DEFAULT_SAMPLE_RATE, MAX_SAMPLE_RATE};
