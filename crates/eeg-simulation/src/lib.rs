//! EEG-Simulation: synthetic EEG generation for running without hardware
//!
//! Produces the same newline-delimited text a serial EEG front end would.

pub mod real_time_stream;
pub mod signal_patterns;
pub mod eeg_simulator;

pub use eeg_simulator::*;
pub use real_time_stream::*;
pub use signal_patterns::*;
