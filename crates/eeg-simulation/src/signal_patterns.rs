//! Pre-defined EEG rhythm mixtures for realistic simulation

use eeg_core::{Band, EegError};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::str::FromStr;

/// One sinusoidal rhythm in ADC counts
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rhythm {
    pub frequency: f64,
    pub amplitude: f64,
}

impl Rhythm {
    pub const fn new(frequency: f64, amplitude: f64) -> Self {
        Self { frequency, amplitude }
    }

    /// Rhythm value at `time` seconds
    pub fn value_at(&self, time: f64) -> f64 {
        self.amplitude * (2.0 * PI * self.frequency * time).sin()
    }

    /// Band this rhythm falls into, if any
    pub fn band(&self) -> Option<Band> {
        Band::for_frequency(self.frequency)
    }
}

/// Predefined mental states, each a mixture of rhythms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentalState {
    /// Eyes closed, strong posterior alpha
    #[default]
    Relaxed,
    /// Theta takes over as alpha fades
    Drowsy,
    /// Task engagement, beta dominant
    Focused,
    /// Slow-wave sleep, large delta
    DeepSleep,
    /// High arousal with gamma activity
    Alert,
}

impl MentalState {
    /// Rhythm mixture for this state
    pub fn rhythms(&self) -> Vec<Rhythm> {
        match self {
            MentalState::Relaxed => vec![
                Rhythm::new(10.0, 120.0),
                Rhythm::new(6.0, 25.0),
                Rhythm::new(20.0, 15.0),
            ],
            MentalState::Drowsy => vec![
                Rhythm::new(6.0, 110.0),
                Rhythm::new(9.0, 30.0),
                Rhythm::new(2.0, 40.0),
            ],
            MentalState::Focused => vec![
                Rhythm::new(21.0, 90.0),
                Rhythm::new(10.0, 30.0),
                Rhythm::new(38.0, 15.0),
            ],
            MentalState::DeepSleep => vec![
                Rhythm::new(1.5, 200.0),
                Rhythm::new(5.0, 30.0),
            ],
            MentalState::Alert => vec![
                Rhythm::new(40.0, 70.0),
                Rhythm::new(18.0, 50.0),
                Rhythm::new(11.0, 20.0),
            ],
        }
    }

    /// Band carrying the largest rhythm
    pub fn dominant_band(&self) -> Option<Band> {
        self.rhythms()
            .into_iter()
            .max_by(|a, b| a.amplitude.total_cmp(&b.amplitude))
            .and_then(|r| r.band())
    }

    /// Name used on the command line and in serialized configs
    pub const fn name(&self) -> &'static str {
        match self {
            MentalState::Relaxed => "relaxed",
            MentalState::Drowsy => "drowsy",
            MentalState::Focused => "focused",
            MentalState::DeepSleep => "deep_sleep",
            MentalState::Alert => "alert",
        }
    }

    /// Get state description
    pub fn description(&self) -> &'static str {
        match self {
            MentalState::Relaxed => "Relaxed, eyes closed",
            MentalState::Drowsy => "Drowsy",
            MentalState::Focused => "Focused task",
            MentalState::DeepSleep => "Deep sleep",
            MentalState::Alert => "Alert, high arousal",
        }
    }

    /// All presets
    pub fn presets() -> [MentalState; 5] {
        [
            MentalState::Relaxed,
            MentalState::Drowsy,
            MentalState::Focused,
            MentalState::DeepSleep,
            MentalState::Alert,
        ]
    }
}

impl FromStr for MentalState {
    type Err = EegError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        MentalState::presets()
            .into_iter()
            .find(|state| state.name() == wanted)
            .ok_or(EegError::InvalidSignalConfig {
                reason: "unknown mental state, expected relaxed, drowsy, focused, deep_sleep or alert",
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_state_names() {
        for state in MentalState::presets() {
            assert_eq!(state.name().parse::<MentalState>().unwrap(), state);
        }
        assert_eq!("Deep-Sleep".parse::<MentalState>().unwrap(), MentalState::DeepSleep);
        assert!("asleep".parse::<MentalState>().is_err());
    }

    #[test]
    fn test_dominant_bands() {
        assert_eq!(MentalState::Relaxed.dominant_band(), Some(Band::Alpha));
        assert_eq!(MentalState::Drowsy.dominant_band(), Some(Band::Theta));
        assert_eq!(MentalState::Focused.dominant_band(), Some(Band::Beta));
        assert_eq!(MentalState::DeepSleep.dominant_band(), Some(Band::Delta));
        assert_eq!(MentalState::Alert.dominant_band(), Some(Band::Gamma));
    }

    #[test]
    fn test_rhythm_value() {
        let rhythm = Rhythm::new(1.0, 2.0);
        assert!(rhythm.value_at(0.0).abs() < 1e-12);
        assert!((rhythm.value_at(0.25) - 2.0).abs() < 1e-12);
    }
}
