//! Canonical EEG frequency bands and per-block band powers

use crate::error::{EegError, EegResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the five canonical physiological frequency bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Band {
    Delta,
    Theta,
    Alpha,
    Beta,
    Gamma,
}

impl Band {
    /// All bands in precedence order
    pub const ALL: [Band; 5] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta, Band::Gamma];

    /// Half-open frequency interval `[low, high)` in Hz
    pub const fn range(self) -> (f64, f64) {
        match self {
            Band::Delta => (0.5, 4.0),
            Band::Theta => (4.0, 8.0),
            Band::Alpha => (8.0, 13.0),
            Band::Beta => (13.0, 30.0),
            Band::Gamma => (30.0, 100.0),
        }
    }

    /// Lower edge in Hz (inclusive)
    pub const fn low_freq(self) -> f64 {
        self.range().0
    }

    /// Upper edge in Hz (exclusive)
    pub const fn high_freq(self) -> f64 {
        self.range().1
    }

    /// Width of the band in Hz
    pub fn bandwidth(self) -> f64 {
        self.high_freq() - self.low_freq()
    }

    /// Check whether a frequency falls inside this band
    pub fn contains(self, frequency: f64) -> bool {
        let (low, high) = self.range();
        frequency >= low && frequency < high
    }

    /// Band owning `frequency`, first match in precedence order.
    ///
    /// Frequencies below 0.5 Hz or at/above 100 Hz belong to no band.
    pub fn for_frequency(frequency: f64) -> Option<Band> {
        Band::ALL.into_iter().find(|band| band.contains(frequency))
    }

    /// Lowercase band name as used in storage and on the wire
    pub const fn name(self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
            Band::Gamma => "gamma",
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Summed spectral power per band for one block.
///
/// Values are raw sums of squared DFT magnitudes, not normalized by block
/// length or bandwidth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BandPowers {
    pub delta: f64,
    pub theta: f64,
    pub alpha: f64,
    pub beta: f64,
    pub gamma: f64,
}

impl BandPowers {
    /// Power accumulated in `band`
    pub fn get(&self, band: Band) -> f64 {
        match band {
            Band::Delta => self.delta,
            Band::Theta => self.theta,
            Band::Alpha => self.alpha,
            Band::Beta => self.beta,
            Band::Gamma => self.gamma,
        }
    }

    /// Mutable access to the power of `band`
    pub fn get_mut(&mut self, band: Band) -> &mut f64 {
        match band {
            Band::Delta => &mut self.delta,
            Band::Theta => &mut self.theta,
            Band::Alpha => &mut self.alpha,
            Band::Beta => &mut self.beta,
            Band::Gamma => &mut self.gamma,
        }
    }

    /// Iterate `(band, power)` pairs in precedence order
    pub fn iter(&self) -> impl Iterator<Item = (Band, f64)> + '_ {
        Band::ALL.into_iter().map(move |band| (band, self.get(band)))
    }

    /// Sum over all five bands
    pub fn total(&self) -> f64 {
        self.iter().map(|(_, power)| power).sum()
    }

    /// Band with the largest power, `None` when every band is zero
    pub fn dominant(&self) -> Option<Band> {
        self.iter()
            .filter(|(_, power)| *power > 0.0)
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(band, _)| band)
    }

    /// Reject negative or non-finite values (e.g. device-computed powers)
    pub fn validate(&self) -> EegResult<()> {
        for (band, value) in self.iter() {
            if !value.is_finite() || value < 0.0 {
                return Err(EegError::InvalidBandPower {
                    band: band.name(),
                    value,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_edges_are_half_open() {
        assert_eq!(Band::for_frequency(0.49), None);
        assert_eq!(Band::for_frequency(0.5), Some(Band::Delta));
        assert_eq!(Band::for_frequency(3.99), Some(Band::Delta));
        assert_eq!(Band::for_frequency(4.0), Some(Band::Theta));
        assert_eq!(Band::for_frequency(8.0), Some(Band::Alpha));
        assert_eq!(Band::for_frequency(13.0), Some(Band::Beta));
        assert_eq!(Band::for_frequency(30.0), Some(Band::Gamma));
        assert_eq!(Band::for_frequency(99.9), Some(Band::Gamma));
        assert_eq!(Band::for_frequency(100.0), None);
    }

    #[test]
    fn test_band_powers_accessors() {
        let mut powers = BandPowers::default();
        *powers.get_mut(Band::Alpha) += 4.0;
        *powers.get_mut(Band::Beta) += 1.0;

        assert_eq!(powers.alpha, 4.0);
        assert_eq!(powers.total(), 5.0);
        assert_eq!(powers.dominant(), Some(Band::Alpha));
        assert_eq!(BandPowers::default().dominant(), None);
    }

    #[test]
    fn test_band_powers_validate() {
        let valid = BandPowers { delta: 1.0, theta: 0.0, alpha: 2.5, beta: 3.0, gamma: 0.1 };
        assert!(valid.validate().is_ok());

        let negative = BandPowers { beta: -1.0, ..valid };
        assert!(matches!(
            negative.validate(),
            Err(EegError::InvalidBandPower { band: "beta", .. })
        ));

        let nan = BandPowers { gamma: f64::NAN, ..valid };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_band_powers_wire_names() {
        let powers = BandPowers { delta: 1.0, theta: 2.0, alpha: 3.0, beta: 4.0, gamma: 5.0 };
        let json = serde_json::to_value(powers).unwrap();
        for band in Band::ALL {
            assert_eq!(json[band.name()], powers.get(band));
        }
    }
}
