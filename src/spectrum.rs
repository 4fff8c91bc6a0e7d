//! Reduces a magnitude spectrum to a handful of bands for the visuals.

use std::{
    ops::Range,
    sync::{Arc, RwLock},
};

use serde::{Deserialize, Serialize};

/// Samples in one spectrum snapshot.
pub const SPECTRUM_LEN: usize = 512;

/// Bands in a [`BandSet`].
pub const BAND_COUNT: usize = 8;

/// Window function the audio engine applies before its FFT.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum SpectrumWindow {
    Rectangular,
    Triangle,
    Hamming,
    Hann,
    Blackman,
    BlackmanHarris,
}

/// One tick's worth of non-negative magnitudes, low frequencies first.
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrumSnapshot(Box<[f64; SPECTRUM_LEN]>);

impl SpectrumSnapshot {
    pub fn new(samples: [f64; SPECTRUM_LEN]) -> Self {
        Self(Box::new(samples))
    }

    /// Copies `samples` in, padding with silence or dropping the excess.
    pub fn from_slice(samples: &[f64]) -> Self {
        let mut buf = [0.0; SPECTRUM_LEN];
        let n = samples.len().min(SPECTRUM_LEN);
        buf[..n].copy_from_slice(&samples[..n]);
        Self::new(buf)
    }

    pub fn silent() -> Self {
        Self::new([0.0; SPECTRUM_LEN])
    }

    pub fn samples(&self) -> &[f64; SPECTRUM_LEN] {
        &self.0
    }
}

/// Aggregated band energies, lowest band first.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BandSet(pub [f64; BAND_COUNT]);

impl BandSet {
    pub fn get(&self, band: usize) -> Option<f64> {
        self.0.get(band).copied()
    }
}

/// The sample range each band covers. Band `i` spans `2^(i+1)` samples and
/// the last band takes whatever is left, so the ranges tile the spectrum.
pub fn band_partitions() -> [Range<usize>; BAND_COUNT] {
    let mut start = 0;
    std::array::from_fn(|i| {
        let end = if i == BAND_COUNT - 1 {
            SPECTRUM_LEN
        } else {
            start + (2 << i)
        };
        let range = start..end;
        start = end;
        range
    })
}

/// Computes the [`BandSet`] for a snapshot.
///
/// Sample `n` (counting from 1 over the whole spectrum) is weighted by `n`,
/// and each band reports the running weighted sum divided by the number of
/// samples consumed so far. Band values are therefore cumulative over all
/// lower bands, not local to their own partition.
pub fn aggregate(snapshot: &SpectrumSnapshot) -> BandSet {
    let samples = snapshot.samples();
    let mut bands = [0.0; BAND_COUNT];
    let mut sum = 0.0;
    let mut count = 0usize;

    for (band, range) in bands.iter_mut().zip(band_partitions()) {
        for sample in &samples[range] {
            count += 1;
            sum += sample * count as f64;
        }
        *band = sum / count as f64;
    }

    BandSet(bands)
}

/// The process-wide band location: one writer per tick, any number of
/// readers in between. A reader always sees a whole [`BandSet`].
#[derive(Debug, Clone, Default)]
pub struct SharedBands {
    bands: Arc<RwLock<BandSet>>,
}

impl SharedBands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, bands: BandSet) {
        // A poisoned lock still holds a complete BandSet.
        let mut slot = self.bands.write().unwrap_or_else(|e| e.into_inner());
        *slot = bands;
    }

    pub fn current(&self) -> BandSet {
        *self.bands.read().unwrap_or_else(|e| e.into_inner())
    }
}

/// Turns one band into a scale factor: `bands[band] * multiplier + offset`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandScaler {
    pub band: usize,
    pub multiplier: f64,
    pub offset: f64,
}

impl BandScaler {
    pub fn new(band: usize, multiplier: f64, offset: f64) -> Self {
        Self {
            band,
            multiplier,
            offset,
        }
    }

    /// Missing bands count as silent.
    pub fn scale(&self, bands: &BandSet) -> f64 {
        bands.get(self.band).unwrap_or(0.0) * self.multiplier + self.offset
    }
}

impl From<&crate::config::ScaleConfig> for BandScaler {
    fn from(config: &crate::config::ScaleConfig) -> Self {
        Self::new(config.band, config.multiplier, config.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::distributions::{Distribution, Uniform};

    #[test]
    fn partitions_tile_the_spectrum() {
        let parts = band_partitions();
        assert_eq!(parts[0], 0..2);
        assert_eq!(parts[1], 2..6);
        assert_eq!(parts[6], 126..254);
        assert_eq!(parts[7], 254..512);
        assert_eq!(parts[7].len(), 256 + 2);

        assert!(parts.windows(2).all(|w| w[0].end == w[1].start));
        assert_eq!(parts.iter().map(|r| r.len()).sum::<usize>(), SPECTRUM_LEN);
    }

    #[test]
    fn constant_spectrum_gives_constant_bands() {
        let bands = aggregate(&SpectrumSnapshot::new([1.0; SPECTRUM_LEN]));
        // With weight n over n samples the running mean is (n + 1) / 2.
        let counts = band_partitions().map(|r| r.end as f64);
        for (value, n) in bands.0.iter().zip(counts) {
            assert!((value - (n + 1.0) / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn running_mean_spans_earlier_bands() {
        let mut samples = [0.0; SPECTRUM_LEN];
        samples[0] = 3.0;
        let bands = aggregate(&SpectrumSnapshot::new(samples));

        // Only sample 1 contributes: 3 * 1, divided by the count so far.
        assert!((bands.0[0] - 1.5).abs() < 1e-12);
        assert!((bands.0[1] - 0.5).abs() < 1e-12);
        assert!((bands.0[7] - 3.0 / 512.0).abs() < 1e-12);
    }

    #[test]
    fn silence_is_silent() {
        assert_eq!(aggregate(&SpectrumSnapshot::silent()), BandSet::default());
    }

    #[test]
    fn random_spectra_stay_finite_and_non_negative() {
        let mut rng = rand::thread_rng();
        let dist = Uniform::new(0.0, 1.0);
        for _ in 0..16 {
            let samples: Vec<f64> = dist.sample_iter(&mut rng).take(SPECTRUM_LEN).collect();
            let bands = aggregate(&SpectrumSnapshot::from_slice(&samples));
            assert!(bands.0.iter().all(|b| b.is_finite() && *b >= 0.0));
        }
    }

    #[test]
    fn from_slice_pads_and_truncates() {
        let short = SpectrumSnapshot::from_slice(&[1.0, 2.0]);
        assert_eq!(short.samples()[1], 2.0);
        assert_eq!(short.samples()[2], 0.0);

        let long = SpectrumSnapshot::from_slice(&[1.0; 600]);
        assert_eq!(long.samples()[SPECTRUM_LEN - 1], 1.0);
    }

    #[test]
    fn shared_bands_hand_out_whole_sets() {
        let shared = SharedBands::new();
        let reader = shared.clone();
        let bands = BandSet([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);

        shared.publish(bands);
        assert_eq!(reader.current(), bands);
    }

    #[test]
    fn scaler_is_linear_in_its_band() {
        let bands = BandSet([0.0, 0.5, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert_eq!(BandScaler::new(1, 4.0, 1.0).scale(&bands), 3.0);
        assert_eq!(BandScaler::new(42, 4.0, 1.0).scale(&bands), 1.0);
    }
}
