//! A stand-in synthesis engine for running the pipeline without one.
//!
//! It remembers the last volume and pitch it was given and produces a
//! spectrum with a harmonic series whose fundamental follows the pitch and
//! whose level follows the volume.

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::collaborators::AudioCollaborator;
use crate::spectrum::{SpectrumSnapshot, SpectrumWindow, SPECTRUM_LEN};

/// Bin of the fundamental at pitch 1.0.
const BASE_BIN: f64 = 12.0;
const HARMONICS: usize = 6;

#[derive(Debug, Clone)]
pub struct DummyAudio {
    volume: f64,
    pitch: f64,
    noise_floor: f64,
    rng: StdRng,
}

impl Default for DummyAudio {
    fn default() -> Self {
        Self::new(0.001)
    }
}

impl DummyAudio {
    pub fn new(noise_floor: f64) -> Self {
        Self {
            volume: 0.0,
            pitch: 1.0,
            noise_floor,
            rng: StdRng::from_entropy(),
        }
    }

    /// A deterministic engine, for tests.
    pub fn seeded(noise_floor: f64, seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            ..Self::new(noise_floor)
        }
    }
}

/// How many neighbouring bins a peak leaks into under each window.
fn leakage(window: SpectrumWindow) -> usize {
    match window {
        SpectrumWindow::Rectangular => 4,
        SpectrumWindow::Triangle | SpectrumWindow::Hamming | SpectrumWindow::Hann => 2,
        SpectrumWindow::Blackman | SpectrumWindow::BlackmanHarris => 1,
    }
}

impl AudioCollaborator for DummyAudio {
    fn set_volume(&mut self, volume: f64) {
        self.volume = volume;
    }

    fn set_pitch(&mut self, pitch: f64) {
        self.pitch = pitch;
    }

    fn spectrum(&mut self, window: SpectrumWindow) -> Option<SpectrumSnapshot> {
        let mut samples = [0.0; SPECTRUM_LEN];
        if self.noise_floor > 0.0 {
            for sample in samples.iter_mut() {
                *sample = self.rng.gen_range(0.0..self.noise_floor);
            }
        }

        let spread = leakage(window);
        for harmonic in 1..=HARMONICS {
            let centre = (BASE_BIN * self.pitch * harmonic as f64).round() as usize;
            let level = self.volume / harmonic as f64;
            let lo = centre.saturating_sub(spread);
            let hi = (centre + spread).min(SPECTRUM_LEN - 1);
            for bin in lo..=hi {
                let distance = bin.abs_diff(centre) as f64;
                samples[bin] += level / (1.0 + distance);
            }
        }

        Some(SpectrumSnapshot::new(samples))
    }
}
