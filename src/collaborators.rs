//! The seams between the pipeline and the outside world.
//!
//! The pipeline pulls text from a [`TelemetrySource`], pushes control values
//! into an [`AudioCollaborator`] and a [`LightCollaborator`], and pulls
//! spectrum snapshots back out of the audio side. Real devices, engines, and
//! renderers implement these; the in-memory versions below serve the
//! monitor and the tests.

use std::collections::VecDeque;

use log::{debug, info};

use crate::spectrum::{SpectrumSnapshot, SpectrumWindow};

/// Something that yields telemetry text.
pub trait TelemetrySource {
    /// Returns whatever text has arrived since the last call, which may be
    /// nothing, several records, or half of one. Must not block past the
    /// source's configured timeout.
    fn read_available(&mut self) -> std::io::Result<String>;
}

/// The synthesis engine the wand plays.
pub trait AudioCollaborator {
    fn set_volume(&mut self, volume: f64);
    fn set_pitch(&mut self, pitch: f64);
    /// The latest magnitude spectrum, if the engine has one.
    fn spectrum(&mut self, window: SpectrumWindow) -> Option<SpectrumSnapshot>;
}

/// The light the wand colours.
pub trait LightCollaborator {
    fn set_color(&mut self, hue: f64, saturation: f64, value: f64);
}

/// A [`TelemetrySource`] that hands out pre-recorded chunks, one per read.
#[derive(Debug, Default, Clone)]
pub struct ScriptedSource {
    chunks: VecDeque<String>,
}

impl ScriptedSource {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            chunks: chunks.into_iter().map(Into::into).collect(),
        }
    }
}

impl TelemetrySource for ScriptedSource {
    fn read_available(&mut self) -> std::io::Result<String> {
        Ok(self.chunks.pop_front().unwrap_or_default())
    }
}

/// An audio engine that just remembers what it was told.
#[derive(Debug, Clone, Default)]
pub struct RecordingAudio {
    pub volume: Option<f64>,
    pub pitch: Option<f64>,
    pub next_spectrum: Option<SpectrumSnapshot>,
    pub last_window: Option<SpectrumWindow>,
}

impl AudioCollaborator for RecordingAudio {
    fn set_volume(&mut self, volume: f64) {
        self.volume = Some(volume);
    }

    fn set_pitch(&mut self, pitch: f64) {
        self.pitch = Some(pitch);
    }

    fn spectrum(&mut self, window: SpectrumWindow) -> Option<SpectrumSnapshot> {
        self.last_window = Some(window);
        self.next_spectrum.clone()
    }
}

/// A light that just remembers its colour.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RecordingLight {
    pub hsv: Option<(f64, f64, f64)>,
}

impl LightCollaborator for RecordingLight {
    fn set_color(&mut self, hue: f64, saturation: f64, value: f64) {
        self.hsv = Some((hue, saturation, value));
    }
}

/// Stands in for a synthesis engine when none is attached: every value is
/// logged and no spectrum is ever available.
#[derive(Debug, Default)]
pub struct LoggingAudio;

impl AudioCollaborator for LoggingAudio {
    fn set_volume(&mut self, volume: f64) {
        info!("volume <- {volume:.4}");
    }

    fn set_pitch(&mut self, pitch: f64) {
        info!("pitch <- {pitch:.4}");
    }

    fn spectrum(&mut self, window: SpectrumWindow) -> Option<SpectrumSnapshot> {
        debug!("no audio engine attached, no {window:?} spectrum");
        None
    }
}

/// Stands in for a renderer when none is attached.
#[derive(Debug, Default)]
pub struct LoggingLight;

impl LightCollaborator for LoggingLight {
    fn set_color(&mut self, hue: f64, saturation: f64, value: f64) {
        info!("light <- hsv({hue:.3}, {saturation:.1}, {value:.1})");
    }
}
