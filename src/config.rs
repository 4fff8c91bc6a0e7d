//! Pipeline configuration, stored on disk as [ron].
//!
//! [`PipelineConfig::default()`] is the reference deployment: a wand on
//! `/dev/tty.usbmodem2822491` at 115200 baud, playing plane at `z = 5`.
//! A file only needs the fields it wants to change:
//!
//! ```text
//! (serial: (port: "COM5", read_timeout_ms: 100), tick_rate_hz: 90.0)
//! ```

use std::{fs::File, io::Write, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::spectrum::SpectrumWindow;

/// Everything the pipeline can be told.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub serial: SerialConfig,
    /// Depth of the playing plane.
    pub plane_depth: f64,
    /// Wand position until a frame reports one.
    pub initial_origin: [f64; 3],
    pub instrument: InstrumentConfig,
    pub light: LightConfig,
    pub scale: ScaleConfig,
    pub spectrum_window: SpectrumWindow,
    /// How many ticks per second the binaries run.
    pub tick_rate_hz: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            serial: SerialConfig::default(),
            plane_depth: 5.0,
            initial_origin: [0.0, 1.0, 1.0],
            instrument: InstrumentConfig::default(),
            light: LightConfig::default(),
            scale: ScaleConfig::default(),
            spectrum_window: SpectrumWindow::Blackman,
            tick_rate_hz: 60.0,
        }
    }
}

impl PipelineConfig {
    /// Read a configuration from the path provided.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron(&text)
    }

    /// Parse a configuration from RON text.
    pub fn from_ron(text: &str) -> Result<Self, PipelineError> {
        ron::from_str(text).map_err(PipelineError::Config)
    }

    /// Write the configuration out to the path provided.
    pub fn to_path(&self, path: impl AsRef<Path>) -> Result<(), PipelineError> {
        let mut handle = File::create(path)?;
        handle.write_all(self.to_ron()?.as_bytes())?;
        Ok(())
    }

    /// Pretty-printed RON text.
    pub fn to_ron(&self) -> Result<String, PipelineError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(PipelineError::ConfigWrite)
    }

    /// Time budget for a single tick. Rates that are not positive, or so
    /// small that the period can't be represented, leave ticks unpaced.
    pub fn tick_period(&self) -> Duration {
        if self.tick_rate_hz > 0.0 {
            Duration::try_from_secs_f64(1.0 / self.tick_rate_hz).unwrap_or(Duration::ZERO)
        } else {
            Duration::ZERO
        }
    }
}

/// Where the wand is plugged in.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    pub port: String,
    pub baud_rate: u32,
    /// Longest a single read may block, in milliseconds.
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/tty.usbmodem2822491".to_owned(),
            baud_rate: 115200,
            read_timeout_ms: 2000,
        }
    }
}

impl SerialConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// When the instrument listens to the wand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum ModulationGate {
    /// Every decoded frame modulates the instrument.
    Always,
    /// Only while the operator holds the trigger.
    Held,
}

/// Plane bounds and output ranges of the audio instrument.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InstrumentConfig {
    pub up: f64,
    pub down: f64,
    pub left: f64,
    pub right: f64,
    pub pitch_min: f64,
    pub pitch_max: f64,
    /// Steepness of the volume curve.
    pub volume_gain: f64,
    pub gate: ModulationGate,
}

impl Default for InstrumentConfig {
    fn default() -> Self {
        Self {
            up: 10.0,
            down: 1.0,
            left: -5.0,
            right: 5.0,
            pitch_min: 0.75,
            pitch_max: 3.0,
            volume_gain: 20.0,
            gate: ModulationGate::Always,
        }
    }
}

/// Lateral bounds and hue range of the spotlight.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LightConfig {
    pub left: f64,
    pub right: f64,
    pub hue_min: f64,
    pub hue_max: f64,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            left: -3.0,
            right: 3.0,
            hue_min: 0.0,
            hue_max: 0.85,
        }
    }
}

/// Which band drives the visual scale, and how.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ScaleConfig {
    pub band: usize,
    pub multiplier: f64,
    pub offset: f64,
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            band: 1,
            multiplier: 100.0,
            offset: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_path() {
        let tempfile = tempfile::NamedTempFile::new().unwrap();
        let path = tempfile.path();
        let mut config = PipelineConfig::default();
        config.serial.port = "COM5".to_owned();
        config.serial.read_timeout_ms = 100;
        config.instrument.gate = ModulationGate::Held;

        config.to_path(path).unwrap();
        let read_config = PipelineConfig::from_path(path).unwrap();
        assert_eq!(config, read_config);
    }

    #[test]
    fn partial_files_keep_defaults() {
        let config =
            PipelineConfig::from_ron("(serial: (port: \"COM4\"), light: (hue_max: 0.5))").unwrap();

        assert_eq!(config.serial.port, "COM4");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.light.hue_max, 0.5);
        assert_eq!(config.light.left, -3.0);
        assert_eq!(config.plane_depth, 5.0);
        assert_eq!(config.spectrum_window, SpectrumWindow::Blackman);
    }

    #[test]
    fn garbage_is_a_config_error() {
        let err = PipelineConfig::from_ron("(plane_depth: \"deep\")").unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = PipelineConfig::from_path(dir.path().join("nope.ron")).unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
    }

    #[test]
    fn tick_period_follows_rate() {
        let config = PipelineConfig {
            tick_rate_hz: 50.0,
            ..Default::default()
        };
        assert_eq!(config.tick_period(), Duration::from_millis(20));
        assert_eq!(
            SerialConfig::default().read_timeout(),
            Duration::from_millis(2000)
        );
    }

    #[test]
    fn unrepresentable_tick_rates_are_unpaced() {
        for rate in ["1e-300", "0.0", "-5.0"] {
            let config = PipelineConfig::from_ron(&format!("(tick_rate_hz: {rate})")).unwrap();
            assert_eq!(config.tick_period(), Duration::ZERO, "rate {rate}");
        }
        for tick_rate_hz in [f64::NAN, f64::INFINITY, f64::MIN_POSITIVE] {
            let config = PipelineConfig {
                tick_rate_hz,
                ..Default::default()
            };
            assert_eq!(config.tick_period(), Duration::ZERO);
        }
    }
}
