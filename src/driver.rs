//! The per-tick orchestration of the wand pipeline.
//!
//! Each [`PipelineDriver::tick`] is a complete unit of work:
//!
//! 1. read whatever telemetry text arrived,
//! 2. decode the latest complete record,
//! 3. if there is one, update the wand pose, project it, run the curves, and
//!    publish volume, pitch, and hue,
//! 4. independently, pull a spectrum snapshot and publish its bands.
//!
//! Nothing that goes wrong in one tick carries into the next, and an output
//! is only overwritten when its path succeeded; otherwise the previous value
//! stays in effect.

use glam::{DQuat, DVec3, EulerRot};
use log::{debug, warn};

use crate::collaborators::{AudioCollaborator, LightCollaborator, TelemetrySource};
use crate::config::{ModulationGate, PipelineConfig};
use crate::curve::{hue_curve, pitch_curve, volume_curve, MappingCurve};
use crate::frame_decoder::{decode_latest, DecodeError, PoseFrame};
use crate::projector::{PlaneProjector, ProjectedPoint};
use crate::spectrum::{aggregate, BandSet, SharedBands, SpectrumWindow};

/// Depth of the wand whenever a frame reports a position.
const MOUNT_DEPTH: f64 = 1.0;

/// How far a tick got along the pose path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickState {
    /// No complete frame this tick.
    #[default]
    Idle,
    /// A frame was decoded and the light updated, but the instrument gate
    /// was closed.
    FrameAvailable,
    /// A frame was decoded and every pose output published.
    Dispatched,
}

/// The wand's transform. Owned by the host; the driver only updates it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WandPose {
    pub orientation: DQuat,
    pub origin: DVec3,
}

impl WandPose {
    pub fn new(origin: DVec3) -> Self {
        Self {
            orientation: DQuat::IDENTITY,
            origin,
        }
    }

    /// The device reports the inverse of the wand's rotation; normalize it
    /// and flip it round. Position-bearing frames also move the wand.
    pub fn apply(&mut self, frame: &PoseFrame) {
        self.orientation = frame.orientation().normalize().inverse();
        if let Some(offset) = frame.offset() {
            self.origin = DVec3::new(offset.x, offset.y, MOUNT_DEPTH);
        }
    }

    /// Orientation as `(x, y, z)` Euler angles in degrees, applied in
    /// z, x, y order.
    pub fn euler_degrees(&self) -> DVec3 {
        let (y, x, z) = self.orientation.to_euler(EulerRot::YXZ);
        DVec3::new(x.to_degrees(), y.to_degrees(), z.to_degrees())
    }
}

/// The control values computed from one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Modulation {
    pub aim: ProjectedPoint,
    pub volume: f64,
    pub pitch: f64,
    pub hue: f64,
}

/// What happened during one tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub state: TickState,
    pub frame: Option<PoseFrame>,
    pub modulation: Option<Modulation>,
    pub bands: Option<BandSet>,
    pub decode_error: Option<DecodeError>,
    pub read_error: Option<std::io::Error>,
}

/// Sequences decoding, projection, mapping, and spectrum aggregation.
#[derive(Debug, Clone)]
pub struct PipelineDriver {
    pose: WandPose,
    instrument: PlaneProjector,
    spotlight: PlaneProjector,
    volume: MappingCurve,
    pitch: MappingCurve,
    hue: MappingCurve,
    gate: ModulationGate,
    trigger_held: bool,
    window: SpectrumWindow,
    bands: SharedBands,
}

impl PipelineDriver {
    pub fn new(config: &PipelineConfig) -> Self {
        let instrument = &config.instrument;
        let light = &config.light;
        let [x, y, z] = config.initial_origin;

        Self {
            pose: WandPose::new(DVec3::new(x, y, z)),
            instrument: PlaneProjector::new(
                config.plane_depth,
                ProjectedPoint::new(instrument.left, instrument.up),
            ),
            spotlight: PlaneProjector::new(config.plane_depth, ProjectedPoint::new(light.left, 0.0)),
            volume: volume_curve(instrument),
            pitch: pitch_curve(instrument),
            hue: hue_curve(light),
            gate: instrument.gate,
            trigger_held: false,
            window: config.spectrum_window,
            bands: SharedBands::new(),
        }
    }

    /// A handle readers can keep to the published bands.
    pub fn bands(&self) -> SharedBands {
        self.bands.clone()
    }

    pub fn pose(&self) -> &WandPose {
        &self.pose
    }

    /// Tells a [`ModulationGate::Held`] instrument whether the trigger is down.
    pub fn set_trigger(&mut self, held: bool) {
        self.trigger_held = held;
    }

    pub fn trigger_held(&self) -> bool {
        self.trigger_held
    }

    fn instrument_open(&self) -> bool {
        match self.gate {
            ModulationGate::Always => true,
            ModulationGate::Held => self.trigger_held,
        }
    }

    /// Runs one tick against the given collaborators.
    pub fn tick<S, A, L>(&mut self, source: &mut S, audio: &mut A, light: &mut L) -> TickReport
    where
        S: TelemetrySource + ?Sized,
        A: AudioCollaborator + ?Sized,
        L: LightCollaborator + ?Sized,
    {
        let mut report = TickReport::default();

        match source.read_available() {
            Ok(text) => self.pose_path(&text, audio, light, &mut report),
            Err(e) => {
                warn!("telemetry read failed: {e}");
                report.read_error = Some(e);
            }
        }

        report.bands = self.spectrum_path(audio);
        report
    }

    fn pose_path<A, L>(&mut self, text: &str, audio: &mut A, light: &mut L, report: &mut TickReport)
    where
        A: AudioCollaborator + ?Sized,
        L: LightCollaborator + ?Sized,
    {
        let frame = match decode_latest(text) {
            Ok(Some(frame)) => frame,
            Ok(None) => return,
            Err(e) => {
                warn!("Was unable to parse telemetry record: {}", e);
                report.decode_error = Some(e);
                return;
            }
        };
        debug!("Received {:?}", frame);
        report.frame = Some(frame);

        self.pose.apply(&frame);
        let modulation = self.modulate();
        report.modulation = Some(modulation);

        light.set_color(modulation.hue, 1.0, 1.0);
        if self.instrument_open() {
            audio.set_volume(modulation.volume);
            audio.set_pitch(modulation.pitch);
            report.state = TickState::Dispatched;
        } else {
            report.state = TickState::FrameAvailable;
        }
    }

    /// Projects the current pose and evaluates every curve.
    pub fn modulate(&self) -> Modulation {
        let WandPose {
            orientation,
            origin,
        } = self.pose;

        let aim = self.instrument.project(orientation, origin);
        let lateral = self.spotlight.project(orientation, origin).x;

        Modulation {
            aim,
            volume: self.volume.map(aim.y),
            pitch: self.pitch.map(aim.x),
            hue: self.hue.map(lateral),
        }
    }

    fn spectrum_path<A>(&mut self, audio: &mut A) -> Option<BandSet>
    where
        A: AudioCollaborator + ?Sized,
    {
        let snapshot = audio.spectrum(self.window)?;
        let bands = aggregate(&snapshot);
        self.bands.publish(bands);
        Some(bands)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{RecordingAudio, RecordingLight, ScriptedSource};
    use crate::spectrum::{SpectrumSnapshot, SPECTRUM_LEN};
    use std::f64::consts::FRAC_PI_2;
    use std::io::{Error, ErrorKind};

    /// A record whose orientation, once inverted, tilts the wand's up axis
    /// by `angle` about x.
    fn qc_line(angle: f64) -> String {
        let q = DQuat::from_rotation_x(angle).inverse();
        // z goes out negated on the wire.
        format!("QC {} {} {} {}\n", q.w, q.x, q.y, -q.z)
    }

    fn harness() -> (PipelineDriver, RecordingAudio, RecordingLight) {
        (
            PipelineDriver::new(&PipelineConfig::default()),
            RecordingAudio::default(),
            RecordingLight::default(),
        )
    }

    struct Unplugged;

    impl TelemetrySource for Unplugged {
        fn read_available(&mut self) -> std::io::Result<String> {
            Err(Error::new(ErrorKind::BrokenPipe, "device disconnected"))
        }
    }

    #[test]
    fn idle_without_complete_line() {
        let (mut driver, mut audio, mut light) = harness();
        let mut source = ScriptedSource::new(["QC 1.0 0.0 0.0 0.0"]);

        let report = driver.tick(&mut source, &mut audio, &mut light);
        assert_eq!(report.state, TickState::Idle);
        assert_eq!(audio.volume, None);
        assert_eq!(light.hsv, None);
    }

    #[test]
    fn straight_ahead_dispatches_centre() {
        let (mut driver, mut audio, mut light) = harness();
        let mut source = ScriptedSource::new([qc_line(FRAC_PI_2) + "QC"]);

        let report = driver.tick(&mut source, &mut audio, &mut light);
        assert_eq!(report.state, TickState::Dispatched);

        let aim = report.modulation.unwrap().aim;
        assert!(aim.x.abs() < 1e-9);
        assert!((aim.y - 1.0).abs() < 1e-9);

        assert!((audio.pitch.unwrap() - 1.875).abs() < 1e-9);
        let (hue, s, v) = light.hsv.unwrap();
        assert!((hue - 0.425).abs() < 1e-9);
        assert_eq!((s, v), (1.0, 1.0));
    }

    #[test]
    fn identity_frame_falls_back_to_corner() {
        // Pointing straight up never reaches the plane.
        let (mut driver, mut audio, mut light) = harness();
        let mut source = ScriptedSource::new(["QC 1.0 0.0 0.0 0.0\n"]);

        let report = driver.tick(&mut source, &mut audio, &mut light);
        let modulation = report.modulation.unwrap();
        assert_eq!(modulation.aim, ProjectedPoint::new(-5.0, 10.0));
        assert_eq!(audio.volume, Some(1.0));
        assert_eq!(audio.pitch, Some(0.75));
        assert_eq!(light.hsv.map(|c| c.0), Some(0.0));
    }

    #[test]
    fn positioned_frames_move_the_wand() {
        let (mut driver, mut audio, mut light) = harness();
        let q = DQuat::from_rotation_x(FRAC_PI_2).inverse();
        let line = format!("QLM {} {} {} {} 0 0 0 150 -40 0\n", q.w, q.x, q.y, -q.z);
        let mut source = ScriptedSource::new([line]);

        let report = driver.tick(&mut source, &mut audio, &mut light);
        assert_eq!(driver.pose().origin, DVec3::new(1.5, 0.6, 1.0));

        let aim = report.modulation.unwrap().aim;
        assert!((aim.x - 1.5).abs() < 1e-9);
        assert!((aim.y - 0.6).abs() < 1e-9);
    }

    #[test]
    fn orientation_frames_keep_the_origin() {
        let (mut driver, mut audio, mut light) = harness();
        let mut source = ScriptedSource::new(["QHM 1 0 0 0 -200 100\n".to_owned(), qc_line(0.3)]);

        driver.tick(&mut source, &mut audio, &mut light);
        let origin = driver.pose().origin;
        assert_eq!(origin, DVec3::new(2.0, 2.0, 1.0));

        driver.tick(&mut source, &mut audio, &mut light);
        assert_eq!(driver.pose().origin, origin);
    }

    #[test]
    fn decode_failure_keeps_previous_outputs() {
        let (mut driver, mut audio, mut light) = harness();
        let mut source = ScriptedSource::new([qc_line(FRAC_PI_2), "QC 1.0 oops 0 0\n".to_owned()]);

        driver.tick(&mut source, &mut audio, &mut light);
        let before = (audio.volume, audio.pitch, light.hsv);

        let report = driver.tick(&mut source, &mut audio, &mut light);
        assert!(report.decode_error.is_some());
        assert_eq!(report.state, TickState::Idle);
        assert_eq!((audio.volume, audio.pitch, light.hsv), before);
    }

    #[test]
    fn gate_holds_the_instrument_not_the_light() {
        let mut config = PipelineConfig::default();
        config.instrument.gate = ModulationGate::Held;
        let mut driver = PipelineDriver::new(&config);
        let mut audio = RecordingAudio::default();
        let mut light = RecordingLight::default();
        let mut source = ScriptedSource::new([qc_line(FRAC_PI_2), qc_line(FRAC_PI_2)]);

        let report = driver.tick(&mut source, &mut audio, &mut light);
        assert_eq!(report.state, TickState::FrameAvailable);
        assert_eq!(audio.volume, None);
        assert!(light.hsv.is_some());

        driver.set_trigger(true);
        let report = driver.tick(&mut source, &mut audio, &mut light);
        assert_eq!(report.state, TickState::Dispatched);
        assert!(audio.volume.is_some());
    }

    #[test]
    fn spectrum_is_independent_of_pose() {
        let (mut driver, mut audio, mut light) = harness();
        let readers = driver.bands();
        audio.next_spectrum = Some(SpectrumSnapshot::new([2.0; SPECTRUM_LEN]));

        let report = driver.tick(&mut Unplugged, &mut audio, &mut light);
        assert!(report.read_error.is_some());
        assert_eq!(report.state, TickState::Idle);

        let bands = report.bands.unwrap();
        assert_eq!(readers.current(), bands);
        assert!((bands.0[0] - 3.0).abs() < 1e-12);
        assert_eq!(audio.last_window, Some(SpectrumWindow::Blackman));
    }

    #[test]
    fn missing_spectrum_keeps_published_bands() {
        let (mut driver, mut audio, mut light) = harness();
        let readers = driver.bands();
        let mut source = ScriptedSource::default();

        audio.next_spectrum = Some(SpectrumSnapshot::new([1.0; SPECTRUM_LEN]));
        driver.tick(&mut source, &mut audio, &mut light);
        let published = readers.current();

        audio.next_spectrum = None;
        let report = driver.tick(&mut source, &mut audio, &mut light);
        assert_eq!(report.bands, None);
        assert_eq!(readers.current(), published);
    }

    #[test]
    fn zero_quaternion_is_sanitized() {
        let (mut driver, mut audio, mut light) = harness();
        let mut source = ScriptedSource::new(["QC 0 0 0 0\n"]);

        driver.tick(&mut source, &mut audio, &mut light);
        // NaN aims clamp to the bottom of the volume curve, near silence.
        assert!(audio.volume.unwrap() < 0.01);
        assert_eq!(audio.pitch, Some(0.75));
        assert_eq!(light.hsv.map(|c| c.0), Some(0.0));
    }

    #[test]
    fn euler_readout_in_degrees() {
        let mut pose = WandPose::new(DVec3::ZERO);
        pose.orientation = DQuat::from_rotation_x(30f64.to_radians());
        let euler = pose.euler_degrees();
        assert!((euler.x - 30.0).abs() < 1e-9);
        assert!(euler.y.abs() < 1e-9 && euler.z.abs() < 1e-9);
    }
}
