use crate::collaborators::TelemetrySource;
use crate::frame_decoder::Mount;
use crate::projector::ProjectedPoint;
use glam::{DQuat, DVec2, DVec3};
use rand::prelude::*;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

/// Which record kind the dummy wand emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    QC,
    QLM,
    QHM,
}

/// A fake wand that sweeps its aim around the playing plane on a
/// background thread and writes telemetry records, sometimes in two halves,
/// into a buffer that [`TelemetrySource::read_available`] drains.
pub struct DummyWand {
    handle: Option<thread::JoinHandle<()>>,
    tx: mpsc::Sender<Signal>,
    pending: Arc<Mutex<String>>,
}

enum Signal {
    Noise(f64),
    Kind(FrameKind),
    Stop,
}

/// Settings for a [`DummyWand`].
#[derive(Debug, Clone)]
pub struct DummyWandBuilder {
    rate_hz: f64,
    noise: f64,
    kind: FrameKind,
    depth: f64,
    origin: DVec3,
}

impl Default for DummyWandBuilder {
    fn default() -> Self {
        Self {
            rate_hz: 100.0,
            noise: 0.000001,
            kind: FrameKind::QC,
            depth: 5.0,
            origin: DVec3::new(0.0, 1.0, 1.0),
        }
    }
}

impl DummyWandBuilder {
    /// Records per second.
    pub fn rate(self, rate_hz: f64) -> Self {
        Self { rate_hz, ..self }
    }

    /// Uniform jitter on the aim point, in plane units.
    pub fn noise(self, noise: f64) -> Self {
        Self { noise, ..self }
    }

    pub fn kind(self, kind: FrameKind) -> Self {
        Self { kind, ..self }
    }

    /// The plane the wand aims at, and where the wand sits.
    pub fn geometry(self, depth: f64, origin: DVec3) -> Self {
        Self {
            depth,
            origin,
            ..self
        }
    }

    pub fn build(self) -> DummyWand {
        let (tx, rx) = mpsc::channel::<Signal>();
        let pending = Arc::new(Mutex::new(String::new()));
        let th_pending = Arc::clone(&pending);
        let period = Duration::from_secs_f64(1.0 / self.rate_hz.max(1.0));

        let handle = thread::spawn(move || {
            let mut rng = thread_rng();
            let mut running = true;
            let mut noise = self.noise;
            let mut kind = self.kind;
            let mut t = 0.0;
            while running {
                while let Ok(received) = rx.try_recv() {
                    match received {
                        Signal::Noise(new_noise) => noise = new_noise,
                        Signal::Kind(new_kind) => kind = new_kind,
                        Signal::Stop => running = false,
                    }
                }

                let mut aim = sweep(t);
                if noise > 0.0 {
                    aim.x += rng.gen_range(-noise..noise);
                    aim.y += rng.gen_range(-noise..noise);
                }
                let orientation = aim_orientation(self.origin, aim, self.depth);
                let offset = DVec2::new(self.origin.x, self.origin.y);
                let line = wire_record(kind, orientation, offset);

                // Deliver some records in two halves, like a real link does.
                let split = rng.gen_range(0..line.len());
                push(&th_pending, &line[..split]);
                thread::sleep(period / 2);
                push(&th_pending, &line[split..]);
                thread::sleep(period / 2);

                t += period.as_secs_f64();
            }
        });

        DummyWand {
            handle: Some(handle),
            tx,
            pending,
        }
    }
}

fn push(pending: &Mutex<String>, text: &str) {
    pending
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .push_str(text);
}

impl DummyWand {
    pub fn builder() -> DummyWandBuilder {
        DummyWandBuilder::default()
    }

    pub fn set_noise(&self, noise: f64) {
        // A send only fails once the thread is gone, and then there is
        // nothing left to configure.
        let _ = self.tx.send(Signal::Noise(noise));
    }

    pub fn set_kind(&self, kind: FrameKind) {
        let _ = self.tx.send(Signal::Kind(kind));
    }

    pub fn stop(&mut self) {
        let _ = self.tx.send(Signal::Stop);
        // `.join()` moves the handle, so take it out of the struct first.
        if let Some(thread) = self.handle.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for DummyWand {
    fn drop(&mut self) {
        self.stop();
    }
}

impl TelemetrySource for DummyWand {
    fn read_available(&mut self) -> std::io::Result<String> {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        Ok(std::mem::take(&mut *pending))
    }
}

/// A slow Lissajous figure covering most of the instrument's plane.
fn sweep(t: f64) -> ProjectedPoint {
    ProjectedPoint::new(4.0 * (0.7 * t).sin(), 5.5 + 4.0 * (1.1 * t).sin())
}

/// The orientation that tilts the wand's up axis from `origin` towards
/// `aim` on the plane at `depth`.
pub fn aim_orientation(origin: DVec3, aim: ProjectedPoint, depth: f64) -> DQuat {
    let direction = DVec3::new(aim.x, aim.y, depth) - origin;
    DQuat::from_rotation_arc(DVec3::Y, direction.normalize())
}

/// Encodes a wand pose the way the device does: the inverse rotation,
/// scalar first, third vector component negated, offsets in centimetres.
pub fn wire_record(kind: FrameKind, orientation: DQuat, offset: DVec2) -> String {
    let q = orientation.inverse();
    let quat = format!("{} {} {} {}", q.w, q.x, q.y, -q.z);
    match kind {
        FrameKind::QC => format!("QC {quat}\n"),
        FrameKind::QLM => {
            let (x, y) = raw_offset(Mount::LowMount, offset);
            format!("QLM {quat} 0 0 0 {x} {y} 0\n")
        }
        FrameKind::QHM => {
            let (x, y) = raw_offset(Mount::HighMount, offset);
            format!("QHM {quat} {x} {y}\n")
        }
    }
}

fn raw_offset(mount: Mount, offset: DVec2) -> (f64, f64) {
    let lateral = match mount {
        Mount::LowMount => offset.x * 100.0,
        Mount::HighMount => -offset.x * 100.0,
    };
    (lateral, (offset.y - 1.0) * 100.0)
}
