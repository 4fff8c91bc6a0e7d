//! Casts the wand's aim ray onto the playing plane.

use std::fmt::Display;

use glam::{DQuat, DVec3};
use log::debug;

/// The wand's local "up" axis as a pure quaternion.
const UP: DQuat = DQuat::from_xyzw(0.0, 1.0, 0.0, 0.0);

/// A point on the playing plane; `x` is lateral and `y` is vertical.
#[derive(Debug, PartialEq, Clone, Copy, Default)]
pub struct ProjectedPoint {
    pub x: f64,
    pub y: f64,
}

impl ProjectedPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl Display for ProjectedPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.3}, {:.3})", self.x, self.y)
    }
}

/// Intersects aim rays with the plane `z = depth`.
///
/// When the ray can't reach the plane (it points away from it, or runs
/// parallel to it) the projector answers with its `fallback` point instead.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneProjector {
    depth: f64,
    fallback: ProjectedPoint,
}

impl PlaneProjector {
    pub fn new(depth: f64, fallback: ProjectedPoint) -> Self {
        Self { depth, fallback }
    }

    /// World-space aim direction: the vector part of `q * up * q⁻¹`.
    pub fn aim_direction(orientation: DQuat) -> DVec3 {
        let rotated = orientation * UP * orientation.inverse();
        DVec3::new(rotated.x, rotated.y, rotated.z)
    }

    /// Solves `origin + s * direction` against the plane. `None` when `s`
    /// is negative or the direction has no depth component.
    ///
    /// NaN orientations are passed through as NaN points; the curves clamp
    /// them.
    pub fn intersect(&self, orientation: DQuat, origin: DVec3) -> Option<ProjectedPoint> {
        let direction = Self::aim_direction(orientation);
        if direction.z == 0.0 {
            return None;
        }

        let s = (self.depth - origin.z) / direction.z;
        if s < 0.0 {
            return None;
        }

        let hit = origin + s * direction;
        Some(ProjectedPoint::new(hit.x, hit.y))
    }

    /// Like [`PlaneProjector::intersect`], but degenerate geometry yields
    /// the fallback point.
    pub fn project(&self, orientation: DQuat, origin: DVec3) -> ProjectedPoint {
        self.intersect(orientation, origin).unwrap_or_else(|| {
            debug!("aim ray misses the plane at z={}, using {}", self.depth, self.fallback);
            self.fallback
        })
    }
}
