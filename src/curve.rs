//! Bounded scalar-to-scalar mapping curves.
//!
//! Every continuous output of the pipeline (volume, pitch, hue) is a
//! [`MappingCurve`] evaluated on one coordinate of the projected point.

use serde::{Deserialize, Serialize};

use crate::config::{InstrumentConfig, LightConfig};

/// How the curve walks from `range_min` to `range_max`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub enum CurveShape {
    /// Plain linear interpolation.
    Linear,
    /// Exponential rise towards the top of the domain, scaled by `gain`.
    /// The result saturates at the range bounds.
    Exponential { gain: f64 },
}

/// Which domain bound a NaN input is clamped to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum NanClamp {
    Low,
    High,
}

/// A pure function from `[domain_min, domain_max]` to `[range_min, range_max]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct MappingCurve {
    pub domain_min: f64,
    pub domain_max: f64,
    pub range_min: f64,
    pub range_max: f64,
    pub shape: CurveShape,
    pub nan: NanClamp,
}

impl MappingCurve {
    pub fn linear(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self {
            domain_min: domain.0,
            domain_max: domain.1,
            range_min: range.0,
            range_max: range.1,
            shape: CurveShape::Linear,
            nan: NanClamp::Low,
        }
    }

    pub fn exponential(domain: (f64, f64), range: (f64, f64), gain: f64) -> Self {
        Self {
            shape: CurveShape::Exponential { gain },
            ..Self::linear(domain, range)
        }
    }

    pub fn with_nan_clamp(self, nan: NanClamp) -> Self {
        Self { nan, ..self }
    }

    /// Clamps `input` into the domain, sending NaN to the configured side.
    pub fn sanitize(&self, input: f64) -> f64 {
        if input.is_nan() {
            return match self.nan {
                NanClamp::Low => self.domain_min,
                NanClamp::High => self.domain_max,
            };
        }
        if input < self.domain_min {
            self.domain_min
        } else if input > self.domain_max {
            self.domain_max
        } else {
            input
        }
    }

    /// Evaluates the curve. A degenerate domain always yields `range_min`.
    pub fn map(&self, input: f64) -> f64 {
        let span = self.domain_max - self.domain_min;
        if span == 0.0 {
            return self.range_min;
        }

        let t = self.sanitize(input);
        let range = self.range_max - self.range_min;

        match self.shape {
            CurveShape::Linear => self.range_min + range * (t - self.domain_min) / span,
            CurveShape::Exponential { gain } => {
                let rise = (gain * (t - self.domain_min).exp() - 1.0) / (span.exp() - 1.0);
                let lo = self.range_min.min(self.range_max);
                let hi = self.range_min.max(self.range_max);
                (self.range_min + range * rise).clamp(lo, hi)
            }
        }
    }
}

/// Free-function form of [`MappingCurve::map`].
pub fn map(curve: &MappingCurve, input: f64) -> f64 {
    curve.map(input)
}

/// Vertical position to volume in `[0, 1]`.
pub fn volume_curve(instrument: &InstrumentConfig) -> MappingCurve {
    MappingCurve::exponential(
        (instrument.down, instrument.up),
        (0.0, 1.0),
        instrument.volume_gain,
    )
}

/// Lateral position to pitch multiplier.
pub fn pitch_curve(instrument: &InstrumentConfig) -> MappingCurve {
    MappingCurve::linear(
        (instrument.left, instrument.right),
        (instrument.pitch_min, instrument.pitch_max),
    )
}

/// Lateral position to light hue.
pub fn hue_curve(light: &LightConfig) -> MappingCurve {
    MappingCurve::linear((light.left, light.right), (light.hue_min, light.hue_max))
}
