//! Decodes the wand's line-oriented ASCII telemetry into [`PoseFrame`]s.
//!
//! The device streams newline-terminated records of space-separated tokens:
//!
//! ```text
//! QC  q1 q2 q3 q4
//! QLM q1 q2 q3 q4 f5 f6 f7 x y z
//! QHM q1 q2 q3 q4 x y
//! ```
//!
//! `q1` is the scalar part of the orientation quaternion and `q2..q4` its
//! vector part, with the third vector component reported with the opposite
//! sign to ours. Records we don't recognize are ignored.

use std::{borrow::Cow, fmt};

use glam::{DQuat, DVec2};
use nom::{combinator::all_consuming, number::complete::double, Finish, IResult};

const QC: &str = "QC";
const QLM: &str = "QLM";
const QHM: &str = "QHM";

/// Token count (tag included) each record kind must carry.
const QC_TOKENS: usize = 5;
const QLM_TOKENS: usize = 10;
const QHM_TOKENS: usize = 7;

/// Token positions of the raw offset for each mount.
const QLM_OFFSET: (usize, usize) = (8, 9);
const QHM_OFFSET: (usize, usize) = (5, 6);

/// Centimetres on the wire, plane units in the scene.
const OFFSET_SCALE: f64 = 0.01;

/// The two position conventions the device can report. They carry the same
/// raw fields but disagree about sign and origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mount {
    /// Tracker mounted low; lateral axis matches ours.
    LowMount,
    /// Tracker mounted high; lateral axis is mirrored.
    HighMount,
}

impl Mount {
    /// Converts a raw `(lateral, vertical)` pair to plane units.
    pub fn apply(self, lateral: f64, vertical: f64) -> DVec2 {
        let lateral = match self {
            Mount::LowMount => OFFSET_SCALE * lateral,
            Mount::HighMount => -OFFSET_SCALE * lateral,
        };
        DVec2::new(lateral, 1.0 + OFFSET_SCALE * vertical)
    }
}

/// One fully decoded telemetry record.
///
/// The orientation is exactly what the device sent (after the axis fix-up);
/// it is not normalized here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PoseFrame {
    /// A `QC` record.
    Orientation(DQuat),
    /// A `QLM` or `QHM` record.
    OrientationWithPosition2D {
        /// Raw orientation quaternion.
        orientation: DQuat,
        /// Offset in plane units, already transformed for `mount`.
        offset: DVec2,
        /// Which convention produced `offset`.
        mount: Mount,
    },
}

impl PoseFrame {
    /// The orientation carried by either kind of frame.
    pub fn orientation(&self) -> DQuat {
        match *self {
            PoseFrame::Orientation(q) => q,
            PoseFrame::OrientationWithPosition2D { orientation, .. } => orientation,
        }
    }

    /// The position offset, if this frame carries one.
    pub fn offset(&self) -> Option<DVec2> {
        match *self {
            PoseFrame::Orientation(_) => None,
            PoseFrame::OrientationWithPosition2D { offset, .. } => Some(offset),
        }
    }
}

/// Why a selected record could not be turned into a [`PoseFrame`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The record has fewer tokens than its tag requires.
    Truncated {
        /// The frame-kind tag.
        tag: String,
        /// Tokens the tag requires, tag included.
        expected: usize,
        /// Tokens actually present.
        found: usize,
    },

    /// A token that should hold a number doesn't.
    MalformedField {
        /// Position of the token in the record, tag at 0.
        index: usize,
        /// The offending text.
        token: String,
    },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            DecodeError::Truncated {
                tag,
                expected,
                found,
            } => Cow::from(format!(
                "{tag} record needs {expected} tokens, got {found}"
            )),
            DecodeError::MalformedField { index, token } => {
                Cow::from(format!("token {index} is not a number: {token:?}"))
            }
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for DecodeError {}

/// Decodes the most recent complete record in `buffer`.
///
/// The final line of the buffer is always discarded, since the device may
/// still be writing it; the line before it is the one decoded. With fewer
/// than two lines there is nothing complete to decode.
pub fn decode_latest(buffer: &str) -> Result<Option<PoseFrame>, DecodeError> {
    let lines: Vec<&str> = buffer.split('\n').collect();
    if lines.len() < 2 {
        return Ok(None);
    }

    parse_line(lines[lines.len() - 2])
}

/// Parses a single record. Unknown tags are not an error, they are `None`.
pub fn parse_line(line: &str) -> Result<Option<PoseFrame>, DecodeError> {
    let line = line.strip_suffix('\r').unwrap_or(line);
    let tokens: Vec<&str> = line.split(' ').collect();

    let frame = match tokens[0] {
        QC => {
            require(&tokens, QC_TOKENS)?;
            PoseFrame::Orientation(parse_orientation(&tokens)?)
        }
        QLM => {
            require(&tokens, QLM_TOKENS)?;
            parse_positioned(&tokens, QLM_OFFSET, Mount::LowMount)?
        }
        QHM => {
            require(&tokens, QHM_TOKENS)?;
            parse_positioned(&tokens, QHM_OFFSET, Mount::HighMount)?
        }
        _ => return Ok(None),
    };

    Ok(Some(frame))
}

fn require(tokens: &[&str], expected: usize) -> Result<(), DecodeError> {
    if tokens.len() < expected {
        return Err(DecodeError::Truncated {
            tag: tokens[0].to_owned(),
            expected,
            found: tokens.len(),
        });
    }
    Ok(())
}

fn parse_number(s: &str) -> IResult<&str, f64> {
    all_consuming(double)(s)
}

fn field(tokens: &[&str], index: usize) -> Result<f64, DecodeError> {
    let token = tokens[index];
    match parse_number(token).finish() {
        Ok((_remaining, value)) => Ok(value),
        Err(_) => Err(DecodeError::MalformedField {
            index,
            token: token.to_owned(),
        }),
    }
}

/// Reads `q1..q4` as `(w, x, y, -z)`.
fn parse_orientation(tokens: &[&str]) -> Result<DQuat, DecodeError> {
    let w = field(tokens, 1)?;
    let x = field(tokens, 2)?;
    let y = field(tokens, 3)?;
    let z = -field(tokens, 4)?;
    Ok(DQuat::from_xyzw(x, y, z, w))
}

fn parse_positioned(
    tokens: &[&str],
    (lateral, vertical): (usize, usize),
    mount: Mount,
) -> Result<PoseFrame, DecodeError> {
    let orientation = parse_orientation(tokens)?;
    let offset = mount.apply(field(tokens, lateral)?, field(tokens, vertical)?);
    Ok(PoseFrame::OrientationWithPosition2D {
        orientation,
        offset,
        mount,
    })
}
