//! VRWand turns a hand-held wand into a musical instrument and a stage light
//! controller.
//!
//! The wand streams its orientation, and sometimes its position, over a
//! serial link as lines of text. Each tick the host reads whatever arrived,
//! decodes the newest complete record, casts a ray from the wand onto a
//! virtual playing plane, and maps where it lands onto volume, pitch, and a
//! light's hue. Independently, the synthesiser's spectrum is folded into a
//! handful of frequency bands that other visuals can read.
//!
//! The pipeline itself lives in [`driver`]. Everything it talks to is behind
//! the traits in [`collaborators`], so it runs the same against a real port
//! ([`serial`]), a simulated wand ([`dummy_wand`]), or a script in a test.

pub mod args;
pub mod collaborators;
pub mod config;
pub mod curve;
pub mod driver;
pub mod dummy_audio;
pub mod dummy_wand;
pub mod error;
pub mod frame_decoder;
pub mod gui;
pub mod light;
pub mod projector;
pub mod serial;
pub mod spectrum;

pub use config::PipelineConfig;
pub use driver::{PipelineDriver, TickReport, TickState};
pub use error::PipelineError;
