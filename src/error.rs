//! The error type shared by the pipeline, its configuration, and the binaries.

use std::{borrow::Cow, fmt};

/// Everything that can go wrong between opening the serial link and
/// running ticks. Malformed telemetry is not here: it is recovered inside a
/// tick and reported as a [`crate::frame_decoder::DecodeError`].
#[derive(Debug)]
pub enum PipelineError {
    /// The serial device could not be opened or configured. Fatal at start-up.
    PortUnavailable {
        /// The port identifier we tried to open.
        port: String,
        /// Whatever the operating system told us.
        source: std::io::Error,
    },

    /// Returned when io fails while reading the link or configuration files.
    Io(std::io::Error),

    /// Returned when a configuration file cannot be deserialized.
    Config(ron::de::SpannedError),

    /// Returned when a configuration cannot be serialized.
    ConfigWrite(ron::Error),
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use PipelineError as PE;
        let msg = match self {
            PE::PortUnavailable { port, source } => {
                Cow::from(format!("could not open serial port {port}: {source}"))
            }
            PE::Io(error) => Cow::from(format!("io error: {}", error)),
            PE::Config(error) => Cow::from(format!("config error: {}", error)),
            PE::ConfigWrite(error) => Cow::from(format!("config write error: {}", error)),
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::PortUnavailable { source, .. } => Some(source),
            PipelineError::Io(error) => Some(error),
            PipelineError::Config(error) => Some(error),
            PipelineError::ConfigWrite(error) => Some(error),
        }
    }
}

impl From<std::io::Error> for PipelineError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}
