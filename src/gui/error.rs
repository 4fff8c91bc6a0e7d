use std::{borrow::Cow, error::Error, fmt::Display};

use crate::error::PipelineError;

#[derive(Debug)]
pub enum MonitorError {
    IOError(std::io::Error),
    Pipeline(PipelineError),
}

impl Display for MonitorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            MonitorError::IOError(error) => Cow::from(format!("terminal error: {}", error)),
            MonitorError::Pipeline(error) => Cow::from(error.to_string()),
        };

        write!(f, "{}", msg)
    }
}

impl Error for MonitorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MonitorError::IOError(error) => Some(error),
            MonitorError::Pipeline(error) => Some(error),
        }
    }
}

impl From<std::io::Error> for MonitorError {
    fn from(value: std::io::Error) -> Self {
        Self::IOError(value)
    }
}

impl From<PipelineError> for MonitorError {
    fn from(value: PipelineError) -> Self {
        Self::Pipeline(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::ErrorKind;

    #[test]
    fn pipeline_errors_read_as_themselves() {
        let inner = PipelineError::Io(std::io::Error::new(ErrorKind::NotFound, "no wand.ron"));
        let expected = inner.to_string();
        let err = MonitorError::from(inner);

        assert_eq!(err.to_string(), expected);
        assert!(!err.to_string().contains("Pipeline("));
    }

    #[test]
    fn terminal_errors_are_labelled() {
        let err = MonitorError::from(std::io::Error::new(ErrorKind::Other, "no tty"));
        assert_eq!(err.to_string(), "terminal error: no tty");
    }
}
