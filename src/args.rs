// Commandline argument parser using clap for VRWand

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::PipelineConfig;
use crate::error::PipelineError;

#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct WandArgs {
    #[command(subcommand)]
    /// Which task to perform
    pub command: Command,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Drive the instrument and light from a wand on a serial port
    #[command(about)]
    Run(RunCommand),

    /// List the serial ports the system knows about
    #[command(about)]
    Ports,

    /// Print the default configuration as RON, or write it to a file
    #[command(about)]
    DumpConfig(DumpConfigCommand),
}

#[derive(Debug, Args, Clone, Default)]
#[command(version, about)]
pub struct RunCommand {
    /// RON configuration file; defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serial port the wand is attached to, overriding the configuration
    #[arg(short, long)]
    pub port: Option<String>,

    /// Baud rate, overriding the configuration
    #[arg(short, long)]
    pub baud: Option<u32>,

    /// Read timeout in milliseconds, overriding the configuration
    #[arg(short, long = "timeout-ms")]
    pub timeout_ms: Option<u64>,
}

impl RunCommand {
    /// Loads the configuration file, if any, and applies the overrides.
    pub fn resolve(&self) -> Result<PipelineConfig, PipelineError> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_path(path)?,
            None => PipelineConfig::default(),
        };
        if let Some(port) = &self.port {
            config.serial.port = port.clone();
        }
        if let Some(baud) = self.baud {
            config.serial.baud_rate = baud;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.serial.read_timeout_ms = timeout_ms;
        }
        Ok(config)
    }
}

#[derive(Debug, Args, Clone)]
#[command(version, about)]
pub struct DumpConfigCommand {
    /// File to write to instead of stdout
    #[arg(short = 'o', long = "out")]
    pub outfile: Option<PathBuf>,
}

/// Arguments for the monitor, which runs the pipeline against a simulated
/// wand and synthesiser.
#[derive(Debug, Parser, Clone)]
#[clap(version, about)]
pub struct MonitorArgs {
    /// RON configuration file; defaults are used when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Jitter on the simulated aim point, in plane units
    #[arg(short, long, default_value_t = 0.05)]
    pub noise: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_run_overrides() {
        let args = WandArgs::parse_from([
            "vrwand",
            "run",
            "--port",
            "COM5",
            "--baud",
            "9600",
            "--timeout-ms",
            "100",
        ]);
        let Command::Run(run) = args.command else {
            panic!("expected run");
        };
        let config = run.resolve().unwrap();

        assert_eq!(config.serial.port, "COM5");
        assert_eq!(config.serial.baud_rate, 9600);
        assert_eq!(config.serial.read_timeout_ms, 100);
        assert_eq!(config.instrument, PipelineConfig::default().instrument);
    }

    #[test]
    fn overrides_win_over_the_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "(serial: (port: \"/dev/ttyACM0\", baud_rate: 57600))").unwrap();

        let run = RunCommand {
            config: Some(file.path().to_owned()),
            baud: Some(115200),
            ..Default::default()
        };
        let config = run.resolve().unwrap();

        assert_eq!(config.serial.port, "/dev/ttyACM0");
        assert_eq!(config.serial.baud_rate, 115200);
    }

    #[test]
    fn parses_other_commands() {
        assert!(matches!(
            WandArgs::parse_from(["vrwand", "ports"]).command,
            Command::Ports
        ));
        let args = WandArgs::parse_from(["vrwand", "dump-config", "-o", "wand.ron"]);
        let Command::DumpConfig(dump) = args.command else {
            panic!("expected dump-config");
        };
        assert_eq!(dump.outfile, Some(PathBuf::from("wand.ron")));
    }

    #[test]
    fn monitor_defaults() {
        let args = MonitorArgs::parse_from(["monitor"]);
        assert!(args.config.is_none());
        assert_eq!(args.noise, 0.05);
    }
}
