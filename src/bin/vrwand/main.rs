//! Drives the instrument and light from a wand on a serial port.
//!
//! ```text
//! cargo run --bin vrwand -- run --port /dev/tty.usbmodem2822491 --timeout-ms 100
//! cargo run --bin vrwand -- ports
//! cargo run --bin vrwand -- dump-config --out wand.ron
//! ```

use std::{
    process::ExitCode,
    time::{Duration, Instant},
};

use clap::Parser;
use log::{error, info, warn};
use vrwand::{
    args::{Command, DumpConfigCommand, RunCommand, WandArgs},
    collaborators::{LoggingAudio, LoggingLight},
    serial::SerialTelemetry,
    PipelineConfig, PipelineDriver, PipelineError, TickState,
};

/// How often the run loop reports what it has been doing.
const STATUS_PERIOD: Duration = Duration::from_secs(5);

fn main() -> ExitCode {
    env_logger::init();
    let args = WandArgs::parse();

    let res = match args.command {
        Command::Run(run) => run_pipeline(&run),
        Command::Ports => list_ports(),
        Command::DumpConfig(dump) => dump_config(&dump),
    };

    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn run_pipeline(run: &RunCommand) -> Result<(), PipelineError> {
    let config = run.resolve()?;
    let mut source = SerialTelemetry::open(&config.serial)?;
    let mut driver = PipelineDriver::new(&config);
    let mut audio = LoggingAudio;
    let mut light = LoggingLight;

    let period = config.tick_period();
    let mut last_status = Instant::now();
    let (mut dispatched, mut bad_frames) = (0u64, 0u64);

    loop {
        let started = Instant::now();
        let report = driver.tick(&mut source, &mut audio, &mut light);

        if let Some(e) = report.read_error {
            return Err(PipelineError::Io(e));
        }
        if report.decode_error.is_some() {
            bad_frames += 1;
        }
        if report.state == TickState::Dispatched {
            dispatched += 1;
        }

        if last_status.elapsed() >= STATUS_PERIOD {
            let euler = driver.pose().euler_degrees();
            info!(
                "{dispatched} frames dispatched, {bad_frames} rejected; euler ({:.1}, {:.1}, {:.1})",
                euler.x, euler.y, euler.z
            );
            if dispatched == 0 {
                warn!("No frames from {} yet", config.serial.port);
            }
            last_status = Instant::now();
        }

        if let Some(remaining) = period.checked_sub(started.elapsed()) {
            spin_sleep::sleep(remaining);
        }
    }
}

fn list_ports() -> Result<(), PipelineError> {
    let ports = SerialTelemetry::available_ports()?;
    println!("Available devices:");
    for port in ports {
        println!("\t{}", port.to_string_lossy());
    }
    Ok(())
}

fn dump_config(dump: &DumpConfigCommand) -> Result<(), PipelineError> {
    let config = PipelineConfig::default();
    match &dump.outfile {
        Some(path) => {
            config.to_path(path)?;
            info!("Wrote default configuration to {}", path.display());
        }
        None => println!("{}", config.to_ron()?),
    }
    Ok(())
}
