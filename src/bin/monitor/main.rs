mod gui;

use std::process::ExitCode;

use clap::Parser;
use glam::DVec3;

use gui::engage_gui;
use vrwand::{
    args::MonitorArgs,
    dummy_audio::DummyAudio,
    dummy_wand::DummyWand,
    gui::MonitorError,
    PipelineConfig,
};

fn main() -> ExitCode {
    let args = MonitorArgs::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("monitor: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &MonitorArgs) -> Result<(), MonitorError> {
    let config = match &args.config {
        Some(path) => PipelineConfig::from_path(path)?,
        None => PipelineConfig::default(),
    };

    let [x, y, z] = config.initial_origin;
    let mut wand = DummyWand::builder()
        .rate(config.tick_rate_hz)
        .noise(args.noise)
        .geometry(config.plane_depth, DVec3::new(x, y, z))
        .build();

    let res = engage_gui(&config, &mut wand, DummyAudio::default(), args.noise);
    wand.stop();
    res
}
