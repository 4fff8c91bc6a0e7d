use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    io,
    time::{Duration, Instant},
};

use vrwand::{
    collaborators::RecordingLight,
    dummy_audio::DummyAudio,
    dummy_wand::{DummyWand, FrameKind},
    gui::{render_dashboard, DashboardState, MonitorError},
    spectrum::BandScaler,
    PipelineConfig, PipelineDriver,
};

struct App<'a> {
    driver: PipelineDriver,
    wand: &'a mut DummyWand,
    audio: DummyAudio,
    light: RecordingLight,
    kind: FrameKind,
    noise: f64,
    state: DashboardState,
}

impl<'a> App<'a> {
    fn new(
        config: &PipelineConfig,
        wand: &'a mut DummyWand,
        audio: DummyAudio,
        noise: f64,
    ) -> App<'a> {
        App {
            driver: PipelineDriver::new(config),
            wand,
            audio,
            light: RecordingLight::default(),
            kind: FrameKind::QC,
            noise,
            state: DashboardState::new(
                config.instrument.clone(),
                BandScaler::from(&config.scale),
            ),
        }
    }

    fn on_tick(&mut self) {
        let report = self
            .driver
            .tick(&mut *self.wand, &mut self.audio, &mut self.light);
        self.state.record(
            &report,
            self.driver.pose().euler_degrees(),
            self.driver.trigger_held(),
        );
    }

    fn toggle_trigger(&mut self) {
        let held = self.driver.trigger_held();
        self.driver.set_trigger(!held);
    }

    fn next_kind(&mut self) {
        self.kind = match self.kind {
            FrameKind::QC => FrameKind::QLM,
            FrameKind::QLM => FrameKind::QHM,
            FrameKind::QHM => FrameKind::QC,
        };
        self.wand.set_kind(self.kind);
    }

    fn scale_noise(&mut self, factor: f64) {
        self.noise *= factor;
        self.wand.set_noise(self.noise);
    }
}

pub fn engage_gui(
    config: &PipelineConfig,
    wand: &mut DummyWand,
    audio: DummyAudio,
    noise: f64,
) -> Result<(), MonitorError> {
    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // create app and run it
    let app = App::new(config, wand, audio, noise);
    let res = run_app(&mut terminal, app, config.tick_period());

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    Ok(res?)
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    mut app: App,
    tick_rate: Duration,
) -> io::Result<()> {
    let mut last_tick = Instant::now();
    loop {
        terminal.draw(|f| render_dashboard(f, &app.state))?;

        let timeout = tick_rate
            .checked_sub(last_tick.elapsed())
            .unwrap_or_else(|| Duration::from_secs(0));
        if crossterm::event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') => return Ok(()),
                        KeyCode::Char(' ') => app.toggle_trigger(),
                        KeyCode::Char('k') => app.next_kind(),
                        KeyCode::Char('+') => app.scale_noise(2.0),
                        KeyCode::Char('-') => app.scale_noise(0.5),
                        _ => {}
                    }
                }
            }
        }
        if last_tick.elapsed() >= tick_rate {
            app.on_tick();
            last_tick = Instant::now();
        }
    }
}
