use std::collections::VecDeque;

use glam::DVec3;
use ratatui::{
    prelude::*,
    widgets::{block::Title, *},
};

use crate::config::{InstrumentConfig, ModulationGate};
use crate::driver::{Modulation, TickReport};
use crate::light::hsv_to_rgb;
use crate::spectrum::{BandScaler, BandSet, BAND_COUNT};

const TRAIL_LEN: usize = 64;
const BAND_LABELS: [&str; BAND_COUNT] = ["b0", "b1", "b2", "b3", "b4", "b5", "b6", "b7"];

/// Everything the dashboard shows, folded together from tick reports.
#[derive(Debug, Clone)]
pub struct DashboardState {
    pub instrument: InstrumentConfig,
    pub scaler: BandScaler,
    pub modulation: Option<Modulation>,
    pub trail: VecDeque<(f64, f64)>,
    pub bands: BandSet,
    pub euler: DVec3,
    pub trigger_held: bool,
    pub frames: u64,
    pub decode_errors: u64,
}

impl DashboardState {
    pub fn new(instrument: InstrumentConfig, scaler: BandScaler) -> Self {
        Self {
            instrument,
            scaler,
            modulation: None,
            trail: VecDeque::with_capacity(TRAIL_LEN),
            bands: BandSet::default(),
            euler: DVec3::ZERO,
            trigger_held: false,
            frames: 0,
            decode_errors: 0,
        }
    }

    /// Folds one tick into the state. Values a tick didn't produce are kept.
    pub fn record(&mut self, report: &TickReport, euler: DVec3, trigger_held: bool) {
        if let Some(modulation) = report.modulation {
            self.frames += 1;
            self.modulation = Some(modulation);
            if self.trail.len() == TRAIL_LEN {
                self.trail.pop_front();
            }
            self.trail.push_back((modulation.aim.x, modulation.aim.y));
        }
        if report.decode_error.is_some() {
            self.decode_errors += 1;
        }
        if let Some(bands) = report.bands {
            self.bands = bands;
        }
        self.euler = euler;
        self.trigger_held = trigger_held;
    }

    fn instrument_live(&self) -> bool {
        match self.instrument.gate {
            ModulationGate::Always => true,
            ModulationGate::Held => self.trigger_held,
        }
    }
}

pub fn render_dashboard(frame: &mut Frame, state: &DashboardState) {
    let columns = Layout::horizontal([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(frame.size());
    let right = Layout::vertical([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Min(8),
        Constraint::Length(4),
    ])
    .split(columns[1]);

    let trail: Vec<(f64, f64)> = state.trail.iter().copied().collect();
    frame.render_widget(aim_chart(&state.instrument, &trail), columns[0]);

    let (volume, pitch, hue) = state
        .modulation
        .map(|m| (m.volume, m.pitch, m.hue))
        .unwrap_or((0.0, state.instrument.pitch_min, 0.0));
    let pitch_span = state.instrument.pitch_max - state.instrument.pitch_min;
    let pitch_ratio = if pitch_span > 0.0 {
        (pitch - state.instrument.pitch_min) / pitch_span
    } else {
        0.0
    };
    let rgb = hsv_to_rgb(hue, 1.0, 1.0);

    frame.render_widget(
        gauge(" Volume ", volume, format!("{volume:.3}"), Color::Green),
        right[0],
    );
    frame.render_widget(
        gauge(" Pitch ", pitch_ratio, format!("{pitch:.3}x"), Color::Cyan),
        right[1],
    );
    frame.render_widget(
        gauge(" Hue ", 1.0, format!("{hue:.3}"), Color::Rgb(rgb.r, rgb.g, rgb.b)),
        right[2],
    );
    frame.render_widget(band_chart(state), right[3]);
    frame.render_widget(status(state), right[4]);
}

fn gauge<'a>(title: &'a str, ratio: f64, label: String, color: Color) -> Gauge<'a> {
    let ratio = if ratio.is_finite() {
        ratio.clamp(0.0, 1.0)
    } else {
        0.0
    };
    Gauge::default()
        .block(Block::default().title(title).borders(Borders::ALL))
        .gauge_style(Style::default().fg(color))
        .ratio(ratio)
        .label(label)
}

fn aim_chart<'a>(instrument: &InstrumentConfig, trail: &'a [(f64, f64)]) -> Chart<'a> {
    let bounds_x = [instrument.left, instrument.right];
    let bounds_y = [instrument.down, instrument.up];
    let labels = |[lo, hi]: [f64; 2]| -> Vec<Span<'static>> {
        [lo, (lo + hi) / 2.0, hi]
            .iter()
            .map(|v| Span::from(format!("{v:.1}")))
            .collect()
    };

    let title = Title::from(" Aim ".magenta().bold());
    Chart::new(vec![Dataset::default()
        .name("aim")
        .marker(symbols::Marker::Dot)
        .graph_type(GraphType::Scatter)
        .style(Style::default().fg(Color::Magenta))
        .data(trail)])
    .block(
        Block::default()
            .title(title.alignment(Alignment::Center))
            .borders(Borders::ALL),
    )
    .x_axis(
        Axis::default()
            .title(Span::styled("lateral", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds(bounds_x)
            .labels(labels(bounds_x)),
    )
    .y_axis(
        Axis::default()
            .title(Span::styled("vertical", Style::default().fg(Color::Red)))
            .style(Style::default().fg(Color::White))
            .bounds(bounds_y)
            .labels(labels(bounds_y)),
    )
}

fn band_chart(state: &DashboardState) -> BarChart<'_> {
    let peak = state.bands.0.iter().cloned().fold(0.0, f64::max);
    let data: [(&str, u64); BAND_COUNT] = std::array::from_fn(|i| {
        let value = state.bands.0[i];
        let height = if peak > 0.0 { value / peak * 100.0 } else { 0.0 };
        (BAND_LABELS[i], height.round() as u64)
    });

    BarChart::default()
        .block(Block::default().title(" Bands ").borders(Borders::ALL))
        .bar_width(3)
        .bar_gap(1)
        .bar_style(Style::default().fg(Color::Yellow))
        .value_style(Style::default().fg(Color::Black).bg(Color::Yellow))
        .data(&data)
        .max(100)
}

fn status(state: &DashboardState) -> Paragraph<'_> {
    let gate = if state.instrument_live() {
        "playing".green().bold()
    } else {
        "held".red().bold()
    };
    let scale = state.scaler.scale(&state.bands);
    let lines = vec![
        Line::from(vec![
            " instrument ".into(),
            gate,
            format!("  scale {scale:.2}").into(),
        ]),
        Line::from(format!(
            " euler {:.1}, {:.1}, {:.1}  frames {}  bad {}",
            state.euler.x, state.euler.y, state.euler.z, state.frames, state.decode_errors
        )),
    ];
    let instructions = Title::from(Line::from(vec![
        " Trigger ".into(),
        "<Space>".magenta().bold(),
        " Frame ".into(),
        "<K>".magenta().bold(),
        " Noise ".into(),
        "<+/->".magenta().bold(),
        " Quit ".into(),
        "<Q> ".magenta().bold(),
    ]));

    Paragraph::new(lines).block(
        Block::default()
            .title(
                instructions
                    .alignment(Alignment::Center)
                    .position(block::Position::Bottom),
            )
            .borders(Borders::ALL),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::TickState;
    use crate::projector::ProjectedPoint;
    use ratatui::backend::TestBackend;

    fn state() -> DashboardState {
        DashboardState::new(InstrumentConfig::default(), BandScaler::new(1, 10.0, 1.0))
    }

    fn report(aim: ProjectedPoint) -> TickReport {
        TickReport {
            state: TickState::Dispatched,
            modulation: Some(Modulation {
                aim,
                volume: 0.5,
                pitch: 1.5,
                hue: 0.3,
            }),
            bands: Some(BandSet([0.1; BAND_COUNT])),
            ..Default::default()
        }
    }

    fn screen_text(state: &DashboardState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| render_dashboard(f, state)).unwrap();
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn record_keeps_a_bounded_trail() {
        let mut state = state();
        for i in 0..(TRAIL_LEN + 10) {
            state.record(&report(ProjectedPoint::new(i as f64, 0.0)), DVec3::ZERO, false);
        }
        assert_eq!(state.trail.len(), TRAIL_LEN);
        assert_eq!(state.trail.front(), Some(&(10.0, 0.0)));
        assert_eq!(state.trail.back(), Some(&((TRAIL_LEN + 9) as f64, 0.0)));
        assert_eq!(state.frames, (TRAIL_LEN + 10) as u64);
    }

    #[test]
    fn empty_ticks_keep_previous_values() {
        let mut state = state();
        state.record(&report(ProjectedPoint::new(1.0, 2.0)), DVec3::ZERO, false);
        state.record(&TickReport::default(), DVec3::ZERO, false);

        assert_eq!(state.modulation.map(|m| m.volume), Some(0.5));
        assert_eq!(state.bands, BandSet([0.1; BAND_COUNT]));
    }

    #[test]
    fn renders_every_panel() {
        let mut state = state();
        state.record(&report(ProjectedPoint::new(1.0, 5.0)), DVec3::ZERO, false);
        let text = screen_text(&state);

        for needle in ["Aim", "Volume", "Pitch", "Hue", "Bands", "playing"] {
            assert!(text.contains(needle), "missing {needle}");
        }
    }

    #[test]
    fn renders_before_any_frame() {
        let text = screen_text(&state());
        assert!(text.contains("Volume"));
    }
}
