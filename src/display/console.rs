use std::io::Write;

use crate::{payload::Channel, pipeline::Presenter, state::SensorSnapshot};

/// Bar cell glyphs from empty to full; each cell holds five steps.
const BAR_LEVELS: [char; 6] = [' ', '▏', '▎', '▌', '▊', '█'];
const BAR_STEPS: usize = BAR_LEVELS.len() - 1;
pub const DEFAULT_BAR_WIDTH: usize = 8;

/// One-line text readout: indicator, one bar per configured channel, and the
/// strongest sensor marked with `*`. Identical consecutive lines are printed once.
pub struct ConsolePresenter<W: Write + Send> {
    out: W,
    channels: Vec<Channel>,
    bar_width: usize,
    last_line: Option<String>,
}

impl<W: Write + Send> ConsolePresenter<W> {
    pub fn new(out: W, channels: Vec<Channel>) -> Self {
        Self {
            out,
            channels,
            bar_width: DEFAULT_BAR_WIDTH,
            last_line: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> Presenter for ConsolePresenter<W> {
    fn present(&mut self, snapshot: &SensorSnapshot) {
        let line = render_line(snapshot, &self.channels, self.bar_width);
        if self.last_line.as_deref() == Some(line.as_str()) {
            return;
        }
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
        self.last_line = Some(line);
    }
}

pub fn render_line(snapshot: &SensorSnapshot, channels: &[Channel], bar_width: usize) -> String {
    let indicator = if snapshot.connectivity.is_lit() { '●' } else { '○' };
    let dominant = snapshot.reading.dominant_among(channels);
    let mut line = format!("{indicator} {:<4}", snapshot.connectivity.as_str());
    for channel in channels {
        let value = snapshot.reading.get(*channel);
        let marker = if dominant == Some(*channel) { '*' } else { ' ' };
        line.push_str(&format!(
            " |{marker}{:<7} {} {:>3}%",
            channel.as_str(),
            render_bar(value, bar_width),
            percent(value)
        ));
    }
    line
}

pub fn render_bar(value: f64, width: usize) -> String {
    let total_units = width * BAR_STEPS;
    let filled_units = (value.clamp(0.0, 1.0) * total_units as f64).round() as usize;
    (0..width)
        .map(|col| {
            let remaining = filled_units.saturating_sub(col * BAR_STEPS);
            BAR_LEVELS[remaining.min(BAR_STEPS)]
        })
        .collect()
}

fn percent(value: f64) -> u8 {
    (value.clamp(0.0, 1.0) * 100.0).round() as u8
}
