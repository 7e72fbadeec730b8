use std::io::{self, IsTerminal, Write};
use std::time::{Duration, Instant};

use checker_core::{RunViewModel, SessionState};
use checker_engine::{ExportSummary, RunSummary};

const MIN_REDRAW: Duration = Duration::from_millis(100);
const TITLE_WIDTH: usize = 40;

/// Single-line progress display on stderr.
pub struct ProgressRenderer {
    enabled: bool,
    last_draw: Option<Instant>,
    drawn: bool,
}

impl ProgressRenderer {
    pub fn new() -> Self {
        Self {
            enabled: io::stderr().is_terminal(),
            last_draw: None,
            drawn: false,
        }
    }

    pub fn render(&mut self, view: &RunViewModel) {
        if !self.enabled {
            return;
        }
        let now = Instant::now();
        let finished = view.session == SessionState::Finished;
        if !finished && self.last_draw.is_some_and(|at| now - at < MIN_REDRAW) {
            return;
        }
        self.last_draw = Some(now);
        self.drawn = true;
        let mut err = io::stderr().lock();
        let _ = write!(err, "\r\x1b[2K{}", progress_line(view));
        let _ = err.flush();
    }

    /// Move past the progress line so later output starts clean.
    pub fn finish(&mut self) {
        if self.drawn {
            eprintln!();
            self.drawn = false;
        }
    }
}

pub fn progress_line(view: &RunViewModel) -> String {
    let state = match view.session {
        SessionState::Idle => "idle",
        SessionState::Running => "checking",
        SessionState::Finishing => "finishing",
        SessionState::Finished => "done",
    };
    let mut line = format!(
        "[{:5.1}%] {}/{} {} | live {} dead {}",
        view.percent, view.completed, view.total, state, view.live, view.dead
    );
    if let Some(last) = &view.last_item {
        let title: String = last.title.chars().take(TITLE_WIDTH).collect();
        line.push_str(&format!(
            " | {} {}",
            if last.is_live { "+" } else { "-" },
            title
        ));
    }
    line
}

pub fn summary_text(summary: &RunSummary, export: Option<&ExportSummary>) -> String {
    let mut text = format!(
        "Checked {} of {} entries in {:.1}s: {} live, {} dead",
        summary.checked,
        summary.total,
        summary.elapsed.as_secs_f64(),
        summary.live,
        summary.dead
    );
    if summary.unchecked > 0 {
        text.push_str(&format!(", {} not checked", summary.unchecked));
    }
    text.push('\n');
    if let Some(export) = export {
        for group in &export.groups {
            text.push_str(&format!(
                "  {:<24} live {:>5}  dead {:>5}\n",
                group.group, group.live, group.dead
            ));
        }
        if let Some(manifest) = &export.manifest_path {
            text.push_str(&format!("Summary written to {}\n", manifest.display()));
        }
    }
    text
}
