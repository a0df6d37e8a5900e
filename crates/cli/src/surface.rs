//! Line-oriented terminal surface.

use std::io::Write;

use ticktrack_core::RunningView;
use ticktrack_timer::DisplaySurface;
use tracing::warn;

/// Prints every render as one line.
pub struct TerminalSurface<W: Write + Send> {
    out: W,
}

impl TerminalSurface<std::io::Stdout> {
    /// Surface writing to stdout.
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> TerminalSurface<W> {
    /// Surface writing to `out`.
    pub fn new(out: W) -> Self {
        Self { out }
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{}", text).and_then(|_| self.out.flush()) {
            warn!(error = %e, "terminal write failed");
        }
    }
}

impl<W: Write + Send> DisplaySurface for TerminalSurface<W> {
    fn show_running(&mut self, view: &RunningView) {
        let line = match (&view.project, &view.description) {
            (Some(project), Some(description)) => {
                format!("▶ {}  {} | {}", view.duration, project, description)
            }
            _ => format!("▶ {}", view.duration),
        };
        self.line(&line);
    }

    fn show_stopped(&mut self) {
        self.line("■ stopped");
    }

    fn update_duration(&mut self, text: &str) {
        self.line(&format!("  {}", text));
    }

    fn set_hidden(&mut self, hidden: bool) {
        if hidden {
            self.line("(hidden)");
        }
    }
}
