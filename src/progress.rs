//! Progress bar for dispatch, drawn on stderr.

use fanout::{Invocation, Outcome, ProgressCallback};
use indicatif::{ProgressBar, ProgressStyle};

/// Dispatch progress shown as an indicatif bar.
pub struct DispatchBar {
    bar: ProgressBar,
}

impl DispatchBar {
    /// A visible bar, or a hidden one when `quiet`.
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} Running [{bar:30.cyan/blue}] {pos}/{len} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("=> ");
        bar.set_style(style);
        Self { bar }
    }
}

impl ProgressCallback for DispatchBar {
    fn on_dispatch_start(&self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_invocation_complete(&self, invocation: &Invocation, outcome: &Outcome) {
        let symbol = if outcome.is_opaque() { "○" } else { "✓" };
        self.bar.set_message(format!(
            "{symbol} {}/{}",
            invocation.profile, invocation.region
        ));
        self.bar.inc(1);
    }

    fn on_dispatch_complete(&self) {
        self.bar.finish_and_clear();
    }
}
