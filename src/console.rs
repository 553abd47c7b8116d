//! Progress bar on stderr.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use tracing::debug;

use treesum_scan::{ChecksumError, ChecksumListener};

/// Renders hashing progress of one source as a percentage bar.
pub struct ConsoleListener {
    bar: ProgressBar,
}

impl ConsoleListener {
    /// Create a bar labelled with the source being hashed.
    pub fn new(label: impl Into<String>) -> Self {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::stderr());
        bar.set_style(Self::style());
        bar.set_message(label.into());
        Self { bar }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos:>3}% {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl ChecksumListener for ConsoleListener {
    fn on_start(&self) {
        self.bar.set_position(0);
        self.bar.tick();
    }

    fn on_progress(&self, percent: u8) {
        self.bar.set_position(u64::from(percent));
    }

    fn on_done(&self) {
        self.bar.finish_and_clear();
    }

    fn on_error(&self, error: &ChecksumError) {
        self.bar.abandon_with_message(format!("failed: {error}"));
    }

    fn on_debug(&self, message: &str) {
        debug!("{message}");
    }
}

impl Drop for ConsoleListener {
    fn drop(&mut self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }
}
