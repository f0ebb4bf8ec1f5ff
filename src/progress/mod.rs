// Package progress provides the per-pass progress facade.
//
// Bars draw on stdout; logs stay on stderr. The library default is hidden so
// embedding callers decide whether anything is drawn.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress reporting policy for a run.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    enabled: bool,
}

impl Progress {
    /// Draws spinners on stdout.
    pub fn stdout() -> Self {
        Self { enabled: true }
    }

    /// Draws nothing; the library default.
    pub fn hidden() -> Self {
        Self { enabled: false }
    }

    /// A shard-counting spinner for one pass.
    pub fn pass(&self, label: &str) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new_spinner();
        bar.set_draw_target(ProgressDrawTarget::stdout());
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}: {pos} shards")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(label.to_string());
        bar
    }
}

impl Default for Progress {
    fn default() -> Self {
        Self::hidden()
    }
}
