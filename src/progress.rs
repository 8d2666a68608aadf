use std::sync::Arc;
use indicatif::{ProgressBar, ProgressStyle};
use crate::worker::ProgressCallback;

const PROGRESS_TEMPLATE: &str = "[{bar:30}] {percent:>3}% ({pos}/{len}) {elapsed}";

/// Полоса прогресса в терминале, управляется колбэком пула
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn new(total: usize, hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total as u64)
        };

        let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█░");
        bar.set_style(style);

        Self { bar }
    }

    pub fn callback(&self) -> ProgressCallback {
        let bar = self.bar.clone();
        Arc::new(move |completed, total| {
            bar.set_length(total as u64);
            bar.set_position(completed as u64);
        })
    }

    pub fn finish(&self) {
        self.bar.finish();
    }

    #[cfg(test)]
    pub fn position(&self) -> u64 {
        self.bar.position()
    }
}
