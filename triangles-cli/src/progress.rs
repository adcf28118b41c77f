//! Mining progress spinner

use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Spinner shown on stderr while a nonce search runs; a no-op when disabled
#[derive(Clone, Default)]
pub struct MiningProgress {
    bar: Option<ProgressBar>,
}

impl MiningProgress {
    pub fn new(enabled: bool) -> Self {
        if !enabled {
            return Self::disabled();
        }

        let bar = ProgressBar::new_spinner();
        if let Ok(style) =
            ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
        {
            bar.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
        }
        Self { bar: Some(bar) }
    }

    pub fn disabled() -> Self {
        Self { bar: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.bar.is_some()
    }

    /// Start ticking for a search at `difficulty` bits
    pub fn start(&self, difficulty: u8) {
        if let Some(bar) = &self.bar {
            bar.set_message(format!("Mining {} bits of proof of work...", difficulty));
            bar.enable_steady_tick(Duration::from_millis(100));
        }
    }

    /// Callback handed to the miner; updates the attempt counter
    pub fn callback(&self) -> impl FnMut(u64) + Send + 'static {
        let bar = self.bar.clone();
        move |attempts| {
            if let Some(bar) = &bar {
                bar.set_message(format!("Mining... {} attempts", attempts));
            }
        }
    }

    pub fn finish(&self, message: String) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message);
        }
    }

    pub fn abandon(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_progress_is_inert() {
        let progress = MiningProgress::disabled();
        assert!(!progress.is_enabled());

        progress.start(8);
        let mut callback = progress.callback();
        callback(1 << 14);
        progress.finish("done".to_string());
    }

    #[test]
    fn test_hidden_bar_accepts_updates() {
        let progress = MiningProgress {
            bar: Some(ProgressBar::hidden()),
        };
        progress.start(4);
        let mut callback = progress.callback();
        callback(42);
        progress.abandon();
        assert!(progress.is_enabled());
    }
}
