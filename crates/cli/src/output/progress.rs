//! Progress indication for bulk operations
//!
//! The indicator lives on stderr so it never mixes with shell responses.

use super::OutputConfig;

/// Counter shown while a bulk operation runs
///
/// Hidden unless the configuration enables progress.
#[derive(Debug)]
pub struct ProgressBar {
    bar: Option<indicatif::ProgressBar>,
}

impl ProgressBar {
    /// Create a counter that is redrawn only when [`Self::set_position`] is called
    pub fn counter(config: OutputConfig, message: &str) -> Self {
        let bar = config.progress.then(|| {
            let bar = indicatif::ProgressBar::new_spinner();
            let style = indicatif::ProgressStyle::with_template("{spinner:.green} {msg} {pos}")
                .unwrap_or_else(|_| indicatif::ProgressStyle::default_spinner());
            bar.set_style(style);
            bar.set_message(message.to_string());
            bar
        });

        Self { bar }
    }

    pub fn set_position(&self, pos: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(pos);
        }
    }

    /// Finish and clear the indicator
    pub fn finish_and_clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.bar.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_without_progress() {
        let bar = ProgressBar::counter(OutputConfig { progress: false }, "Deleting");
        assert!(!bar.is_visible());
        bar.set_position(10);
        bar.finish_and_clear();
    }

    #[test]
    fn test_visible_with_progress() {
        let bar = ProgressBar::counter(OutputConfig { progress: true }, "Deleting");
        assert!(bar.is_visible());
        bar.finish_and_clear();
    }
}
