//! Output formatting utilities
//!
//! The shell writes its responses through a [`Formatter`] bound to stdout or
//! the `-o` file. Progress indication goes to stderr and only appears in
//! attended sessions.

mod formatter;
mod progress;

pub use formatter::{Capture, Formatter};
pub use progress::ProgressBar;

/// Output configuration derived from CLI flags
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputConfig {
    /// Show progress indicators on stderr
    pub progress: bool,
}

impl OutputConfig {
    /// Progress is shown only to a person at a terminal reading no script
    pub fn detect(no_progress: bool, scripted: bool) -> Self {
        Self {
            progress: !no_progress && !scripted && console::user_attended_stderr(),
        }
    }
}
