//! Command timing

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Durations above this are "long" commands
pub const LONG_COMMAND_MS: u128 = 1000;

/// When the dispatcher reports command runtimes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingMode {
    None,
    #[default]
    Long,
    All,
}

impl TimingMode {
    /// Whether a command that ran for `elapsed` gets a runtime line
    pub fn should_report(self, elapsed: Duration) -> bool {
        match self {
            TimingMode::None => false,
            TimingMode::Long => elapsed.as_millis() > LONG_COMMAND_MS,
            TimingMode::All => true,
        }
    }
}

impl fmt::Display for TimingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimingMode::None => "NONE",
            TimingMode::Long => "LONG",
            TimingMode::All => "ALL",
        })
    }
}

impl FromStr for TimingMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "none" => Ok(TimingMode::None),
            "long" => Ok(TimingMode::Long),
            "all" => Ok(TimingMode::All),
            _ => Err(Error::InvalidArgument(format!(
                "invalid time mode '{s}'; use none, long, or all"
            ))),
        }
    }
}

/// Render a duration as `[H h][M m]S.mmm s`.
///
/// Hours and minutes appear only when a larger unit is non-zero; fields
/// after the leading one are zero padded.
pub fn format_runtime(elapsed: Duration) -> String {
    let total_ms = elapsed.as_millis();
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;

    if hours > 0 {
        format!("{hours}h{mins:02}m{secs:02}.{ms:03}s")
    } else if mins > 0 {
        format!("{mins}m{secs:02}.{ms:03}s")
    } else {
        format!("{secs}.{ms:03}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_format_runtime() {
        assert_eq!(format_runtime(ms(43_384_005)), "12h03m04.005s");
        assert_eq!(format_runtime(ms(950)), "0.950s");
        assert_eq!(format_runtime(ms(65_000)), "1m05.000s");
        assert_eq!(format_runtime(ms(3_603_000)), "1h00m03.000s");
        assert_eq!(format_runtime(ms(0)), "0.000s");
        assert_eq!(format_runtime(ms(59_999)), "59.999s");
    }

    #[test]
    fn test_should_report() {
        assert!(!TimingMode::None.should_report(ms(10_000)));
        assert!(TimingMode::All.should_report(ms(0)));
        assert!(!TimingMode::Long.should_report(ms(1000)));
        assert!(TimingMode::Long.should_report(ms(1001)));
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("ALL".parse::<TimingMode>().unwrap(), TimingMode::All);
        assert_eq!("none".parse::<TimingMode>().unwrap(), TimingMode::None);
        assert!("sometimes".parse::<TimingMode>().is_err());
        assert_eq!(TimingMode::default().to_string(), "LONG");
    }
}
