//! Process exit codes for sh3
//!
//! Command errors inside the shell never change the exit code; these only
//! describe how the process itself ended.

/// Exit codes for the sh3 binary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Input ended or the user quit
    Success = 0,

    /// Unreadable input, unwritable output, or another fatal failure
    GeneralError = 1,

    /// Invalid arguments or configuration
    UsageError = 2,

    /// The service could not be reached at startup
    NetworkError = 3,

    /// A resource named at startup does not exist
    NotFound = 5,
}

impl ExitCode {
    /// Convert exit code to i32 for use with std::process::exit
    #[inline]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    /// Create exit code from i32 value
    ///
    /// Returns None if the value doesn't correspond to a known exit code.
    pub const fn from_i32(code: i32) -> Option<Self> {
        match code {
            0 => Some(Self::Success),
            1 => Some(Self::GeneralError),
            2 => Some(Self::UsageError),
            3 => Some(Self::NetworkError),
            5 => Some(Self::NotFound),
            _ => None,
        }
    }

    /// Exit code for an error that reached the process boundary
    pub fn for_error(error: &anyhow::Error) -> Self {
        error
            .downcast_ref::<sh3_core::Error>()
            .and_then(|e| Self::from_i32(e.exit_code()))
            .unwrap_or(Self::GeneralError)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.as_i32()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::UsageError.as_i32(), 2);
        assert_eq!(ExitCode::from_i32(5), Some(ExitCode::NotFound));
        assert_eq!(ExitCode::from_i32(99), None);
    }

    #[test]
    fn test_for_error() {
        let config = anyhow::Error::new(sh3_core::Error::Config("bad threads".into()));
        assert_eq!(ExitCode::for_error(&config), ExitCode::UsageError);

        let io = anyhow::Error::new(std::io::Error::other("gone"));
        assert_eq!(ExitCode::for_error(&io), ExitCode::GeneralError);

        let wrapped = anyhow::Error::new(sh3_core::Error::Network("refused".into()))
            .context("could not start");
        assert_eq!(ExitCode::for_error(&wrapped), ExitCode::NetworkError);
    }
}
