//! Exit codes for the fedisample CLI.
//!
//! Exit codes communicate operation outcome without requiring output
//! parsing:
//! - 0-6: success/operational outcomes
//! - 10-19: user/environment errors (recoverable by user action)
//! - 20-29: internal errors

use fedisample_common::{Error, ErrorCategory};

/// Exit codes for fedisample operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Clean = 0,

    /// The candidate pool was exhausted before the target sample size.
    PartialSample = 1,

    /// Invalid arguments or statistics names.
    ArgsError = 10,

    /// Configuration file problems.
    ConfigError = 11,

    /// Instance data could not be loaded or was unusable.
    DataError = 12,

    /// Network operation failed.
    NetworkError = 13,

    /// I/O error.
    IoError = 20,

    /// Internal error.
    InternalError = 21,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Whether this code reports an operational (non-error) outcome.
    pub fn is_operational(self) -> bool {
        (self as i32) < 10
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> ExitCode {
        if let Error::UnknownStat { .. } = err {
            return ExitCode::ArgsError;
        }
        match err.category() {
            ErrorCategory::Config => ExitCode::ConfigError,
            ErrorCategory::Load | ErrorCategory::Analysis => ExitCode::DataError,
            ErrorCategory::Sampling => ExitCode::InternalError,
            ErrorCategory::Network => ExitCode::NetworkError,
            ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::PartialSample.as_i32(), 1);
        assert_eq!(ExitCode::ConfigError.as_i32(), 11);
        assert_eq!(ExitCode::IoError.as_i32(), 20);
    }

    #[test]
    fn operational_outcomes_are_below_ten() {
        assert!(ExitCode::Clean.is_operational());
        assert!(ExitCode::PartialSample.is_operational());
        assert!(!ExitCode::DataError.is_operational());
    }

    #[test]
    fn error_categories_map_to_codes() {
        assert_eq!(
            ExitCode::from(&Error::Config("x".into())),
            ExitCode::ConfigError
        );
        assert_eq!(
            ExitCode::from(&Error::UnknownStat { name: "x".into() }),
            ExitCode::ArgsError
        );
        assert_eq!(ExitCode::from(&Error::EmptyDataset), ExitCode::DataError);
        assert_eq!(
            ExitCode::from(&Error::Http {
                instance: "a.example".into(),
                message: "timeout".into()
            }),
            ExitCode::NetworkError
        );
    }
}
