//! Exit code constants for harrow.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Operation completed and every result was good |
//! | 1 | `TESTS_FAILED` | At least one test case had a bad result |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 3 | `INTERNAL` | Infrastructure failure (work directory, store, ...) |
//! | 4 | `UNUSED_FILTERS` | A filter given on the command line matched nothing |
//! | 130 | `INTERRUPTED` | Run aborted by a termination signal |

/// Exit codes matching the documented exit code table.
///
/// Use the named constants for common exit codes, or [`as_i32()`](Self::as_i32)
/// to get the numeric value for `std::process::exit()`.
///
/// # Example
///
/// ```rust
/// use harrow_utils::exit_codes::ExitCode;
///
/// let code = ExitCode::SUCCESS;
/// assert_eq!(code.as_i32(), 0);
/// assert_eq!(ExitCode::TESTS_FAILED, ExitCode::from_i32(1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - every matching test case produced a good result
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Some test case failed, broke, or did not run cleanly
    pub const TESTS_FAILED: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid arguments, filters, or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Internal error - the run could not be carried out
    pub const INTERNAL: ExitCode = ExitCode(3);

    /// Some filter provided by the user did not match any test case
    pub const UNUSED_FILTERS: ExitCode = ExitCode(4);

    /// The run was interrupted by SIGINT/SIGTERM/SIGHUP
    pub const INTERRUPTED: ExitCode = ExitCode(130);

    /// Get the numeric exit code value.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    ///
    /// Prefer using the named constants when possible.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }

    /// Whether this code denotes a successful invocation.
    #[must_use]
    pub const fn is_success(self) -> bool {
        self.0 == 0
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::TESTS_FAILED.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::INTERNAL.as_i32(), 3);
        assert_eq!(ExitCode::UNUSED_FILTERS.as_i32(), 4);
        assert_eq!(ExitCode::INTERRUPTED.as_i32(), 130);
    }

    #[test]
    fn test_exit_code_conversions() {
        let code: ExitCode = 2.into();
        assert_eq!(code, ExitCode::CLI_ARGS);
        let raw: i32 = ExitCode::INTERRUPTED.into();
        assert_eq!(raw, 130);
        assert!(ExitCode::SUCCESS.is_success());
        assert!(!ExitCode::TESTS_FAILED.is_success());
    }
}
