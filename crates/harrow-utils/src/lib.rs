pub mod error;
pub mod exit_codes;
pub mod logging;
pub mod paths;
pub mod units;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;
