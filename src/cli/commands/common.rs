//! Helpers shared by the command implementations.

use std::collections::BTreeSet;

use anyhow::Result;
use harrow_config::ConfigError;
use harrow_engine::{Filter, FilterSet};
use harrow_model::TestResultType;
use harrow_utils::exit_codes::ExitCode;

use crate::error::HarrowError;

pub(crate) fn parse_filters(filters: &[String]) -> Result<FilterSet> {
    Ok(FilterSet::parse(filters).map_err(HarrowError::from)?)
}

/// Exit code of a command that saw `bad` results and left `unused` filters.
///
/// Bad results take precedence over unused filters.
pub fn outcome_code(bad: usize, unused: &BTreeSet<Filter>) -> ExitCode {
    for filter in unused {
        eprintln!("warning: No test cases matched by the filter '{filter}'");
    }
    if bad > 0 {
        ExitCode::TESTS_FAILED
    } else if !unused.is_empty() {
        ExitCode::UNUSED_FILTERS
    } else {
        ExitCode::SUCCESS
    }
}

/// Parse a comma-separated list of result types such as `failed,broken`.
pub fn parse_result_types(raw: &str) -> Result<BTreeSet<TestResultType>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| {
            TestResultType::parse(name).map_err(|e| ConfigError::InvalidValue {
                key: "results_filter".to_string(),
                reason: e.to_string(),
            })
        })
        .collect()
}
