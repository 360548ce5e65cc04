//! The `report` driver: replay a results file through filters.

use std::collections::BTreeSet;
use std::path::Path;

use harrow_engine::{Filter, FilterSet};
use harrow_model::Context;
use harrow_store::{ResultRecord, Store};
use harrow_utils::logging::driver_span;

use crate::error::DriverError;

/// Callbacks of [`scan_results`], called in declaration order.
pub trait ScanHooks {
    fn begin(&mut self) {}

    fn got_context(&mut self, _context: &Context) {}

    fn got_result(&mut self, record: &ResultRecord);

    fn end(&mut self, _unused_filters: &BTreeSet<Filter>) {}
}

/// Feed every stored result matching `filters` to `hooks`.
///
/// Returns the filters that matched no stored result.
pub fn scan_results(
    store_file: &Path,
    filters: &FilterSet,
    hooks: &mut dyn ScanHooks,
) -> Result<BTreeSet<Filter>, DriverError> {
    let span = driver_span("report", &store_file.display().to_string());
    let _guard = span.enter();

    let store = Store::open(store_file)?;
    hooks.begin();
    hooks.got_context(&store.context()?);

    for record in store.results()? {
        if filters
            .match_test_case(record.program.relative_path(), &record.case_name)
            .is_some()
        {
            hooks.got_result(&record);
        }
    }

    let unused = filters.unused();
    hooks.end(&unused);
    Ok(unused)
}
