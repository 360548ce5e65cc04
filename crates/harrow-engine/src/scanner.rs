//! Lazy enumeration of the `(program, case)` pairs a filter set selects.

use std::collections::{BTreeSet, VecDeque};
use std::sync::Arc;

use harrow_model::TestProgram;

use crate::filters::{Filter, FilterSet};

/// One selected test case.
#[derive(Debug, Clone)]
pub struct ScanResult {
    pub program: Arc<TestProgram>,
    pub case_name: String,
}

/// Walks programs in input order and yields the cases the filters select.
///
/// A program no filter can select is dropped before its case list is ever
/// requested, so no listing process runs for it.
#[derive(Debug)]
pub struct Scanner {
    pending: VecDeque<Arc<TestProgram>>,
    filters: FilterSet,
    current: Option<(Arc<TestProgram>, VecDeque<String>)>,
}

impl Scanner {
    #[must_use]
    pub fn new(programs: impl IntoIterator<Item = Arc<TestProgram>>, filters: FilterSet) -> Self {
        Self {
            pending: programs.into_iter().collect(),
            filters,
            current: None,
        }
    }

    /// Advance to the next selected case, or `None` once exhausted.
    pub fn yield_next(&mut self) -> Option<ScanResult> {
        loop {
            if self.current.is_none() {
                let program = self.pending.pop_front()?;
                if !self.filters.match_program(program.relative_path()) {
                    tracing::trace!(program = %program.relative_path().display(), "program excluded by filters");
                    continue;
                }
                let names = program.test_cases().keys().cloned().collect();
                self.current = Some((program, names));
            }

            let (program, names) = self.current.as_mut()?;
            let Some(case_name) = names.pop_front() else {
                self.current = None;
                continue;
            };
            if self
                .filters
                .match_test_case(program.relative_path(), &case_name)
                .is_some()
            {
                return Some(ScanResult {
                    program: Arc::clone(program),
                    case_name,
                });
            }
        }
    }

    /// Whether no more cases will be yielded.
    #[must_use]
    pub fn done(&self) -> bool {
        self.pending.is_empty() && self.current.as_ref().is_none_or(|(_, names)| names.is_empty())
    }

    /// Filters that have not matched anything yet; final once exhausted.
    #[must_use]
    pub fn unused_filters(&self) -> BTreeSet<Filter> {
        self.filters.unused()
    }
}

impl Iterator for Scanner {
    type Item = ScanResult;

    fn next(&mut self) -> Option<Self::Item> {
        self.yield_next()
    }
}
