//! User-supplied selectors over `(program, case)` pairs.
//!
//! A filter is `path[:case-glob]`. The path selects a program, or every
//! program below a directory; the optional glob then narrows the cases.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;

use globset::{Glob, GlobMatcher};

use crate::error::EngineError;

#[derive(Debug, Clone)]
pub struct Filter {
    path: PathBuf,
    case_glob: Option<String>,
    matcher: Option<GlobMatcher>,
}

impl Filter {
    pub fn new(path: impl AsRef<Path>, case_glob: Option<&str>) -> Result<Self, EngineError> {
        let raw = path.as_ref();
        let shown = raw.display().to_string();
        if raw.as_os_str().is_empty() {
            return Err(EngineError::invalid_filter(&shown, "Test program path is empty"));
        }
        let path = harrow_utils::paths::normalize_relative(raw).ok_or_else(|| {
            EngineError::invalid_filter(&shown, "Test program path must be relative and stay inside the suite")
        })?;

        let matcher = match case_glob {
            None => None,
            Some("") => {
                return Err(EngineError::invalid_filter(&shown, "Test case name is empty"));
            }
            Some(glob) => Some(
                Glob::new(glob)
                    .map_err(|e| EngineError::invalid_filter(glob, e.to_string()))?
                    .compile_matcher(),
            ),
        };

        Ok(Self {
            path,
            case_glob: case_glob.map(str::to_string),
            matcher,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn case_glob(&self) -> Option<&str> {
        self.case_glob.as_deref()
    }

    /// Whether the program at `relative_path` is selected, ignoring the case.
    #[must_use]
    pub fn matches_program(&self, relative_path: &Path) -> bool {
        relative_path.starts_with(&self.path)
    }

    #[must_use]
    pub fn matches_test_case(&self, relative_path: &Path, case_name: &str) -> bool {
        if !self.matches_program(relative_path) {
            return false;
        }
        self.matcher
            .as_ref()
            .is_none_or(|matcher| matcher.is_match(case_name))
    }

    /// Whether one filter selects everything the other could select.
    ///
    /// Filters naming case globs on the same program are disjoint selections
    /// even when their globs happen to match a common name.
    fn overlaps(&self, other: &Self) -> bool {
        let covers = |outer: &Self, inner: &Self| {
            outer.case_glob.is_none() && inner.path.starts_with(&outer.path)
        };
        self == other || covers(self, other) || covers(other, self)
    }
}

impl FromStr for Filter {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((path, glob)) => Self::new(path, Some(glob)),
            None => Self::new(s, None),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(glob) = &self.case_glob {
            write!(f, ":{glob}")?;
        }
        Ok(())
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.case_glob == other.case_glob
    }
}

impl Eq for Filter {}

impl PartialOrd for Filter {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Filter {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (&self.path, &self.case_glob).cmp(&(&other.path, &other.case_glob))
    }
}

/// A disjoint set of filters that remembers which of them matched.
#[derive(Debug, Default)]
pub struct FilterSet {
    filters: Vec<Filter>,
    used: Mutex<BTreeSet<usize>>,
}

impl FilterSet {
    /// Build a set, rejecting duplicates and filters contained in another.
    pub fn new(filters: impl IntoIterator<Item = Filter>) -> Result<Self, EngineError> {
        let filters: Vec<Filter> = filters.into_iter().collect();
        for (i, a) in filters.iter().enumerate() {
            for b in &filters[i + 1..] {
                if a == b {
                    return Err(EngineError::invalid_filter(
                        &a.to_string(),
                        "Duplicate filter",
                    ));
                }
                if a.overlaps(b) {
                    return Err(EngineError::invalid_filter(
                        &b.to_string(),
                        format!("Filters '{a}' and '{b}' are not disjoint"),
                    ));
                }
            }
        }
        Ok(Self {
            filters,
            used: Mutex::new(BTreeSet::new()),
        })
    }

    /// Parse every argument as a filter.
    pub fn parse<I, S>(args: I) -> Result<Self, EngineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let filters = args
            .into_iter()
            .map(|arg| arg.as_ref().parse())
            .collect::<Result<Vec<Filter>, _>>()?;
        Self::new(filters)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Whether any filter could select cases of this program.
    #[must_use]
    pub fn match_program(&self, relative_path: &Path) -> bool {
        self.filters.is_empty()
            || self
                .filters
                .iter()
                .any(|filter| filter.matches_program(relative_path))
    }

    /// Match a case, recording the filter that selected it.
    ///
    /// Returns the matching filter, or `Some(None)` when the set is empty and
    /// everything matches.
    pub fn match_test_case(&self, relative_path: &Path, case_name: &str) -> Option<Option<&Filter>> {
        if self.filters.is_empty() {
            return Some(None);
        }
        let matching: Vec<usize> = self
            .filters
            .iter()
            .enumerate()
            .filter(|(_, filter)| filter.matches_test_case(relative_path, case_name))
            .map(|(index, _)| index)
            .collect();
        let first = *matching.first()?;
        if let Ok(mut used) = self.used.lock() {
            used.extend(matching);
        }
        Some(Some(&self.filters[first]))
    }

    /// Filters that have not matched any case so far.
    #[must_use]
    pub fn unused(&self) -> BTreeSet<Filter> {
        let used = self.used.lock().map(|u| u.clone()).unwrap_or_default();
        self.filters
            .iter()
            .enumerate()
            .filter(|(i, _)| !used.contains(i))
            .map(|(_, filter)| filter.clone())
            .collect()
    }
}
