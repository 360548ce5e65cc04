//! Minimal parser for the Test Anything Protocol.

use std::ops::RangeInclusive;

use crate::error::InterfaceError;

/// What a TAP stream reported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TapSummary {
    /// Declared plan, `1..N`.
    pub plan: Option<RangeInclusive<u64>>,
    pub ok_count: u64,
    pub not_ok_count: u64,
    pub bailed_out: bool,
    /// Set when the plan was `1..0 # SKIP <reason>`.
    pub all_skipped_reason: Option<String>,
}

impl TapSummary {
    /// Number of test points the plan announced.
    #[must_use]
    pub fn planned(&self) -> u64 {
        self.plan
            .as_ref()
            .map_or(0, |p| (p.end() + 1).saturating_sub(*p.start()))
    }
}

fn parse_plan(line: &str) -> Result<(RangeInclusive<u64>, Option<String>), InterfaceError> {
    let (range, directive) = match line.split_once('#') {
        Some((range, directive)) => (range.trim(), Some(directive.trim())),
        None => (line.trim(), None),
    };
    let invalid = || InterfaceError::format(format!("Output includes invalid plan '{line}'"));

    let (first, last) = range.split_once("..").ok_or_else(invalid)?;
    let first: u64 = first.parse().map_err(|_| invalid())?;
    let last: u64 = last.parse().map_err(|_| invalid())?;

    if first == 1 && last == 0 {
        let reason = directive
            .and_then(|d| {
                let upper = d.to_ascii_uppercase();
                upper
                    .starts_with("SKIP")
                    .then(|| d[4..].trim().to_string())
            })
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| "No reason specified".to_string());
        return Ok((first..=last, Some(reason)));
    }
    if first != 1 || last < first {
        return Err(InterfaceError::format(format!(
            "Found reversed or malformed plan {first}..{last}"
        )));
    }
    Ok((first..=last, None))
}

/// `true` for a `# TODO` or `# SKIP` directive, which makes `not ok` harmless.
fn has_lenient_directive(line: &str) -> bool {
    line.split_once('#').is_some_and(|(_, directive)| {
        let directive = directive.trim_start().to_ascii_uppercase();
        directive.starts_with("TODO") || directive.starts_with("SKIP")
    })
}

/// Parse a TAP stream.
pub fn parse_tap_output(output: &str) -> Result<TapSummary, InterfaceError> {
    let mut summary = TapSummary::default();

    for line in output.lines() {
        if line.starts_with("Bail out!") {
            summary.bailed_out = true;
            return Ok(summary);
        }

        if line.starts_with("1..") {
            if summary.plan.is_some() {
                return Err(InterfaceError::format(format!(
                    "Output includes two test plans; found second '{line}'"
                )));
            }
            let (plan, skipped) = parse_plan(line)?;
            summary.plan = Some(plan);
            summary.all_skipped_reason = skipped;
        } else if line.starts_with("not ok") {
            if has_lenient_directive(line) {
                summary.ok_count += 1;
            } else {
                summary.not_ok_count += 1;
            }
        } else if line.starts_with("ok") {
            summary.ok_count += 1;
        }
    }

    if summary.plan.is_none() {
        return Err(InterfaceError::format("Output did not contain any TAP plan"));
    }
    if summary.all_skipped_reason.is_none() {
        let reported = summary.ok_count + summary.not_ok_count;
        if reported != summary.planned() {
            return Err(InterfaceError::format(format!(
                "Reported plan differs from actual executed tests; planned {}, found {reported}",
                summary.planned()
            )));
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_results() {
        let summary =
            parse_tap_output("1..4\nok 1\nnot ok 2 - broken\nok 3 # SKIP slow\nnot ok 4 # TODO later\n")
                .unwrap();
        assert_eq!(summary.plan, Some(1..=4));
        assert_eq!(summary.ok_count, 3);
        assert_eq!(summary.not_ok_count, 1);
        assert!(!summary.bailed_out);
    }

    #[test]
    fn test_plan_may_trail() {
        let summary = parse_tap_output("ok 1\nok 2\n1..2\n").unwrap();
        assert_eq!(summary.planned(), 2);
    }

    #[test]
    fn test_skip_plan() {
        let summary = parse_tap_output("1..0 # SKIP no network\n").unwrap();
        assert_eq!(summary.all_skipped_reason.as_deref(), Some("no network"));

        let summary = parse_tap_output("1..0\n").unwrap();
        assert_eq!(
            summary.all_skipped_reason.as_deref(),
            Some("No reason specified")
        );
    }

    #[test]
    fn test_bail_out_stops_parsing() {
        let summary = parse_tap_output("1..3\nok 1\nBail out! disk full\nnot ok 2\n").unwrap();
        assert!(summary.bailed_out);
        assert_eq!(summary.ok_count, 1);
        assert_eq!(summary.not_ok_count, 0);
    }

    #[test]
    fn test_invalid_streams() {
        let e = parse_tap_output("ok 1\n").unwrap_err();
        assert_eq!(e.to_string(), "Output did not contain any TAP plan");

        let e = parse_tap_output("1..2\nok 1\n").unwrap_err();
        assert!(e.to_string().contains("planned 2, found 1"));

        let e = parse_tap_output("1..1\nok 1\n1..1\n").unwrap_err();
        assert!(e.to_string().contains("two test plans"));

        assert!(parse_tap_output("1..x\n").is_err());
        assert!(parse_tap_output("3..1\n").is_err());
    }
}
