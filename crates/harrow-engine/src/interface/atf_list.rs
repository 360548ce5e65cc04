//! Parser for the test case list printed by `prog -l`.

use std::collections::BTreeSet;

use harrow_model::{MetadataOverrides, TestCaseSpec};

use crate::error::InterfaceError;

const EXPECTED_CONTENT_TYPE: &str = "Content-Type: application/X-atf-tp; version=\"1\"";

/// Canonical metadata name of a listing property.
fn property_name(key: &str) -> Option<String> {
    let name = match key {
        "descr" => "description",
        "has.cleanup" => "has_cleanup",
        "is.exclusive" => "is_exclusive",
        "require.arch" => "allowed_architectures",
        "require.config" => "required_configs",
        "require.diskspace" => "required_disk_space",
        "require.files" => "required_files",
        "require.machine" => "allowed_platforms",
        "require.memory" => "required_memory",
        "require.progs" => "required_programs",
        "require.user" => "required_user",
        "timeout" => "timeout",
        custom if custom.starts_with("X-") => return Some(format!("custom.{custom}")),
        _ => return None,
    };
    Some(name.to_string())
}

fn split_property(line: &str) -> Result<(&str, &str), InterfaceError> {
    match line.split_once(':') {
        Some((key, value)) if !key.is_empty() && !key.contains(char::is_whitespace) => {
            Ok((key, value.trim()))
        }
        _ => Err(InterfaceError::format(format!(
            "Invalid property; expecting 'name: value', got '{line}'"
        ))),
    }
}

struct PendingCase {
    name: String,
    overrides: MetadataOverrides,
    seen: BTreeSet<String>,
}

impl PendingCase {
    fn add(&mut self, key: &str, value: &str) -> Result<(), InterfaceError> {
        if !self.seen.insert(key.to_string()) {
            return Err(InterfaceError::format(format!(
                "Duplicate value for property {key}"
            )));
        }
        let name = property_name(key).ok_or_else(|| {
            InterfaceError::format(format!("Unknown test case metadata property {key}"))
        })?;
        self.overrides
            .insert(&name, value)
            .map_err(|e| InterfaceError::format(e.to_string()))
    }

    fn finish(self) -> TestCaseSpec {
        TestCaseSpec::with_overrides(self.name, self.overrides)
    }
}

/// Parse a complete listing.
pub(crate) fn parse_atf_list(output: &str) -> Result<Vec<TestCaseSpec>, InterfaceError> {
    let mut lines = output.lines();

    match lines.next() {
        Some(line) if line == EXPECTED_CONTENT_TYPE => {}
        other => {
            return Err(InterfaceError::format(format!(
                "Invalid header for test case list; expecting Content-Type for application/X-atf-tp version 1, got '{}'",
                other.unwrap_or_default()
            )));
        }
    }
    match lines.next() {
        Some("") => {}
        other => {
            return Err(InterfaceError::format(format!(
                "Invalid header for test case list; expecting a blank line, got '{}'",
                other.unwrap_or_default()
            )));
        }
    }

    let mut cases: Vec<TestCaseSpec> = Vec::new();
    let mut names = BTreeSet::new();
    let mut current: Option<PendingCase> = None;

    for line in lines {
        if line.is_empty() {
            if let Some(done) = current.take() {
                cases.push(done.finish());
            }
            continue;
        }

        let (key, value) = split_property(line)?;
        match current.as_mut() {
            None => {
                if key != "ident" {
                    return Err(InterfaceError::format(
                        "Invalid test case definition; must be preceded by the identifier",
                    ));
                }
                if value.is_empty() {
                    return Err(InterfaceError::format("Test case with an empty identifier"));
                }
                if !names.insert(value.to_string()) {
                    return Err(InterfaceError::format(format!(
                        "Duplicate test case '{value}'"
                    )));
                }
                current = Some(PendingCase {
                    name: value.to_string(),
                    overrides: MetadataOverrides::new(),
                    seen: BTreeSet::new(),
                });
            }
            Some(_) if key == "ident" => {
                return Err(InterfaceError::format(
                    "Invalid test case definition; identifier must be followed by a blank line before the next one",
                ));
            }
            Some(pending) => pending.add(key, value)?,
        }
    }
    if let Some(done) = current.take() {
        cases.push(done.finish());
    }

    if cases.is_empty() {
        return Err(InterfaceError::format("No test cases"));
    }
    Ok(cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(body: &str) -> String {
        format!("{EXPECTED_CONTENT_TYPE}\n\n{body}")
    }

    #[test]
    fn test_parses_cases_and_properties() {
        let cases = parse_atf_list(&listing(
            "ident: first\ndescr: The first one\ntimeout: 15\n\nident: second\nhas.cleanup: true\nrequire.progs: /bin/sh cc\nX-owner: fs\n",
        ))
        .unwrap();

        assert_eq!(cases.len(), 2);
        assert_eq!(cases[0].name, "first");
        assert!(cases[0].overrides.contains("description"));
        assert!(cases[0].overrides.contains("timeout"));
        assert_eq!(cases[1].name, "second");
        assert!(cases[1].overrides.contains("has_cleanup"));
        assert!(cases[1].overrides.contains("required_programs"));
        assert!(cases[1].overrides.contains("custom.X-owner"));
    }

    #[test]
    fn test_exclusive_property() {
        let cases = parse_atf_list(&listing(
            "ident: one\nis.exclusive: true\n\nident: two\n",
        ))
        .unwrap();

        let base = harrow_model::Metadata::default();
        assert!(cases[0].overrides.apply(&base).unwrap().is_exclusive);
        assert!(!cases[1].overrides.apply(&base).unwrap().is_exclusive);

        let err = parse_atf_list(&listing("ident: one\nis.exclusive: maybe\n")).unwrap_err();
        assert!(err.to_string().contains("is_exclusive"));
    }

    #[test]
    fn test_bad_header() {
        let err = parse_atf_list("Content-Type: text/plain\n\nident: a\n").unwrap_err();
        assert!(err.to_string().contains("Invalid header"));

        let err = parse_atf_list(&format!("{EXPECTED_CONTENT_TYPE}\nident: a\n")).unwrap_err();
        assert!(err.to_string().contains("blank line"));

        assert!(parse_atf_list("").is_err());
    }

    #[test]
    fn test_no_test_cases() {
        assert_eq!(
            parse_atf_list(&listing("")).unwrap_err(),
            InterfaceError::format("No test cases")
        );
    }

    #[test]
    fn test_property_errors() {
        let err = parse_atf_list(&listing("descr: x\n")).unwrap_err();
        assert!(err.to_string().contains("preceded by the identifier"));

        let err = parse_atf_list(&listing("ident: a\ncolour: red\n")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unknown test case metadata property colour"
        );

        let err = parse_atf_list(&listing("ident: a\ndescr: x\ndescr: y\n")).unwrap_err();
        assert_eq!(err.to_string(), "Duplicate value for property descr");

        let err = parse_atf_list(&listing("ident: a\nthis is not a property\n")).unwrap_err();
        assert!(err.to_string().contains("Invalid property"));

        let err = parse_atf_list(&listing("ident: a\ntimeout: soon\n")).unwrap_err();
        assert!(err.to_string().contains("timeout"));
    }

    #[test]
    fn test_duplicate_identifier() {
        let err = parse_atf_list(&listing("ident: a\n\nident: a\n")).unwrap_err();
        assert!(err.to_string().contains("Duplicate test case"));
    }
}
