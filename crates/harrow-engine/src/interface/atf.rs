//! Programs speaking the ATF test program protocol.

use std::path::Path;

use harrow_model::{TestCaseSpec, TestProgram, TestResult};
use harrow_runner::{CommandSpec, ProcessStatus};

use super::atf_list::parse_atf_list;
use super::atf_result::{RESULT_FILE, calculate_atf_result};
use super::{TestInterface, Vars};
use crate::error::InterfaceError;

#[derive(Debug, Clone, Copy, Default)]
pub struct AtfInterface;

impl AtfInterface {
    fn case_command(
        program: &TestProgram,
        target: &str,
        vars: &Vars,
        control_dir: &Path,
    ) -> CommandSpec {
        let mut result_arg = std::ffi::OsString::from("-r");
        result_arg.push(control_dir.join(RESULT_FILE));

        CommandSpec::new(program.absolute_path())
            .arg(result_arg)
            .args(
                vars.iter()
                    .flat_map(|(name, value)| ["-v".to_string(), format!("{name}={value}")]),
            )
            .arg(target)
    }
}

fn read_output(path: &Path) -> Result<String, InterfaceError> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(text),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(InterfaceError::format(format!(
            "Cannot read {}: {e}",
            path.display()
        ))),
    }
}

impl TestInterface for AtfInterface {
    fn list_command(&self, program: &TestProgram, vars: &Vars) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(program.absolute_path())
                .args(
                    vars.iter()
                        .flat_map(|(name, value)| ["-v".to_string(), format!("{name}={value}")]),
                )
                .arg("-l"),
        )
    }

    fn parse_list(
        &self,
        status: Option<ProcessStatus>,
        stdout: &Path,
        stderr: &Path,
    ) -> Result<Vec<TestCaseSpec>, InterfaceError> {
        match status {
            None => return Err(InterfaceError::format("Test case list timed out")),
            Some(ProcessStatus::Signaled { signal, .. }) => {
                return Err(InterfaceError::format(format!(
                    "Test program received signal {signal}"
                )));
            }
            Some(ProcessStatus::Exited(0)) => {}
            Some(ProcessStatus::Exited(code)) => {
                return Err(InterfaceError::format(format!(
                    "Test program did not exit cleanly; exited with code {code}"
                )));
            }
        }

        let errors = read_output(stderr)?;
        if !errors.trim().is_empty() {
            return Err(InterfaceError::format(format!(
                "Test case list wrote to stderr: {}",
                errors.trim_end()
            )));
        }

        parse_atf_list(&read_output(stdout)?)
    }

    fn test_command(
        &self,
        program: &TestProgram,
        case_name: &str,
        vars: &Vars,
        control_dir: &Path,
    ) -> CommandSpec {
        Self::case_command(program, case_name, vars, control_dir)
    }

    fn cleanup_command(
        &self,
        program: &TestProgram,
        case_name: &str,
        vars: &Vars,
        control_dir: &Path,
    ) -> Option<CommandSpec> {
        let case = program.find(case_name).ok()?;
        case.metadata().has_cleanup.then(|| {
            Self::case_command(program, &format!("{case_name}:cleanup"), vars, control_dir)
        })
    }

    fn compute_result(
        &self,
        status: Option<ProcessStatus>,
        control_dir: &Path,
        _stdout: &Path,
        _stderr: &Path,
    ) -> TestResult {
        calculate_atf_result(status, &control_dir.join(RESULT_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harrow_model::{Metadata, MetadataBuilder, TestCase, TestCasesMap};
    use std::ffi::OsString;
    use tempfile::TempDir;

    fn program_with(cases: &[(&str, bool)]) -> TestProgram {
        let cases: TestCasesMap = cases
            .iter()
            .map(|(name, cleanup)| {
                let mut builder = MetadataBuilder::new();
                builder
                    .set("has_cleanup", if *cleanup { "true" } else { "false" })
                    .unwrap();
                (name.to_string(), TestCase::new(*name, builder.build()))
            })
            .collect();
        TestProgram::new("atf", "t_atf", "/suite", "s", Metadata::default(), cases)
    }

    fn args(cmd: &CommandSpec) -> Vec<String> {
        cmd.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_test_command_argv() {
        let program = program_with(&[("one", false)]);
        let vars = Vars::from([("a".to_string(), "1".to_string())]);
        let cmd = AtfInterface.test_command(&program, "one", &vars, Path::new("/ctl"));

        assert_eq!(cmd.program, OsString::from("/suite/t_atf"));
        assert_eq!(args(&cmd), vec!["-r/ctl/result.atf", "-v", "a=1", "one"]);
        assert!(cmd.env.is_none());
    }

    #[test]
    fn test_cleanup_only_when_declared() {
        let program = program_with(&[("plain", false), ("tidy", true)]);
        let vars = Vars::new();
        let ctl = Path::new("/ctl");

        assert!(
            AtfInterface
                .cleanup_command(&program, "plain", &vars, ctl)
                .is_none()
        );
        let cmd = AtfInterface
            .cleanup_command(&program, "tidy", &vars, ctl)
            .unwrap();
        assert_eq!(args(&cmd), vec!["-r/ctl/result.atf", "tidy:cleanup"]);
    }

    #[test]
    fn test_parse_list_rejects_bad_termination() {
        let td = TempDir::new().unwrap();
        let out = td.path().join("stdout");
        let err = td.path().join("stderr");

        let e = AtfInterface.parse_list(None, &out, &err).unwrap_err();
        assert_eq!(e.to_string(), "Test case list timed out");

        let e = AtfInterface
            .parse_list(
                Some(ProcessStatus::Signaled {
                    signal: 11,
                    core_dumped: false,
                }),
                &out,
                &err,
            )
            .unwrap_err();
        assert!(e.to_string().contains("received signal 11"));

        let e = AtfInterface
            .parse_list(Some(ProcessStatus::Exited(2)), &out, &err)
            .unwrap_err();
        assert!(e.to_string().contains("did not exit cleanly"));
    }

    #[test]
    fn test_parse_list_rejects_stderr_noise() {
        let td = TempDir::new().unwrap();
        let out = td.path().join("stdout");
        let err = td.path().join("stderr");
        std::fs::write(
            &out,
            "Content-Type: application/X-atf-tp; version=\"1\"\n\nident: a\n",
        )
        .unwrap();
        std::fs::write(&err, "warning: something\n").unwrap();

        let e = AtfInterface
            .parse_list(Some(ProcessStatus::Exited(0)), &out, &err)
            .unwrap_err();
        assert!(e.to_string().contains("stderr"));

        std::fs::write(&err, "").unwrap();
        let specs = AtfInterface
            .parse_list(Some(ProcessStatus::Exited(0)), &out, &err)
            .unwrap();
        assert_eq!(specs, vec![TestCaseSpec::new("a")]);
    }
}
