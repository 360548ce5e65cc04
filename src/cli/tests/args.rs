//! Argument parsing tests

use std::path::PathBuf;

use clap::Parser;

use crate::cli::{Cli, Commands};

#[test]
fn test_global_options_after_subcommand() {
    let cli = Cli::try_parse_from([
        "harrow",
        "test",
        "-v",
        "parallelism=4",
        "--variable",
        "platform=amd64",
        "--verbose",
        "fs/t_mount:remount",
    ])
    .unwrap();

    assert_eq!(cli.variables, vec!["parallelism=4", "platform=amd64"]);
    assert!(cli.verbose);
    match cli.command {
        Commands::Test {
            suite,
            results_file,
            filters,
        } => {
            assert_eq!(suite.harrowfile, PathBuf::from("Harrowfile"));
            assert!(suite.build_root.is_none());
            assert!(results_file.is_none());
            assert_eq!(filters, vec!["fs/t_mount:remount"]);
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_suite_args() {
    let cli = Cli::try_parse_from([
        "harrow",
        "list",
        "-k",
        "other/Harrowfile",
        "--build-root",
        "/tmp/build",
        "--verbose-list",
    ])
    .unwrap();

    match cli.command {
        Commands::List {
            suite,
            verbose_list,
            filters,
        } => {
            assert_eq!(suite.harrowfile, PathBuf::from("other/Harrowfile"));
            assert_eq!(suite.build_root, Some(PathBuf::from("/tmp/build")));
            assert!(verbose_list);
            assert!(filters.is_empty());
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_debug_defaults_and_required_filter() {
    let cli = Cli::try_parse_from(["harrow", "debug", "t_one:case"]).unwrap();
    match cli.command {
        Commands::Debug {
            stdout,
            stderr,
            filter,
            ..
        } => {
            assert_eq!(stdout, PathBuf::from("/dev/stdout"));
            assert_eq!(stderr, PathBuf::from("/dev/stderr"));
            assert_eq!(filter, "t_one:case");
        }
        other => panic!("unexpected command {other:?}"),
    }

    assert!(Cli::try_parse_from(["harrow", "debug"]).is_err());
}

#[test]
fn test_report_defaults() {
    let cli = Cli::try_parse_from(["harrow", "report"]).unwrap();
    match cli.command {
        Commands::Report {
            results_file,
            results_filter,
            filters,
        } => {
            assert!(results_file.is_none());
            assert_eq!(results_filter, "skipped,expected_failure,broken,failed");
            assert!(filters.is_empty());
        }
        other => panic!("unexpected command {other:?}"),
    }
}

#[test]
fn test_unknown_subcommand_rejected() {
    assert!(Cli::try_parse_from(["harrow", "explode"]).is_err());
    assert!(Cli::try_parse_from(["harrow"]).is_err());
}

#[test]
fn test_config_json_flag() {
    let cli = Cli::try_parse_from(["harrow", "--config", "/etc/harrow.toml", "config", "--json"])
        .unwrap();
    assert_eq!(cli.config, Some(PathBuf::from("/etc/harrow.toml")));
    assert!(matches!(cli.command, Commands::Config { json: true }));
}
