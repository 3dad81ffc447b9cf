//! Command behavior, discovery and flag handling.

use crate::commands::{parse_extra_labels, run_generate, run_validate};
use crate::discover::discover_spec_files;
use crate::{Cli, Commands, GenerateArgs, ValidateArgs};
use clap::Parser;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write_file(dir: &Path, rel: &str, content: &str) -> PathBuf {
    let path = dir.join(rel);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn spec_text(service: &str) -> String {
    format!(
        r#"version: oxslo/v1
service: {service}
slos:
  - name: availability
    objective: 99.9
    sli:
      raw:
        error_ratio_query: sum(rate(errors[{{{{window}}}}])) / sum(rate(all[{{{{window}}}}]))
"#
    )
}

fn generate_args(input: &Path, output: &str) -> GenerateArgs {
    GenerateArgs {
        input: input.to_path_buf(),
        output: output.to_string(),
        fs_include: None,
        fs_exclude: None,
        ignore_slo_duplicates: false,
        extra_labels: Vec::new(),
        default_slo_period: "30d".to_string(),
        disable_recordings: false,
        disable_alerts: false,
    }
}

fn validate_args(input: &Path) -> ValidateArgs {
    ValidateArgs {
        input: input.to_path_buf(),
        fs_include: None,
        fs_exclude: None,
        ignore_slo_duplicates: false,
        default_slo_period: "30d".to_string(),
    }
}

#[test]
fn extra_labels_parse_into_a_sorted_map() {
    let labels =
        parse_extra_labels(&["env=prod".to_string(), "cluster=eu-1".to_string()]).unwrap();
    assert_eq!(labels.keys().collect::<Vec<_>>(), ["cluster", "env"]);
    assert_eq!(labels["env"], "prod");

    // Only the first '=' splits; values may contain more.
    let labels = parse_extra_labels(&["selector=a=b".to_string()]).unwrap();
    assert_eq!(labels["selector"], "a=b");
}

#[test]
fn malformed_extra_labels_are_rejected() {
    assert!(parse_extra_labels(&["noequals".to_string()]).is_err());
    assert!(parse_extra_labels(&["bad-name=x".to_string()]).is_err());
    assert!(parse_extra_labels(&["oxslo_id=forged".to_string()]).is_err());
}

#[test]
fn discovery_finds_yaml_files_recursively() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "b.yaml", "placeholder");
    write_file(dir.path(), "a/a.yml", "placeholder");
    write_file(dir.path(), "notes.txt", "placeholder");

    let files = discover_spec_files(dir.path(), None, None).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|path| {
            path.strip_prefix(dir.path())
                .unwrap()
                .to_string_lossy()
                .into_owned()
        })
        .collect();
    assert_eq!(names, ["a/a.yml", "b.yaml"]);
}

#[test]
fn discovery_exclude_wins_over_include() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.yaml", "placeholder");
    write_file(dir.path(), "b.yaml", "placeholder");

    let include = Regex::new(".*").unwrap();
    let exclude = Regex::new(r"b\.yaml$").unwrap();
    let files = discover_spec_files(dir.path(), Some(&include), Some(&exclude)).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("a.yaml"));
}

#[cfg(unix)]
#[test]
fn discovery_ignores_symlink_cycles() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "specs/api.yaml", &spec_text("api"));
    // specs/loop -> specs: following it would re-discover api.yaml under
    // an ever-longer path on every resolution level
    std::os::unix::fs::symlink(dir.path().join("specs"), dir.path().join("specs/loop"))
        .unwrap();

    let files = discover_spec_files(dir.path(), None, None).unwrap();
    assert_eq!(files.len(), 1);
    assert!(files[0].ends_with("specs/api.yaml"));
}

#[test]
fn single_file_input_bypasses_filters() {
    let dir = TempDir::new().unwrap();
    let path = write_file(dir.path(), "api.yaml", &spec_text("api"));

    let exclude = Regex::new("api").unwrap();
    let files = discover_spec_files(&path, None, Some(&exclude)).unwrap();
    assert_eq!(files, vec![path]);
}

#[test]
fn generate_writes_rules_for_valid_specs() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "api.yaml", &spec_text("api"));
    let output = dir.path().join("out/rules.yaml");
    let args = generate_args(dir.path(), output.to_str().unwrap());

    let summary = run_generate(&args).unwrap();
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.spec_files, 1);
    assert_eq!(summary.slo_count, 1);
    assert_eq!(summary.rule_count, 7);

    let rendered = fs::read_to_string(&output).unwrap();
    assert!(rendered.starts_with("---\n# Code generated by oxslo v"));
    assert!(rendered.contains("slo:api_availability:info"));
    assert!(rendered.contains("slo_burn_rate_api_availability_page"));
}

#[test]
fn generate_stamps_extra_labels_on_rules() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "api.yaml", &spec_text("api"));
    let output = dir.path().join("rules.yaml");
    let mut args = generate_args(dir.path(), output.to_str().unwrap());
    args.extra_labels = vec!["team=core".to_string()];

    let summary = run_generate(&args).unwrap();
    assert_eq!(summary.error_count, 0);
    let rendered = fs::read_to_string(&output).unwrap();
    assert!(rendered.contains("team: core"));
}

#[test]
fn generate_writes_nothing_when_validation_fails() {
    let dir = TempDir::new().unwrap();
    let broken = spec_text("api").replace("objective: 99.9", "objective: 150");
    write_file(dir.path(), "api.yaml", &broken);
    let output = dir.path().join("rules.yaml");
    let args = generate_args(dir.path(), output.to_str().unwrap());

    let summary = run_generate(&args).unwrap();
    assert_eq!(summary.error_count, 1);
    assert!(summary.failed());
    assert!(!output.exists());
}

#[test]
fn missing_input_path_is_an_error() {
    let args = validate_args(Path::new("/nonexistent/oxslo-input"));
    assert!(run_validate(&args).is_err());
}

#[test]
fn directory_without_spec_files_is_an_error() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "readme.md", "nothing to see");

    let err = run_validate(&validate_args(dir.path())).unwrap_err();
    assert!(err.to_string().contains("no SLO spec files"));
}

#[test]
fn duplicate_slos_across_files_fail_unless_ignored() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "a.yaml", &spec_text("api"));
    write_file(dir.path(), "b.yaml", &spec_text("api"));

    let summary = run_validate(&validate_args(dir.path())).unwrap();
    assert_eq!(summary.error_count, 1);

    let mut args = validate_args(dir.path());
    args.ignore_slo_duplicates = true;
    let summary = run_validate(&args).unwrap();
    assert_eq!(summary.error_count, 0);
    assert_eq!(summary.rule_count, 7);
}

#[test]
fn broken_file_does_not_block_the_rest() {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "bad.yaml", "version: [unclosed\n");
    write_file(dir.path(), "good.yaml", &spec_text("api"));

    let summary = run_validate(&validate_args(dir.path())).unwrap();
    assert_eq!(summary.error_count, 1);
    assert_eq!(summary.spec_files, 2);
    assert_eq!(summary.slo_count, 1);
    assert_eq!(summary.rule_count, 7);
}

#[test]
fn cli_parses_generate_flags() {
    let cli = Cli::try_parse_from([
        "oxslo",
        "generate",
        "--input",
        "specs/",
        "--output",
        "out.yaml",
        "--extra-labels",
        "env=prod",
        "--extra-labels",
        "cluster=eu-1",
        "--ignore-slo-duplicates",
        "--debug",
    ])
    .unwrap();

    assert!(cli.debug);
    match cli.command {
        Commands::Generate(args) => {
            assert_eq!(args.input, PathBuf::from("specs/"));
            assert_eq!(args.output, "out.yaml");
            assert_eq!(args.extra_labels, ["env=prod", "cluster=eu-1"]);
            assert!(args.ignore_slo_duplicates);
            assert!(!args.disable_recordings);
            assert!(!args.disable_alerts);
            assert_eq!(args.default_slo_period, "30d");
        }
        other => panic!("expected the generate command, got {other:?}"),
    }
}

#[test]
fn cli_parses_validate_with_defaults() {
    let cli = Cli::try_parse_from(["oxslo", "validate", "-i", "specs/"]).unwrap();
    assert!(!cli.debug);
    match cli.command {
        Commands::Validate(args) => {
            assert_eq!(args.input, PathBuf::from("specs/"));
            assert!(args.fs_include.is_none());
            assert!(!args.ignore_slo_duplicates);
        }
        other => panic!("expected the validate command, got {other:?}"),
    }
}
