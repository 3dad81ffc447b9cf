//! Generate and validate command implementations.
//!
//! Both commands share the same load pipeline: discover spec files,
//! parse each one independently, then hand every parsed group to the
//! core run. Per-file failures are logged and counted instead of
//! aborting the batch, so one broken spec never hides problems in the
//! rest.

use crate::discover::discover_spec_files;
use crate::{GenerateArgs, ValidateArgs};
use anyhow::{bail, Context, Result};
use oxslo_core::duration::parse_duration;
use oxslo_core::model::{SloGroup, RESERVED_LABEL_PREFIX};
use oxslo_core::sli::SliPluginRegistry;
use oxslo_core::validate::{is_valid_label_name, run, DuplicateRegistry, RunOptions, RunReport};
use oxslo_render::{render_rules, RenderOptions};
use oxslo_spec::{parse_spec, ParseOptions};
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Counters reported back to `main` for exit-code handling.
#[derive(Debug, Default)]
pub struct CommandSummary {
    pub spec_files: usize,
    pub slo_count: usize,
    pub rule_count: usize,
    pub error_count: usize,
}

impl CommandSummary {
    pub fn failed(&self) -> bool {
        self.error_count > 0
    }
}

struct LoadedSpecs {
    groups: Vec<SloGroup>,
    files: usize,
    parse_errors: usize,
}

pub fn run_generate(args: &GenerateArgs) -> Result<CommandSummary> {
    let extra_labels = parse_extra_labels(&args.extra_labels)?;
    let loaded = load_specs(
        &args.input,
        args.fs_include.as_deref(),
        args.fs_exclude.as_deref(),
        &args.default_slo_period,
    )?;

    let report = run_groups(&loaded, args.ignore_slo_duplicates, extra_labels);
    let summary = summarize(&loaded, &report);
    if summary.failed() {
        tracing::error!(errors = summary.error_count, "Not writing rules");
        return Ok(summary);
    }

    let options = RenderOptions {
        disable_recordings: args.disable_recordings,
        disable_alerts: args.disable_alerts,
    };
    let rendered = render_rules(&report.groups, &options)?;
    write_output(&args.output, &rendered)?;
    tracing::info!(
        specs = summary.spec_files,
        slos = summary.slo_count,
        rules = summary.rule_count,
        "Rules generated"
    );
    Ok(summary)
}

pub fn run_validate(args: &ValidateArgs) -> Result<CommandSummary> {
    let loaded = load_specs(
        &args.input,
        args.fs_include.as_deref(),
        args.fs_exclude.as_deref(),
        &args.default_slo_period,
    )?;

    let report = run_groups(&loaded, args.ignore_slo_duplicates, BTreeMap::new());
    let summary = summarize(&loaded, &report);
    if summary.failed() {
        tracing::error!(errors = summary.error_count, "Validation failed");
    } else {
        tracing::info!(
            specs = summary.spec_files,
            slos = summary.slo_count,
            rules = summary.rule_count,
            "Validation passed"
        );
    }
    Ok(summary)
}

fn load_specs(
    input: &Path,
    include: Option<&str>,
    exclude: Option<&str>,
    default_period: &str,
) -> Result<LoadedSpecs> {
    let default_period = parse_duration(default_period)
        .map_err(|err| anyhow::anyhow!("--default-slo-period: {err}"))?;
    let include = compile_filter(include, "--fs-include")?;
    let exclude = compile_filter(exclude, "--fs-exclude")?;

    let files = discover_spec_files(input, include.as_ref(), exclude.as_ref())
        .with_context(|| format!("discovering spec files under {}", input.display()))?;
    if files.is_empty() {
        bail!("no SLO spec files found under {}", input.display());
    }
    tracing::debug!(count = files.len(), "Discovered spec files");

    let options = ParseOptions { default_period };
    let mut groups = Vec::new();
    let mut parse_errors = 0usize;
    for path in &files {
        let source_id = path.display().to_string();
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(err) => {
                tracing::error!(source = %source_id, error = %err, "Failed to read spec file");
                parse_errors += 1;
                continue;
            }
        };
        match parse_spec(&source_id, &raw, &options) {
            Ok(mut parsed) => {
                tracing::debug!(source = %source_id, groups = parsed.len(), "Parsed spec file");
                groups.append(&mut parsed);
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to parse spec file");
                parse_errors += 1;
            }
        }
    }
    Ok(LoadedSpecs {
        groups,
        files: files.len(),
        parse_errors,
    })
}

fn run_groups(
    loaded: &LoadedSpecs,
    ignore_duplicates: bool,
    extra_labels: BTreeMap<String, String>,
) -> RunReport {
    let plugins = SliPluginRegistry::default();
    let registry = DuplicateRegistry::new();
    let options = RunOptions {
        ignore_duplicates,
        extra_labels,
    };
    let report = run(&loaded.groups, &plugins, &registry, &options);
    for err in &report.errors {
        tracing::error!(error = %err, "SLO rejected");
    }
    if report.skipped_duplicates > 0 {
        tracing::warn!(
            count = report.skipped_duplicates,
            "Duplicate SLOs skipped, first declaration wins"
        );
    }
    report
}

fn summarize(loaded: &LoadedSpecs, report: &RunReport) -> CommandSummary {
    CommandSummary {
        spec_files: loaded.files,
        slo_count: loaded.groups.iter().map(|group| group.slos.len()).sum(),
        rule_count: report.rule_count(),
        error_count: loaded.parse_errors + report.errors.len(),
    }
}

fn compile_filter(pattern: Option<&str>, flag: &str) -> Result<Option<Regex>> {
    match pattern {
        Some(pattern) => {
            let regex = Regex::new(pattern)
                .with_context(|| format!("{flag}: invalid regex '{pattern}'"))?;
            Ok(Some(regex))
        }
        None => Ok(None),
    }
}

fn write_output(target: &str, rendered: &str) -> Result<()> {
    if target == "-" {
        let mut stdout = std::io::stdout().lock();
        stdout.write_all(rendered.as_bytes())?;
        return Ok(());
    }
    let path = PathBuf::from(target);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }
    fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
    tracing::info!(path = %path.display(), "Rule file written");
    Ok(())
}

pub(crate) fn parse_extra_labels(pairs: &[String]) -> Result<BTreeMap<String, String>> {
    let mut labels = BTreeMap::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            bail!("--extra-labels: '{pair}' is not key=value");
        };
        if !is_valid_label_name(key) {
            bail!("--extra-labels: '{key}' is not a valid Prometheus label name");
        }
        if key.starts_with(RESERVED_LABEL_PREFIX) {
            bail!("--extra-labels: '{key}' uses the reserved '{RESERVED_LABEL_PREFIX}' prefix");
        }
        labels.insert(key.to_string(), value.to_string());
    }
    Ok(labels)
}
