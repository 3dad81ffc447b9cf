//! Structural validation, duplicate detection and the run driver.

use crate::error::ValidationError;
use crate::model::{Sli, Slo, SloGroup, SloKey, RESERVED_LABEL_PREFIX};
use crate::rules::{GenerateOptions, GeneratedRule, GroupRuleBuilder};
use crate::sli::SliPluginRegistry;
use crate::window::Severity;
use rayon::prelude::*;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

/// Tracks (service, name) pairs across a whole run so the same SLO cannot
/// be declared twice. One instance per run; never persisted.
pub struct DuplicateRegistry {
    seen: Mutex<HashMap<SloKey, String>>,
}

impl DuplicateRegistry {
    pub fn new() -> Self {
        Self {
            seen: Mutex::new(HashMap::new()),
        }
    }

    /// Atomically registers `key` for `source_id`. When the key is
    /// already taken, returns the source that registered it first.
    pub fn try_register(&self, key: &SloKey, source_id: &str) -> Result<(), String> {
        let mut seen = self.seen.lock().unwrap_or_else(|e| e.into_inner());
        match seen.get(key) {
            Some(first) => Err(first.clone()),
            None => {
                seen.insert(key.clone(), source_id.to_string());
                Ok(())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for DuplicateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-run behavior switches.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Skip duplicate SLOs (first declaration wins) instead of failing.
    pub ignore_duplicates: bool,
    /// Extra labels stamped on every generated rule.
    pub extra_labels: BTreeMap<String, String>,
}

/// Rules generated for one input group.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRules {
    pub group: String,
    pub source: String,
    pub rules: Vec<GeneratedRule>,
}

/// Outcome of one validation and generation run. Groups appear in input
/// order; errors are ordered by group, then by pass (structural,
/// duplicate, generation), then by SLO.
#[derive(Debug)]
pub struct RunReport {
    pub groups: Vec<GroupRules>,
    pub errors: Vec<ValidationError>,
    /// Duplicates silently dropped because ignoring was requested.
    pub skipped_duplicates: usize,
}

impl RunReport {
    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn rule_count(&self) -> usize {
        self.groups.iter().map(|g| g.rules.len()).sum()
    }
}

/// Prometheus label name: `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Prometheus metric or alert name: `[a-zA-Z_:][a-zA-Z0-9_:]*`.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}

fn is_valid_slo_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Structural checks for one SLO. Returns every violation, not only the
/// first one found.
pub fn validate_slo(slo: &Slo) -> Vec<String> {
    let mut problems = Vec::new();

    if !is_valid_slo_name(&slo.service) {
        problems.push(format!(
            "service '{}' must be non-empty and match [a-zA-Z0-9_-]",
            slo.service
        ));
    }
    if !is_valid_slo_name(&slo.name) {
        problems.push(format!(
            "name '{}' must be non-empty and match [a-zA-Z0-9_-]",
            slo.name
        ));
    }
    if !(slo.objective > 0.0 && slo.objective < 100.0) {
        problems.push(format!(
            "objective must be greater than 0 and less than 100, got {}",
            slo.objective
        ));
    }
    if slo.period.is_zero() {
        problems.push("error budget period must be greater than zero".to_string());
    }

    match &slo.sli {
        Sli::Raw { error_ratio_query } => {
            if error_ratio_query.trim().is_empty() {
                problems.push("sli.raw.error_ratio_query is empty".to_string());
            }
        }
        Sli::Events {
            error_query,
            total_query,
        } => {
            if error_query.trim().is_empty() {
                problems.push("sli.events.error_query is empty".to_string());
            }
            if total_query.trim().is_empty() {
                problems.push("sli.events.total_query is empty".to_string());
            }
        }
        Sli::Plugin { id, .. } => {
            if id.trim().is_empty() {
                problems.push("sli.plugin.id is empty".to_string());
            }
        }
    }

    check_label_keys(&slo.labels, "labels", true, &mut problems);
    check_label_keys(&slo.annotations, "annotations", false, &mut problems);
    check_label_keys(&slo.alerting.labels, "alerting.labels", true, &mut problems);
    check_label_keys(
        &slo.alerting.annotations,
        "alerting.annotations",
        false,
        &mut problems,
    );

    for severity in Severity::ALL {
        let policy = slo.alerting.policy(severity);
        check_label_keys(
            &policy.labels,
            &format!("alerting.{severity}.labels"),
            true,
            &mut problems,
        );
        check_label_keys(
            &policy.annotations,
            &format!("alerting.{severity}.annotations"),
            false,
            &mut problems,
        );
        if let Some(window) = &policy.window {
            if window.short_window >= window.long_window {
                problems.push(format!(
                    "alerting.{severity}: short_window must be shorter than long_window"
                ));
            }
            if !(window.burn_rate_factor > 0.0) {
                problems.push(format!(
                    "alerting.{severity}: burn_rate_factor must be greater than zero"
                ));
            }
        }
    }

    problems
}

fn check_label_keys(
    map: &BTreeMap<String, String>,
    field: &str,
    reserved: bool,
    problems: &mut Vec<String>,
) {
    for key in map.keys() {
        if !is_valid_label_name(key) {
            problems.push(format!("{field}: '{key}' is not a valid label name"));
        } else if reserved && key.starts_with(RESERVED_LABEL_PREFIX) {
            problems.push(format!(
                "{field}: '{key}' uses the reserved '{RESERVED_LABEL_PREFIX}' prefix"
            ));
        }
    }
}

/// Runs validation and generation over every group.
///
/// The duplicate pass runs first, sequentially in input order, so that
/// first-wins is deterministic; the structural and generation passes then
/// run per group in parallel. A failing group never aborts its siblings,
/// and in-flight groups always run to completion before the error set is
/// finalized.
pub fn run(
    groups: &[SloGroup],
    plugins: &SliPluginRegistry,
    registry: &DuplicateRegistry,
    options: &RunOptions,
) -> RunReport {
    // (group index, slo index) pairs excluded as duplicates
    let mut skip: HashSet<(usize, usize)> = HashSet::new();
    let mut duplicate_errors: Vec<Vec<ValidationError>> =
        (0..groups.len()).map(|_| Vec::new()).collect();
    let mut skipped = 0usize;

    for (gi, group) in groups.iter().enumerate() {
        for (si, slo) in group.slos.iter().enumerate() {
            if slo.service.is_empty() || slo.name.is_empty() {
                // no meaningful key; the structural pass reports these
                continue;
            }
            if let Err(first_source_id) = registry.try_register(&slo.key(), &group.source) {
                skip.insert((gi, si));
                if options.ignore_duplicates {
                    skipped += 1;
                } else {
                    duplicate_errors[gi].push(ValidationError::DuplicateSlo {
                        key: slo.key(),
                        source_id: group.source.clone(),
                        first_source_id,
                    });
                }
            }
        }
    }

    let generate_options = GenerateOptions {
        extra_labels: options.extra_labels.clone(),
    };

    let results: Vec<GroupOutcome> = groups
        .par_iter()
        .enumerate()
        .map(|(gi, group)| process_group(gi, group, &skip, plugins, &generate_options))
        .collect();

    let mut report = RunReport {
        groups: Vec::with_capacity(groups.len()),
        errors: Vec::new(),
        skipped_duplicates: skipped,
    };
    for (gi, outcome) in results.into_iter().enumerate() {
        report.errors.extend(outcome.structural);
        report.errors.extend(std::mem::take(&mut duplicate_errors[gi]));
        report.errors.extend(outcome.generation);
        report.groups.push(outcome.rules);
    }
    report
}

struct GroupOutcome {
    rules: GroupRules,
    structural: Vec<ValidationError>,
    generation: Vec<ValidationError>,
}

fn process_group(
    group_index: usize,
    group: &SloGroup,
    skip: &HashSet<(usize, usize)>,
    plugins: &SliPluginRegistry,
    options: &GenerateOptions,
) -> GroupOutcome {
    let mut structural = Vec::new();
    let mut generation = Vec::new();

    if group.slos.is_empty() {
        structural.push(ValidationError::Structural {
            source_id: group.source.clone(),
            subject: format!("group '{}'", group.name),
            detail: "spec declares no SLOs".to_string(),
        });
    }

    let mut valid = vec![true; group.slos.len()];
    for (si, slo) in group.slos.iter().enumerate() {
        for detail in validate_slo(slo) {
            valid[si] = false;
            structural.push(ValidationError::Structural {
                source_id: group.source.clone(),
                subject: format!("SLO '{}'", slo.key()),
                detail,
            });
        }
    }

    let mut builder = GroupRuleBuilder::new(group, plugins, options);
    for (si, slo) in group.slos.iter().enumerate() {
        if !valid[si] || skip.contains(&(group_index, si)) {
            continue;
        }
        if let Err(err) = builder.add_slo(slo) {
            generation.push(err);
        }
    }
    let rules = builder.finish();

    structural.extend(verify_rules(group, &rules));

    GroupOutcome {
        rules: GroupRules {
            group: group.name.clone(),
            source: group.source.clone(),
            rules,
        },
        structural,
        generation,
    }
}

/// Post-generation sanity checks over the produced rules. These guard
/// the generator's own output and never fire for validated input.
fn verify_rules(group: &SloGroup, rules: &[GeneratedRule]) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    for rule in rules {
        let mut details = Vec::new();
        if !is_valid_metric_name(rule.name()) {
            details.push(format!("'{}' is not a valid rule name", rule.name()));
        }
        if !seen.insert(rule.name()) {
            details.push(format!("rule name '{}' is not unique", rule.name()));
        }
        if rule.expr().trim().is_empty() {
            details.push(format!("rule '{}' has an empty expression", rule.name()));
        }
        for key in rule.labels().keys() {
            if !is_valid_label_name(key) {
                details.push(format!("rule '{}' label '{key}' is invalid", rule.name()));
            }
        }
        for detail in details {
            errors.push(ValidationError::Structural {
                source_id: group.source.clone(),
                subject: format!("group '{}'", group.name),
                detail,
            });
        }
    }
    errors
}
