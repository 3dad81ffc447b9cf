//! Rule generation: expanding one SLO into its recording and alerting
//! rules.
//!
//! Every name and label produced here is a pure function of the SLO and
//! the run options, so repeated runs over the same input emit identical
//! rule sets.

use crate::duration::format_duration;
use crate::error::{SliError, ValidationError};
use crate::model::{Slo, SloGroup};
use crate::sli::{resolve_sli, SliPluginRegistry};
use crate::window::{alert_windows, Severity, WindowSpec};
use std::collections::{BTreeMap, HashSet};
use std::time::Duration;

/// Labels the generator owns. User labels with these names are replaced.
pub const LABEL_ID: &str = "oxslo_id";
pub const LABEL_SERVICE: &str = "oxslo_service";
pub const LABEL_SLO: &str = "oxslo_slo";
pub const LABEL_WINDOW: &str = "oxslo_window";
pub const LABEL_SEVERITY: &str = "oxslo_severity";
pub const LABEL_OBJECTIVE: &str = "oxslo_objective";
pub const LABEL_PERIOD: &str = "oxslo_period";

/// A single generated Prometheus rule.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedRule {
    Recording {
        record: String,
        expr: String,
        labels: BTreeMap<String, String>,
    },
    Alerting {
        alert: String,
        expr: String,
        for_duration: Duration,
        labels: BTreeMap<String, String>,
        annotations: BTreeMap<String, String>,
        severity: Severity,
    },
}

impl GeneratedRule {
    /// Rule name; unique within a group.
    pub fn name(&self) -> &str {
        match self {
            GeneratedRule::Recording { record, .. } => record,
            GeneratedRule::Alerting { alert, .. } => alert,
        }
    }

    pub fn expr(&self) -> &str {
        match self {
            GeneratedRule::Recording { expr, .. } => expr,
            GeneratedRule::Alerting { expr, .. } => expr,
        }
    }

    pub fn labels(&self) -> &BTreeMap<String, String> {
        match self {
            GeneratedRule::Recording { labels, .. } => labels,
            GeneratedRule::Alerting { labels, .. } => labels,
        }
    }
}

/// Options applying to every generated rule of a run.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Extra labels stamped on every rule, below SLO and severity labels
    /// in precedence.
    pub extra_labels: BTreeMap<String, String>,
}

// Metric-name part: `-` maps to `_`. Service and name charset is
// validated before generation, so nothing else needs mapping.
fn metric_part(s: &str) -> String {
    s.replace('-', "_")
}

/// `slo:{service}_{name}:info`
pub fn info_metric_name(service: &str, name: &str) -> String {
    format!("slo:{}_{}:info", metric_part(service), metric_part(name))
}

/// `slo:{service}_{name}:error_ratio_rate{window}`
pub fn ratio_metric_name(service: &str, name: &str, window: Duration) -> String {
    format!(
        "slo:{}_{}:error_ratio_rate{}",
        metric_part(service),
        metric_part(name),
        format_duration(window)
    )
}

/// `slo_burn_rate_{service}_{name}_{severity}`
pub fn alert_name(service: &str, name: &str, severity: Severity) -> String {
    format!(
        "slo_burn_rate_{}_{}_{severity}",
        metric_part(service),
        metric_part(name)
    )
}

/// Incremental rule builder for one group, tracking name uniqueness.
///
/// SLOs are committed one at a time; a failing SLO contributes nothing
/// while rules already committed stay untouched.
pub struct GroupRuleBuilder<'a> {
    group: &'a SloGroup,
    plugins: &'a SliPluginRegistry,
    options: &'a GenerateOptions,
    used_names: HashSet<String>,
    rules: Vec<GeneratedRule>,
}

impl<'a> GroupRuleBuilder<'a> {
    pub fn new(
        group: &'a SloGroup,
        plugins: &'a SliPluginRegistry,
        options: &'a GenerateOptions,
    ) -> Self {
        Self {
            group,
            plugins,
            options,
            used_names: HashSet::new(),
            rules: Vec::new(),
        }
    }

    /// Generates and commits the rules for one SLO.
    ///
    /// # Errors
    ///
    /// Fails on SLI resolution problems or when a rule name is already
    /// taken within the group; the builder state is unchanged on failure.
    pub fn add_slo(&mut self, slo: &Slo) -> Result<(), ValidationError> {
        let candidate = self.build_rules(slo)?;
        for rule in &candidate {
            if self.used_names.contains(rule.name()) {
                return Err(ValidationError::RuleNameCollision {
                    source_id: self.group.source.clone(),
                    key: slo.key(),
                    group: self.group.name.clone(),
                    rule_name: rule.name().to_string(),
                });
            }
        }
        for rule in &candidate {
            self.used_names.insert(rule.name().to_string());
        }
        self.rules.extend(candidate);
        Ok(())
    }

    pub fn finish(self) -> Vec<GeneratedRule> {
        self.rules
    }

    fn build_rules(&self, slo: &Slo) -> Result<Vec<GeneratedRule>, ValidationError> {
        let specs = alert_windows(slo);
        let mut rules = Vec::new();

        rules.push(self.info_rule(slo));

        // every short and long window of the enabled severities,
        // deduplicated, ascending
        let mut windows: Vec<Duration> = specs
            .iter()
            .flat_map(|s| [s.short_window, s.long_window])
            .collect();
        windows.sort_unstable();
        windows.dedup();
        for window in windows {
            rules.push(self.ratio_rule(slo, window)?);
        }

        for spec in &specs {
            rules.push(self.alert_rule(slo, spec));
        }

        Ok(rules)
    }

    fn info_rule(&self, slo: &Slo) -> GeneratedRule {
        let mut labels = self.user_labels(slo);
        stamp_identity(&mut labels, slo);
        labels.insert(LABEL_OBJECTIVE.to_string(), slo.objective.to_string());
        labels.insert(LABEL_PERIOD.to_string(), format_duration(slo.period));
        GeneratedRule::Recording {
            record: info_metric_name(&slo.service, &slo.name),
            expr: "vector(1)".to_string(),
            labels,
        }
    }

    fn ratio_rule(&self, slo: &Slo, window: Duration) -> Result<GeneratedRule, ValidationError> {
        let expr = resolve_sli(slo, self.plugins, window).map_err(|err| match err {
            SliError::UnknownPlugin { id } => ValidationError::UnknownPlugin {
                source_id: self.group.source.clone(),
                key: slo.key(),
                plugin_id: id,
            },
            err => ValidationError::SliResolution {
                source_id: self.group.source.clone(),
                key: slo.key(),
                err,
            },
        })?;

        let mut labels = self.user_labels(slo);
        stamp_identity(&mut labels, slo);
        labels.insert(LABEL_WINDOW.to_string(), format_duration(window));
        Ok(GeneratedRule::Recording {
            record: ratio_metric_name(&slo.service, &slo.name, window),
            expr,
            labels,
        })
    }

    fn alert_rule(&self, slo: &Slo, spec: &WindowSpec) -> GeneratedRule {
        let id = slo.id();
        let threshold = format!("({} * {})", spec.burn_rate_factor, slo.error_budget());
        let short_metric = ratio_metric_name(&slo.service, &slo.name, spec.short_window);
        let long_metric = ratio_metric_name(&slo.service, &slo.name, spec.long_window);
        // both windows must exceed the threshold: the long window proves
        // the burn is sustained, the short one that it is still happening
        let burn = |metric: &str| {
            format!("max({metric}{{{LABEL_ID}=\"{id}\"}} > {threshold}) without ({LABEL_WINDOW})")
        };
        let expr = format!("({}) and ({})", burn(&short_metric), burn(&long_metric));

        let policy = slo.alerting.policy(spec.severity);
        let mut labels = self.user_labels(slo);
        labels.extend(slo.alerting.labels.clone());
        labels.extend(policy.labels.clone());
        stamp_identity(&mut labels, slo);
        labels.insert(LABEL_SEVERITY.to_string(), spec.severity.to_string());

        let mut annotations = BTreeMap::new();
        annotations.insert(
            "summary".to_string(),
            format!(
                "High error budget burn rate for SLO '{}' ({})",
                slo.key(),
                spec.severity
            ),
        );
        annotations.extend(slo.annotations.clone());
        annotations.extend(slo.alerting.annotations.clone());
        annotations.extend(policy.annotations.clone());

        GeneratedRule::Alerting {
            alert: alert_name(&slo.service, &slo.name, spec.severity),
            expr,
            for_duration: spec.short_window,
            labels,
            annotations,
            severity: spec.severity,
        }
    }

    fn user_labels(&self, slo: &Slo) -> BTreeMap<String, String> {
        let mut labels = self.options.extra_labels.clone();
        labels.extend(slo.labels.clone());
        labels
    }
}

// Identity labels go in last so user labels can never shadow them.
fn stamp_identity(labels: &mut BTreeMap<String, String>, slo: &Slo) {
    labels.insert(LABEL_ID.to_string(), slo.id());
    labels.insert(LABEL_SERVICE.to_string(), slo.service.clone());
    labels.insert(LABEL_SLO.to_string(), slo.name.clone());
}

/// Generates the full rule set for one group. A failing SLO aborts only
/// itself; rules from other SLOs are kept.
pub fn generate_group(
    group: &SloGroup,
    plugins: &SliPluginRegistry,
    options: &GenerateOptions,
) -> (Vec<GeneratedRule>, Vec<ValidationError>) {
    let mut builder = GroupRuleBuilder::new(group, plugins, options);
    let mut errors = Vec::new();
    for slo in &group.slos {
        if let Err(err) = builder.add_slo(slo) {
            errors.push(err);
        }
    }
    (builder.finish(), errors)
}
