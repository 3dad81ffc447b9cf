//! Prometheus rule-file rendering.
//!
//! Takes the rules a generation run produced and lays them out as one
//! Prometheus rule file: per SLO, a recordings group and an alerts
//! group, named after the SLO id. Output is deterministic, so a
//! generated file diffs cleanly between runs.

pub mod error;
pub mod rulefile;

#[cfg(test)]
mod tests;

pub use crate::error::RenderError;

use crate::rulefile::{PrometheusRule, RuleFile, RuleGroup};
use oxslo_core::rules::{GeneratedRule, LABEL_ID};
use oxslo_core::validate::GroupRules;
use std::collections::HashMap;

/// Output switches for one render.
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Leave recording rules out of the output.
    pub disable_recordings: bool,
    /// Leave alerting rules out of the output.
    pub disable_alerts: bool,
}

const RECORDINGS_GROUP_PREFIX: &str = "oxslo-slo-recordings-";
const ALERTS_GROUP_PREFIX: &str = "oxslo-slo-alerts-";

const HEADER: &str = concat!(
    "---\n",
    "# Code generated by oxslo v",
    env!("CARGO_PKG_VERSION"),
    ".\n",
    "# DO NOT EDIT.\n",
    "\n",
);

/// Renders generated rules as one Prometheus rule file.
///
/// Rules are partitioned per SLO by their identity label, in first-seen
/// order; empty groups are omitted, so disabling both rule kinds yields
/// a file with an empty group list.
///
/// # Errors
///
/// Fails only if YAML serialization itself fails.
pub fn render_rules(groups: &[GroupRules], options: &RenderOptions) -> Result<String, RenderError> {
    let mut out = Vec::new();
    for group in groups {
        for (slo_id, rules) in partition_by_slo(&group.rules) {
            if !options.disable_recordings {
                let name = format!("{RECORDINGS_GROUP_PREFIX}{slo_id}");
                push_group(&mut out, name, &rules, true);
            }
            if !options.disable_alerts {
                let name = format!("{ALERTS_GROUP_PREFIX}{slo_id}");
                push_group(&mut out, name, &rules, false);
            }
        }
    }

    let file = RuleFile { groups: out };
    let yaml = serde_yaml::to_string(&file)?;
    Ok(format!("{HEADER}{yaml}"))
}

fn push_group(out: &mut Vec<RuleGroup>, name: String, rules: &[&GeneratedRule], recordings: bool) {
    let rules: Vec<PrometheusRule> = rules
        .iter()
        .filter(|rule| matches!(rule, GeneratedRule::Recording { .. }) == recordings)
        .map(|rule| PrometheusRule::from(*rule))
        .collect();
    if !rules.is_empty() {
        out.push(RuleGroup { name, rules });
    }
}

// Groups a rule list by SLO id, keeping first-seen order. Every generated
// rule carries the identity label; the fallback id only guards against
// hand-built input.
fn partition_by_slo(rules: &[GeneratedRule]) -> Vec<(String, Vec<&GeneratedRule>)> {
    let mut order: Vec<String> = Vec::new();
    let mut by_id: HashMap<String, Vec<&GeneratedRule>> = HashMap::new();
    for rule in rules {
        let id = rule
            .labels()
            .get(LABEL_ID)
            .cloned()
            .unwrap_or_else(|| "unknown".to_string());
        if !by_id.contains_key(&id) {
            order.push(id.clone());
        }
        by_id.entry(id).or_default().push(rule);
    }
    order
        .into_iter()
        .map(|id| {
            let rules = by_id.remove(&id).unwrap_or_default();
            (id, rules)
        })
        .collect()
}
