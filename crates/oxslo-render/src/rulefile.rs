//! Prometheus rule-file data model.

use oxslo_core::duration::format_duration;
use oxslo_core::rules::GeneratedRule;
use serde::Serialize;
use std::collections::BTreeMap;

/// Top-level rule file, as Prometheus loads it.
#[derive(Debug, Serialize)]
pub struct RuleFile {
    pub groups: Vec<RuleGroup>,
}

#[derive(Debug, Serialize)]
pub struct RuleGroup {
    pub name: String,
    pub rules: Vec<PrometheusRule>,
}

/// One rule entry. Exactly one of `record` and `alert` is set; Prometheus
/// forbids annotations on recording rules, so those stay empty there.
#[derive(Debug, Serialize)]
pub struct PrometheusRule {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<String>,
    pub expr: String,
    #[serde(rename = "for", skip_serializing_if = "Option::is_none")]
    pub for_duration: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl From<&GeneratedRule> for PrometheusRule {
    fn from(rule: &GeneratedRule) -> Self {
        match rule {
            GeneratedRule::Recording {
                record,
                expr,
                labels,
            } => Self {
                record: Some(record.clone()),
                alert: None,
                expr: expr.clone(),
                for_duration: None,
                labels: labels.clone(),
                annotations: BTreeMap::new(),
            },
            GeneratedRule::Alerting {
                alert,
                expr,
                for_duration,
                labels,
                annotations,
                ..
            } => Self {
                record: None,
                alert: Some(alert.clone()),
                expr: expr.clone(),
                for_duration: Some(format_duration(*for_duration)),
                labels: labels.clone(),
                annotations: annotations.clone(),
            },
        }
    }
}
