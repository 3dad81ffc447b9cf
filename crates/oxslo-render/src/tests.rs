//! Rule-file layout and determinism.

use crate::{render_rules, RenderOptions};
use oxslo_core::model::{Sli, Slo, SloGroup, DEFAULT_ERROR_BUDGET_PERIOD};
use oxslo_core::rules::{generate_group, GenerateOptions, GeneratedRule};
use oxslo_core::sli::SliPluginRegistry;
use oxslo_core::validate::GroupRules;
use std::collections::BTreeMap;

fn make_slo(service: &str, name: &str) -> Slo {
    Slo {
        service: service.to_string(),
        name: name.to_string(),
        description: None,
        objective: 99.9,
        period: DEFAULT_ERROR_BUDGET_PERIOD,
        labels: BTreeMap::new(),
        annotations: BTreeMap::new(),
        sli: Sli::Raw {
            error_ratio_query:
                "sum(rate(errors_total[{{window}}])) / sum(rate(requests_total[{{window}}]))"
                    .to_string(),
        },
        alerting: Default::default(),
    }
}

fn rules_for(slos: Vec<Slo>) -> GroupRules {
    let group = SloGroup {
        name: "api".to_string(),
        source: "test.yaml".to_string(),
        slos,
    };
    let plugins = SliPluginRegistry::default();
    let (rules, errors) = generate_group(&group, &plugins, &GenerateOptions::default());
    assert!(errors.is_empty(), "unexpected generation errors: {errors:?}");
    GroupRules {
        group: group.name,
        source: group.source,
        rules,
    }
}

fn parse_back(yaml: &str) -> serde_yaml::Value {
    serde_yaml::from_str(yaml).expect("rendered output should be valid YAML")
}

fn group_names(value: &serde_yaml::Value) -> Vec<String> {
    value["groups"]
        .as_sequence()
        .expect("groups should be a sequence")
        .iter()
        .map(|group| {
            group["name"]
                .as_str()
                .expect("group name should be a string")
                .to_string()
        })
        .collect()
}

#[test]
fn rendered_file_carries_the_generated_header() {
    let rules = rules_for(vec![make_slo("api", "latency")]);
    let yaml = render_rules(&[rules], &RenderOptions::default()).unwrap();

    assert!(yaml.starts_with("---\n# Code generated by oxslo v"));
    assert!(yaml.contains("# DO NOT EDIT.\n"));
}

#[test]
fn groups_are_partitioned_per_slo_in_first_seen_order() {
    let rules = rules_for(vec![make_slo("api", "latency"), make_slo("api", "checkout")]);
    let yaml = render_rules(&[rules], &RenderOptions::default()).unwrap();

    let value = parse_back(&yaml);
    assert_eq!(
        group_names(&value),
        [
            "oxslo-slo-recordings-api-latency",
            "oxslo-slo-alerts-api-latency",
            "oxslo-slo-recordings-api-checkout",
            "oxslo-slo-alerts-api-checkout",
        ]
    );
}

#[test]
fn rule_entries_have_prometheus_rule_file_shape() {
    let rules = rules_for(vec![make_slo("api", "latency")]);
    let alert_expr = rules
        .rules
        .iter()
        .find_map(|rule| match rule {
            GeneratedRule::Alerting { expr, .. } => Some(expr.clone()),
            GeneratedRule::Recording { .. } => None,
        })
        .expect("an alert rule should be generated");
    let yaml = render_rules(&[rules], &RenderOptions::default()).unwrap();

    let value = parse_back(&yaml);
    let groups = value["groups"].as_sequence().unwrap();

    let recording = &groups[0]["rules"][0];
    assert_eq!(recording["record"].as_str(), Some("slo:api_latency:info"));
    assert!(recording.get("alert").is_none());
    assert!(recording.get("for").is_none());
    assert!(recording.get("annotations").is_none());
    assert_eq!(recording["labels"]["oxslo_id"].as_str(), Some("api-latency"));

    let alert = &groups[1]["rules"][0];
    assert_eq!(
        alert["alert"].as_str(),
        Some("slo_burn_rate_api_latency_page")
    );
    assert!(alert.get("record").is_none());
    assert_eq!(alert["for"].as_str(), Some("5m"));
    assert_eq!(alert["expr"].as_str(), Some(alert_expr.as_str()));
    assert_eq!(alert["labels"]["oxslo_severity"].as_str(), Some("page"));
    assert!(alert["annotations"]["summary"].as_str().is_some());
}

#[test]
fn disable_recordings_keeps_only_alert_groups() {
    let rules = rules_for(vec![make_slo("api", "latency")]);
    let options = RenderOptions {
        disable_recordings: true,
        disable_alerts: false,
    };
    let yaml = render_rules(&[rules], &options).unwrap();

    let names = group_names(&parse_back(&yaml));
    assert_eq!(names, ["oxslo-slo-alerts-api-latency"]);
}

#[test]
fn disable_alerts_keeps_only_recording_groups() {
    let rules = rules_for(vec![make_slo("api", "latency")]);
    let options = RenderOptions {
        disable_recordings: false,
        disable_alerts: true,
    };
    let yaml = render_rules(&[rules], &options).unwrap();

    let names = group_names(&parse_back(&yaml));
    assert_eq!(names, ["oxslo-slo-recordings-api-latency"]);
}

#[test]
fn disabling_both_kinds_leaves_an_empty_group_list() {
    let rules = rules_for(vec![make_slo("api", "latency")]);
    let options = RenderOptions {
        disable_recordings: true,
        disable_alerts: true,
    };
    let yaml = render_rules(&[rules], &options).unwrap();

    assert!(yaml.contains("groups: []"));
}

#[test]
fn empty_input_renders_an_empty_group_list() {
    let yaml = render_rules(&[], &RenderOptions::default()).unwrap();
    assert!(yaml.contains("groups: []"));
}

#[test]
fn output_is_byte_stable_across_renders() {
    let first_rules = rules_for(vec![make_slo("api", "latency"), make_slo("api", "checkout")]);
    let second_rules = rules_for(vec![make_slo("api", "latency"), make_slo("api", "checkout")]);

    let first = render_rules(&[first_rules], &RenderOptions::default()).unwrap();
    let second = render_rules(&[second_rules], &RenderOptions::default()).unwrap();
    assert_eq!(first, second);
}
