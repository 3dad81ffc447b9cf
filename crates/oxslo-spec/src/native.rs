//! Native `oxslo/v1` spec dialect.

use crate::error::ParseError;
use crate::ParseOptions;
use oxslo_core::duration::parse_duration;
use oxslo_core::model::{AlertPolicy, Alerting, Sli, Slo, SloGroup, WindowOverride};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Body of a native spec document.
///
/// The Kubernetes dialect nests this same shape under `spec:`, so it is
/// shared between the two parsers. `version` is the native top-level
/// marker and stays unset in the Kubernetes form.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct SpecBody {
    #[serde(default)]
    version: Option<String>,
    service: String,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    slos: Vec<SloSpec>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SloSpec {
    name: String,
    objective: f64,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    period: Option<String>,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    sli: SliSpec,
    #[serde(default)]
    alerting: AlertingSpec,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SliSpec {
    #[serde(default)]
    raw: Option<RawSli>,
    #[serde(default)]
    events: Option<EventsSli>,
    #[serde(default)]
    plugin: Option<PluginSli>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSli {
    error_ratio_query: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventsSli {
    error_query: String,
    total_query: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PluginSli {
    id: String,
    #[serde(default)]
    options: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct AlertingSpec {
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    #[serde(default)]
    page: PolicySpec,
    #[serde(default)]
    ticket: PolicySpec,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct PolicySpec {
    #[serde(default)]
    disable: bool,
    #[serde(default)]
    labels: BTreeMap<String, String>,
    #[serde(default)]
    annotations: BTreeMap<String, String>,
    #[serde(default)]
    short_window: Option<String>,
    #[serde(default)]
    long_window: Option<String>,
    #[serde(default)]
    burn_rate_factor: Option<f64>,
}

/// Parses one native document. The group is named after the service.
pub(crate) fn parse(
    source_id: &str,
    value: serde_yaml::Value,
    options: &ParseOptions,
) -> Result<SloGroup, ParseError> {
    let body: SpecBody = serde_yaml::from_value(value).map_err(|err| ParseError::Yaml {
        source_id: source_id.to_string(),
        err,
    })?;
    match body.version.as_deref() {
        Some(crate::NATIVE_VERSION) => {}
        other => {
            return Err(ParseError::Invalid {
                source_id: source_id.to_string(),
                detail: format!("unsupported spec version '{}'", other.unwrap_or("")),
            })
        }
    }
    let group_name = body.service.clone();
    build_group(source_id, group_name, body, options)
}

/// Converts a parsed body into a group. Shared with the Kubernetes
/// dialect, which supplies its own group name from object metadata.
pub(crate) fn build_group(
    source_id: &str,
    group_name: String,
    body: SpecBody,
    options: &ParseOptions,
) -> Result<SloGroup, ParseError> {
    let SpecBody {
        service,
        labels,
        slos,
        ..
    } = body;
    let mut converted = Vec::with_capacity(slos.len());
    for slo in slos {
        converted.push(convert_slo(source_id, &service, &labels, slo, options)?);
    }
    Ok(SloGroup {
        name: group_name,
        source: source_id.to_string(),
        slos: converted,
    })
}

fn convert_slo(
    source_id: &str,
    service: &str,
    group_labels: &BTreeMap<String, String>,
    spec: SloSpec,
    options: &ParseOptions,
) -> Result<Slo, ParseError> {
    let SloSpec {
        name,
        objective,
        description,
        period,
        labels: slo_labels,
        annotations,
        sli,
        alerting,
    } = spec;

    let invalid = |detail: String| ParseError::Invalid {
        source_id: source_id.to_string(),
        detail,
    };

    let period = match period {
        Some(text) => {
            parse_duration(&text).map_err(|err| invalid(format!("SLO '{name}': {err}")))?
        }
        None => options.default_period,
    };

    let sli = match (sli.raw, sli.events, sli.plugin) {
        (Some(raw), None, None) => Sli::Raw {
            error_ratio_query: raw.error_ratio_query,
        },
        (None, Some(events), None) => Sli::Events {
            error_query: events.error_query,
            total_query: events.total_query,
        },
        (None, None, Some(plugin)) => Sli::Plugin {
            id: plugin.id,
            options: plugin.options,
        },
        _ => {
            return Err(invalid(format!(
                "SLO '{name}': sli must set exactly one of raw, events, plugin"
            )))
        }
    };

    let AlertingSpec {
        labels: alert_labels,
        annotations: alert_annotations,
        page,
        ticket,
    } = alerting;
    let alerting = Alerting {
        labels: alert_labels,
        annotations: alert_annotations,
        page: convert_policy(&name, "page", page, &invalid)?,
        ticket: convert_policy(&name, "ticket", ticket, &invalid)?,
    };

    // Group labels apply to every SLO; the SLO's own labels win on conflict.
    let mut labels = group_labels.clone();
    labels.extend(slo_labels);

    Ok(Slo {
        service: service.to_string(),
        name,
        description,
        objective,
        period,
        labels,
        annotations,
        sli,
        alerting,
    })
}

fn convert_policy(
    name: &str,
    severity: &str,
    spec: PolicySpec,
    invalid: &impl Fn(String) -> ParseError,
) -> Result<AlertPolicy, ParseError> {
    let window = match (spec.short_window, spec.long_window, spec.burn_rate_factor) {
        (None, None, None) => None,
        (Some(short), Some(long), Some(factor)) => Some(WindowOverride {
            short_window: parse_duration(&short)
                .map_err(|err| invalid(format!("SLO '{name}': alerting.{severity}: {err}")))?,
            long_window: parse_duration(&long)
                .map_err(|err| invalid(format!("SLO '{name}': alerting.{severity}: {err}")))?,
            burn_rate_factor: factor,
        }),
        _ => {
            return Err(invalid(format!(
                "SLO '{name}': alerting.{severity}: short_window, long_window and \
                 burn_rate_factor must be set together"
            )))
        }
    };
    Ok(AlertPolicy {
        enabled: !spec.disable,
        labels: spec.labels,
        annotations: spec.annotations,
        window,
    })
}
