//! OpenSLO `openslo/v1alpha` dialect.
//!
//! Only the subset that maps onto Prometheus event ratios is accepted:
//! one objective backed by `ratioMetrics` with promql sources, at most
//! one time window, and the `Occurrences` budgeting method. The good
//! ratio is inverted into an error ratio at parse time, after which the
//! SLO is indistinguishable from a native events SLO.

use crate::error::ParseError;
use crate::ParseOptions;
use oxslo_core::model::{Alerting, Sli, Slo, SloGroup};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const PROMETHEUS_SOURCE: &str = "prometheus";
const PROMQL_QUERY_TYPE: &str = "promql";
const OCCURRENCES_METHOD: &str = "Occurrences";

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "apiVersion")]
    api_version: String,
    kind: String,
    metadata: Metadata,
    spec: SloSpec,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
    #[serde(default, rename = "displayName")]
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SloSpec {
    service: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default, rename = "budgetingMethod")]
    budgeting_method: Option<String>,
    #[serde(default)]
    objectives: Vec<Objective>,
    #[serde(default, rename = "timeWindows")]
    time_windows: Vec<TimeWindow>,
}

#[derive(Debug, Deserialize)]
struct Objective {
    target: f64,
    #[serde(default, rename = "ratioMetrics")]
    ratio_metrics: Option<RatioMetrics>,
}

#[derive(Debug, Deserialize)]
struct RatioMetrics {
    good: MetricSource,
    total: MetricSource,
}

#[derive(Debug, Deserialize)]
struct MetricSource {
    source: String,
    #[serde(rename = "queryType")]
    query_type: String,
    query: String,
}

#[derive(Debug, Deserialize)]
struct TimeWindow {
    count: u32,
    unit: String,
}

/// Parses one OpenSLO document into a single-SLO group.
pub(crate) fn parse(
    source_id: &str,
    value: serde_yaml::Value,
    options: &ParseOptions,
) -> Result<SloGroup, ParseError> {
    let invalid = |detail: String| ParseError::Invalid {
        source_id: source_id.to_string(),
        detail,
    };

    let manifest: Manifest = serde_yaml::from_value(value).map_err(|err| ParseError::Yaml {
        source_id: source_id.to_string(),
        err,
    })?;
    if manifest.api_version != crate::OPENSLO_API_VERSION || manifest.kind != crate::OPENSLO_KIND {
        return Err(invalid(format!(
            "unsupported object {}/{}",
            manifest.api_version, manifest.kind
        )));
    }
    let name = manifest.metadata.name;
    let spec = manifest.spec;

    if let Some(method) = &spec.budgeting_method {
        if method != OCCURRENCES_METHOD {
            return Err(invalid(format!(
                "SLO '{name}': budgeting method '{method}' is not supported \
                 (only {OCCURRENCES_METHOD})"
            )));
        }
    }

    let mut objectives = spec.objectives;
    if objectives.len() != 1 {
        return Err(invalid(format!(
            "SLO '{name}': exactly one objective is required, got {}",
            objectives.len()
        )));
    }
    let objective = objectives.remove(0);

    let ratio = objective
        .ratio_metrics
        .ok_or_else(|| invalid(format!("SLO '{name}': the objective must define ratioMetrics")))?;
    for metric in [&ratio.good, &ratio.total] {
        if metric.source != PROMETHEUS_SOURCE || metric.query_type != PROMQL_QUERY_TYPE {
            return Err(invalid(format!(
                "SLO '{name}': ratio metrics must use source '{PROMETHEUS_SOURCE}' \
                 and queryType '{PROMQL_QUERY_TYPE}'"
            )));
        }
    }

    let period = match spec.time_windows.len() {
        0 => options.default_period,
        1 => window_duration(&name, &spec.time_windows[0], &invalid)?,
        n => {
            return Err(invalid(format!(
                "SLO '{name}': at most one time window is supported, got {n}"
            )))
        }
    };

    // OpenSLO targets are a 0..1 fraction; objectives here are percent.
    // Bounds are checked by validation along with everything else.
    let slo = Slo {
        service: spec.service,
        name: name.clone(),
        description: spec.description.or(manifest.metadata.display_name),
        objective: objective.target * 100.0,
        period,
        labels: BTreeMap::new(),
        annotations: BTreeMap::new(),
        sli: Sli::Events {
            error_query: format!("({}) - ({})", ratio.total.query, ratio.good.query),
            total_query: ratio.total.query,
        },
        alerting: Alerting::default(),
    };

    Ok(SloGroup {
        name,
        source: source_id.to_string(),
        slos: vec![slo],
    })
}

fn window_duration(
    name: &str,
    window: &TimeWindow,
    invalid: &impl Fn(String) -> ParseError,
) -> Result<Duration, ParseError> {
    let unit = match window.unit.as_str() {
        "Hour" => Duration::from_secs(60 * 60),
        "Day" => Duration::from_secs(24 * 60 * 60),
        "Week" => Duration::from_secs(7 * 24 * 60 * 60),
        other => {
            return Err(invalid(format!(
                "SLO '{name}': unsupported time window unit '{other}'"
            )))
        }
    };
    Ok(unit * window.count)
}
