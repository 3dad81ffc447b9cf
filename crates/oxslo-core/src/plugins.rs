//! Built-in SLI plugins for common HTTP service indicators.
//!
//! Each plugin expands a small option map into a full error-ratio query,
//! so that teams do not have to repeat the same rate/sum boilerplate in
//! every spec file.

use crate::duration::format_duration;
use crate::error::SliError;
use crate::model::Slo;
use crate::validate::is_valid_metric_name;
use crate::SliPlugin;
use std::collections::BTreeMap;
use std::time::Duration;

const OPT_METRIC: &str = "metric";
const OPT_FILTER: &str = "filter";
const OPT_ERROR_FILTER: &str = "error_filter";
const OPT_LE: &str = "le";

/// Error-request ratio over a request counter (e.g. 5xx responses out of
/// all responses).
///
/// Options:
/// - `metric`: counter name, default `http_requests_total`
/// - `error_filter`: matchers selecting error series, default `code=~"5.."`
/// - `filter`: optional base matchers applied to both sides
pub struct HttpAvailabilityPlugin;

impl SliPlugin for HttpAvailabilityPlugin {
    fn id(&self) -> &str {
        "http-availability"
    }

    fn resolve(
        &self,
        _slo: &Slo,
        options: &BTreeMap<String, String>,
        window: Duration,
    ) -> Result<String, SliError> {
        check_options(self.id(), options, &[OPT_METRIC, OPT_FILTER, OPT_ERROR_FILTER])?;
        let metric = check_metric(
            self.id(),
            option_or(options, OPT_METRIC, "http_requests_total"),
        )?;
        let filter = option_or(options, OPT_FILTER, "");
        let error_filter = option_or(options, OPT_ERROR_FILTER, r#"code=~"5..""#);

        let window = format_duration(window);
        let error_sel = selector(&[filter, error_filter]);
        let total_sel = selector(&[filter]);
        Ok(format!(
            "sum(rate({metric}{error_sel}[{window}])) / sum(rate({metric}{total_sel}[{window}]))"
        ))
    }
}

/// Slow-request ratio over a histogram: requests above a bucket boundary
/// out of all requests.
///
/// Options:
/// - `metric`: histogram base name, default `http_request_duration_seconds`
/// - `le`: bucket boundary counting as fast enough (required)
/// - `filter`: optional base matchers
pub struct HttpLatencyPlugin;

impl SliPlugin for HttpLatencyPlugin {
    fn id(&self) -> &str {
        "http-latency"
    }

    fn resolve(
        &self,
        _slo: &Slo,
        options: &BTreeMap<String, String>,
        window: Duration,
    ) -> Result<String, SliError> {
        check_options(self.id(), options, &[OPT_METRIC, OPT_FILTER, OPT_LE])?;
        let metric = check_metric(
            self.id(),
            option_or(options, OPT_METRIC, "http_request_duration_seconds"),
        )?;
        let le = options.get(OPT_LE).ok_or_else(|| SliError::Plugin {
            id: self.id().to_string(),
            reason: "option 'le' is required".to_string(),
        })?;
        if le.parse::<f64>().is_err() {
            return Err(SliError::Plugin {
                id: self.id().to_string(),
                reason: format!("option 'le' must be a number, got '{le}'"),
            });
        }
        let filter = option_or(options, OPT_FILTER, "");

        let window = format_duration(window);
        let le_matcher = format!(r#"le="{le}""#);
        let count_sel = selector(&[filter]);
        let bucket_sel = selector(&[filter, &le_matcher]);
        let count = format!("sum(rate({metric}_count{count_sel}[{window}]))");
        let bucket = format!("sum(rate({metric}_bucket{bucket_sel}[{window}]))");
        Ok(format!("({count} - {bucket}) / {count}"))
    }
}

fn option_or<'a>(options: &'a BTreeMap<String, String>, key: &str, default: &'a str) -> &'a str {
    options.get(key).map(String::as_str).unwrap_or(default)
}

fn check_options(
    id: &str,
    options: &BTreeMap<String, String>,
    allowed: &[&str],
) -> Result<(), SliError> {
    for key in options.keys() {
        if !allowed.contains(&key.as_str()) {
            return Err(SliError::Plugin {
                id: id.to_string(),
                reason: format!("unknown option '{key}'"),
            });
        }
    }
    Ok(())
}

fn check_metric<'a>(id: &str, metric: &'a str) -> Result<&'a str, SliError> {
    if !is_valid_metric_name(metric) {
        return Err(SliError::Plugin {
            id: id.to_string(),
            reason: format!("invalid metric name '{metric}'"),
        });
    }
    Ok(metric)
}

/// Builds a `{...}` selector from matchers, skipping empty ones. Returns
/// an empty string when no matcher remains.
fn selector(matchers: &[&str]) -> String {
    let parts: Vec<&str> = matchers.iter().copied().filter(|m| !m.is_empty()).collect();
    if parts.is_empty() {
        String::new()
    } else {
        format!("{{{}}}", parts.join(", "))
    }
}
