//! Intermediate representation shared by every input dialect.
//!
//! Parsers converge on these types; validation and rule generation never
//! branch on where an SLO came from. The types are plain data: malformed
//! values (an objective of 150, an empty service) are representable and
//! rejected by the validator, not by constructors.

use crate::window::Severity;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Error budget period applied when a spec does not set one.
pub const DEFAULT_ERROR_BUDGET_PERIOD: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Label prefix owned by the rule generator. User labels must not use it.
pub const RESERVED_LABEL_PREFIX: &str = "oxslo_";

/// A named batch of SLOs originating from one spec document.
#[derive(Debug, Clone, PartialEq)]
pub struct SloGroup {
    /// Group name: the service for native specs, `metadata.name` for the
    /// Kubernetes and OpenSLO dialects.
    pub name: String,
    /// Opaque source identifier (usually a file path), used only for
    /// error attribution.
    pub source: String,
    pub slos: Vec<Slo>,
}

/// A single service level objective.
#[derive(Debug, Clone, PartialEq)]
pub struct Slo {
    pub service: String,
    pub name: String,
    pub description: Option<String>,
    /// Target percentage, strictly between 0 and 100 (e.g. `99.9`).
    pub objective: f64,
    /// Error budget period the objective applies to.
    pub period: Duration,
    /// Labels propagated to every generated rule of this SLO.
    pub labels: BTreeMap<String, String>,
    /// Annotations propagated to the generated alert rules.
    pub annotations: BTreeMap<String, String>,
    pub sli: Sli,
    pub alerting: Alerting,
}

impl Slo {
    /// Identity used in generated labels and output group names.
    pub fn id(&self) -> String {
        format!("{}-{}", self.service, self.name)
    }

    pub fn key(&self) -> SloKey {
        SloKey::new(&self.service, &self.name)
    }

    /// Allowed failure fraction, e.g. 0.001 for a 99.9 objective.
    pub fn error_budget(&self) -> f64 {
        (100.0 - self.objective) / 100.0
    }
}

/// Duplicate key: the (service, name) pair must be unique within a run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SloKey {
    pub service: String,
    pub name: String,
}

impl SloKey {
    pub fn new(service: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for SloKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.service, self.name)
    }
}

/// How the error ratio is measured. Exactly one variant per SLO.
#[derive(Debug, Clone, PartialEq)]
pub enum Sli {
    /// A query template computing the error ratio directly.
    Raw { error_ratio_query: String },
    /// Separate error-count and total-count templates, combined by the
    /// resolver as `(error) / (total)`.
    Events {
        error_query: String,
        total_query: String,
    },
    /// Delegation to a registered SLI plugin.
    Plugin {
        id: String,
        options: BTreeMap<String, String>,
    },
}

/// Alerting configuration for one SLO.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Alerting {
    /// Labels added to every alert rule of this SLO.
    pub labels: BTreeMap<String, String>,
    /// Annotations added to every alert rule of this SLO.
    pub annotations: BTreeMap<String, String>,
    pub page: AlertPolicy,
    pub ticket: AlertPolicy,
}

impl Alerting {
    /// Policy for one severity tier.
    pub fn policy(&self, severity: Severity) -> &AlertPolicy {
        match severity {
            Severity::Page => &self.page,
            Severity::Ticket => &self.ticket,
        }
    }
}

/// Per-severity alerting policy.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPolicy {
    /// Disabled severities contribute no rules at all.
    pub enabled: bool,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
    /// Replaces the computed window/burn-rate triple for this severity.
    pub window: Option<WindowOverride>,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            window: None,
        }
    }
}

/// Explicit window/burn-rate triple overriding the standard table.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowOverride {
    pub short_window: Duration,
    pub long_window: Duration,
    pub burn_rate_factor: f64,
}
