//! SLO processing core: intermediate representation, validation, and
//! multi-window multi-burn-rate Prometheus rule generation.
//!
//! Input dialects are parsed elsewhere and converge on [`model::Slo`];
//! this crate derives evaluation windows, resolves SLI definitions into
//! query strings through registered [`SliPlugin`]s, and expands each SLO
//! into its recording and alerting rules. The crate is pure: no I/O, no
//! logging, no process exits; every failure is a typed error carrying
//! its source attribution.

pub mod duration;
pub mod error;
pub mod model;
pub mod plugins;
pub mod rules;
pub mod sli;
pub mod validate;
pub mod window;


use crate::error::SliError;
use crate::model::Slo;
use std::collections::BTreeMap;
use std::time::Duration;

/// A reusable SLI definition that expands into an error-ratio query for a
/// concrete evaluation window.
///
/// Implementations are registered in the [`sli::SliPluginRegistry`] by
/// their `id()` and looked up when an SLO declares `sli.plugin`.
/// Resolution must be deterministic: the same SLO, options and window
/// always produce the same query string.
pub trait SliPlugin: Send + Sync {
    /// Returns the plugin id SLOs reference (e.g. `"http-availability"`).
    fn id(&self) -> &str;

    /// Expands this plugin into an error-ratio query over `window`.
    ///
    /// # Errors
    ///
    /// Returns an error if the options are missing a required key,
    /// contain an unknown key, or hold values the plugin cannot use.
    fn resolve(
        &self,
        slo: &Slo,
        options: &BTreeMap<String, String>,
        window: Duration,
    ) -> Result<String, SliError>;
}
