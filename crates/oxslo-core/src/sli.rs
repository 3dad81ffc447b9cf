//! SLI query resolution: templates, event ratios and the plugin registry.

use crate::duration::format_duration;
use crate::error::SliError;
use crate::model::{Sli, Slo};
use crate::SliPlugin;
use std::collections::HashMap;
use std::time::Duration;

/// Literal replaced by the formatted window duration in query templates.
pub const WINDOW_PLACEHOLDER: &str = "{{window}}";

/// Registry of available [`SliPlugin`]s, used to resolve `sli.plugin`
/// definitions. Populated once at startup and read-only afterwards.
///
/// # Examples
///
/// ```
/// use oxslo_core::sli::SliPluginRegistry;
///
/// let registry = SliPluginRegistry::default();
/// assert!(registry.has_plugin("http-availability"));
/// assert!(registry.has_plugin("http-latency"));
/// assert!(!registry.has_plugin("nonexistent"));
/// ```
pub struct SliPluginRegistry {
    plugins: HashMap<String, Box<dyn SliPlugin>>,
}

impl SliPluginRegistry {
    pub fn new() -> Self {
        Self {
            plugins: HashMap::new(),
        }
    }

    pub fn register(&mut self, plugin: Box<dyn SliPlugin>) {
        let id = plugin.id().to_string();
        self.plugins.insert(id, plugin);
    }

    pub fn get_plugin(&self, id: &str) -> Option<&dyn SliPlugin> {
        self.plugins.get(id).map(|p| p.as_ref())
    }

    pub fn has_plugin(&self, id: &str) -> bool {
        self.plugins.contains_key(id)
    }

    pub fn plugin_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.plugins.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for SliPluginRegistry {
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(crate::plugins::HttpAvailabilityPlugin));
        registry.register(Box::new(crate::plugins::HttpLatencyPlugin));
        registry
    }
}

/// Resolves the SLI of `slo` into one error-ratio query over `window`.
///
/// Resolution is referentially transparent: the same SLO and window
/// always yield the same string.
///
/// # Errors
///
/// Fails if a template is missing the window placeholder, the referenced
/// plugin is not registered, or the plugin rejects the SLO's options.
pub fn resolve_sli(
    slo: &Slo,
    registry: &SliPluginRegistry,
    window: Duration,
) -> Result<String, SliError> {
    match &slo.sli {
        Sli::Raw { error_ratio_query } => {
            expand_template(error_ratio_query, "error_ratio_query", window)
        }
        Sli::Events {
            error_query,
            total_query,
        } => {
            let error = expand_template(error_query, "error_query", window)?;
            let total = expand_template(total_query, "total_query", window)?;
            Ok(format!("({error}) / ({total})"))
        }
        Sli::Plugin { id, options } => match registry.get_plugin(id) {
            Some(plugin) => plugin.resolve(slo, options, window),
            None => Err(SliError::UnknownPlugin { id: id.clone() }),
        },
    }
}

fn expand_template(
    template: &str,
    field: &'static str,
    window: Duration,
) -> Result<String, SliError> {
    if !template.contains(WINDOW_PLACEHOLDER) {
        return Err(SliError::MissingWindowPlaceholder { field });
    }
    Ok(template.replace(WINDOW_PLACEHOLDER, &format_duration(window)))
}
