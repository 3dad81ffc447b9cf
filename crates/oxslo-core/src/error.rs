use crate::model::SloKey;

/// Errors produced while resolving an SLI definition into a query string.
///
/// # Examples
///
/// ```rust
/// use oxslo_core::error::SliError;
///
/// let err = SliError::UnknownPlugin { id: "http-latency-p99".to_string() };
/// assert!(err.to_string().contains("http-latency-p99"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum SliError {
    /// A query template does not reference the window placeholder, so the
    /// resolved query could not vary by evaluation window.
    #[error("SLI: {field} is missing the '{{{{window}}}}' placeholder")]
    MissingWindowPlaceholder { field: &'static str },

    /// The referenced SLI plugin is not registered.
    #[error("SLI: unknown plugin '{id}'")]
    UnknownPlugin { id: String },

    /// A registered plugin rejected the SLO's options.
    #[error("SLI: plugin '{id}': {reason}")]
    Plugin { id: String, reason: String },
}

/// Invalid Prometheus-style duration string.
#[derive(Debug, thiserror::Error)]
#[error("invalid duration '{input}': {reason}")]
pub struct DurationError {
    pub input: String,
    pub reason: String,
}

/// Errors collected by a validation and generation run.
///
/// Every variant carries the source identifier of the spec unit it was
/// found in, so callers can attribute failures across many input files.
/// [`ValidationError::DuplicateSlo`] is the only kind a caller may opt to
/// suppress (keep the first declaration, skip the rest); all other kinds
/// always fail the run.
///
/// # Examples
///
/// ```rust
/// use oxslo_core::error::ValidationError;
/// use oxslo_core::model::SloKey;
///
/// let err = ValidationError::DuplicateSlo {
///     key: SloKey::new("api", "latency"),
///     source_id: "b.yaml".to_string(),
///     first_source_id: "a.yaml".to_string(),
/// };
/// assert!(err.to_string().contains("a.yaml"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    /// An SLO or group field violates a structural constraint.
    #[error("{source_id}: {subject}: {detail}")]
    Structural {
        source_id: String,
        subject: String,
        detail: String,
    },

    /// The same (service, name) pair was declared more than once in a run.
    #[error("{source_id}: duplicate SLO '{key}' (first declared in {first_source_id})")]
    DuplicateSlo {
        key: SloKey,
        source_id: String,
        first_source_id: String,
    },

    /// The SLI definition could not be resolved into a query.
    #[error("{source_id}: SLO '{key}': {err}")]
    SliResolution {
        source_id: String,
        key: SloKey,
        #[source]
        err: SliError,
    },

    /// An SLO referenced an SLI plugin that is not registered.
    #[error("{source_id}: SLO '{key}': unknown SLI plugin '{plugin_id}'")]
    UnknownPlugin {
        source_id: String,
        key: SloKey,
        plugin_id: String,
    },

    /// Two rules in one group would share a name.
    #[error("{source_id}: SLO '{key}': rule name '{rule_name}' already exists in group '{group}'")]
    RuleNameCollision {
        source_id: String,
        key: SloKey,
        group: String,
        rule_name: String,
    },
}

/// Convenience `Result` alias for validation and generation operations.
pub type Result<T> = std::result::Result<T, ValidationError>;
