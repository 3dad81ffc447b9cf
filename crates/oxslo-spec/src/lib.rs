//! Spec file parsing: dialect detection plus conversion into SLO groups.
//!
//! Three input dialects are supported. The native `oxslo/v1` format, the
//! Kubernetes `oxslo.dev/v1` `PrometheusServiceLevel` object (the native
//! body nested under `spec:`), and a subset of OpenSLO `openslo/v1alpha`.
//! Each YAML document in a file is detected and converted independently;
//! all of them converge on [`oxslo_core::model::SloGroup`], so validation
//! and rule generation never see the dialect an SLO came from.

pub mod error;
pub mod kubernetes;
pub mod native;
pub mod openslo;


pub use crate::error::ParseError;

use oxslo_core::model::{SloGroup, DEFAULT_ERROR_BUDGET_PERIOD};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Version marker of the native dialect.
pub const NATIVE_VERSION: &str = "oxslo/v1";
/// `apiVersion` of the Kubernetes dialect.
pub const KUBERNETES_API_VERSION: &str = "oxslo.dev/v1";
/// `kind` of the Kubernetes dialect.
pub const KUBERNETES_KIND: &str = "PrometheusServiceLevel";
/// `apiVersion` of the supported OpenSLO dialect.
pub const OPENSLO_API_VERSION: &str = "openslo/v1alpha";
/// `kind` of the supported OpenSLO dialect.
pub const OPENSLO_KIND: &str = "SLO";

/// Input dialect of a single spec document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecDialect {
    Native,
    Kubernetes,
    OpenSlo,
}

impl fmt::Display for SpecDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Native => "native",
            Self::Kubernetes => "kubernetes",
            Self::OpenSlo => "openslo",
        };
        f.write_str(name)
    }
}

/// Per-run parsing options.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Error budget period applied to SLOs that do not set one.
    pub default_period: Duration,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            default_period: DEFAULT_ERROR_BUDGET_PERIOD,
        }
    }
}

/// Parses one spec file, possibly holding several YAML documents, into
/// SLO groups.
///
/// Empty documents are skipped. Documents are independent: each one is
/// dialect-detected and converted on its own, and one group is produced
/// per document.
///
/// # Errors
///
/// Returns [`ParseError::Yaml`] on malformed YAML or schema mismatches,
/// [`ParseError::UnknownDialect`] when a document carries no recognized
/// dialect marker, [`ParseError::EmptySpec`] when the file yields no
/// documents at all, and [`ParseError::Invalid`] when a document matches
/// a dialect but breaks its rules.
pub fn parse_spec(
    source_id: &str,
    raw: &str,
    options: &ParseOptions,
) -> Result<Vec<SloGroup>, ParseError> {
    let mut groups = Vec::new();
    for document in serde_yaml::Deserializer::from_str(raw) {
        let value = serde_yaml::Value::deserialize(document).map_err(|err| ParseError::Yaml {
            source_id: source_id.to_string(),
            err,
        })?;
        if value.is_null() {
            continue;
        }
        let group = match detect_dialect(&value) {
            Some(SpecDialect::Native) => native::parse(source_id, value, options)?,
            Some(SpecDialect::Kubernetes) => kubernetes::parse(source_id, value, options)?,
            Some(SpecDialect::OpenSlo) => openslo::parse(source_id, value, options)?,
            None => {
                return Err(ParseError::UnknownDialect {
                    source_id: source_id.to_string(),
                })
            }
        };
        groups.push(group);
    }
    if groups.is_empty() {
        return Err(ParseError::EmptySpec {
            source_id: source_id.to_string(),
        });
    }
    Ok(groups)
}

/// Recognizes the dialect of one YAML document, if any.
///
/// Any document with a top-level `version` field routes to the native
/// parser, which rejects unsupported versions with a specific error;
/// the other dialects are identified by their `apiVersion`/`kind` pair.
pub fn detect_dialect(value: &serde_yaml::Value) -> Option<SpecDialect> {
    let field = |key: &str| value.get(key).and_then(serde_yaml::Value::as_str);
    match (field("version"), field("apiVersion"), field("kind")) {
        (Some(_), _, _) => Some(SpecDialect::Native),
        (_, Some(KUBERNETES_API_VERSION), Some(KUBERNETES_KIND)) => Some(SpecDialect::Kubernetes),
        (_, Some(OPENSLO_API_VERSION), Some(OPENSLO_KIND)) => Some(SpecDialect::OpenSlo),
        _ => None,
    }
}
