//! Kubernetes `oxslo.dev/v1` `PrometheusServiceLevel` dialect.
//!
//! The object body under `spec:` is the native format without the
//! version marker. `metadata.name` becomes the group name, so one
//! cluster object maps onto one rule-generation group. Unknown metadata
//! fields (namespace, uid, managed fields) are ignored, as manifests
//! read back from a cluster carry plenty of them.

use crate::error::ParseError;
use crate::native::{self, SpecBody};
use crate::ParseOptions;
use oxslo_core::model::SloGroup;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(rename = "apiVersion")]
    api_version: String,
    kind: String,
    metadata: Metadata,
    spec: serde_yaml::Value,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    name: String,
}

/// Parses one `PrometheusServiceLevel` document.
pub(crate) fn parse(
    source_id: &str,
    value: serde_yaml::Value,
    options: &ParseOptions,
) -> Result<SloGroup, ParseError> {
    let yaml_err = |err: serde_yaml::Error| ParseError::Yaml {
        source_id: source_id.to_string(),
        err,
    };

    let manifest: Manifest = serde_yaml::from_value(value).map_err(yaml_err)?;
    if manifest.api_version != crate::KUBERNETES_API_VERSION
        || manifest.kind != crate::KUBERNETES_KIND
    {
        return Err(ParseError::Invalid {
            source_id: source_id.to_string(),
            detail: format!(
                "unsupported object {}/{}",
                manifest.api_version, manifest.kind
            ),
        });
    }

    let body: SpecBody = serde_yaml::from_value(manifest.spec).map_err(yaml_err)?;
    native::build_group(source_id, manifest.metadata.name, body, options)
}
