//! Error types for spec file parsing.

/// Errors raised while reading a spec file into SLO groups.
///
/// Every variant names the source it came from, so callers can report
/// per-file failures while continuing with the rest of a batch.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// The document is not valid YAML, or does not fit the dialect schema.
    #[error("Spec: {source_id}: {err}")]
    Yaml {
        source_id: String,
        #[source]
        err: serde_yaml::Error,
    },

    /// No dialect marker was recognized in the document.
    #[error("Spec: {source_id}: unrecognized spec dialect")]
    UnknownDialect { source_id: String },

    /// The file contained no spec documents at all.
    #[error("Spec: {source_id}: no SLO spec documents found")]
    EmptySpec { source_id: String },

    /// The document matched a dialect but its content is unusable.
    #[error("Spec: {source_id}: {detail}")]
    Invalid { source_id: String, detail: String },
}

impl ParseError {
    /// Identifier of the source the error came from.
    pub fn source_id(&self) -> &str {
        match self {
            Self::Yaml { source_id, .. }
            | Self::UnknownDialect { source_id }
            | Self::EmptySpec { source_id }
            | Self::Invalid { source_id, .. } => source_id,
        }
    }
}

pub type Result<T> = std::result::Result<T, ParseError>;
