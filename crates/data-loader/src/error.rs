//! Error types for the data-loader crate.
//!
//! Every failure carries enough context (entity kind, line, field, raw value)
//! for the load to report exactly which record stopped it.

use crate::types::EntityKind;
use thiserror::Error;

/// Errors that can occur while reading and transforming source rows
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// The backing file for an entity kind does not exist.
    ///
    /// Loaders treat this as "nothing to load", never as a failure.
    #[error("Source file not found: {path}")]
    MissingSource { path: String },

    /// A required field is missing or failed numeric/date parsing
    #[error("Malformed {kind} record at line {line}: field `{field}` has invalid value {value:?}")]
    MalformedRecord {
        kind: EntityKind,
        line: usize,
        field: String,
        value: String,
    },

    /// The delimited-text reader rejected the input
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error occurred while opening a source
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A typed record could not be encoded as a BSON document
    #[error("Failed to encode {kind} document: {source}")]
    Encode {
        kind: EntityKind,
        #[source]
        source: bson::ser::Error,
    },
}

impl DataLoadError {
    /// Shorthand used by the transformer for every field-level failure
    pub(crate) fn malformed(
        kind: EntityKind,
        line: usize,
        field: &str,
        value: impl Into<String>,
    ) -> Self {
        DataLoadError::MalformedRecord {
            kind,
            line,
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// True when the error only means "this entity kind has no file"
    pub fn is_missing_source(&self) -> bool {
        matches!(self, DataLoadError::MissingSource { .. })
    }
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
