//! Error types for storage collaborators.

use pipeline::PipelineError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached or rejected the operation
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A unique index rejected a duplicate key
    #[error("Constraint violation in {collection}: {detail}")]
    ConstraintViolation { collection: String, detail: String },

    /// The store cannot run the requested aggregation
    #[error("Aggregation failed on {collection}: {source}")]
    Aggregation {
        collection: String,
        #[source]
        source: PipelineError,
    },
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, StoreError>;
