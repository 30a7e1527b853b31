//! Error types for analytical queries.

use store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RankingError {
    /// The aggregation could not be run
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The store returned a document that is not a ranked movie
    #[error("Unexpected ranking result: {0}")]
    MalformedResult(#[from] bson::de::Error),
}

pub type Result<T> = std::result::Result<T, RankingError>;
