//! The storage collaborator seam.
//!
//! Loaders and queries only ever see `&dyn DocumentStore`; the handle is
//! passed in by the caller, never looked up globally.

use crate::error::Result;
use bson::{doc, Document};
use pipeline::{AggregationPipeline, Direction};

/// An index declaration: ordered key fields plus a uniqueness flag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub keys: Vec<(String, Direction)>,
    pub unique: bool,
}

impl IndexSpec {
    pub fn new<N: Into<String>>(keys: impl IntoIterator<Item = (N, Direction)>) -> Self {
        Self {
            keys: keys
                .into_iter()
                .map(|(field, direction)| (field.into(), direction))
                .collect(),
            unique: false,
        }
    }

    /// Mark the index as unique (builder pattern)
    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    /// Conventional index name, e.g. `movieId_1_ts_-1`
    pub fn name(&self) -> String {
        self.keys
            .iter()
            .map(|(field, direction)| format!("{}_{}", field, direction.as_i32()))
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Key document in wire form, e.g. `{ movieId: 1, ts: -1 }`
    pub fn key_document(&self) -> Document {
        let mut keys = doc! {};
        for (field, direction) in &self.keys {
            keys.insert(field.clone(), direction.as_i32());
        }
        keys
    }
}

/// Core trait for document stores.
///
/// All operations block until the store acknowledges them.
///
/// ## Design Note
/// - `Send + Sync` lets one store handle be shared by concurrent readers
/// - `insert_many` is unordered: members of one batch may be applied in any order
/// - `create_index` must be idempotent
pub trait DocumentStore: Send + Sync {
    /// Returns the name of this store (for logging/debugging)
    fn name(&self) -> &str;

    /// Unordered bulk insert. Returns the number of documents inserted.
    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<u64>;

    /// Discard every document of a collection. Returns the number removed.
    fn delete_all(&self, collection: &str) -> Result<u64>;

    /// Ensure an index exists. Returns `true` if it was created by this call.
    fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<bool>;

    /// Run an aggregation pipeline and collect the full result set
    fn aggregate(&self, collection: &str, pipeline: &AggregationPipeline) -> Result<Vec<Document>>;

    /// Number of documents in a collection
    fn count(&self, collection: &str) -> Result<u64>;
}
