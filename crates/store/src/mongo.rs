//! MongoDB-backed document store (blocking driver).
//!
//! Pipelines are rendered to BSON and executed by the server's aggregation
//! engine; bulk inserts are sent unordered.

use crate::error::{Result, StoreError};
use crate::traits::{DocumentStore, IndexSpec};
use bson::{doc, Document};
use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};
use mongodb::options::{IndexOptions, InsertManyOptions};
use mongodb::sync::{Client, Collection, Database};
use mongodb::IndexModel;
use pipeline::AggregationPipeline;
use tracing::{debug, info};

/// Server error code for a unique index violation
const DUPLICATE_KEY: i32 = 11000;
/// Server error code for an operation on a collection that does not exist yet
const NAMESPACE_NOT_FOUND: i32 = 26;

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    /// Connect to `uri` and use database `db_name`.
    ///
    /// The driver connects lazily; the first operation surfaces an
    /// unreachable server as `StoreError::Unavailable`.
    pub fn connect(uri: &str, db_name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        info!("Using MongoDB database {}", db_name);
        Ok(Self {
            db: client.database(db_name),
        })
    }

    pub fn from_database(db: Database) -> Self {
        Self { db }
    }

    fn collection(&self, name: &str) -> Collection<Document> {
        self.db.collection::<Document>(name)
    }
}

fn map_error(collection: &str, err: MongoError) -> StoreError {
    classify(collection, &server_errors(&err), err.to_string())
}

/// Server-reported (code, message) pairs carried by a driver error
fn server_errors(err: &MongoError) -> Vec<(i32, String)> {
    match err.kind.as_ref() {
        ErrorKind::BulkWrite(failure) => failure
            .write_errors
            .iter()
            .flatten()
            .map(|e| (e.code, e.message.clone()))
            .collect(),
        ErrorKind::Write(WriteFailure::WriteError(e)) => vec![(e.code, e.message.clone())],
        ErrorKind::Command(e) => vec![(e.code, e.message.clone())],
        _ => Vec::new(),
    }
}

/// A duplicate key anywhere in the batch is a constraint violation; anything
/// else means the store could not do the work
fn classify(collection: &str, errors: &[(i32, String)], rendered: String) -> StoreError {
    match errors.iter().find(|(code, _)| *code == DUPLICATE_KEY) {
        Some((_, message)) => StoreError::ConstraintViolation {
            collection: collection.to_string(),
            detail: format!("{} ({} rejected)", message, errors.len()),
        },
        None => StoreError::Unavailable(rendered),
    }
}

fn is_namespace_missing(err: &MongoError) -> bool {
    matches!(err.kind.as_ref(), ErrorKind::Command(e) if e.code == NAMESPACE_NOT_FOUND)
}

impl DocumentStore for MongoStore {
    fn name(&self) -> &str {
        "mongodb"
    }

    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<u64> {
        if docs.is_empty() {
            return Ok(0);
        }
        let options = InsertManyOptions::builder().ordered(false).build();
        let result = self
            .collection(collection)
            .insert_many(docs, options)
            .map_err(|e| map_error(collection, e))?;

        debug!("Inserted {} documents into {}", result.inserted_ids.len(), collection);
        Ok(result.inserted_ids.len() as u64)
    }

    fn delete_all(&self, collection: &str) -> Result<u64> {
        let result = self
            .collection(collection)
            .delete_many(doc! {}, None)
            .map_err(|e| map_error(collection, e))?;
        Ok(result.deleted_count)
    }

    fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<bool> {
        let coll = self.collection(collection);
        let name = index.name();
        let existing = match coll.list_index_names() {
            Ok(names) => names,
            Err(e) if is_namespace_missing(&e) => Vec::new(),
            Err(e) => return Err(map_error(collection, e)),
        };

        let options = IndexOptions::builder()
            .name(name.clone())
            .unique(index.unique)
            .build();
        let model = IndexModel::builder()
            .keys(index.key_document())
            .options(options)
            .build();

        // createIndexes is a no-op on the server for an identical index
        coll.create_index(model, None)
            .map_err(|e| map_error(collection, e))?;
        Ok(!existing.contains(&name))
    }

    fn aggregate(&self, collection: &str, pipeline: &AggregationPipeline) -> Result<Vec<Document>> {
        let cursor = self
            .collection(collection)
            .aggregate(pipeline.to_documents(), None)
            .map_err(|e| map_error(collection, e))?;

        cursor
            .map(|doc| doc.map_err(|e| map_error(collection, e)))
            .collect()
    }

    fn count(&self, collection: &str) -> Result<u64> {
        self.collection(collection)
            .count_documents(doc! {}, None)
            .map_err(|e| map_error(collection, e))
    }
}
