//! In-process document store.
//!
//! Holds every collection in memory, enforces unique indexes the way a real
//! document database does for unordered bulk writes, and evaluates
//! aggregation pipelines with the `pipeline` crate's evaluator. Used by the
//! test suites and by `moviedb load --dry-run`.

use crate::error::{Result, StoreError};
use crate::traits::{DocumentStore, IndexSpec};
use bson::{Bson, Document};
use pipeline::value::{get_path, value_key};
use pipeline::{AggregationPipeline, CollectionSource};
use std::collections::{HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::debug;

#[derive(Debug, Default)]
struct MemoryCollection {
    docs: Vec<Document>,
    indexes: Vec<IndexSpec>,
    /// Keys already taken, per unique index name
    unique_keys: HashMap<String, HashSet<String>>,
}

impl MemoryCollection {
    fn unique_indexes(&self) -> impl Iterator<Item = &IndexSpec> {
        self.indexes.iter().filter(|index| index.unique)
    }
}

fn index_key(index: &IndexSpec, doc: &Document) -> String {
    index
        .keys
        .iter()
        .map(|(field, _)| value_key(get_path(doc, field).unwrap_or(&Bson::Null)))
        .collect::<Vec<_>>()
        .join("\u{1f}")
}

struct Snapshot<'a>(&'a HashMap<String, MemoryCollection>);

impl CollectionSource for Snapshot<'_> {
    fn documents(&self, collection: &str) -> &[Document] {
        self.0
            .get(collection)
            .map(|c| c.docs.as_slice())
            .unwrap_or(&[])
    }
}

/// Document store backed by in-memory collections
#[derive(Debug, Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, MemoryCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .read()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, MemoryCollection>>> {
        self.collections
            .write()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }

    /// Copy of every document in a collection, in insertion order
    pub fn documents(&self, collection: &str) -> Result<Vec<Document>> {
        Ok(Snapshot(&*self.read()?).documents(collection).to_vec())
    }

    /// Names of the indexes declared on a collection
    pub fn index_names(&self, collection: &str) -> Result<Vec<String>> {
        Ok(self
            .read()?
            .get(collection)
            .map(|c| c.indexes.iter().map(IndexSpec::name).collect())
            .unwrap_or_default())
    }
}

impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn insert_many(&self, collection: &str, docs: Vec<Document>) -> Result<u64> {
        let mut collections = self.write()?;
        let target = collections.entry(collection.to_string()).or_default();

        let unique: Vec<IndexSpec> = target.unique_indexes().cloned().collect();
        let mut inserted = 0;
        let mut duplicates = Vec::new();

        // unordered: a duplicate is skipped, the rest of the batch still lands
        for doc in docs {
            let keys: Vec<(String, String)> = unique
                .iter()
                .map(|index| (index.name(), index_key(index, &doc)))
                .collect();
            let clash = keys.iter().find(|(name, key)| {
                target
                    .unique_keys
                    .get(name)
                    .is_some_and(|taken| taken.contains(key))
            });

            if let Some((name, key)) = clash {
                duplicates.push(format!("duplicate key on {}: {}", name, key));
                continue;
            }
            for (name, key) in keys {
                target.unique_keys.entry(name).or_default().insert(key);
            }
            target.docs.push(doc);
            inserted += 1;
        }

        debug!("Inserted {} documents into {}", inserted, collection);
        if let Some(first) = duplicates.first() {
            return Err(StoreError::ConstraintViolation {
                collection: collection.to_string(),
                detail: format!("{} ({} rejected)", first, duplicates.len()),
            });
        }
        Ok(inserted)
    }

    fn delete_all(&self, collection: &str) -> Result<u64> {
        let mut collections = self.write()?;
        let Some(target) = collections.get_mut(collection) else {
            return Ok(0);
        };

        let removed = target.docs.len() as u64;
        target.docs.clear();
        for taken in target.unique_keys.values_mut() {
            taken.clear();
        }
        Ok(removed)
    }

    fn create_index(&self, collection: &str, index: &IndexSpec) -> Result<bool> {
        let mut collections = self.write()?;
        let target = collections.entry(collection.to_string()).or_default();
        let name = index.name();

        if let Some(existing) = target.indexes.iter().find(|i| i.name() == name) {
            if existing == index {
                return Ok(false);
            }
            return Err(StoreError::Unavailable(format!(
                "index {} already exists on {} with different options",
                name, collection
            )));
        }

        if index.unique {
            let mut taken = HashSet::new();
            for doc in &target.docs {
                let key = index_key(index, doc);
                if !taken.insert(key.clone()) {
                    return Err(StoreError::ConstraintViolation {
                        collection: collection.to_string(),
                        detail: format!("duplicate key on {}: {}", name, key),
                    });
                }
            }
            target.unique_keys.insert(name, taken);
        }

        target.indexes.push(index.clone());
        Ok(true)
    }

    fn aggregate(&self, collection: &str, pipeline: &AggregationPipeline) -> Result<Vec<Document>> {
        let collections = self.read()?;
        let snapshot = Snapshot(&collections);
        let input = snapshot.documents(collection).to_vec();

        pipeline
            .apply(input, &snapshot)
            .map_err(|source| StoreError::Aggregation {
                collection: collection.to_string(),
                source,
            })
    }

    fn count(&self, collection: &str) -> Result<u64> {
        Ok(Snapshot(&*self.read()?).documents(collection).len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use pipeline::{Accumulator, Direction};

    fn movie_id_unique() -> IndexSpec {
        IndexSpec::new([("movieId", Direction::Ascending)]).unique()
    }

    #[test]
    fn test_insert_and_count() {
        let store = MemoryStore::new();
        let inserted = store
            .insert_many("ratings", vec![doc! { "movieId": 1 }, doc! { "movieId": 1 }])
            .unwrap();

        assert_eq!(inserted, 2);
        assert_eq!(store.count("ratings").unwrap(), 2);
        assert_eq!(store.count("unknown").unwrap(), 0);
    }

    #[test]
    fn test_documents_keep_insertion_order() {
        let store = MemoryStore::new();
        store
            .insert_many("movies", vec![doc! { "movieId": 3 }, doc! { "movieId": 1 }])
            .unwrap();
        store.insert_many("movies", vec![doc! { "movieId": 2 }]).unwrap();

        let ids: Vec<i32> = store
            .documents("movies")
            .unwrap()
            .iter()
            .map(|d| d.get_i32("movieId").unwrap())
            .collect();

        assert_eq!(ids, vec![3, 1, 2]);
        assert!(store.documents("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_create_index_is_idempotent() {
        let store = MemoryStore::new();
        assert!(store.create_index("movies", &movie_id_unique()).unwrap());
        assert!(!store.create_index("movies", &movie_id_unique()).unwrap());

        assert_eq!(store.index_names("movies").unwrap(), vec!["movieId_1"]);
    }

    #[test]
    fn test_unique_index_rejects_duplicates_but_keeps_the_rest() {
        let store = MemoryStore::new();
        store.create_index("movies", &movie_id_unique()).unwrap();
        store.insert_many("movies", vec![doc! { "movieId": 1 }]).unwrap();

        let err = store
            .insert_many("movies", vec![doc! { "movieId": 2 }, doc! { "movieId": 1_i64 }])
            .unwrap_err();

        assert!(matches!(err, StoreError::ConstraintViolation { ref collection, .. } if collection == "movies"));
        assert_eq!(store.count("movies").unwrap(), 2);
    }

    #[test]
    fn test_unique_index_on_populated_collection() {
        let store = MemoryStore::new();
        store
            .insert_many("users", vec![doc! { "userId": 1 }, doc! { "userId": 1 }])
            .unwrap();

        let index = IndexSpec::new([("userId", Direction::Ascending)]).unique();
        assert!(matches!(
            store.create_index("users", &index),
            Err(StoreError::ConstraintViolation { .. })
        ));
    }

    #[test]
    fn test_delete_all_frees_unique_keys() {
        let store = MemoryStore::new();
        store.create_index("movies", &movie_id_unique()).unwrap();
        store.insert_many("movies", vec![doc! { "movieId": 1 }]).unwrap();

        assert_eq!(store.delete_all("movies").unwrap(), 1);
        assert_eq!(store.delete_all("never-created").unwrap(), 0);
        store.insert_many("movies", vec![doc! { "movieId": 1 }]).unwrap();
        assert_eq!(store.count("movies").unwrap(), 1);
        assert_eq!(store.index_names("movies").unwrap().len(), 1);
    }

    #[test]
    fn test_aggregate_joins_other_collections() {
        let store = MemoryStore::new();
        store
            .insert_many("movies", vec![doc! { "movieId": 1, "title": "A" }])
            .unwrap();
        store
            .insert_many("ratings", vec![doc! { "movieId": 1, "rating": 4.0 }])
            .unwrap();

        let pipeline = AggregationPipeline::new()
            .group("movieId", [("n", Accumulator::Count)])
            .lookup("movies", "_id", "movieId", "movie")
            .unwind("movie");

        let out = store.aggregate("ratings", &pipeline).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].get_document("movie").unwrap().get_str("title").unwrap(), "A");
    }

    #[test]
    fn test_aggregate_reports_invalid_stage() {
        let store = MemoryStore::new();
        let err = store
            .aggregate("ratings", &AggregationPipeline::new().limit(0))
            .unwrap_err();
        assert!(matches!(err, StoreError::Aggregation { .. }));
    }
}
