//! Integration tests for the ingestion pipeline.
//!
//! These run the batch loader and the full orchestrated load against the
//! in-memory store, using CSV fixtures written to a scratch directory.

use bson::Document;
use data_loader::{DataLoadError, EntityKind, RawRow};
use ingest::{
    BatchLoader, IngestError, LoadOrchestrator, LoadStage, LoaderConfig, NoProgress,
    ProgressReporter,
};
use pipeline::AggregationPipeline;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use store::{DocumentStore, IndexSpec, MemoryStore, StoreError};

// ============================================================================
// Test Fixtures
// ============================================================================

/// Scratch data directory, removed on drop
struct DataDir {
    path: PathBuf,
}

impl DataDir {
    fn new(name: &str) -> Self {
        let path = std::env::temp_dir().join(format!("moviedb-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&path);
        fs::create_dir_all(&path).unwrap();
        Self { path }
    }

    fn write(&self, kind: EntityKind, contents: &str) {
        fs::write(self.path.join(kind.file_name()), contents).unwrap();
    }

    fn config(&self) -> LoaderConfig {
        LoaderConfig::new(&self.path)
    }
}

impl Drop for DataDir {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.path);
    }
}

const MOVIES: &str = "movieId,title,year,genres\n\
1,A,1995,(no genres listed)\n\
2,B,,Comedy\n\
3,C,2001,Drama|Crime\n";

const RATINGS: &str = "userId,movieId,rating,timestamp\n\
1,1,5.0,964982703\n\
1,2,3.0,964981247\n\
2,2,4.0,964982224\n\
2,99,1.0,964983815\n";

const USERS: &str = "userId,name,joinDate,country,age,genres\n\
1,Ana,2019-03-01,ES,34,Comedy|Drama\n\
2,,,,,\n";

/// Counts bulk inserts without keeping the documents
#[derive(Default)]
struct CountingStore {
    inserts: Mutex<Vec<usize>>,
}

impl DocumentStore for CountingStore {
    fn name(&self) -> &str {
        "counting"
    }

    fn insert_many(&self, _collection: &str, docs: Vec<Document>) -> store::Result<u64> {
        self.inserts.lock().unwrap().push(docs.len());
        Ok(docs.len() as u64)
    }

    fn delete_all(&self, _collection: &str) -> store::Result<u64> {
        Ok(0)
    }

    fn create_index(&self, _collection: &str, _index: &IndexSpec) -> store::Result<bool> {
        Ok(true)
    }

    fn aggregate(&self, _collection: &str, _pipeline: &AggregationPipeline) -> store::Result<Vec<Document>> {
        Ok(Vec::new())
    }

    fn count(&self, _collection: &str) -> store::Result<u64> {
        Ok(0)
    }
}

#[derive(Default)]
struct RecordingProgress {
    totals: Mutex<Vec<u64>>,
}

impl ProgressReporter for RecordingProgress {
    fn batch_committed(&self, kind: EntityKind, total: u64) {
        assert_eq!(kind, EntityKind::Rating);
        self.totals.lock().unwrap().push(total);
    }
}

fn rating_rows(count: usize) -> impl Iterator<Item = data_loader::Result<RawRow>> {
    (0..count).map(|i| {
        Ok(RawRow::new(
            i + 2,
            [
                ("userId", (i % 610).to_string()),
                ("movieId", (i % 9742).to_string()),
                ("rating", "3.5".to_string()),
                ("timestamp", "964982703".to_string()),
            ],
        ))
    })
}

// ============================================================================
// Batch loader
// ============================================================================

#[test]
fn test_250k_ratings_issue_three_inserts_and_two_notifications() {
    let store = CountingStore::default();
    let progress = RecordingProgress::default();
    let loader = BatchLoader::new(&store, &progress, 100_000);

    let report = loader.load(EntityKind::Rating, rating_rows(250_000)).unwrap();

    assert_eq!(report.inserted, 250_000);
    assert_eq!(report.batches, 3);
    assert_eq!(*store.inserts.lock().unwrap(), vec![100_000, 100_000, 50_000]);
    assert_eq!(*progress.totals.lock().unwrap(), vec![100_000, 200_000]);
}

#[test]
fn test_exact_multiple_sends_no_trailing_batch() {
    let store = CountingStore::default();
    let progress = RecordingProgress::default();
    let loader = BatchLoader::new(&store, &progress, 1_000);

    loader.load(EntityKind::Rating, rating_rows(2_000)).unwrap();

    assert_eq!(*store.inserts.lock().unwrap(), vec![1_000, 1_000]);
    assert_eq!(progress.totals.lock().unwrap().len(), 2);
}

// ============================================================================
// Full load
// ============================================================================

#[test]
fn test_full_load_writes_all_three_collections() {
    let data = DataDir::new("full-load");
    data.write(EntityKind::Movie, MOVIES);
    data.write(EntityKind::Rating, RATINGS);
    data.write(EntityKind::User, USERS);

    let store = MemoryStore::new();
    let summary = LoadOrchestrator::new(&store, &NoProgress, data.config())
        .run()
        .unwrap();

    let inserted: Vec<u64> = summary.reports.iter().map(|r| r.inserted).collect();
    assert_eq!(inserted, vec![3, 4, 2]);
    assert_eq!(
        summary.stored,
        vec![
            (EntityKind::Movie, 3),
            (EntityKind::Rating, 4),
            (EntityKind::User, 2),
        ]
    );

    let movies = store.documents("movies").unwrap();
    assert!(movies[0].get_array("genres").unwrap().is_empty());
    assert!(movies[1].get("year").unwrap().as_null().is_some());

    let users = store.documents("users").unwrap();
    assert_eq!(users[1].get_str("name").unwrap(), "user_2");
    assert!(users[1].get("country").unwrap().as_null().is_some());
}

#[test]
fn test_running_the_load_twice_gives_the_same_state() {
    let data = DataDir::new("idempotent");
    data.write(EntityKind::Movie, MOVIES);
    data.write(EntityKind::Rating, RATINGS);
    data.write(EntityKind::User, USERS);

    let store = MemoryStore::new();
    let orchestrator = LoadOrchestrator::new(&store, &NoProgress, data.config());

    orchestrator.run().unwrap();
    let first: Vec<Vec<Document>> = EntityKind::ALL
        .iter()
        .map(|kind| store.documents(kind.collection()).unwrap())
        .collect();

    let second_summary = orchestrator.run().unwrap();
    let second: Vec<Vec<Document>> = EntityKind::ALL
        .iter()
        .map(|kind| store.documents(kind.collection()).unwrap())
        .collect();

    assert_eq!(first, second);
    assert_eq!(second_summary.deleted, 9);
    assert_eq!(second_summary.indexes_created, 0);
    assert_eq!(store.index_names("ratings").unwrap().len(), 3);
}

#[test]
fn test_reset_discards_unrelated_prior_content() {
    let data = DataDir::new("reset");
    data.write(EntityKind::Movie, MOVIES);

    let store = MemoryStore::new();
    store
        .insert_many("ratings", vec![bson::doc! { "userId": 7, "movieId": 7, "rating": 1.0 }])
        .unwrap();

    LoadOrchestrator::new(&store, &NoProgress, data.config())
        .run()
        .unwrap();

    assert_eq!(store.count("ratings").unwrap(), 0);
    assert_eq!(store.count("movies").unwrap(), 3);
}

#[test]
fn test_malformed_rating_halts_before_users() {
    let data = DataDir::new("malformed");
    data.write(EntityKind::Movie, MOVIES);
    data.write(EntityKind::Rating, "userId,movieId,rating,timestamp\n1,1,5.0,notatime\n");
    data.write(EntityKind::User, USERS);

    let store = MemoryStore::new();
    let err = LoadOrchestrator::new(&store, &NoProgress, data.config())
        .run()
        .unwrap_err();

    assert!(matches!(err, IngestError::Stage { stage: LoadStage::RatingsLoaded, .. }));
    match err.root() {
        IngestError::Data(DataLoadError::MalformedRecord { kind, field, value, .. }) => {
            assert_eq!(*kind, EntityKind::Rating);
            assert_eq!(field, "timestamp");
            assert_eq!(value, "notatime");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.count("movies").unwrap(), 3);
    assert_eq!(store.count("users").unwrap(), 0);
}

#[test]
fn test_duplicate_movie_id_is_a_constraint_violation() {
    let data = DataDir::new("duplicate");
    data.write(EntityKind::Movie, "movieId,title,year,genres\n1,A,,\n1,A again,,\n");
    data.write(EntityKind::Rating, RATINGS);

    let store = MemoryStore::new();
    let err = LoadOrchestrator::new(&store, &NoProgress, data.config())
        .run()
        .unwrap_err();

    assert!(matches!(err, IngestError::Stage { stage: LoadStage::MoviesLoaded, .. }));
    assert!(matches!(
        err.root(),
        IngestError::Store(StoreError::ConstraintViolation { .. })
    ));
    assert_eq!(store.count("ratings").unwrap(), 0);
}
