//! Batch loader: streams rows through the transformer into the store.
//!
//! Documents are buffered and submitted as unordered bulk inserts. Ratings
//! are flushed every `ratings_batch_size` documents; movies and users go in a
//! single batch per file. A malformed row aborts the load for its entity
//! kind, leaving batches that were already submitted in place.

use crate::error::Result;
use crate::progress::ProgressReporter;
use data_loader::{transform, CsvRecordSource, DataLoadError, EntityKind, RawRow};
use std::path::Path;
use store::DocumentStore;
use tracing::{info, warn};

/// Outcome of loading one entity kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadReport {
    pub kind: EntityKind,
    /// Documents acknowledged by the store
    pub inserted: u64,
    /// Bulk-insert operations issued
    pub batches: u64,
}

impl LoadReport {
    pub fn empty(kind: EntityKind) -> Self {
        Self {
            kind,
            inserted: 0,
            batches: 0,
        }
    }
}

pub struct BatchLoader<'a> {
    store: &'a dyn DocumentStore,
    progress: &'a dyn ProgressReporter,
    ratings_batch_size: usize,
}

impl<'a> BatchLoader<'a> {
    /// Create a new BatchLoader.
    ///
    /// # Arguments
    /// * `store` - Destination store
    /// * `progress` - Notified after every full ratings batch
    /// * `ratings_batch_size` - Documents per ratings bulk insert (typically 100,000)
    pub fn new(
        store: &'a dyn DocumentStore,
        progress: &'a dyn ProgressReporter,
        ratings_batch_size: usize,
    ) -> Self {
        Self {
            store,
            progress,
            ratings_batch_size: ratings_batch_size.max(1),
        }
    }

    /// Buffer threshold for a kind; `None` means one batch for the whole file
    pub fn batch_size(&self, kind: EntityKind) -> Option<usize> {
        match kind {
            EntityKind::Rating => Some(self.ratings_batch_size),
            EntityKind::Movie | EntityKind::User => None,
        }
    }

    /// Load the CSV file for `kind`. A missing file is a no-op.
    pub fn load_path(&self, kind: EntityKind, path: &Path) -> Result<LoadReport> {
        match CsvRecordSource::open(path) {
            Ok(source) => self.load(kind, source),
            Err(DataLoadError::MissingSource { path }) => {
                warn!("No {} file at {}, skipping", kind, path);
                Ok(LoadReport::empty(kind))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Drive a row source through the transformer into the store
    pub fn load<I>(&self, kind: EntityKind, rows: I) -> Result<LoadReport>
    where
        I: IntoIterator<Item = data_loader::Result<RawRow>>,
    {
        let collection = kind.collection();
        let threshold = self.batch_size(kind);
        let mut report = LoadReport::empty(kind);
        let mut buffer = Vec::with_capacity(threshold.unwrap_or(1024));

        for row in rows {
            let document = transform(kind, &row?)?.to_document()?;
            buffer.push(document);

            if threshold.is_some_and(|limit| buffer.len() >= limit) {
                let capacity = buffer.len();
                let batch = std::mem::replace(&mut buffer, Vec::with_capacity(capacity));
                report.inserted += self.store.insert_many(collection, batch)?;
                report.batches += 1;
                self.progress.batch_committed(kind, report.inserted);
            }
        }

        if !buffer.is_empty() {
            report.inserted += self.store.insert_many(collection, buffer)?;
            report.batches += 1;
        }

        info!(
            "Loaded {} {} in {} batch(es)",
            report.inserted, collection, report.batches
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::IngestError;
    use crate::progress::NoProgress;
    use store::MemoryStore;

    fn rows(data: &str) -> CsvRecordSource<&[u8]> {
        CsvRecordSource::from_reader(data.as_bytes()).unwrap()
    }

    #[test]
    fn test_movies_load_in_one_batch() {
        let store = MemoryStore::new();
        let loader = BatchLoader::new(&store, &NoProgress, 2);

        let report = loader
            .load(
                EntityKind::Movie,
                rows("movieId,title,year,genres\n1,A,,\n2,B,1999,Comedy\n3,C,2001,Drama\n"),
            )
            .unwrap();

        assert_eq!(report.inserted, 3);
        assert_eq!(report.batches, 1);
        assert_eq!(store.count("movies").unwrap(), 3);
    }

    #[test]
    fn test_empty_source_issues_no_insert() {
        let store = MemoryStore::new();
        let loader = BatchLoader::new(&store, &NoProgress, 10);

        let report = loader
            .load(EntityKind::Rating, rows("userId,movieId,rating,timestamp\n"))
            .unwrap();

        assert_eq!(report, LoadReport::empty(EntityKind::Rating));
    }

    #[test]
    fn test_malformed_row_keeps_prior_batches() {
        let store = MemoryStore::new();
        let loader = BatchLoader::new(&store, &NoProgress, 2);
        let data = "userId,movieId,rating,timestamp\n1,1,4.0,0\n1,2,3.0,0\n1,3,oops,0\n1,4,2.0,0\n";

        let err = loader.load(EntityKind::Rating, rows(data)).unwrap_err();

        assert!(matches!(
            err,
            IngestError::Data(DataLoadError::MalformedRecord { line: 4, .. })
        ));
        assert_eq!(store.count("ratings").unwrap(), 2);
    }

    #[test]
    fn test_missing_file_is_a_no_op() {
        let store = MemoryStore::new();
        let loader = BatchLoader::new(&store, &NoProgress, 10);

        let report = loader
            .load_path(EntityKind::User, Path::new("no/such/dir/users.csv"))
            .unwrap();

        assert_eq!(report.inserted, 0);
        assert_eq!(report.batches, 0);
    }
}
