//! Loader configuration.

use data_loader::EntityKind;
use std::path::{Path, PathBuf};

/// Documents per bulk insert for the ratings file
pub const DEFAULT_RATINGS_BATCH_SIZE: usize = 100_000;

/// Where the source files live and how large rating batches are
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoaderConfig {
    pub data_dir: PathBuf,
    pub ratings_batch_size: usize,
}

impl LoaderConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_ratings_batch_size(mut self, size: usize) -> Self {
        self.ratings_batch_size = size.max(1);
        self
    }

    /// Path of the CSV file for an entity kind, e.g. `data/ratings.csv`
    pub fn path_for(&self, kind: EntityKind) -> PathBuf {
        self.data_dir.join(kind.file_name())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            ratings_batch_size: DEFAULT_RATINGS_BATCH_SIZE,
        }
    }
}
