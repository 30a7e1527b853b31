//! # Load Orchestrator
//!
//! Sequences a full load:
//! 1. Reset: empty the movies, ratings and users collections
//! 2. Provision indexes
//! 3. Load movies
//! 4. Load ratings
//! 5. Load users
//!
//! No retries. The first failing stage halts the sequence and later stages
//! never run. Reset is unconditional and destructive; the loader is meant for
//! a controlled environment, not a populated production store.

use std::fmt;
use std::time::Instant;

use tracing::info;

use crate::batch::{BatchLoader, LoadReport};
use crate::config::LoaderConfig;
use crate::error::{IngestError, Result};
use crate::indexes::IndexProvisioner;
use crate::progress::ProgressReporter;
use data_loader::EntityKind;
use store::DocumentStore;

/// States of the linear load sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Reset,
    IndexesProvisioned,
    MoviesLoaded,
    RatingsLoaded,
    UsersLoaded,
    Done,
}

impl LoadStage {
    /// The stage reached once `kind` has been loaded
    pub fn loaded(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Movie => LoadStage::MoviesLoaded,
            EntityKind::Rating => LoadStage::RatingsLoaded,
            EntityKind::User => LoadStage::UsersLoaded,
        }
    }
}

impl fmt::Display for LoadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LoadStage::Reset => "Reset",
            LoadStage::IndexesProvisioned => "IndexesProvisioned",
            LoadStage::MoviesLoaded => "MoviesLoaded",
            LoadStage::RatingsLoaded => "RatingsLoaded",
            LoadStage::UsersLoaded => "UsersLoaded",
            LoadStage::Done => "Done",
        };
        f.write_str(name)
    }
}

/// What a completed load did
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Documents removed by the reset, across all three collections
    pub deleted: u64,
    pub indexes_created: usize,
    /// One report per entity kind, in load order
    pub reports: Vec<LoadReport>,
    /// Documents held by each collection once the load finished
    pub stored: Vec<(EntityKind, u64)>,
}

impl LoadSummary {
    pub fn report(&self, kind: EntityKind) -> Option<&LoadReport> {
        self.reports.iter().find(|report| report.kind == kind)
    }

    pub fn stored(&self, kind: EntityKind) -> Option<u64> {
        self.stored
            .iter()
            .find(|(stored_kind, _)| *stored_kind == kind)
            .map(|(_, count)| *count)
    }
}

/// Runs the Reset → ... → Done sequence against one store
pub struct LoadOrchestrator<'a> {
    store: &'a dyn DocumentStore,
    progress: &'a dyn ProgressReporter,
    config: LoaderConfig,
}

impl<'a> LoadOrchestrator<'a> {
    /// Create an orchestrator.
    ///
    /// # Arguments
    /// * `store` - Store to reset and load
    /// * `progress` - Receives ratings batch notifications
    /// * `config` - Data directory and batch size
    pub fn new(
        store: &'a dyn DocumentStore,
        progress: &'a dyn ProgressReporter,
        config: LoaderConfig,
    ) -> Self {
        Self {
            store,
            progress,
            config,
        }
    }

    /// Main entry point: run the full load
    pub fn run(&self) -> Result<LoadSummary> {
        let start_time = Instant::now();
        info!(
            "Starting load from {} into {} store",
            self.config.data_dir().display(),
            self.store.name()
        );

        let deleted = stage(LoadStage::Reset, || self.reset())?;
        info!("Reset complete, removed {} documents", deleted);

        let indexes_created = stage(LoadStage::IndexesProvisioned, || {
            IndexProvisioner::new(self.store).provision()
        })?;

        let loader = BatchLoader::new(self.store, self.progress, self.config.ratings_batch_size);
        let mut reports = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let path = self.config.path_for(kind);
            let report = stage(LoadStage::loaded(kind), || loader.load_path(kind, &path))?;
            info!("Entered {}", LoadStage::loaded(kind));
            reports.push(report);
        }

        let stored = stage(LoadStage::Done, || self.count_stored())?;

        info!(
            "Entered {} in {:.2?}",
            LoadStage::Done,
            start_time.elapsed()
        );
        Ok(LoadSummary {
            deleted,
            indexes_created,
            reports,
            stored,
        })
    }

    /// Count what each collection holds after loading
    fn count_stored(&self) -> Result<Vec<(EntityKind, u64)>> {
        let mut stored = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let count = self.store.count(kind.collection())?;
            info!("{} now holds {} documents", kind.collection(), count);
            stored.push((kind, count));
        }
        Ok(stored)
    }

    /// Discard the contents of all three collections
    fn reset(&self) -> Result<u64> {
        let mut deleted = 0;
        for kind in EntityKind::ALL {
            deleted += self.store.delete_all(kind.collection())?;
        }
        Ok(deleted)
    }
}

/// Run one transition, tagging any failure with the stage it was entering
fn stage<T>(stage: LoadStage, step: impl FnOnce() -> Result<T>) -> Result<T> {
    step().map_err(|source| IngestError::Stage {
        stage,
        source: Box::new(source),
    })
}
