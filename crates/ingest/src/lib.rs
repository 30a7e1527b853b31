//! Ingestion pipeline for the movie document store.
//!
//! This crate contains the components that move CSV data into a
//! `DocumentStore`:
//! - `BatchLoader`: rows → transformer → bounded unordered bulk inserts
//! - `IndexProvisioner`: declares the collections' indexes, idempotently
//! - `LoadOrchestrator`: Reset → indexes → movies → ratings → users → Done
//! - `ProgressReporter`: observer for ratings batch commits

pub mod batch;
pub mod config;
pub mod error;
pub mod indexes;
pub mod orchestrator;
pub mod progress;

pub use batch::{BatchLoader, LoadReport};
pub use config::{LoaderConfig, DEFAULT_RATINGS_BATCH_SIZE};
pub use error::{IngestError, Result};
pub use indexes::{required_indexes, IndexProvisioner};
pub use orchestrator::{LoadOrchestrator, LoadStage, LoadSummary};
pub use progress::{LogProgress, NoProgress, ProgressReporter};
