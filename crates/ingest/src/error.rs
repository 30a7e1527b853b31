//! Error types for the ingestion pipeline.

use crate::orchestrator::LoadStage;
use data_loader::DataLoadError;
use store::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// A row could not be read or transformed; aborts the current entity kind
    #[error(transparent)]
    Data(#[from] DataLoadError),

    /// The store failed or rejected a write
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A load stage failed; later stages were not run
    #[error("Load halted while entering {stage}: {source}")]
    Stage {
        stage: LoadStage,
        #[source]
        source: Box<IngestError>,
    },
}

impl IngestError {
    /// The innermost error, with any stage wrapping removed
    pub fn root(&self) -> &IngestError {
        match self {
            IngestError::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
