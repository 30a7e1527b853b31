//! Error types for pipeline evaluation.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// A stage is well-typed but cannot be evaluated as declared
    #[error("Invalid {stage} stage: {reason}")]
    InvalidStage { stage: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
