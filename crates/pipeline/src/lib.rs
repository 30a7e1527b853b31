//! Aggregation pipelines for the movie document store.
//!
//! This crate provides:
//! - `Stage`: the declarative group/match/sort/limit/lookup/unwind/project steps
//! - `AggregationPipeline`: a builder chaining stages
//! - An in-process evaluator for stores without an aggregation engine
//! - BSON value helpers (path lookup, cross-type comparison, grouping keys)
//!
//! ## Architecture
//! A pipeline is data. A store backed by a real document database renders it
//! with `to_documents()` and lets the server run it; the in-memory store
//! calls `apply()` and runs every stage here, stage by stage.
//!
//! ## Example Usage
//! ```ignore
//! use pipeline::{AggregationPipeline, Accumulator, Direction};
//!
//! let pipeline = AggregationPipeline::new()
//!     .group("movieId", [("avgRating", Accumulator::Avg("rating".into())), ("n", Accumulator::Count)])
//!     .match_gte("n", 1000)
//!     .sort([("avgRating", Direction::Descending), ("n", Direction::Descending)])
//!     .limit(10);
//! ```

pub mod error;
pub mod stage;
pub mod value;
pub mod eval;
pub mod aggregation;

// Re-export main types
pub use aggregation::AggregationPipeline;
pub use error::PipelineError;
pub use eval::CollectionSource;
pub use stage::{Accumulator, Direction, Predicate, Projection, Stage};
