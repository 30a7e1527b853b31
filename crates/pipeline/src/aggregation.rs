//! The AggregationPipeline chains stages together.
//!
//! Built with the builder pattern; a store either renders it to BSON for its
//! own aggregation engine (`to_documents`) or evaluates it in process
//! (`apply`).

use crate::error::Result;
use crate::eval::CollectionSource;
use crate::stage::{Accumulator, Direction, Predicate, Projection, Stage};
use bson::{Bson, Document};

/// An ordered list of aggregation stages.
///
/// ## Usage
/// ```ignore
/// let pipeline = AggregationPipeline::new()
///     .group("movieId", [("n", Accumulator::Count)])
///     .match_gte("n", 1000)
///     .sort([("n", Direction::Descending)])
///     .limit(10);
///
/// let results = store.aggregate("ratings", &pipeline)?;
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregationPipeline {
    stages: Vec<Stage>,
}

impl AggregationPipeline {
    /// Create a new empty pipeline.
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Append any stage (builder pattern).
    pub fn add_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Group by `key`, computing the named accumulators per group
    pub fn group<N: Into<String>>(
        self,
        key: impl Into<String>,
        accumulators: impl IntoIterator<Item = (N, Accumulator)>,
    ) -> Self {
        self.add_stage(Stage::Group {
            key: key.into(),
            accumulators: accumulators
                .into_iter()
                .map(|(name, acc)| (name.into(), acc))
                .collect(),
        })
    }

    /// Keep documents whose `field` is greater than or equal to `bound`
    pub fn match_gte(self, field: impl Into<String>, bound: impl Into<Bson>) -> Self {
        self.add_stage(Stage::Match {
            field: field.into(),
            predicate: Predicate::Gte(bound.into()),
        })
    }

    pub fn sort<N: Into<String>>(self, keys: impl IntoIterator<Item = (N, Direction)>) -> Self {
        self.add_stage(Stage::Sort(
            keys.into_iter()
                .map(|(field, direction)| (field.into(), direction))
                .collect(),
        ))
    }

    pub fn limit(self, n: u64) -> Self {
        self.add_stage(Stage::Limit(n))
    }

    /// Equality join: every document gets an array `as_field` holding the
    /// documents of `from` whose `foreign_field` equals its `local_field`
    pub fn lookup(
        self,
        from: impl Into<String>,
        local_field: impl Into<String>,
        foreign_field: impl Into<String>,
        as_field: impl Into<String>,
    ) -> Self {
        self.add_stage(Stage::Lookup {
            from: from.into(),
            local_field: local_field.into(),
            foreign_field: foreign_field.into(),
            as_field: as_field.into(),
        })
    }

    pub fn unwind(self, field: impl Into<String>) -> Self {
        self.add_stage(Stage::Unwind(field.into()))
    }

    pub fn project<N: Into<String>>(self, fields: impl IntoIterator<Item = (N, Projection)>) -> Self {
        self.add_stage(Stage::Project(
            fields
                .into_iter()
                .map(|(name, projection)| (name.into(), projection))
                .collect(),
        ))
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Render every stage in wire form, ready for a store's aggregate command
    pub fn to_documents(&self) -> Vec<Document> {
        self.stages.iter().map(Stage::to_document).collect()
    }

    /// Evaluate all stages in sequence over `input`.
    ///
    /// # Arguments
    /// * `input` - Documents of the collection the pipeline runs against
    /// * `source` - The other collections, for `$lookup`
    pub fn apply(&self, input: Vec<Document>, source: &dyn CollectionSource) -> Result<Vec<Document>> {
        let mut current = input;
        for stage in &self.stages {
            tracing::debug!(
                "Applying stage: {} (input count: {})",
                stage.name(),
                current.len()
            );
            current = stage.apply(current, source)?;
            tracing::debug!(
                "Stage applied: {} (output count: {})",
                stage.name(),
                current.len()
            );
        }
        Ok(current)
    }
}
